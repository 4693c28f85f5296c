//! Relay User Bot - Main Entry Point
//!
//! A Telegram userbot that relays every incoming message to a MongoDB
//! collection and an n8n-style webhook endpoint.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use relay_user_bot::config::{RelaySettings, TelegramConfig};
use relay_user_bot::pipeline::{RelayPipeline, RelayPolicy};
use relay_user_bot::sinks::{Forwarder, MongoStore, RecordStore, WebhookSink};
use relay_user_bot::telegram::{event_from_message, TelegramError, Update, Userbot};

/// Telegram userbot for relaying messages to external sinks.
#[derive(Parser, Debug)]
#[command(name = "relay_bot")]
#[command(about = "Relay incoming Telegram messages to MongoDB and a webhook")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let tg_config = TelegramConfig::from_env()
        .context("Failed to load Telegram configuration from environment")?;

    let settings = RelaySettings::from_env_with_defaults();

    std::fs::create_dir_all(&settings.download_dir)
        .context("Failed to create media download directory")?;

    // Set up sinks; each degrades to disabled when unconfigured or unreachable
    let store = connect_store(&settings).await;
    let forwarder = build_forwarder(&settings)?;

    // Connect to Telegram
    let (bot, mut stream) = Userbot::connect(&tg_config)
        .await
        .context("Failed to connect to Telegram")?;

    // Handle authentication if needed
    if !bot.is_authorized().await.context("Failed to check authorization")? {
        authenticate(&bot, &tg_config).await?;
    }

    match bot.me_id().await {
        Ok(id) => info!("Logged in as user {}", id),
        Err(e) => warn!("Could not resolve own user id: {}", e),
    }

    let pipeline = Arc::new(RelayPipeline::new(
        store,
        forwarder,
        RelayPolicy {
            denied_sender_id: settings.denied_sender_id,
            forward_duplicates: settings.forward_duplicates,
            max_media_bytes: settings.max_media_bytes,
            download_dir: settings.download_dir.clone(),
        },
    ));

    info!("Relay bot is running. Use Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            update = stream.next() => {
                match update {
                    Ok(Update::NewMessage(message)) => {
                        let event = event_from_message(bot.inner(), &message);
                        pipeline.relay(event).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Update stream ended: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // Cleanup: stop taking events, drain webhook tasks, drop the connection
    info!("Shutting down...");
    pipeline.shutdown().await;
    bot.disconnect();

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Connects the document sink, degrading to disabled on failure.
async fn connect_store(settings: &RelaySettings) -> Option<Arc<dyn RecordStore>> {
    let Some(uri) = &settings.mongo_uri else {
        info!("MONGO_URI not set; document logging disabled");
        return None;
    };

    match MongoStore::connect(uri, &settings.mongo_db, &settings.mongo_collection).await {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!("Document store unreachable; logging disabled: {}", e);
            None
        }
    }
}

/// Builds the webhook sink, degrading to disabled when unconfigured.
fn build_forwarder(settings: &RelaySettings) -> Result<Option<Arc<dyn Forwarder>>> {
    let Some(url) = &settings.webhook_url else {
        info!("N8N_WEBHOOK_URL not set; webhook forwarding disabled");
        return Ok(None);
    };

    let sink = WebhookSink::new(
        url.clone(),
        settings.max_concurrent_uploads,
        Duration::from_secs(settings.webhook_timeout_secs),
    )
    .context("Failed to build webhook client")?;

    info!(
        "Webhook sink enabled (max {} concurrent uploads)",
        settings.max_concurrent_uploads
    );
    Ok(Some(Arc::new(sink)))
}

/// Handles Telegram authentication.
async fn authenticate(bot: &Userbot, config: &TelegramConfig) -> Result<()> {
    info!("Authentication required");

    let phone: String = Input::new()
        .with_prompt("Enter your phone number (with country code)")
        .interact_text()?;

    let token = bot
        .request_login_code(&phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    match bot.sign_in(&token, &code).await {
        Ok(()) => {
            info!("Successfully signed in!");
            Ok(())
        }
        Err(TelegramError::PasswordRequired(password_token)) => {
            info!("Two-factor authentication is enabled");

            let hint = password_token.hint().unwrap_or("no hint");
            info!("Password hint: {}", hint);

            let password: String = Password::new()
                .with_prompt("Enter your 2FA password")
                .interact()?;

            bot.check_password(password_token, &password)
                .await
                .context("2FA authentication failed")?;

            info!("Successfully signed in with 2FA!");
            Ok(())
        }
        Err(e) => Err(e).context("Authentication failed"),
    }
}

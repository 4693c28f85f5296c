//! Webhook sink with bounded delivery concurrency.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

use super::Forwarder;
use crate::event::LogRecord;
use crate::pipeline::StagedMedia;

/// Errors that can occur during webhook delivery.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to read staged media: {0}")]
    Media(#[from] std::io::Error),

    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook answered status {0}")]
    Status(u16),

    #[error("Delivery limiter closed")]
    LimiterClosed,
}

/// Multipart POST sink for a single webhook endpoint.
///
/// At most `max_concurrent` deliveries are in flight at once; callers
/// beyond the cap wait for a permit. Deliveries are never retried.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    limiter: Semaphore,
}

impl WebhookSink {
    /// Creates a sink for `url` with the given concurrency cap and
    /// per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        url: String,
        max_concurrent: usize,
        timeout: Duration,
    ) -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url,
            limiter: Semaphore::new(max_concurrent),
        })
    }
}

#[async_trait]
impl Forwarder for WebhookSink {
    async fn deliver(
        &self,
        record: &LogRecord,
        media: Option<StagedMedia>,
    ) -> Result<(), ForwardError> {
        // Holding `media` to the end of this scope guarantees the staged
        // file is removed on every exit path, including early returns.
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ForwardError::LimiterClosed)?;

        let json = serde_json::to_string(record)?;
        let mut form =
            Form::new().part("json_data", Part::text(json).mime_str("application/json")?);

        if let Some(staged) = &media {
            let bytes = tokio::fs::read(staged.path()).await?;
            let part = Part::bytes(bytes)
                .file_name(staged.file_name())
                .mime_str(staged.content_type())?;
            form = form.part("file", part);
        }

        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(ForwardError::Status(status));
        }

        debug!(
            "Webhook delivery ok (chat_id: {}, message_id: {}, status: {})",
            record.chat_id, record.message_id, status
        );
        Ok(())
    }
}

impl std::fmt::Debug for WebhookSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSink")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

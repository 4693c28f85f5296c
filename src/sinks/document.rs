//! MongoDB-backed document sink.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use thiserror::Error;
use tracing::{debug, info};

use super::{RecordId, RecordStore};
use crate::event::LogRecord;

/// How long to wait for a reachable server before giving up at startup.
const SERVER_SELECTION_TIMEOUT_SECS: u64 = 5;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document store request failed: {0}")]
    Request(#[from] mongodb::error::Error),

    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

/// Document sink backed by a MongoDB collection.
///
/// One document per logged message; `(chat_id, message_id)` is the
/// dedup key. The check-then-insert is not transactional, so the dedup
/// guarantee is best-effort.
pub struct MongoStore {
    collection: Collection<LogRecord>,
}

impl MongoStore {
    /// Connects to the store and verifies it is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is invalid or the server does not
    /// answer a ping within the selection timeout. Callers treat that
    /// as "sink disabled", not as a fatal condition.
    pub async fn connect(uri: &str, db: &str, collection: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.server_selection_timeout =
            Some(Duration::from_secs(SERVER_SELECTION_TIMEOUT_SECS));

        let client = Client::with_options(options)?;
        let database = client.database(db);
        database.run_command(doc! { "ping": 1 }).await?;

        info!("Connected to document store (db: {}, collection: {})", db, collection);

        Ok(Self {
            collection: database.collection(collection),
        })
    }
}

#[async_trait]
impl RecordStore for MongoStore {
    async fn exists(&self, chat_id: i64, message_id: i32) -> Result<bool, StoreError> {
        let found = self
            .collection
            .find_one(doc! { "chat_id": chat_id, "message_id": message_id })
            .await?;
        Ok(found.is_some())
    }

    async fn insert(&self, record: &LogRecord) -> Result<RecordId, StoreError> {
        let result = self.collection.insert_one(record).await?;
        let id = RecordId(result.inserted_id.to_string());
        debug!(
            "Stored record {} (chat_id: {}, message_id: {})",
            id, record.chat_id, record.message_id
        );
        Ok(id)
    }
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("collection", &self.collection.name())
            .finish_non_exhaustive()
    }
}

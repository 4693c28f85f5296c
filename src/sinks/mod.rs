//! Delivery sinks for log records.
//!
//! Two independent targets: a document store for durable, deduplicated
//! logging, and a webhook endpoint for downstream automation. The
//! pipeline talks to both through object-safe traits so that either can
//! be swapped for an in-memory double in tests.

mod document;
mod webhook;

use async_trait::async_trait;

use crate::event::LogRecord;
use crate::pipeline::StagedMedia;

pub use document::{MongoStore, StoreError};
pub use webhook::{ForwardError, WebhookSink};

/// Identifier assigned to a persisted record by the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordId(pub String);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable record storage with a `(chat_id, message_id)` dedup index.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Checks whether a record for this `(chat_id, message_id)` pair exists.
    async fn exists(&self, chat_id: i64, message_id: i32) -> Result<bool, StoreError>;

    /// Inserts a record and returns its store-assigned id.
    async fn insert(&self, record: &LogRecord) -> Result<RecordId, StoreError>;
}

/// Best-effort forwarding of a record (plus optionally staged media).
///
/// Implementations own the staged file: it must be gone after `deliver`
/// returns, whatever the outcome.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Delivers a record. At-most-once: failures are not retried.
    async fn deliver(
        &self,
        record: &LogRecord,
        media: Option<StagedMedia>,
    ) -> Result<(), ForwardError>;
}

//! Message relay pipeline.
//!
//! One `relay` call per inbound event:
//! 1. Drop the operator's own outgoing messages
//! 2. Drop messages from the denylisted sender
//! 3. Project the event into a `LogRecord`
//! 4. Persist synchronously, deduplicated on `(chat_id, message_id)`
//! 5. Stage attached media into a temporary file (failure is non-fatal)
//! 6. Hand the record and staged file to a background webhook task
//!
//! The call returns after step 6 is scheduled; webhook delivery never
//! blocks message intake. Errors never escape `relay`: one bad event
//! must not affect the next.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use super::StagedMedia;
use crate::event::{InboundEvent, LogRecord};
use crate::sinks::{Forwarder, RecordStore, StoreError};

/// Errors that can abort a single relay operation.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Record persistence failed: {0}")]
    Store(#[from] StoreError),
}

/// Filter and dedup policy applied to every event.
#[derive(Debug, Clone)]
pub struct RelayPolicy {
    /// Sender id whose messages are discarded silently.
    pub denied_sender_id: Option<i64>,

    /// Whether already-logged messages are still forwarded.
    pub forward_duplicates: bool,

    /// Media larger than this is not staged.
    pub max_media_bytes: Option<u64>,

    /// Directory staged media is downloaded into.
    pub download_dir: PathBuf,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            denied_sender_id: None,
            forward_duplicates: true,
            max_media_bytes: None,
            download_dir: std::env::temp_dir(),
        }
    }
}

/// The relay pipeline: filters, persists, and fans out inbound events.
///
/// Either sink may be absent (disabled by configuration or an
/// unreachable backend); the pipeline then skips that stage.
pub struct RelayPipeline {
    store: Option<Arc<dyn RecordStore>>,
    forwarder: Option<Arc<dyn Forwarder>>,
    policy: RelayPolicy,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl RelayPipeline {
    /// Creates a pipeline with the given sinks and policy.
    #[must_use]
    pub fn new(
        store: Option<Arc<dyn RecordStore>>,
        forwarder: Option<Arc<dyn Forwarder>>,
        policy: RelayPolicy,
    ) -> Self {
        Self {
            store,
            forwarder,
            policy,
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Relays one inbound event to the configured sinks.
    ///
    /// Never fails: errors are logged here and swallowed so that a
    /// malformed or unlucky event cannot stall the update loop.
    pub async fn relay(&self, event: InboundEvent) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(
                "Pipeline closed, dropping event (chat_id: {}, message_id: {})",
                event.chat_id, event.message_id
            );
            return;
        }

        let chat_id = event.chat_id;
        let message_id = event.message_id;
        if let Err(e) = self.process(event).await {
            warn!(
                "Relay failed (chat_id: {}, message_id: {}): {}",
                chat_id, message_id, e
            );
        }
    }

    /// Blocks new events and waits for all in-flight webhook tasks.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let mut tasks = self.tasks.lock().await;
        let pending = tasks.len();
        if pending > 0 {
            info!("Draining {} in-flight webhook deliveries...", pending);
        }
        while tasks.join_next().await.is_some() {}
    }

    async fn process(&self, event: InboundEvent) -> Result<(), RelayError> {
        if event.outgoing {
            trace!(
                "Ignoring own outgoing message (chat_id: {}, message_id: {})",
                event.chat_id, event.message_id
            );
            return Ok(());
        }

        if let Some(denied) = self.policy.denied_sender_id
            && event.sender.as_ref().is_some_and(|s| s.id == Some(denied))
        {
            trace!(
                "Ignoring denylisted sender {} (chat_id: {}, message_id: {})",
                denied, event.chat_id, event.message_id
            );
            return Ok(());
        }

        let record = LogRecord::from_event(&event);

        let duplicate = self.persist(&record).await?;
        if duplicate && !self.policy.forward_duplicates {
            debug!(
                "Skipping duplicate (chat_id: {}, message_id: {})",
                record.chat_id, record.message_id
            );
            return Ok(());
        }

        let staged = if event.media.is_some() {
            self.stage_media(&event).await
        } else {
            None
        };

        self.dispatch(record, staged).await;
        Ok(())
    }

    /// Inserts the record unless the dedup index already has its key.
    /// Returns whether the record was a duplicate.
    async fn persist(&self, record: &LogRecord) -> Result<bool, RelayError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };

        if store.exists(record.chat_id, record.message_id).await? {
            debug!(
                "Record already logged (chat_id: {}, message_id: {})",
                record.chat_id, record.message_id
            );
            return Ok(true);
        }

        let id = store.insert(record).await?;
        debug!(
            "Logged record {} (chat_id: {}, message_id: {})",
            id, record.chat_id, record.message_id
        );
        Ok(false)
    }

    /// Downloads attached media into a uniquely named temporary file.
    ///
    /// Any failure is non-fatal: the event is forwarded without a file
    /// part, and a partially written file is removed.
    async fn stage_media(&self, event: &InboundEvent) -> Option<StagedMedia> {
        let media = event.media.as_ref()?;

        if let (Some(max), Some(size)) = (self.policy.max_media_bytes, media.size_bytes)
            && size > max
        {
            info!(
                "Media too large to stage ({} > {} bytes, chat_id: {}, message_id: {})",
                size, max, event.chat_id, event.message_id
            );
            return None;
        }

        let Some(source) = media.source.as_ref() else {
            debug!(
                "Media kind {} has no downloadable content (chat_id: {}, message_id: {})",
                media.kind, event.chat_id, event.message_id
            );
            return None;
        };

        // Keyed by chat and message id so concurrent relays never collide.
        let path = self
            .policy
            .download_dir
            .join(format!("{}_{}", event.chat_id, event.message_id));

        match source.download_to(&path).await {
            Ok(size) => {
                debug!("Staged {} bytes at {}", size, path.display());
                Some(StagedMedia::new(path, size, media.mime_type.clone()))
            }
            Err(e) => {
                warn!(
                    "Media download failed, forwarding without file (chat_id: {}, message_id: {}): {}",
                    event.chat_id, event.message_id, e
                );
                if path.exists() {
                    let _ = std::fs::remove_file(&path);
                }
                None
            }
        }
    }

    /// Schedules webhook delivery as a background task that owns the
    /// staged file. Returns as soon as the task is spawned.
    async fn dispatch(&self, record: LogRecord, staged: Option<StagedMedia>) {
        let Some(forwarder) = &self.forwarder else {
            // No webhook configured: dropping `staged` here removes the file.
            return;
        };

        let forwarder = Arc::clone(forwarder);
        let mut tasks = self.tasks.lock().await;

        // Reap finished deliveries so the set does not grow unbounded.
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            if let Err(e) = forwarder.deliver(&record, staged).await {
                warn!(
                    "Webhook delivery failed (chat_id: {}, message_id: {}): {}",
                    record.chat_id, record.message_id, e
                );
            }
        });
    }
}

impl std::fmt::Debug for RelayPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayPipeline")
            .field("policy", &self.policy)
            .field("has_store", &self.store.is_some())
            .field("has_forwarder", &self.forwarder.is_some())
            .finish_non_exhaustive()
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use relay_user_bot::event::{InboundEvent, MediaInfo, MediaKind, SenderInfo};
use relay_user_bot::pipeline::{RelayPipeline, RelayPolicy};

// Mock implementations for integration testing
mod mocks {
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use relay_user_bot::event::{LogRecord, MediaError, MediaSource};
    use relay_user_bot::pipeline::StagedMedia;
    use relay_user_bot::sinks::{ForwardError, Forwarder, RecordId, RecordStore, StoreError};

    /// Record store over a `HashSet`, mirroring the dedup index.
    #[derive(Default)]
    pub struct InMemoryStore {
        keys: Mutex<HashSet<(i64, i32)>>,
        inserted: Mutex<Vec<LogRecord>>,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn inserted(&self) -> Vec<LogRecord> {
            self.inserted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for InMemoryStore {
        async fn exists(&self, chat_id: i64, message_id: i32) -> Result<bool, StoreError> {
            Ok(self.keys.lock().unwrap().contains(&(chat_id, message_id)))
        }

        async fn insert(&self, record: &LogRecord) -> Result<RecordId, StoreError> {
            let mut keys = self.keys.lock().unwrap();
            keys.insert((record.chat_id, record.message_id));

            let mut inserted = self.inserted.lock().unwrap();
            inserted.push(record.clone());
            Ok(RecordId(format!("record-{}", inserted.len())))
        }
    }

    /// A delivered record plus what was known about its staged media.
    #[derive(Debug, Clone)]
    pub struct Delivery {
        pub record: LogRecord,
        pub media_path: Option<PathBuf>,
    }

    /// Forwarder that records deliveries instead of POSTing them.
    #[derive(Default)]
    pub struct RecordingForwarder {
        deliveries: Mutex<Vec<Delivery>>,
    }

    impl RecordingForwarder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn deliveries(&self) -> Vec<Delivery> {
            self.deliveries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Forwarder for RecordingForwarder {
        async fn deliver(
            &self,
            record: &LogRecord,
            media: Option<StagedMedia>,
        ) -> Result<(), ForwardError> {
            self.deliveries.lock().unwrap().push(Delivery {
                record: record.clone(),
                media_path: media.as_ref().map(|m| m.path().to_path_buf()),
            });
            // Dropping `media` here removes the staged file, as the real sink does.
            Ok(())
        }
    }

    /// Media source producing a fixed payload.
    pub struct PayloadSource(pub &'static [u8]);

    #[async_trait]
    impl MediaSource for PayloadSource {
        async fn download_to(&self, dest: &Path) -> Result<u64, MediaError> {
            tokio::fs::write(dest, self.0).await?;
            Ok(self.0.len() as u64)
        }
    }

    /// Media source that always fails mid-transfer.
    pub struct FailingSource;

    #[async_trait]
    impl MediaSource for FailingSource {
        async fn download_to(&self, _dest: &Path) -> Result<u64, MediaError> {
            Err(MediaError::Transfer("connection reset".to_owned()))
        }
    }
}

use mocks::{FailingSource, InMemoryStore, PayloadSource, RecordingForwarder};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("relay_bot_it_{}_{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn pipeline_with(
    store: &Arc<InMemoryStore>,
    forwarder: &Arc<RecordingForwarder>,
    download_dir: &Path,
) -> RelayPipeline {
    RelayPipeline::new(
        Some(Arc::clone(store) as _),
        Some(Arc::clone(forwarder) as _),
        RelayPolicy {
            denied_sender_id: Some(7_436_240_400),
            forward_duplicates: true,
            max_media_bytes: None,
            download_dir: download_dir.to_path_buf(),
        },
    )
}

fn text_event(chat_id: i64, message_id: i32, text: &str) -> InboundEvent {
    InboundEvent {
        chat_id,
        message_id,
        sender: Some(SenderInfo {
            id: Some(5),
            username: Some("alice".to_owned()),
            display_name: Some("Alice".to_owned()),
        }),
        text: Some(text.to_owned()),
        ..InboundEvent::default()
    }
}

#[tokio::test]
async fn outgoing_messages_produce_no_sink_calls() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("outgoing");
    let pipeline = pipeline_with(&store, &forwarder, &dir);

    let event = InboundEvent {
        outgoing: true,
        ..text_event(100, 1, "my own message")
    };
    pipeline.relay(event).await;
    pipeline.shutdown().await;

    assert!(store.inserted().is_empty());
    assert!(forwarder.deliveries().is_empty());
}

#[tokio::test]
async fn denylisted_sender_produces_no_sink_calls() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("denylist");
    let pipeline = pipeline_with(&store, &forwarder, &dir);

    let mut event = text_event(100, 2, "promo");
    event.sender = Some(SenderInfo {
        id: Some(7_436_240_400),
        username: None,
        display_name: None,
    });
    pipeline.relay(event).await;
    pipeline.shutdown().await;

    assert!(store.inserted().is_empty());
    assert!(forwarder.deliveries().is_empty());
}

#[tokio::test]
async fn duplicate_submissions_insert_at_most_once() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("dedup");
    let pipeline = pipeline_with(&store, &forwarder, &dir);

    pipeline.relay(text_event(100, 7, "hi")).await;
    pipeline.relay(text_event(100, 7, "hi")).await;
    pipeline.shutdown().await;

    assert_eq!(store.inserted().len(), 1);
    // Forwarding stays independent of dedup state under the default policy.
    assert_eq!(forwarder.deliveries().len(), 2);
}

#[tokio::test]
async fn duplicates_can_be_dropped_entirely_by_policy() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("dedup_strict");
    let pipeline = RelayPipeline::new(
        Some(Arc::clone(&store) as _),
        Some(Arc::clone(&forwarder) as _),
        RelayPolicy {
            denied_sender_id: None,
            forward_duplicates: false,
            max_media_bytes: None,
            download_dir: dir,
        },
    );

    pipeline.relay(text_event(100, 7, "hi")).await;
    pipeline.relay(text_event(100, 7, "hi")).await;
    pipeline.shutdown().await;

    assert_eq!(store.inserted().len(), 1);
    assert_eq!(forwarder.deliveries().len(), 1);
}

#[tokio::test]
async fn text_event_is_projected_into_both_sinks() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("project");
    let pipeline = pipeline_with(&store, &forwarder, &dir);

    pipeline.relay(text_event(100, 7, "hi")).await;
    pipeline.shutdown().await;

    let inserted = store.inserted();
    assert_eq!(inserted.len(), 1);
    let record = &inserted[0];
    assert_eq!(record.chat_id, 100);
    assert_eq!(record.message_id, 7);
    assert_eq!(record.from_user_id, Some(5));
    assert_eq!(record.username.as_deref(), Some("alice"));
    assert_eq!(record.text, "hi");
    assert!(!record.has_media);

    let deliveries = forwarder.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(&deliveries[0].record, record);
    assert!(deliveries[0].media_path.is_none());
}

#[tokio::test]
async fn staged_media_is_delivered_and_cleaned_up() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("media");
    let pipeline = pipeline_with(&store, &forwarder, &dir);

    let mut event = text_event(100, 9, "");
    event.text = None;
    event.caption = Some("look at this".to_owned());
    event.media = Some(MediaInfo {
        kind: MediaKind::Photo,
        size_bytes: Some(11),
        mime_type: Some("image/jpeg".to_owned()),
        source: Some(Box::new(PayloadSource(b"photo bytes"))),
    });

    pipeline.relay(event).await;
    pipeline.shutdown().await;

    let deliveries = forwarder.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].record.has_media);
    assert_eq!(deliveries[0].record.media_type.as_deref(), Some("photo"));
    assert_eq!(deliveries[0].record.text, "look at this");

    let staged_path = deliveries[0].media_path.as_ref().unwrap();
    assert_eq!(staged_path, &dir.join("100_9"));
    assert!(
        !staged_path.exists(),
        "staged file must be removed after delivery"
    );
}

#[tokio::test]
async fn media_download_failure_still_forwards_without_file() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("media_fail");
    let pipeline = pipeline_with(&store, &forwarder, &dir);

    let mut event = text_event(100, 10, "");
    event.media = Some(MediaInfo {
        kind: MediaKind::Photo,
        size_bytes: None,
        mime_type: None,
        source: Some(Box::new(FailingSource)),
    });

    pipeline.relay(event).await;
    pipeline.shutdown().await;

    let deliveries = forwarder.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].record.has_media);
    assert!(deliveries[0].media_path.is_none());
    assert!(!dir.join("100_10").exists(), "no leftover temp file");
}

#[tokio::test]
async fn oversized_media_is_not_staged() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("media_cap");
    let pipeline = RelayPipeline::new(
        Some(Arc::clone(&store) as _),
        Some(Arc::clone(&forwarder) as _),
        RelayPolicy {
            denied_sender_id: None,
            forward_duplicates: true,
            max_media_bytes: Some(4),
            download_dir: dir.clone(),
        },
    );

    let mut event = text_event(100, 11, "");
    event.media = Some(MediaInfo {
        kind: MediaKind::Document,
        size_bytes: Some(1_000_000),
        mime_type: None,
        source: Some(Box::new(PayloadSource(b"should never be written"))),
    });

    pipeline.relay(event).await;
    pipeline.shutdown().await;

    let deliveries = forwarder.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].media_path.is_none());
    assert!(!dir.join("100_11").exists());
}

#[tokio::test]
async fn events_relay_with_sinks_disabled() {
    let dir = scratch_dir("disabled");
    let pipeline = RelayPipeline::new(
        None,
        None,
        RelayPolicy {
            denied_sender_id: None,
            forward_duplicates: true,
            max_media_bytes: None,
            download_dir: dir.clone(),
        },
    );

    // Staged media must still be cleaned up when no forwarder takes it.
    let mut event = text_event(55, 3, "");
    event.media = Some(MediaInfo {
        kind: MediaKind::Photo,
        size_bytes: None,
        mime_type: None,
        source: Some(Box::new(PayloadSource(b"orphan"))),
    });

    pipeline.relay(event).await;
    pipeline.shutdown().await;

    assert!(!dir.join("55_3").exists(), "no leftover temp file");
}

#[tokio::test]
async fn shutdown_blocks_new_events() {
    let store = Arc::new(InMemoryStore::new());
    let forwarder = Arc::new(RecordingForwarder::new());
    let dir = scratch_dir("closed");
    let pipeline = pipeline_with(&store, &forwarder, &dir);

    pipeline.shutdown().await;
    pipeline.relay(text_event(100, 12, "late")).await;

    assert!(store.inserted().is_empty());
    assert!(forwarder.deliveries().is_empty());
}

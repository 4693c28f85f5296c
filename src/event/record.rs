//! Flattened log record handed to both sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::InboundEvent;

/// Serializable projection of an [`InboundEvent`].
///
/// Created once per event and never mutated. `(chat_id, message_id)`
/// uniquely identifies a record for deduplication. Absent optional
/// fields serialize as `null`, never as an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Dialog id of the chat.
    pub chat_id: i64,

    /// Chat title or peer first name.
    pub chat_title: Option<String>,

    /// Message id within the chat.
    pub message_id: i32,

    /// Resolved sender id.
    pub from_user_id: Option<i64>,

    /// Resolved sender username.
    pub username: Option<String>,

    /// Resolved sender display name.
    pub first_name: Option<String>,

    /// Canonical text content (may be empty for pure media messages).
    pub text: String,

    /// Whether the message carried media.
    pub has_media: bool,

    /// Media kind name, when media is present.
    pub media_type: Option<String>,

    /// Server-side send time.
    pub date: Option<DateTime<Utc>>,
}

impl LogRecord {
    /// Builds a record from an inbound event.
    ///
    /// Always succeeds: missing chat title, sender, or media simply
    /// project to `null` fields.
    #[must_use]
    pub fn from_event(event: &InboundEvent) -> Self {
        let sender = event.effective_sender();

        Self {
            chat_id: event.chat_id,
            chat_title: event.chat_title.clone(),
            message_id: event.message_id,
            from_user_id: sender.and_then(|s| s.id),
            username: sender.and_then(|s| s.username.clone()),
            first_name: sender.and_then(|s| s.display_name.clone()),
            text: event.content().to_owned(),
            has_media: event.media.is_some(),
            media_type: event.media.as_ref().map(|m| m.kind.as_str().to_owned()),
            date: event.sent_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MediaInfo, MediaKind, SenderInfo};

    #[test]
    fn test_record_from_bare_text_event() {
        let event = InboundEvent {
            chat_id: 123,
            message_id: 1,
            text: Some("hello".to_owned()),
            ..InboundEvent::default()
        };

        let record = LogRecord::from_event(&event);
        assert_eq!(record.chat_id, 123);
        assert_eq!(record.message_id, 1);
        assert_eq!(record.text, "hello");
        assert!(record.chat_title.is_none());
        assert!(record.from_user_id.is_none());
        assert!(!record.has_media);
        assert!(record.media_type.is_none());
    }

    #[test]
    fn test_record_resolves_sender_chain() {
        let event = InboundEvent {
            chat_id: 100,
            message_id: 7,
            forwarded_from_user: Some(SenderInfo {
                id: Some(5),
                username: Some("alice".to_owned()),
                display_name: Some("Alice".to_owned()),
            }),
            caption: Some("hi".to_owned()),
            ..InboundEvent::default()
        };

        let record = LogRecord::from_event(&event);
        assert_eq!(record.from_user_id, Some(5));
        assert_eq!(record.username.as_deref(), Some("alice"));
        assert_eq!(record.first_name.as_deref(), Some("Alice"));
        assert_eq!(record.text, "hi");
    }

    #[test]
    fn test_record_media_projection() {
        let event = InboundEvent {
            chat_id: 1,
            message_id: 2,
            media: Some(MediaInfo::bare(MediaKind::Photo)),
            ..InboundEvent::default()
        };

        let record = LogRecord::from_event(&event);
        assert!(record.has_media);
        assert_eq!(record.media_type.as_deref(), Some("photo"));
        assert_eq!(record.text, "");
    }

    #[test]
    fn test_absent_fields_serialize_as_null() {
        let event = InboundEvent {
            chat_id: 123,
            message_id: 1,
            text: Some("hello".to_owned()),
            ..InboundEvent::default()
        };
        let json = serde_json::to_value(LogRecord::from_event(&event)).unwrap();

        assert_eq!(json["chat_title"], serde_json::Value::Null);
        assert_eq!(json["username"], serde_json::Value::Null);
        assert_eq!(json["media_type"], serde_json::Value::Null);
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn test_json_round_trip_without_field_loss() {
        let record = LogRecord {
            chat_id: 123,
            chat_title: None,
            message_id: 1,
            from_user_id: None,
            username: None,
            first_name: None,
            text: "hello".to_owned(),
            has_media: false,
            media_type: None,
            date: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}

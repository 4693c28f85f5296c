//! Inbound event types.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while materializing remote media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Failed to write staged file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Media transfer failed: {0}")]
    Transfer(String),
}

/// A remote reference that can be downloaded into a local file.
///
/// Implemented by the Telegram adapter for downloadable media kinds,
/// and by test doubles.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Downloads the media content into `dest`, returning the byte count.
    async fn download_to(&self, dest: &Path) -> Result<u64, MediaError>;
}

/// Identity of a message sender or forward origin.
///
/// Every field is optional: forwarded channel posts may carry only a
/// display name, and hidden-forward origins may carry nothing at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderInfo {
    /// Bare peer id, if known.
    pub id: Option<i64>,

    /// Public username without the leading `@`.
    pub username: Option<String>,

    /// First name, chat title, or forward-origin name.
    pub display_name: Option<String>,
}

/// Kind of media attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Document,
    Sticker,
    Contact,
    Poll,
    Geo,
    Dice,
    Venue,
    WebPage,
    Other,
}

impl MediaKind {
    /// Returns the kind name used in the `media_type` record field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Sticker => "sticker",
            Self::Contact => "contact",
            Self::Poll => "poll",
            Self::Geo => "geo",
            Self::Dice => "dice",
            Self::Venue => "venue",
            Self::WebPage => "web_page",
            Self::Other => "other",
        }
    }

    /// Whether this kind has downloadable file content.
    #[must_use]
    pub const fn is_downloadable(self) -> bool {
        matches!(self, Self::Photo | Self::Document | Self::Sticker)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media descriptor: kind, size, and the remote reference.
pub struct MediaInfo {
    /// Kind of the attached media.
    pub kind: MediaKind,

    /// Size in bytes, when the remote descriptor exposes it.
    pub size_bytes: Option<u64>,

    /// MIME type, when the remote descriptor exposes it.
    pub mime_type: Option<String>,

    /// Remote reference; absent for kinds with no file content.
    pub source: Option<Box<dyn MediaSource>>,
}

impl MediaInfo {
    /// Creates a descriptor without a downloadable source.
    #[must_use]
    pub fn bare(kind: MediaKind) -> Self {
        Self {
            kind,
            size_bytes: None,
            mime_type: None,
            source: None,
        }
    }
}

impl fmt::Debug for MediaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaInfo")
            .field("kind", &self.kind)
            .field("size_bytes", &self.size_bytes)
            .field("mime_type", &self.mime_type)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

/// A normalized inbound message event.
///
/// Built once by the Telegram adapter and never mutated. Absence of a
/// field means the message genuinely carried no such data.
#[derive(Debug, Default)]
pub struct InboundEvent {
    /// Dialog id of the chat the message arrived in.
    pub chat_id: i64,

    /// Chat title, or the peer's first name in one-to-one chats.
    pub chat_title: Option<String>,

    /// Message id, unique within the chat.
    pub message_id: i32,

    /// Whether the operator's own account sent this message.
    pub outgoing: bool,

    /// Direct sender, when the message carries one.
    pub sender: Option<SenderInfo>,

    /// Original author for messages forwarded from a user.
    pub forwarded_from_user: Option<SenderInfo>,

    /// Origin for messages forwarded from a channel.
    pub forwarded_from_channel: Option<SenderInfo>,

    /// Message text, for plain text messages.
    pub text: Option<String>,

    /// Caption, for media messages.
    pub caption: Option<String>,

    /// Attached media descriptor.
    pub media: Option<MediaInfo>,

    /// Server-side send time.
    pub sent_at: Option<DateTime<Utc>>,
}

impl InboundEvent {
    /// Resolves the effective sender identity.
    ///
    /// Falls back direct sender → forwarded-from user → forwarded-from
    /// channel; returns `None` when all three are absent.
    #[must_use]
    pub fn effective_sender(&self) -> Option<&SenderInfo> {
        self.sender
            .as_ref()
            .or(self.forwarded_from_user.as_ref())
            .or(self.forwarded_from_channel.as_ref())
    }

    /// Canonical text content: text, else caption, else empty.
    #[must_use]
    pub fn content(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or_default()
    }
}

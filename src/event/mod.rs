//! Inbound event data model.
//!
//! Normalized projection of Telegram messages, independent of the
//! underlying client library. Events are immutable once built.

mod record;
mod types;

pub use record::LogRecord;
pub use types::{InboundEvent, MediaError, MediaInfo, MediaKind, MediaSource, SenderInfo};

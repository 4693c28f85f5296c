//! Message relay pipeline module.
//!
//! Receives normalized inbound events, applies filter and dedup policy,
//! stages media, and fans out to the configured sinks.

mod relay;
mod staging;

pub use relay::{RelayError, RelayPipeline, RelayPolicy};
pub use staging::StagedMedia;

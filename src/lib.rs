//! Relay User Bot Library
//!
//! A Telegram userbot that relays incoming messages to external sinks.
//!
//! This crate provides the core functionality for:
//! - Normalizing inbound Telegram messages into log records
//! - Deduplicated persistence into a MongoDB collection
//! - Bounded-concurrency webhook forwarding with media attachments
//! - Connecting to Telegram via `MTProto`

pub mod config;
pub mod event;
pub mod pipeline;
pub mod sinks;
pub mod telegram;

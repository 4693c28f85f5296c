//! Telegram client wrapper module.
//!
//! Provides high-level abstractions for interacting with Telegram,
//! including authentication, the update stream, and conversion of raw
//! messages into normalized inbound events.

mod client;
mod convert;

pub use client::{
    PwdToken as PasswordToken, TelegramError, Token as LoginToken, UpdateStream, Userbot,
};
pub use convert::event_from_message;
pub use grammers_client::update::Update;

//! Twitch chat transport: IRC over WebSocket with automatic reconnects.

mod client;
pub mod irc;
mod reconnect;

pub use client::{ChatClient, ChatConfig, ChatMessage, DEFAULT_URL, spawn};
pub use reconnect::{DEFAULT_RECONNECT_DELAY, ReconnectPolicy};

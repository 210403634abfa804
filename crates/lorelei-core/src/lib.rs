pub mod config;
pub mod conversation;
pub mod dialogue;
pub mod directive;
pub mod fact_store;
pub mod generator;
pub mod intake;

/// Represents commands that the core logic (`Conversation`) issues to the runtime.
///
/// This enum decouples the engine's decisions from the runtime's execution
/// of side effects (like writing to the chat channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Post the given text to the chat channel.
    SendChat(String),
}

/// One inbound event on the chat queue. Voice transcripts travel on their
/// own queue, see [`intake::run_voice_loop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A chat line from `username`.
    Chat { username: String, text: String },
}

//! # Chat
//!
//! Mention-triggered chat front door (Discord).
//!
//! - `mention` - deciding what a message asks for, formatting replies
//! - `handler` - running the agent for a mention and replying
//! - `discord` - gateway listener and REST sink

pub mod discord;
pub mod handler;
pub mod mention;

use thiserror::Error;

pub use discord::{DiscordGateway, DiscordRest};
pub use handler::{ChatSink, MentionHandler};
pub use mention::{classify, ChatMessage, MentionOutcome};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("gateway connection failed: {0}")]
    Gateway(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("gateway sent invalid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("gateway protocol error: {0}")]
    Protocol(String),
    #[error("chat token was rejected")]
    Unauthorized,
    #[error("gateway rejected the requested intents (close code {0})")]
    IntentsRejected(u16),
}

//! # Mention Handler
//!
//! Turns a mention into an agent run and posts the outcome back to the
//! channel the mention came from.

use super::mention::{classify, format_failure, format_success, ChatMessage, MentionOutcome};
use super::mention::{GREETING, PROCESSING};
use super::ChatError;
use crate::agent::TaskRunner;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Where the bot's replies go
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), ChatError>;
}

pub struct MentionHandler {
    runner: Arc<dyn TaskRunner>,
    sink: Arc<dyn ChatSink>,
}

impl MentionHandler {
    pub fn new(runner: Arc<dyn TaskRunner>, sink: Arc<dyn ChatSink>) -> Self {
        Self { runner, sink }
    }

    /// Handle one message to completion. Returns the outcome it acted on.
    pub async fn handle(&self, bot_user_id: &str, message: &ChatMessage) -> MentionOutcome {
        let outcome = classify(bot_user_id, message);
        match &outcome {
            MentionOutcome::Ignore => {}
            MentionOutcome::Greeting => self.reply(&message.channel_id, GREETING).await,
            MentionOutcome::Task(task) => {
                info!(
                    channel_id = %message.channel_id,
                    author_id = %message.author_id,
                    "mention received"
                );
                self.reply(&message.channel_id, PROCESSING).await;

                let reply = match self.runner.run(task).await {
                    Ok(output) => format_success(&output),
                    Err(e) => {
                        warn!(channel_id = %message.channel_id, error = %e, "task failed");
                        format_failure(&e.to_string())
                    }
                };
                self.reply(&message.channel_id, &reply).await;
            }
        }
        outcome
    }

    /// Handle a message on its own task so the gateway loop keeps reading.
    pub fn spawn(self: &Arc<Self>, bot_user_id: String, message: ChatMessage) -> JoinHandle<()> {
        let handler = Arc::clone(self);
        tokio::spawn(async move {
            handler.handle(&bot_user_id, &message).await;
        })
    }

    async fn reply(&self, channel_id: &str, content: &str) {
        if let Err(e) = self.sink.send_message(channel_id, content).await {
            warn!(%channel_id, error = %e, "failed to post chat reply");
        }
    }
}

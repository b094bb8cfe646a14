//! # Mesh Envelopes
//!
//! Message shapes exchanged with other agents over the bus.
//!
//! Inbound messages are dispatched on their `type` field. Only `task` carries
//! work for this agent; every other type is accepted and ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a `task` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContent {
    /// Caller-assigned task identifier, echoed in the reply
    #[serde(default)]
    pub task_id: String,
    /// The natural-language task
    #[serde(default)]
    pub description: String,
    /// Address the result should be sent to
    #[serde(default)]
    pub reply_to: Option<String>,
}

/// A message received from the bus
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Work for this agent
    Task {
        content: TaskContent,
        /// Sender address, used when `reply_to` is missing
        #[serde(default)]
        from: Option<String>,
    },
    /// Any other message type
    #[serde(other)]
    Other,
}

impl InboundMessage {
    pub fn parse(body: &Value) -> Result<Self, serde_json::Error> {
        InboundMessage::deserialize(body)
    }
}

/// Outcome of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Failed,
}

/// A message sent back over the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Result of a `task` message
    TaskResult {
        task_id: String,
        status: TaskStatus,
        /// Agent output, or the error text when `status` is `failed`
        result: String,
        /// Bus id of the message that carried the task
        original_message_id: String,
        completed_at: DateTime<Utc>,
    },
}

impl OutboundMessage {
    pub fn task_result(
        task_id: impl Into<String>,
        original_message_id: impl Into<String>,
        outcome: Result<String, String>,
    ) -> Self {
        let (status, result) = match outcome {
            Ok(output) => (TaskStatus::Completed, output),
            Err(error) => (TaskStatus::Failed, error),
        };
        OutboundMessage::TaskResult {
            task_id: task_id.into(),
            status,
            result,
            original_message_id: original_message_id.into(),
            completed_at: Utc::now(),
        }
    }
}

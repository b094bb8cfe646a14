//! # Agent Facade
//!
//! Turns a task string into a result string by running the radkit tool-calling
//! worker with the Influenxers prompt and marketing tools.
//!
//! Every front door (HTTP, peer messaging, chat) talks to the agent through
//! the [`TaskRunner`] trait, so they can be exercised with a stub runner.

use crate::models::ModelConfig;
use crate::skills::prompts;
use crate::skills::tools::marketing_tools;
use crate::with_llm;
use anyhow::bail;
use async_trait::async_trait;
use radkit::agent::LlmWorker;
use radkit::macros::LLMOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Anything that can turn a task into a textual result.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: &str) -> anyhow::Result<String>;
}

/// Final answer produced by the worker
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, LLMOutput)]
pub struct AgentReply {
    /// The complete answer for the user
    pub output: String,
}

/// The Influenxers agent
#[derive(Debug, Clone, Default)]
pub struct InfluenxersAgent {
    config: ModelConfig,
}

impl InfluenxersAgent {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Run one task through the LLM worker and return its answer.
    pub async fn run_task(&self, task: &str) -> anyhow::Result<String> {
        let task = task.trim();
        if task.is_empty() {
            bail!("task must not be empty");
        }

        let started = Instant::now();
        info!(
            provider = self.config.provider.display_name(),
            model = %self.config.model,
            chars = task.len(),
            "running agent task"
        );

        let input = task.to_string();
        let result: anyhow::Result<AgentReply> = with_llm!(&self.config, |llm| {
            LlmWorker::<AgentReply>::builder(llm)
                .with_system_instructions(prompts::INFLUENXERS)
                .with_tool(marketing_tools::ingest_product)
                .with_tool(marketing_tools::scrape_tiktok_inspiration)
                .with_tool(marketing_tools::analyze_creator_style)
                .with_tool(marketing_tools::generate_script)
                .with_tool(marketing_tools::suggest_edits)
                .build()
                .run(input)
                .await
                .map_err(Into::into)
        });

        match result {
            Ok(reply) => {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "agent task finished");
                Ok(reply.output)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "agent task failed"
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl TaskRunner for InfluenxersAgent {
    async fn run(&self, task: &str) -> anyhow::Result<String> {
        self.run_task(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_task_is_rejected_before_llm() {
        let agent = InfluenxersAgent::default();
        let err = agent.run("   \n").await.unwrap_err();
        assert_eq!(err.to_string(), "task must not be empty");
    }

    #[test]
    fn test_reply_schema_has_output() {
        let reply: AgentReply = serde_json::from_str(r#"{"output": "3 hooks"}"#).unwrap();
        assert_eq!(reply.output, "3 hooks");
    }
}

//! # Influenxers Skill
//!
//! A2A-native skill exposing the agent facade to other agents on the
//! network. The request text is the task; the completion message is the
//! agent's answer.

use crate::agent::InfluenxersAgent;
use crate::models::ModelConfig;
use async_trait::async_trait;
use radkit::agent::{OnRequestResult, SkillHandler};
use radkit::errors::AgentResult;
use radkit::macros::skill;
use radkit::models::Content;
use radkit::runtime::context::{ProgressSender, State};
use radkit::runtime::AgentRuntime;

/// Skill that runs influencer marketing tasks
#[skill(
    id = "influencer_marketing",
    name = "Influencer Marketing",
    description = "Ingests product briefs, scrapes TikTok inspiration, analyzes creator style, generates video scripts, and suggests edits.",
    tags = ["marketing", "tiktok", "influencer", "ugc"],
    examples = [
        "Ingest product for michelechungugc using https://acme.notion.site/brief",
        "Generate a script for michelechungugc"
    ],
    input_modes = ["text/plain"],
    output_modes = ["text/plain"]
)]
pub struct InfluenxersSkill {
    agent: InfluenxersAgent,
}

impl InfluenxersSkill {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            agent: InfluenxersAgent::new(config),
        }
    }
}

#[async_trait]
impl SkillHandler for InfluenxersSkill {
    async fn on_request(
        &self,
        _state: &mut State,
        progress: &ProgressSender,
        _runtime: &dyn AgentRuntime,
        content: Content,
    ) -> AgentResult<OnRequestResult> {
        let task = content.first_text().unwrap_or_default();

        progress
            .send_update("Influenxers is processing your task...")
            .await?;

        match self.agent.run_task(&task).await {
            Ok(output) => Ok(OnRequestResult::Completed {
                message: Some(Content::from_text(&output)),
                artifacts: vec![],
            }),
            Err(e) => Ok(OnRequestResult::Failed {
                error: Content::from_text(&e.to_string()),
            }),
        }
    }
}

//! # A2A Agent Definitions
//!
//! Composes the Influenxers agent from its skill using radkit's Agent::builder()
//! and serves it with radkit's runtime (JSON-RPC, streaming, agent card).

use crate::models::ModelConfig;
use crate::skills::InfluenxersSkill;
use crate::with_llm;
use radkit::agent::{Agent, AgentDefinition};
use radkit::runtime::Runtime;
use tracing::info;

/// Agent name on the A2A network and message bus
pub const AGENT_NAME: &str = "Influenxers";

/// Agent description used in discovery documents
pub const AGENT_DESCRIPTION: &str =
    "Influenxers is an AI agent helping with influencer video marketing tasks.";

/// The Influenxers Agent
pub fn influenxers_agent(config: ModelConfig) -> AgentDefinition {
    Agent::builder()
        .with_name(AGENT_NAME)
        .with_description(AGENT_DESCRIPTION)
        .with_skill(InfluenxersSkill::new(config))
        .build()
}

/// Serve the agent over A2A until the process stops.
///
/// The runtime's LLM (used to route requests to the skill) comes from the
/// same provider configuration as the skill's worker. `base_url` is the
/// public URL advertised in the agent card.
pub async fn serve_a2a(
    config: ModelConfig,
    address: &str,
    base_url: Option<String>,
) -> anyhow::Result<()> {
    info!(%address, provider = config.provider.display_name(), "starting A2A runtime");
    with_llm!(&config, |llm| {
        let mut builder = Runtime::builder(influenxers_agent(config.clone()), llm);
        if let Some(url) = base_url {
            builder = builder.base_url(url);
        }
        builder.build().serve(address).await.map_err(Into::into)
    })
}

//! # Influenxers Skills
//!
//! A2A-native skill, tools, and prompt for the Influenxers agent.
//!
//! ## Architecture
//!
//! ```text
//! Agent (A2A)
//!   └── InfluenxersSkill (#[skill] + SkillHandler)
//!         └── InfluenxersAgent facade (LlmWorker)
//!               └── Tools (#[tool] functions → external services)
//! ```

pub mod llm_helpers;
pub mod prompts;
pub mod tools;

pub mod influenxers_skill;

// Agent Definitions (compose skills into agents)
pub mod agent_definitions;

pub use agent_definitions::{influenxers_agent, serve_a2a, AGENT_DESCRIPTION, AGENT_NAME};
pub use influenxers_skill::InfluenxersSkill;

//! # Influenxers Core
//!
//! The "Brain" of Influenxers: the agent facade, its external service tools,
//! and the front-door adapters that expose it.
//!
//! ## Architecture
//!
//! - `agent` - The facade: task string in, result string out
//! - `models` - LLM provider configuration
//! - `config` - Settings read from the environment
//! - `skills/` - A2A skill, radkit tools, and the system prompt
//! - `tools/` - HTTP client for the marketing services, payload cleanup
//! - `mesh/` - Peer-to-peer agent messaging listener
//! - `chat/` - Discord mention listener
//!
//! ## Usage
//!
//! ```rust,ignore
//! use influenxers_core::agent::{InfluenxersAgent, TaskRunner};
//! use influenxers_core::models::ModelConfig;
//!
//! let agent = InfluenxersAgent::new(ModelConfig::default());
//! let output = agent.run("Analyze the style of @michelechungugc").await?;
//! ```

pub mod agent;
pub mod chat;
pub mod config;
pub mod mesh;
pub mod models;
pub mod skills;
pub mod tools;

pub use agent::{InfluenxersAgent, TaskRunner};
pub use config::Settings;

//! # Settings
//!
//! Runtime configuration read from the process environment at startup.
//!
//! | Variable                       | Default                     |
//! |--------------------------------|-----------------------------|
//! | `INFLUENXERS_PROVIDER`         | `openai`                    |
//! | `INFLUENXERS_MODEL`            | `gpt-4`                     |
//! | `INFLUENXERS_BASE_URL`         | unset                       |
//! | `INFLUENXERS_ANALYTICS_URL`    | analytics load balancer     |
//! | `INFLUENXERS_COLLECT_URL`      | TikTok collection endpoint  |
//! | `INFLUENXERS_DEFAULT_USERNAME` | `michelechungugc`           |
//! | `MESH_SERVER_URL`              | unset (peer messaging off)  |
//! | `MESH_AGENT_ID`                | `Influenxers`               |
//! | `MESH_POLL_INTERVAL_MS`        | `1000`                      |
//! | `DISCORD_TOKEN`                | unset (chat listener off)   |
//!
//! Provider API keys (`OPENAI_API_KEY`, ...) are read by radkit directly.

use crate::mesh::MeshConfig;
use crate::models::{LlmProvider, ModelConfig};
use crate::skills::AGENT_NAME;
use crate::tools::services::ServiceSettings;
use anyhow::{anyhow, Context, Result};
use std::time::Duration;

/// Everything the front doors need to start
#[derive(Debug, Clone)]
pub struct Settings {
    pub model: ModelConfig,
    pub services: ServiceSettings,
    /// Present when a message bus is configured
    pub mesh: Option<MeshConfig>,
    /// Present when the chat listener can log in
    pub discord_token: Option<String>,
}

impl Settings {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("INFLUENXERS_PROVIDER") {
            Some(id) => LlmProvider::parse(&id)
                .ok_or_else(|| anyhow!("unknown INFLUENXERS_PROVIDER '{}'", id))?,
            None => LlmProvider::default(),
        };
        let mut model = ModelConfig::with_provider(
            provider,
            get("INFLUENXERS_MODEL").unwrap_or_else(|| ModelConfig::default().model),
        );
        if let Some(base_url) = get("INFLUENXERS_BASE_URL") {
            if !model.provider.supports_base_url() {
                tracing::warn!(
                    provider = model.provider.display_name(),
                    "INFLUENXERS_BASE_URL is ignored for this provider"
                );
            }
            model.base_url = Some(base_url);
        }

        let mut services = ServiceSettings::default();
        if let Some(url) = get("INFLUENXERS_ANALYTICS_URL") {
            services.analytics_url = url;
        }
        if let Some(url) = get("INFLUENXERS_COLLECT_URL") {
            services.collect_url = url;
        }
        if let Some(username) = get("INFLUENXERS_DEFAULT_USERNAME") {
            services.default_username = username;
        }

        let mesh = match get("MESH_SERVER_URL") {
            Some(server_url) => {
                let mut mesh = MeshConfig::new(
                    server_url,
                    get("MESH_AGENT_ID").unwrap_or_else(|| AGENT_NAME.to_string()),
                );
                if let Some(ms) = get("MESH_POLL_INTERVAL_MS") {
                    let ms: u64 = ms.parse().with_context(|| {
                        format!("MESH_POLL_INTERVAL_MS must be an integer, got '{}'", ms)
                    })?;
                    mesh.poll_interval = Duration::from_millis(ms.max(50));
                }
                Some(mesh)
            }
            None => None,
        };

        Ok(Self {
            model,
            services,
            mesh,
            discord_token: get("DISCORD_TOKEN"),
        })
    }
}

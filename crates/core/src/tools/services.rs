//! # Service Client
//!
//! Outbound HTTP calls to the marketing analytics services.
//!
//! Every call returns text: the raw response body on any HTTP status, or a
//! `❌ <label> failed: <error>` string when the request itself fails. Tool
//! failures therefore reach the agent as readable text instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::payload::normalize_ingest_payload;

/// Prefix of every tool failure string.
pub const FAILURE_MARKER: &str = "❌";

/// Base URL of the analytics service (ingest, style, script, edits)
pub const DEFAULT_ANALYTICS_URL: &str =
    "http://analytics-prototype-lb-294479199.us-east-2.elb.amazonaws.com";

/// TikTok collection endpoint
pub const DEFAULT_COLLECT_URL: &str =
    "https://hznjnyps85.execute-api.us-east-2.amazonaws.com/prod/collect";

/// Username used when the ingest payload does not carry one
pub const DEFAULT_INGEST_USERNAME: &str = "michelechungugc";

/// Requests can trigger long-running analysis jobs upstream.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// The five external operations the agent can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    IngestProduct,
    ScrapeTikTok,
    AnalyzeCreatorStyle,
    GenerateScript,
    SuggestEdits,
}

impl ServiceKind {
    /// Label used in failure strings
    pub fn failure_label(&self) -> &'static str {
        match self {
            ServiceKind::IngestProduct => "Ingest",
            ServiceKind::ScrapeTikTok => "Scrape",
            ServiceKind::AnalyzeCreatorStyle => "Style analysis",
            ServiceKind::GenerateScript => "Script generation",
            ServiceKind::SuggestEdits => "Edit suggestion",
        }
    }
}

/// Where the external services live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Base URL for ingest, style analysis, script, and edit endpoints
    pub analytics_url: String,
    /// Full URL of the TikTok collection endpoint
    pub collect_url: String,
    /// Username filled into ingest payloads that lack one
    pub default_username: String,
    /// Per-request timeout
    #[serde(skip, default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            analytics_url: DEFAULT_ANALYTICS_URL.to_string(),
            collect_url: DEFAULT_COLLECT_URL.to_string(),
            default_username: DEFAULT_INGEST_USERNAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ServiceSettings {
    /// Resolve the endpoint URL for a service
    pub fn endpoint(&self, kind: ServiceKind) -> String {
        let base = self.analytics_url.trim_end_matches('/');
        match kind {
            ServiceKind::IngestProduct => format!("{}/ingest/product", base),
            ServiceKind::ScrapeTikTok => self.collect_url.clone(),
            ServiceKind::AnalyzeCreatorStyle => format!("{}/creator/analyze/style", base),
            ServiceKind::GenerateScript => format!("{}/suggest/script", base),
            ServiceKind::SuggestEdits => format!("{}/suggest/edits", base),
        }
    }
}

/// HTTP client for the external services
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    settings: ServiceSettings,
}

static SHARED: OnceLock<ServiceClient> = OnceLock::new();

impl ServiceClient {
    pub fn new(settings: ServiceSettings) -> Self {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent("influenxers-agent/1.0")
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self { http, settings }
    }

    /// Install the process-wide client used by the agent's tools.
    ///
    /// Returns `false` if a client was already installed.
    pub fn install(settings: ServiceSettings) -> bool {
        SHARED.set(Self::new(settings)).is_ok()
    }

    /// The process-wide client (default settings if none was installed)
    pub fn shared() -> &'static ServiceClient {
        SHARED.get_or_init(|| Self::new(ServiceSettings::default()))
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// POST a JSON payload and return the response text.
    ///
    /// Never fails: transport errors become a prefixed failure string.
    pub async fn call(&self, kind: ServiceKind, payload: &Value) -> String {
        let url = self.settings.endpoint(kind);
        debug!(service = ?kind, %url, %payload, "calling service");

        match self.post(&url, payload).await {
            Ok((status, text)) => {
                info!(service = ?kind, status, bytes = text.len(), "service responded");
                text
            }
            Err(e) => {
                warn!(service = ?kind, error = %e, "service call failed");
                format!("{} {} failed: {}", FAILURE_MARKER, kind.failure_label(), e)
            }
        }
    }

    /// Clean up the ingest payload, then forward it
    pub async fn ingest_product(&self, payload: Value) -> String {
        let payload = normalize_ingest_payload(payload, &self.settings.default_username);
        info!(
            username = payload.get("username").and_then(|v| v.as_str()).unwrap_or(""),
            url = payload.get("url").and_then(|v| v.as_str()).unwrap_or(""),
            "ingest payload"
        );
        self.call(ServiceKind::IngestProduct, &payload).await
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<(u16, String), reqwest::Error> {
        let response = self.http.post(url).json(payload).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unreachable_settings() -> ServiceSettings {
        ServiceSettings {
            // Port 9 (discard) is closed on loopback in test environments.
            analytics_url: "http://127.0.0.1:9".to_string(),
            collect_url: "http://127.0.0.1:9/prod/collect".to_string(),
            default_username: "tester".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_endpoints() {
        let settings = ServiceSettings::default();
        assert_eq!(
            settings.endpoint(ServiceKind::IngestProduct),
            format!("{}/ingest/product", DEFAULT_ANALYTICS_URL)
        );
        assert_eq!(settings.endpoint(ServiceKind::ScrapeTikTok), DEFAULT_COLLECT_URL);
        assert!(settings
            .endpoint(ServiceKind::AnalyzeCreatorStyle)
            .ends_with("/creator/analyze/style"));
        assert!(settings.endpoint(ServiceKind::GenerateScript).ends_with("/suggest/script"));
        assert!(settings.endpoint(ServiceKind::SuggestEdits).ends_with("/suggest/edits"));
    }

    #[test]
    fn test_trailing_slash_in_base() {
        let settings = ServiceSettings {
            analytics_url: "http://svc.local/".to_string(),
            ..ServiceSettings::default()
        };
        assert_eq!(
            settings.endpoint(ServiceKind::SuggestEdits),
            "http://svc.local/suggest/edits"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service_returns_failure_string() {
        let client = ServiceClient::new(unreachable_settings());
        let out = client
            .call(ServiceKind::AnalyzeCreatorStyle, &json!({"handle": "@creator"}))
            .await;
        assert!(out.starts_with(FAILURE_MARKER), "got: {}", out);
        assert!(out.contains("Style analysis failed"));
    }

    #[tokio::test]
    async fn test_unreachable_ingest_returns_failure_string() {
        let client = ServiceClient::new(unreachable_settings());
        let out = client.ingest_product(json!("https://acme.notion.site/brief")).await;
        assert!(out.starts_with("❌ Ingest failed:"), "got: {}", out);
    }
}

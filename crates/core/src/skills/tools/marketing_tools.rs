//! # Marketing Tools
//!
//! Tools the Influenxers agent can call. Each one forwards its arguments to
//! an external service through the shared [`ServiceClient`] and hands the
//! raw response text back to the LLM.
//!
//! Failures are reported as successful tool results carrying the failure
//! text, so the model can explain them instead of aborting the run.

use crate::tools::services::{ServiceClient, ServiceKind};
use radkit::macros::tool;
use radkit::tools::ToolResult;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Typed field wins over an extra key of the same name.
fn with_extra(mut extra: Map<String, Value>, key: &str, value: Value) -> Value {
    extra.insert(key.to_string(), value);
    Value::Object(extra)
}

fn service_result(kind: ServiceKind, text: String) -> ToolResult {
    ToolResult::success(json!({
        "service": kind,
        "response": text
    }))
}

/// Arguments for product brief ingestion
#[derive(Deserialize, JsonSchema)]
pub struct IngestProductArgs {
    /// Creator username (e.g. "michelechungugc"). Defaults when omitted.
    pub username: Option<String>,
    /// Public Notion link to the product brief
    pub url: Value,
    /// Any other keys the model sent, forwarded as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IngestProductArgs {
    pub fn into_payload(self) -> Value {
        let mut payload = self.extra;
        if let Some(username) = self.username {
            payload.insert("username".to_string(), json!(username));
        }
        payload.insert("url".to_string(), self.url);
        Value::Object(payload)
    }
}

/// Ingest a product brief from a Notion page
#[tool(
    description = "Ingest a product brief. Provide 'username' (e.g. 'michelechungugc') and 'url' (a public Notion link). If only a Notion URL is passed, the default username is used."
)]
pub async fn ingest_product(args: IngestProductArgs) -> ToolResult {
    let text = ServiceClient::shared()
        .ingest_product(args.into_payload())
        .await;
    service_result(ServiceKind::IngestProduct, text)
}

/// Arguments for TikTok inspiration scraping
#[derive(Deserialize, JsonSchema)]
pub struct ScrapeTikTokArgs {
    /// Keywords to search TikTok for
    pub search_terms: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScrapeTikTokArgs {
    pub fn into_payload(self) -> Value {
        with_extra(self.extra, "search_terms", json!(self.search_terms))
    }
}

/// Scrape TikTok videos for inspiration
#[tool(description = "Scrape TikTok videos using keywords. Input: {'search_terms': [str]}")]
pub async fn scrape_tiktok_inspiration(args: ScrapeTikTokArgs) -> ToolResult {
    let payload = args.into_payload();
    let text = ServiceClient::shared()
        .call(ServiceKind::ScrapeTikTok, &payload)
        .await;
    service_result(ServiceKind::ScrapeTikTok, text)
}

/// Arguments for creator style analysis
#[derive(Deserialize, JsonSchema)]
pub struct AnalyzeCreatorStyleArgs {
    /// Creator handle, with or without the leading '@'
    pub handle: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalyzeCreatorStyleArgs {
    pub fn into_payload(self) -> Value {
        with_extra(self.extra, "handle", json!(self.handle))
    }
}

/// Analyze a creator's content style
#[tool(description = "Analyze a creator's style. Input: {'handle': str}")]
pub async fn analyze_creator_style(args: AnalyzeCreatorStyleArgs) -> ToolResult {
    let payload = args.into_payload();
    let text = ServiceClient::shared()
        .call(ServiceKind::AnalyzeCreatorStyle, &payload)
        .await;
    service_result(ServiceKind::AnalyzeCreatorStyle, text)
}

/// Arguments for script generation
#[derive(Deserialize, JsonSchema)]
pub struct GenerateScriptArgs {
    /// Creator username whose ingested brief and style drive the script
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GenerateScriptArgs {
    pub fn into_payload(self) -> Value {
        with_extra(self.extra, "username", json!(self.username))
    }
}

/// Generate a video script
#[tool(description = "Generate a video script. Input: {'username': str}")]
pub async fn generate_script(args: GenerateScriptArgs) -> ToolResult {
    let payload = args.into_payload();
    let text = ServiceClient::shared()
        .call(ServiceKind::GenerateScript, &payload)
        .await;
    service_result(ServiceKind::GenerateScript, text)
}

/// Arguments for edit suggestions
#[derive(Deserialize, JsonSchema)]
pub struct SuggestEditsArgs {
    /// URL of the TikTok video to review
    pub tiktok_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SuggestEditsArgs {
    pub fn into_payload(self) -> Value {
        with_extra(self.extra, "tiktok_url", json!(self.tiktok_url))
    }
}

/// Suggest edits for a TikTok video
#[tool(description = "Suggest edits for a TikTok video. Input: {'tiktok_url': str}")]
pub async fn suggest_edits(args: SuggestEditsArgs) -> ToolResult {
    let payload = args.into_payload();
    let text = ServiceClient::shared()
        .call(ServiceKind::SuggestEdits, &payload)
        .await;
    service_result(ServiceKind::SuggestEdits, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_args_accept_any_url_shape() {
        let args: IngestProductArgs =
            serde_json::from_value(json!({"url": {"url": "https://acme.notion.site/x"}})).unwrap();
        assert!(args.username.is_none());
        assert!(args.url.is_object());
    }

    #[test]
    fn test_scrape_args() {
        let args: ScrapeTikTokArgs =
            serde_json::from_value(json!({"search_terms": ["skincare", "ugc"]})).unwrap();
        assert_eq!(args.search_terms.len(), 2);
    }

    #[test]
    fn test_extra_keys_are_forwarded() {
        let args: GenerateScriptArgs = serde_json::from_value(json!({
            "username": "ana",
            "tone": "playful",
            "length_seconds": 30
        }))
        .unwrap();
        assert_eq!(
            args.into_payload(),
            json!({"username": "ana", "tone": "playful", "length_seconds": 30})
        );

        let args: ScrapeTikTokArgs =
            serde_json::from_value(json!({"search_terms": ["ugc"], "limit": 5})).unwrap();
        assert_eq!(args.into_payload(), json!({"search_terms": ["ugc"], "limit": 5}));
    }

    #[test]
    fn test_ingest_payload_keeps_raw_url_and_extras() {
        let args: IngestProductArgs = serde_json::from_value(json!({
            "url": {"url": "https://acme.notion.site/x"},
            "campaign": "spring"
        }))
        .unwrap();
        let payload = args.into_payload();
        assert_eq!(payload["url"], json!({"url": "https://acme.notion.site/x"}));
        assert_eq!(payload["campaign"], "spring");
        assert!(payload.get("username").is_none());
    }
}

//! # Mesh Transport
//!
//! Connection to the agent message bus.
//!
//! The bus speaks plain HTTP:
//!
//! ```text
//! POST {bus}/register            {agent_id, info}   -> {token?}
//! GET  {bus}/messages/{agent_id}                    -> [message, ...] | {messages: [...]}
//! POST {bus}/message/{target}    <message json>
//! POST {bus}/unregister          {agent_id}
//! ```

use super::MeshConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected to the message bus")]
    NotConnected,
    #[error("message bus request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("message bus returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// A message pulled from the bus, before dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEnvelope {
    pub message_id: String,
    pub body: Value,
}

impl InboundEnvelope {
    pub fn new(message_id: impl Into<String>, body: Value) -> Self {
        Self {
            message_id: message_id.into(),
            body,
        }
    }
}

/// Connect/listen/send lifecycle against a message bus
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;

    /// Fetch whatever is waiting. An empty batch means nothing arrived.
    async fn receive(&self) -> Result<Vec<InboundEnvelope>, TransportError>;

    async fn send_message(&self, target: &str, message: Value) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Message bus over HTTP
pub struct HttpBusTransport {
    http: reqwest::Client,
    config: MeshConfig,
    /// Set by `connect`; `Some("")` when the bus issues no token
    session: RwLock<Option<String>>,
    fallback_ids: AtomicU64,
}

impl HttpBusTransport {
    pub fn new(config: MeshConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session: RwLock::new(None),
            fallback_ids: AtomicU64::new(0),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.server_url.trim_end_matches('/'), path)
    }

    async fn token(&self) -> Result<String, TransportError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(TransportError::NotConnected)
    }

    fn authorize(&self, request: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
        if token.is_empty() {
            request
        } else {
            request.bearer_auth(token)
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl MessageTransport for HttpBusTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let body = json!({
            "agent_id": self.config.agent_id,
            "info": {
                "name": self.config.name,
                "description": self.config.description,
                "capabilities": ["task"],
            }
        });
        let response = self.http.post(self.url("register")).json(&body).send().await?;
        let response = Self::check(response).await?;

        // Registration may answer with an empty body.
        let text = response.text().await?;
        let token = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("token").and_then(|t| t.as_str()).map(str::to_string))
            .unwrap_or_default();

        *self.session.write().await = Some(token);
        info!(
            agent_id = %self.config.agent_id,
            bus = %self.config.server_url,
            "registered on message bus"
        );
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<InboundEnvelope>, TransportError> {
        let token = self.token().await?;
        let path = format!("messages/{}", urlencoding::encode(&self.config.agent_id));
        let request = self.authorize(self.http.get(self.url(&path)), &token);
        let response = Self::check(request.send().await?).await?;
        let inbox: Value = response.json().await?;

        let envelopes = parse_inbox(inbox, || {
            format!("local-{}", self.fallback_ids.fetch_add(1, Ordering::Relaxed))
        });
        if !envelopes.is_empty() {
            debug!(count = envelopes.len(), "received messages");
        }
        Ok(envelopes)
    }

    async fn send_message(&self, target: &str, message: Value) -> Result<(), TransportError> {
        let token = self.token().await?;
        let path = format!("message/{}", urlencoding::encode(target));
        let request = self.authorize(self.http.post(self.url(&path)), &token).json(&message);
        Self::check(request.send().await?).await?;
        debug!(%target, "message sent");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let Some(token) = self.session.write().await.take() else {
            return Ok(());
        };
        let body = json!({ "agent_id": self.config.agent_id });
        let request = self.authorize(self.http.post(self.url("unregister")), &token).json(&body);
        Self::check(request.send().await?).await?;
        info!(agent_id = %self.config.agent_id, "unregistered from message bus");
        Ok(())
    }
}

/// Turn an inbox response into envelopes.
///
/// Accepts a bare array or `{"messages": [...]}`. Each item is either the
/// message itself or a wrapper `{id, message}`; ids fall back to
/// `message_id`, then to `next_id()`.
pub fn parse_inbox(inbox: Value, mut next_id: impl FnMut() -> String) -> Vec<InboundEnvelope> {
    let items = match inbox {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("messages") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| {
            let Value::Object(mut map) = item else {
                return None;
            };
            let id = ["id", "message_id"]
                .iter()
                .find_map(|key| match map.get(*key) {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    _ => None,
                })
                .unwrap_or_else(&mut next_id);
            let body = match map.remove("message") {
                Some(inner @ Value::Object(_)) => inner,
                Some(other) => {
                    map.insert("message".to_string(), other);
                    Value::Object(map)
                }
                None => Value::Object(map),
            };
            Some(InboundEnvelope::new(id, body))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TaskRunner;
    use crate::mesh::start_peer_listener;
    use async_trait::async_trait;
    use axum::extract::{Path, State};
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("gen-{}", n)
        }
    }

    #[test]
    fn test_parse_bare_array() {
        let inbox = json!([
            {"id": "m-1", "type": "task", "content": {"task_id": "t"}},
            {"type": "ping"}
        ]);
        let envelopes = parse_inbox(inbox, counter());
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].message_id, "m-1");
        assert_eq!(envelopes[0].body["type"], "task");
        assert_eq!(envelopes[1].message_id, "gen-1");
    }

    #[test]
    fn test_parse_wrapped_messages() {
        let inbox = json!({
            "messages": [
                {"message_id": 42, "message": {"type": "task", "content": {}}},
                "garbage"
            ]
        });
        let envelopes = parse_inbox(inbox, counter());
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].message_id, "42");
        assert_eq!(envelopes[0].body, json!({"type": "task", "content": {}}));
    }

    #[test]
    fn test_parse_unexpected_shapes() {
        assert!(parse_inbox(json!(null), counter()).is_empty());
        assert!(parse_inbox(json!({"status": "ok"}), counter()).is_empty());
    }

    #[tokio::test]
    async fn test_calls_before_connect_fail() {
        let transport = HttpBusTransport::new(MeshConfig::new("http://127.0.0.1:9", "tester"));
        assert!(matches!(
            transport.receive().await,
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.send_message("peer", json!({})).await,
            Err(TransportError::NotConnected)
        ));
        // Disconnecting without a session is a no-op.
        assert_ok!(transport.disconnect().await);
    }

    /// One request as the bus saw it
    #[derive(Debug, Clone)]
    struct BusHit {
        route: String,
        auth: Option<String>,
        body: Value,
    }

    /// In-process message bus speaking the HTTP protocol above
    #[derive(Clone, Default)]
    struct Bus {
        hits: Arc<Mutex<Vec<BusHit>>>,
        inbox: Arc<Mutex<Vec<Value>>>,
    }

    impl Bus {
        fn record(&self, route: impl Into<String>, headers: &HeaderMap, body: Value) {
            let auth = headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            self.hits.lock().unwrap().push(BusHit {
                route: route.into(),
                auth,
                body,
            });
        }

        fn hits(&self) -> Vec<BusHit> {
            self.hits.lock().unwrap().clone()
        }

        fn enqueue(&self, item: Value) {
            self.inbox.lock().unwrap().push(item);
        }
    }

    async fn register(
        State(bus): State<Bus>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        bus.record("register", &headers, body);
        Json(json!({ "token": "tok-1" }))
    }

    async fn inbox(
        State(bus): State<Bus>,
        Path(agent_id): Path<String>,
        headers: HeaderMap,
    ) -> Json<Value> {
        bus.record(format!("messages/{}", agent_id), &headers, Value::Null);
        let pending: Vec<Value> = bus.inbox.lock().unwrap().drain(..).collect();
        Json(json!({ "messages": pending }))
    }

    async fn deliver(
        State(bus): State<Bus>,
        Path(target): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> StatusCode {
        if target == "offline" {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        bus.record(format!("message/{}", target), &headers, body);
        StatusCode::ACCEPTED
    }

    async fn unregister(
        State(bus): State<Bus>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> StatusCode {
        bus.record("unregister", &headers, body);
        StatusCode::OK
    }

    async fn spawn_bus(bus: Bus) -> String {
        let app = Router::new()
            .route("/register", post(register))
            .route("/messages/:agent_id", get(inbox))
            .route("/message/:target", post(deliver))
            .route("/unregister", post(unregister))
            .with_state(bus);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn wrapped_task(id: &str, reply_to: &str) -> Value {
        json!({
            "id": id,
            "message": {
                "type": "task",
                "content": {
                    "task_id": "campaign_001",
                    "description": "Suggest 3 micro-influencer profiles",
                    "reply_to": reply_to
                }
            }
        })
    }

    #[tokio::test]
    async fn test_bus_session_uses_registration_token() {
        let bus = Bus::default();
        bus.enqueue(wrapped_task("m-1", "planner"));
        let url = spawn_bus(bus.clone()).await;
        let transport = HttpBusTransport::new(MeshConfig::new(url, "Influenxers"));

        assert_ok!(transport.connect().await);
        let envelopes = transport.receive().await.unwrap();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].message_id, "m-1");
        assert_eq!(envelopes[0].body["content"]["task_id"], "campaign_001");
        assert!(transport.receive().await.unwrap().is_empty());
        assert_ok!(
            transport
                .send_message("planner", json!({"type": "task_result"}))
                .await
        );
        assert_ok!(transport.disconnect().await);

        let hits = bus.hits();
        let routes: Vec<&str> = hits.iter().map(|h| h.route.as_str()).collect();
        assert_eq!(
            routes,
            vec![
                "register",
                "messages/Influenxers",
                "messages/Influenxers",
                "message/planner",
                "unregister"
            ]
        );
        assert_eq!(hits[0].auth, None);
        assert_eq!(hits[0].body["agent_id"], "Influenxers");
        assert_eq!(hits[0].body["info"]["name"], "Influenxers");
        assert!(hits[1..]
            .iter()
            .all(|h| h.auth.as_deref() == Some("Bearer tok-1")));
        assert_eq!(hits[3].body["type"], "task_result");
        assert_eq!(hits[4].body["agent_id"], "Influenxers");

        // The session ends with the disconnect.
        assert!(matches!(
            transport.receive().await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_bus_error_status_is_reported() {
        let url = spawn_bus(Bus::default()).await;
        let transport = HttpBusTransport::new(MeshConfig::new(url, "Influenxers"));
        assert_ok!(transport.connect().await);

        let err = transport
            .send_message("offline", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, .. }));
    }

    struct EchoRunner;

    #[async_trait]
    impl TaskRunner for EchoRunner {
        async fn run(&self, task: &str) -> anyhow::Result<String> {
            Ok(format!("echo: {}", task))
        }
    }

    #[tokio::test]
    async fn test_listener_answers_task_over_http_bus() {
        let bus = Bus::default();
        bus.enqueue(wrapped_task("m-7", "dummy_target"));
        let url = spawn_bus(bus.clone()).await;

        let mut config = MeshConfig::new(url, "Influenxers");
        config.poll_interval = Duration::from_millis(20);
        let transport = Arc::new(HttpBusTransport::new(config.clone()));
        let handle = start_peer_listener(Arc::new(EchoRunner), transport, &config)
            .await
            .unwrap();

        let delivered = |bus: &Bus| {
            bus.hits()
                .into_iter()
                .filter(|h| h.route == "message/dummy_target")
                .collect::<Vec<_>>()
        };
        for _ in 0..200 {
            if !delivered(&bus).is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown().await;

        let replies = delivered(&bus);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].auth.as_deref(), Some("Bearer tok-1"));
        assert_eq!(replies[0].body["type"], "task_result");
        assert_eq!(replies[0].body["task_id"], "campaign_001");
        assert_eq!(replies[0].body["status"], "completed");
        assert_eq!(replies[0].body["original_message_id"], "m-7");
        assert_eq!(
            replies[0].body["result"],
            "echo: Suggest 3 micro-influencer profiles"
        );
        assert!(bus.hits().iter().any(|h| h.route == "unregister"));
    }
}

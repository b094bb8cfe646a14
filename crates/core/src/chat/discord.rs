//! # Discord
//!
//! Gateway listener and REST sink for the chat front door.
//!
//! ## Session lifecycle
//!
//! ```text
//! connect ─▶ Hello(op 10) ─▶ Identify(op 2) ─▶ READY ─▶ MESSAGE_CREATE ...
//!                 │                                        │
//!                 └── heartbeat(op 1) every interval ◀─────┘
//! Reconnect(op 7) / InvalidSession(op 9) / close ─▶ wait ─▶ connect
//! ```
//!
//! Sessions are never resumed; every reconnect identifies from scratch.

use super::handler::{ChatSink, MentionHandler};
use super::mention::ChatMessage;
use super::ChatError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DISCORD_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
pub const DEFAULT_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15);

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

mod close_code {
    pub const AUTHENTICATION_FAILED: u16 = 4004;
    pub const INVALID_INTENTS: u16 = 4013;
    pub const DISALLOWED_INTENTS: u16 = 4014;
}

mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Posts messages through the Discord REST API
pub struct DiscordRest {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl DiscordRest {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl ChatSink for DiscordRest {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), ChatError> {
        let url = format!(
            "{}/channels/{}/messages",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(channel_id)
        );
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "content": content }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// A gateway frame
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Deserialize)]
struct UserRef {
    id: String,
    #[serde(default)]
    bot: bool,
}

#[derive(Deserialize)]
struct MessageCreate {
    id: String,
    channel_id: String,
    #[serde(default)]
    content: String,
    author: UserRef,
    #[serde(default)]
    mentions: Vec<UserRef>,
}

#[derive(Deserialize)]
struct Ready {
    user: UserRef,
}

/// Parse the data of a `MESSAGE_CREATE` dispatch
pub fn parse_message_create(d: &Value) -> Option<ChatMessage> {
    let event = MessageCreate::deserialize(d).ok()?;
    Some(ChatMessage {
        id: event.id,
        channel_id: event.channel_id,
        author_id: event.author.id,
        author_is_bot: event.author.bot,
        content: event.content,
        mention_ids: event.mentions.into_iter().map(|u| u.id).collect(),
    })
}

/// Parse the bot's own user id from a `READY` dispatch
pub fn parse_ready_user_id(d: &Value) -> Option<String> {
    Ready::deserialize(d).ok().map(|ready| ready.user.id)
}

pub fn identify_payload(token: &str, intents: u64) -> Value {
    json!({
        "op": opcode::IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "influenxers",
                "device": "influenxers"
            }
        }
    })
}

pub fn heartbeat_payload(last_sequence: Option<u64>) -> Value {
    json!({ "op": opcode::HEARTBEAT, "d": last_sequence })
}

/// Read the heartbeat period from a Hello frame.
pub fn heartbeat_interval(hello: &GatewayPayload) -> Result<Duration, ChatError> {
    hello
        .d
        .get("heartbeat_interval")
        .and_then(|v| v.as_u64())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| ChatError::Protocol("hello without a usable heartbeat_interval".to_string()))
}

/// Close codes after which reconnecting cannot succeed.
pub fn fatal_close(code: u16) -> Option<ChatError> {
    match code {
        close_code::AUTHENTICATION_FAILED => Some(ChatError::Unauthorized),
        close_code::INVALID_INTENTS | close_code::DISALLOWED_INTENTS => {
            Some(ChatError::IntentsRejected(code))
        }
        _ => None,
    }
}

/// How a gateway session ended
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Reconnect,
}

/// Listens on the Discord gateway and hands mentions to a [`MentionHandler`]
pub struct DiscordGateway {
    token: String,
    gateway_url: String,
    intents: u64,
    reconnect_delay: Duration,
    handler: Arc<MentionHandler>,
}

impl DiscordGateway {
    pub fn new(token: impl Into<String>, handler: Arc<MentionHandler>) -> Self {
        Self {
            token: token.into(),
            gateway_url: DISCORD_GATEWAY_URL.to_string(),
            intents: DEFAULT_INTENTS,
            reconnect_delay: RECONNECT_DELAY,
            handler,
        }
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Run until `shutdown` flips to true, reconnecting as needed.
    ///
    /// Returns an error only when the gateway refuses the session for good
    /// (bad token, rejected intents).
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), ChatError> {
        loop {
            match self.run_session(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Reconnect) => info!("gateway asked to reconnect"),
                Err(e @ (ChatError::Unauthorized | ChatError::IntentsRejected(_))) => return Err(e),
                Err(e) => warn!(error = %e, "gateway session ended"),
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        info!("chat listener stopped");
        Ok(())
    }

    async fn run_session(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd, ChatError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.gateway_url.as_str()).await?;
        let (mut sink, mut stream) = stream.split();

        let hello = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    let payload: GatewayPayload = serde_json::from_str(text.as_str())?;
                    if payload.op == opcode::HELLO {
                        break payload;
                    }
                }
                Some(Ok(Message::Close(frame))) => return closed(frame),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(SessionEnd::Reconnect),
            }
        };
        let interval = heartbeat_interval(&hello)?;

        sink.send(text_frame(&identify_payload(&self.token, self.intents)))
            .await?;
        debug!(interval_ms = interval.as_millis() as u64, "identified with gateway");

        let mut heartbeat =
            tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        let mut last_sequence: Option<u64> = None;
        let mut bot_user_id: Option<String> = None;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Shutdown);
                }
                _ = heartbeat.tick() => {
                    sink.send(text_frame(&heartbeat_payload(last_sequence))).await?;
                }
                frame = stream.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(frame))) => return closed(frame),
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(SessionEnd::Reconnect),
                    };

                    let payload: GatewayPayload = match serde_json::from_str(text.as_str()) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(error = %e, "unparseable gateway frame");
                            continue;
                        }
                    };
                    if payload.s.is_some() {
                        last_sequence = payload.s;
                    }

                    match payload.op {
                        opcode::DISPATCH => self.dispatch(&payload, &mut bot_user_id),
                        opcode::HEARTBEAT => {
                            sink.send(text_frame(&heartbeat_payload(last_sequence))).await?;
                        }
                        opcode::RECONNECT | opcode::INVALID_SESSION => {
                            return Ok(SessionEnd::Reconnect);
                        }
                        opcode::HEARTBEAT_ACK => {}
                        other => debug!(op = other, "unhandled gateway opcode"),
                    }
                }
            }
        }
    }

    fn dispatch(&self, payload: &GatewayPayload, bot_user_id: &mut Option<String>) {
        match payload.t.as_deref() {
            Some("READY") => {
                *bot_user_id = parse_ready_user_id(&payload.d);
                info!(bot_user_id = ?bot_user_id, "chat listener online");
            }
            Some("MESSAGE_CREATE") => {
                let (Some(bot_id), Some(message)) =
                    (bot_user_id.as_ref(), parse_message_create(&payload.d))
                else {
                    return;
                };
                self.handler.spawn(bot_id.clone(), message);
            }
            _ => {}
        }
    }
}

fn closed(frame: Option<CloseFrame>) -> Result<SessionEnd, ChatError> {
    match frame.map(|f| u16::from(f.code)).and_then(fatal_close) {
        Some(e) => Err(e),
        None => Ok(SessionEnd::Reconnect),
    }
}

fn text_frame(payload: &Value) -> Message {
    Message::Text(payload.to_string().into())
}

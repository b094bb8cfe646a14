//! # Mesh
//!
//! Peer-to-peer agent messaging front door.
//!
//! Other agents post `task` messages on a shared message bus; the listener
//! runs each through the agent facade and posts a `task_result` back to the
//! task's `reply_to` address.

pub mod envelope;
pub mod listener;
pub mod transport;

use crate::skills::{AGENT_DESCRIPTION, AGENT_NAME};
use std::time::Duration;

pub use envelope::{InboundMessage, OutboundMessage, TaskContent, TaskStatus};
pub use listener::{
    handle_incoming_message, spawn_peer_listener, start_peer_listener, PeerListenerHandle, Reply,
};
pub use transport::{HttpBusTransport, InboundEnvelope, MessageTransport, TransportError};

/// Message bus connection settings
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// Base URL of the message bus
    pub server_url: String,
    /// Address other agents send tasks to
    pub agent_id: String,
    /// Display name announced at registration
    pub name: String,
    pub description: String,
    /// Wait between polls when the inbox is empty
    pub poll_interval: Duration,
    /// Messages buffered between the receive loop and the worker
    pub queue_capacity: usize,
    /// How long shutdown waits for an in-flight task
    pub shutdown_grace: Duration,
}

impl MeshConfig {
    pub fn new(server_url: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            agent_id: agent_id.into(),
            name: AGENT_NAME.to_string(),
            description: AGENT_DESCRIPTION.to_string(),
            poll_interval: Duration::from_secs(1),
            queue_capacity: 32,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

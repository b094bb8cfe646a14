//! # Peer Listener
//!
//! Background tasks that feed bus messages to the agent.
//!
//! ## Architecture
//!
//! ```text
//! Message bus                 receive loop            task worker
//!     │                            │                       │
//!     │ ◀──── receive() ───────────┤                       │
//!     ├──── [envelopes] ─────────▶ ├── InboundEnvelope ──▶ │
//!     │                            │                       ├── TaskRunner::run
//!     │ ◀──────────────── send_message(reply_to, task_result) ┘
//! ```
//!
//! The worker handles one task at a time, in arrival order.

use super::envelope::{InboundMessage, OutboundMessage};
use super::transport::{InboundEnvelope, MessageTransport, TransportError};
use super::MeshConfig;
use crate::agent::TaskRunner;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A reply ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Destination address; `None` when the task named no one to reply to
    pub target: Option<String>,
    pub message: OutboundMessage,
}

/// Dispatch one inbound message.
///
/// Returns `None` for messages that carry no task. A task always produces a
/// reply, even when the agent fails.
pub async fn handle_incoming_message(
    runner: &dyn TaskRunner,
    envelope: &InboundEnvelope,
) -> Option<Reply> {
    let message = match InboundMessage::parse(&envelope.body) {
        Ok(message) => message,
        Err(e) => {
            warn!(message_id = %envelope.message_id, error = %e, "dropping unparseable message");
            return None;
        }
    };

    let (content, from) = match message {
        InboundMessage::Task { content, from } => (content, from),
        InboundMessage::Other => {
            debug!(message_id = %envelope.message_id, "ignoring non-task message");
            return None;
        }
    };

    let task_id = if content.task_id.is_empty() {
        envelope.message_id.clone()
    } else {
        content.task_id
    };
    info!(%task_id, message_id = %envelope.message_id, "processing task");

    let outcome = match runner.run(&content.description).await {
        Ok(output) => Ok(output),
        Err(e) => {
            warn!(%task_id, error = %e, "task failed");
            Err(e.to_string())
        }
    };

    Some(Reply {
        target: content.reply_to.or(from),
        message: OutboundMessage::task_result(task_id, envelope.message_id.clone(), outcome),
    })
}

/// Handle for the running listener
pub struct PeerListenerHandle {
    inbound_tx: mpsc::Sender<InboundEnvelope>,
    shutdown_tx: watch::Sender<bool>,
    transport: Arc<dyn MessageTransport>,
    receive_handle: JoinHandle<()>,
    worker_handle: JoinHandle<()>,
    shutdown_grace: Duration,
}

impl PeerListenerHandle {
    /// Queue a message as if it had arrived from the bus
    pub async fn submit(&self, envelope: InboundEnvelope) -> anyhow::Result<()> {
        self.inbound_tx
            .send(envelope)
            .await
            .map_err(|_| anyhow::anyhow!("peer listener has stopped"))
    }

    /// Stop both loops and leave the bus.
    ///
    /// Both loops share one grace period; whatever is still running when it
    /// runs out is aborted.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let deadline = tokio::time::Instant::now() + self.shutdown_grace;

        join_or_abort("receive loop", self.receive_handle, deadline).await;
        join_or_abort("task worker", self.worker_handle, deadline).await;

        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "failed to disconnect from message bus");
        }
        info!("peer listener stopped");
    }
}

async fn join_or_abort(name: &str, mut handle: JoinHandle<()>, deadline: tokio::time::Instant) {
    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "{} panicked", name),
        Err(_) => {
            warn!("{} still busy at shutdown, abandoning it", name);
            handle.abort();
        }
    }
}

/// Connect to the bus and start listening
pub async fn start_peer_listener(
    runner: Arc<dyn TaskRunner>,
    transport: Arc<dyn MessageTransport>,
    config: &MeshConfig,
) -> Result<PeerListenerHandle, TransportError> {
    transport.connect().await?;
    Ok(spawn_peer_listener(runner, transport, config))
}

/// Start the receive loop and task worker on an already connected transport
pub fn spawn_peer_listener(
    runner: Arc<dyn TaskRunner>,
    transport: Arc<dyn MessageTransport>,
    config: &MeshConfig,
) -> PeerListenerHandle {
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundEnvelope>(config.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let receive_handle = tokio::spawn(receive_loop(
        transport.clone(),
        inbound_tx.clone(),
        shutdown_rx.clone(),
        config.poll_interval,
    ));
    let worker_handle = tokio::spawn(task_worker(
        runner,
        transport.clone(),
        inbound_rx,
        shutdown_rx,
    ));

    PeerListenerHandle {
        inbound_tx,
        shutdown_tx,
        transport,
        receive_handle,
        worker_handle,
        shutdown_grace: config.shutdown_grace,
    }
}

async fn receive_loop(
    transport: Arc<dyn MessageTransport>,
    inbound_tx: mpsc::Sender<InboundEnvelope>,
    mut shutdown_rx: watch::Receiver<bool>,
    poll_interval: Duration,
) {
    'poll: loop {
        let batch = tokio::select! {
            _ = shutdown_rx.changed() => break,
            batch = transport.receive() => batch,
        };

        let idle = match batch {
            Ok(envelopes) => {
                let idle = envelopes.is_empty();
                for envelope in envelopes {
                    // A full queue must not hold up shutdown.
                    tokio::select! {
                        _ = shutdown_rx.changed() => break 'poll,
                        sent = inbound_tx.send(envelope) => {
                            if sent.is_err() {
                                break 'poll;
                            }
                        }
                    }
                }
                idle
            }
            Err(e) => {
                warn!(error = %e, "failed to receive from message bus");
                true
            }
        };

        if idle {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
    debug!("receive loop stopped");
}

async fn task_worker(
    runner: Arc<dyn TaskRunner>,
    transport: Arc<dyn MessageTransport>,
    mut inbound_rx: mpsc::Receiver<InboundEnvelope>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let envelope = tokio::select! {
            _ = shutdown_rx.changed() => break,
            envelope = inbound_rx.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let Some(reply) = handle_incoming_message(runner.as_ref(), &envelope).await else {
            continue;
        };

        let Some(target) = reply.target else {
            warn!(
                message_id = %envelope.message_id,
                "task had no reply_to or sender, result dropped"
            );
            continue;
        };

        let message = match serde_json::to_value(&reply.message) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "failed to encode reply");
                continue;
            }
        };
        if let Err(e) = transport.send_message(&target, message).await {
            warn!(%target, error = %e, "failed to send reply");
        }
    }
    debug!("task worker stopped");
}

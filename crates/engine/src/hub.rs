//! Client notification hub.
//!
//! A subscriber registry with best-effort delivery to currently-connected
//! application instances. No delivery guarantee: dead senders are dropped
//! on the next broadcast, and nobody waits for an acknowledgment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// Identifier handed out at subscription time.
pub type ClientId = u64;

/// One-way signals pushed to open application instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A new generation finished activating and took over interception.
    GenerationUpdated { generation: String },
    /// The application should refetch a class of data ("donations",
    /// "messages", ...).
    Resync { topic: String },
}

/// Registry of connected application instances.
#[derive(Clone, Default)]
pub struct ClientHub {
    clients: Arc<RwLock<HashMap<ClientId, mpsc::UnboundedSender<ClientMessage>>>>,
    next_id: Arc<AtomicU64>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connected instance; the receiver carries its signals.
    pub fn subscribe(&self) -> (ClientId, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.write().expect("hub lock poisoned").insert(id, tx);
        tracing::debug!(client = id, "client subscribed");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: ClientId) {
        self.clients.write().expect("hub lock poisoned").remove(&id);
        tracing::debug!(client = id, "client unsubscribed");
    }

    /// Best-effort send to every current subscriber.
    ///
    /// Returns the number of instances the message reached; senders whose
    /// receiver is gone are pruned.
    pub fn broadcast(&self, message: ClientMessage) -> usize {
        let mut clients = self.clients.write().expect("hub lock poisoned");
        let mut delivered = 0;
        clients.retain(|id, tx| match tx.send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                tracing::debug!(client = *id, "dropping disconnected client");
                false
            }
        });
        tracing::debug!(delivered, "broadcast");
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().expect("hub lock poisoned").len()
    }
}

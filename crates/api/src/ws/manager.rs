//! Presence and fan-out management for live conversation rooms.
//!
//! A room is the set of live WebSocket connections currently attentive to
//! one conversation. Messages are only ever published here *after* they
//! are durably committed by the conversation ledger, so a live push can
//! always also be read back via history.

use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use rishta_core::types::{DbId, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Live state of a single WebSocket connection.
///
/// Exists only while the session is live; dropped deterministically on
/// disconnect, never persisted.
pub struct PresenceEntry {
    /// Authenticated user behind this connection.
    pub user_id: DbId,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// Conversation rooms this connection has joined.
    pub rooms: HashSet<DbId>,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections and their room memberships.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Membership is owned by this process
/// instance; a clustered deployment replaces the in-memory maps behind the
/// same join/leave/publish surface.
pub struct PresenceManager {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Connection id -> live entry.
    connections: HashMap<String, PresenceEntry>,
    /// Conversation (connection row) id -> member connection ids.
    rooms: HashMap<DbId, HashSet<String>>,
}

impl PresenceManager {
    /// Create a new, empty manager.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a new authenticated connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn register(
        &self,
        conn_id: String,
        user_id: DbId,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let entry = PresenceEntry {
            user_id,
            sender: tx,
            rooms: HashSet::new(),
            connected_at: chrono::Utc::now(),
        };
        let mut inner = self.inner.write().await;
        if let Some(old) = inner.connections.insert(conn_id.clone(), entry) {
            // A replaced entry (same id reconnecting) must not leave stale
            // room membership behind.
            for room in &old.rooms {
                if let Some(members) = inner.rooms.get_mut(room) {
                    members.remove(&conn_id);
                }
            }
        }
        rx
    }

    /// Remove a connection and every room membership it holds.
    ///
    /// Disconnect cleanup is deterministic: after this call `publish` can
    /// never target the dead connection.
    pub async fn remove(&self, conn_id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.connections.remove(conn_id) {
            for room in entry.rooms {
                if let Some(members) = inner.rooms.get_mut(&room) {
                    members.remove(conn_id);
                    if members.is_empty() {
                        inner.rooms.remove(&room);
                    }
                }
            }
        }
    }

    /// Add a connection to a conversation room.
    ///
    /// Authorization (participant of an accepted connection) is the
    /// caller's responsibility; this only tracks membership.
    pub async fn join(&self, conn_id: &str, room_id: DbId) -> bool {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let Some(entry) = inner.connections.get_mut(conn_id) else {
            return false;
        };
        entry.rooms.insert(room_id);
        inner
            .rooms
            .entry(room_id)
            .or_default()
            .insert(conn_id.to_string());
        true
    }

    /// Remove a connection from a conversation room.
    pub async fn leave(&self, conn_id: &str, room_id: DbId) {
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.connections.get_mut(conn_id) {
            entry.rooms.remove(&room_id);
        }
        if let Some(members) = inner.rooms.get_mut(&room_id) {
            members.remove(conn_id);
            if members.is_empty() {
                inner.rooms.remove(&room_id);
            }
        }
    }

    /// Deliver a message to every live member of a room.
    ///
    /// A room with no live members is a no-op, not an error; offline
    /// recipients catch up via history. Returns the number of connections
    /// the message was sent to. Connections whose send channels are closed
    /// are silently skipped (they are cleaned up on their receive loop
    /// exit).
    pub async fn publish(&self, room_id: DbId, message: Message) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(&room_id) else {
            return 0;
        };
        let mut count = 0;
        for conn_id in members {
            if let Some(entry) = inner.connections.get(conn_id) {
                if entry.sender.send(message.clone()).is_ok() {
                    count += 1;
                }
            }
        }
        count
    }

    /// Send a message to a single connection (acks, replays, errors).
    ///
    /// Returns `false` if the connection is gone or its channel is closed.
    pub async fn send_to_conn(&self, conn_id: &str, message: Message) -> bool {
        let inner = self.inner.read().await;
        match inner.connections.get(conn_id) {
            Some(entry) => entry.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Send a message to all connections belonging to a specific user.
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_user(&self, user_id: DbId, message: Message) -> usize {
        let inner = self.inner.read().await;
        let mut count = 0;
        for entry in inner.connections.values() {
            if entry.user_id == user_id && entry.sender.send(message.clone()).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Number of live members in a room.
    pub async fn room_member_count(&self, room_id: DbId) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(&room_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Send a Close frame to every connection, then clear all state.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.connections.len();
        for entry in inner.connections.values() {
            let _ = entry.sender.send(Message::Close(None));
        }
        inner.connections.clear();
        inner.rooms.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let inner = self.inner.read().await;
        for entry in inner.connections.values() {
            let _ = entry.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for PresenceManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Typed WebSocket frame protocol for live conversations.
//!
//! Frames are JSON objects tagged by a `type` field. Inbound frames are
//! parsed into [`ClientFrame`]; outbound frames serialize from
//! [`ServerFrame`].

use serde::{Deserialize, Serialize};

use rishta_core::types::DbId;
use rishta_db::models::message::Message;

/// Frames a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Join a conversation room. Requires participant membership of an
    /// accepted connection; replays recent history before joining.
    Join { connection_id: DbId },
    /// Leave a conversation room.
    Leave { connection_id: DbId },
    /// Append a message to a conversation and fan it out to the room.
    Send { connection_id: DbId, body: String },
}

/// Frames the server pushes.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Replay of recent history, sent to a joining client only, before it
    /// is added to the room.
    History {
        connection_id: DbId,
        messages: Vec<Message>,
    },
    /// The client is now a member of the room.
    Joined { connection_id: DbId },
    /// The client left the room.
    Left { connection_id: DbId },
    /// A committed message, fanned out to every live room member.
    NewMessage {
        connection_id: DbId,
        message: Message,
    },
    /// Ack to the sender: the append outcome, including degraded
    /// (`status = "failed"`) appends that are not broadcast.
    MessageAccepted {
        connection_id: DbId,
        message: Message,
    },
    /// A notification push outside any room (e.g. a new match).
    Notification {
        kind: String,
        payload: serde_json::Value,
    },
    /// Request-level error; the connection stays open.
    Error { code: String, message: String },
}

impl ServerFrame {
    /// Serialize into a WebSocket text message.
    ///
    /// Serialization of these enums cannot fail; a failure would be a
    /// programming error, so it degrades to an error frame literal.
    pub fn into_message(self) -> axum::extract::ws::Message {
        let text = serde_json::to_string(&self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize server frame");
            r#"{"type":"error","code":"INTERNAL_ERROR","message":"serialization failure"}"#
                .to_string()
        });
        axum::extract::ws::Message::Text(text.into())
    }
}

//! Handlers for the `/connections/{id}/messages` resource, and the shared
//! append-then-broadcast flow used by both HTTP and WebSocket writers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use rishta_core::conversation::{clamp_history_limit, validate_body};
use rishta_core::types::{DbId, Timestamp};
use rishta_db::models::connection::Connection;
use rishta_db::models::message::Message;
use rishta_db::repositories::MessageRepo;
use rishta_events::{DomainEvent, EVENT_MESSAGE_CREATED};

use crate::error::{AppError, AppResult};
use crate::handlers::authorize_participant;
use crate::middleware::auth::{ensure_active, AuthUser};
use crate::state::AppState;
use crate::ws::ServerFrame;

/// Query parameters for `GET /connections/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Restart cursor: return messages strictly older than this timestamp.
    pub before: Option<Timestamp>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
}

/// Request body for `POST /connections/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// GET /api/v1/connections/{id}/messages
///
/// Chronological page of the conversation. Participants only.
pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(connection_id): Path<DbId>,
    Query(params): Query<HistoryQuery>,
) -> AppResult<Json<serde_json::Value>> {
    authorize_participant(&state.pool, connection_id, auth.user_id).await?;

    let limit = clamp_history_limit(params.limit);
    let messages = MessageRepo::history(&state.pool, connection_id, params.before, limit).await?;

    Ok(Json(serde_json::json!({ "data": messages })))
}

/// POST /api/v1/connections/{id}/messages
///
/// Append a message and fan it out to the live room. Returns the created
/// message, whose `status` distinguishes a committed append (`sent`,
/// possibly already `delivered`) from a degraded one (`failed`).
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(connection_id): Path<DbId>,
    Json(input): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    ensure_active(&state, auth.user_id).await?;
    let connection = authorize_participant(&state.pool, connection_id, auth.user_id).await?;

    let message = append_and_fanout(&state, &connection, auth.user_id, &input.body).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "data": message })),
    ))
}

/// The shared write path: validate, append durably, then broadcast.
///
/// Ordering guarantee: `publish` happens strictly after the append
/// committed, so a live-pushed message is always retrievable via history.
/// Degraded (`failed`) appends are returned to the caller but never
/// broadcast. Fan-out and the notification hook are fire-and-forget;
/// their failures never roll back the append.
pub async fn append_and_fanout(
    state: &AppState,
    connection: &Connection,
    sender_id: DbId,
    body: &str,
) -> Result<Message, AppError> {
    validate_body(body)?;

    let message = MessageRepo::append(&state.pool, connection.id, sender_id, body).await?;

    if message.is_broadcastable() {
        let frame = ServerFrame::NewMessage {
            connection_id: connection.id,
            message: message.clone(),
        };
        let recipients = state.presence.publish(connection.id, frame.into_message()).await;

        if recipients > 0 {
            if let Err(e) = MessageRepo::mark_delivered(&state.pool, message.id).await {
                tracing::debug!(message_id = message.id, error = %e, "mark_delivered failed");
            }
        }

        let recipient_id = connection.other_participant(sender_id);
        state.event_bus.publish(
            DomainEvent::new(EVENT_MESSAGE_CREATED)
                .with_source("message", message.id)
                .with_actor(sender_id)
                .with_payload(serde_json::json!({
                    "connection_id": connection.id,
                    "message_id": message.id,
                    "sender_id": sender_id,
                    "recipient_id": recipient_id,
                })),
        );
    }

    Ok(message)
}

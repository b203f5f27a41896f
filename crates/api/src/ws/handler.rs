use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use rishta_core::error::CoreError;
use rishta_core::types::DbId;
use rishta_db::repositories::MessageRepo;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::handlers::{authorize_participant, message::append_and_fanout};
use crate::middleware::auth::ensure_active;
use crate::state::AppState;
use crate::ws::protocol::{ClientFrame, ServerFrame};

/// Number of messages replayed to a client joining a room.
const REPLAY_LIMIT: i64 = 20;

/// Query parameters for the WebSocket upgrade.
///
/// Browsers cannot set headers on WebSocket requests, so the access token
/// rides a query parameter.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    token: String,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// The token is verified and the account-status check passes *before* the
/// upgrade; unauthenticated sockets are never registered.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
) -> Result<impl IntoResponse, AppError> {
    let claims = validate_token(&query.token, &state.config.jwt)
        .map_err(|_| AppError::Core(CoreError::Unauthorized("Invalid or expired token".into())))?;
    ensure_active(&state, claims.sub).await?;

    let user_id = claims.sub;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `PresenceManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound frames on the current task.
///   4. Cleans up all room memberships on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = state.presence.register(conn_id.clone(), user_id).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: process inbound frames.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => {
                handle_frame(&state, &conn_id, user_id, text.as_str()).await;
            }
            Ok(_) => {
                // Binary and ping frames carry no protocol meaning here.
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: drop every room membership and abort the sender task, so
    // publish never accumulates dead targets.
    state.presence.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Parse and dispatch one inbound frame, reporting failures to the client
/// as error frames rather than closing the socket.
async fn handle_frame(state: &AppState, conn_id: &str, user_id: DbId, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            let reply = ServerFrame::Error {
                code: "INVALID_FRAME".into(),
                message: format!("unrecognized frame: {e}"),
            };
            state.presence.send_to_conn(conn_id, reply.into_message()).await;
            return;
        }
    };

    let result = match frame {
        ClientFrame::Join { connection_id } => {
            handle_join(state, conn_id, user_id, connection_id).await
        }
        ClientFrame::Leave { connection_id } => {
            handle_leave(state, conn_id, connection_id).await
        }
        ClientFrame::Send {
            connection_id,
            body,
        } => handle_send(state, conn_id, user_id, connection_id, &body).await,
    };

    if let Err(err) = result {
        state
            .presence
            .send_to_conn(conn_id, error_frame(&err).into_message())
            .await;
    }
}

/// Join a conversation room.
///
/// Replays recent history to the joining client only, then adds it to the
/// room's membership set, then acks.
async fn handle_join(
    state: &AppState,
    conn_id: &str,
    user_id: DbId,
    connection_id: DbId,
) -> Result<(), AppError> {
    authorize_participant(&state.pool, connection_id, user_id).await?;

    let messages = MessageRepo::history(&state.pool, connection_id, None, REPLAY_LIMIT).await?;
    let replay = ServerFrame::History {
        connection_id,
        messages,
    };
    state
        .presence
        .send_to_conn(conn_id, replay.into_message())
        .await;

    state.presence.join(conn_id, connection_id).await;
    state
        .presence
        .send_to_conn(conn_id, ServerFrame::Joined { connection_id }.into_message())
        .await;
    Ok(())
}

/// Leave a conversation room. Leaving a room the client never joined is a
/// no-op ack.
async fn handle_leave(
    state: &AppState,
    conn_id: &str,
    connection_id: DbId,
) -> Result<(), AppError> {
    state.presence.leave(conn_id, connection_id).await;
    state
        .presence
        .send_to_conn(conn_id, ServerFrame::Left { connection_id }.into_message())
        .await;
    Ok(())
}

/// Append a message and fan it out to the room.
///
/// The sender always gets a `message_accepted` ack carrying the message
/// status; only committed `sent` messages are broadcast.
async fn handle_send(
    state: &AppState,
    conn_id: &str,
    user_id: DbId,
    connection_id: DbId,
    body: &str,
) -> Result<(), AppError> {
    let connection = authorize_participant(&state.pool, connection_id, user_id).await?;

    let message = append_and_fanout(state, &connection, user_id, body).await?;
    let ack = ServerFrame::MessageAccepted {
        connection_id,
        message,
    };
    state.presence.send_to_conn(conn_id, ack.into_message()).await;
    Ok(())
}

/// Map an error to a client-visible error frame, mirroring the HTTP codes.
fn error_frame(err: &AppError) -> ServerFrame {
    let (code, message) = match err {
        AppError::Core(core) => match core {
            CoreError::NotFound { entity, id } => {
                ("NOT_FOUND".into(), format!("{entity} with id {id} not found"))
            }
            CoreError::Validation(msg) => ("VALIDATION_ERROR".into(), msg.clone()),
            CoreError::Conflict(msg) => ("CONFLICT".into(), msg.clone()),
            CoreError::Unauthorized(msg) => ("UNAUTHORIZED".into(), msg.clone()),
            CoreError::Forbidden(msg) => ("FORBIDDEN".into(), msg.clone()),
            CoreError::Unavailable(_) => (
                "SERVICE_UNAVAILABLE".into(),
                "The service is temporarily unavailable".into(),
            ),
            CoreError::Internal(_) => (
                "INTERNAL_ERROR".into(),
                "An internal error occurred".into(),
            ),
        },
        AppError::Database(e) => {
            tracing::error!(error = %e, "database error in WebSocket handler");
            (
                "INTERNAL_ERROR".into(),
                "An internal error occurred".into(),
            )
        }
        AppError::BadRequest(msg) => ("BAD_REQUEST".into(), msg.clone()),
        AppError::InternalError(_) => (
            "INTERNAL_ERROR".into(),
            "An internal error occurred".into(),
        ),
    };
    ServerFrame::Error { code, message }
}

//! Handlers for the `/matches` and `/connections/{id}/close` resources.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use rishta_core::types::DbId;
use rishta_db::models::connection::Connection;
use rishta_db::repositories::ConnectionRepo;

use crate::error::AppResult;
use crate::handlers::authorize_participant;
use crate::middleware::auth::{ensure_active, AuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/matches
///
/// List the authenticated user's accepted connections, most recently
/// active first.
pub async fn list_matches(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Connection>>>> {
    let connections = ConnectionRepo::list_accepted_for(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: connections }))
}

/// POST /api/v1/connections/{id}/close
///
/// Close a connection. Terminal; closing an already-closed connection is
/// an idempotent no-op. Only participants may close.
pub async fn close_connection(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(connection_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    ensure_active(&state, auth.user_id).await?;
    authorize_participant(&state.pool, connection_id, auth.user_id).await?;

    let closed = ConnectionRepo::close(&state.pool, connection_id).await?;
    if closed {
        tracing::info!(connection_id, user_id = auth.user_id, "connection closed");
    }
    Ok(StatusCode::NO_CONTENT)
}

//! Handlers for the `/likes` and `/passes` resources: the quota-gated
//! interest flow.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use rishta_core::error::CoreError;
use rishta_core::matching::{ensure_not_self_like, is_valid_kind, LikeOutcome, KIND_LIKE};
use rishta_core::quota::day_bucket;
use rishta_core::types::DbId;
use rishta_db::repositories::{LikeRepo, UserRepo};
use rishta_events::{DomainEvent, EVENT_MATCH_CREATED};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{ensure_active, AuthUser};
use crate::state::AppState;

/// Request body for `POST /likes`.
#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub target_id: DbId,
    /// `like` (default) or `super_like`.
    pub kind: Option<String>,
}

/// Request body for `POST /passes`.
#[derive(Debug, Deserialize)]
pub struct PassRequest {
    pub target_id: DbId,
}

/// POST /api/v1/likes
///
/// Record a like from the authenticated user. Quota exhaustion is a normal
/// outcome (`allowed = false`, "try again tomorrow"), not an error; a
/// repeated like is an idempotent no-op.
pub async fn create_like(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LikeRequest>,
) -> AppResult<Json<serde_json::Value>> {
    ensure_active(&state, auth.user_id).await?;
    ensure_not_self_like(auth.user_id, input.target_id)?;

    let kind = input.kind.as_deref().unwrap_or(KIND_LIKE);
    if !is_valid_kind(kind) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "unknown like kind: {kind}"
        ))));
    }

    // The target must exist; a dangling id is client error, not a match.
    if UserRepo::find_by_id(&state.pool, input.target_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: input.target_id,
        }));
    }

    let outcome = LikeRepo::record_like(
        &state.pool,
        auth.user_id,
        input.target_id,
        kind,
        state.config.daily_like_limit,
    )
    .await?;

    // Notification hook: fire-and-forget, never fails the write.
    if let LikeOutcome::Created {
        mutual: true,
        connection_id: Some(connection_id),
        ..
    } = &outcome
    {
        let connection_id = *connection_id;
        state.event_bus.publish(
            DomainEvent::new(EVENT_MATCH_CREATED)
                .with_source("connection", connection_id)
                .with_actor(auth.user_id)
                .with_payload(serde_json::json!({
                    "connection_id": connection_id,
                    "participants": [auth.user_id, input.target_id],
                })),
        );
    }

    Ok(Json(like_response(&state, auth.user_id, outcome).await?))
}

/// Shape the wire response for a like outcome.
///
/// `remaining` is always present so clients can render the daily budget,
/// including on the idempotent repeat path that consumed no quota.
async fn like_response(
    state: &AppState,
    user_id: DbId,
    outcome: LikeOutcome,
) -> Result<serde_json::Value, AppError> {
    let data = match outcome {
        LikeOutcome::Created {
            mutual,
            connection_id,
            quota,
        } => serde_json::json!({
            "allowed": true,
            "created": true,
            "already_liked": false,
            "mutual": mutual,
            "connection_id": connection_id,
            "remaining": quota.remaining,
        }),
        LikeOutcome::AlreadyLiked {
            mutual,
            connection_id,
        } => {
            let day = day_bucket(chrono::Utc::now());
            let quota = LikeRepo::quota_decision_for(
                &state.pool,
                user_id,
                day,
                state.config.daily_like_limit,
            )
            .await?;
            serde_json::json!({
                "allowed": true,
                "created": false,
                "already_liked": true,
                "mutual": mutual,
                "connection_id": connection_id,
                "remaining": quota.remaining,
            })
        }
        LikeOutcome::QuotaExhausted { quota } => serde_json::json!({
            "allowed": false,
            "created": false,
            "already_liked": false,
            "mutual": false,
            "connection_id": null,
            "remaining": quota.remaining,
        }),
    };
    Ok(serde_json::json!({ "data": data }))
}

/// POST /api/v1/passes
///
/// Acknowledge a pass. Passing keeps no state in this core and does not
/// touch the like quota.
pub async fn create_pass(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<PassRequest>,
) -> AppResult<impl IntoResponse> {
    ensure_active(&state, auth.user_id).await?;
    ensure_not_self_like(auth.user_id, input.target_id)?;

    tracing::debug!(user_id = auth.user_id, target_id = input.target_id, "pass");
    Ok(StatusCode::NO_CONTENT)
}

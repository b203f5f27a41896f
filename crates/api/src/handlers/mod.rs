//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers delegate to the repositories in `rishta_db` and map errors via
//! [`AppError`](crate::error::AppError).

pub mod like;
pub mod matches;
pub mod message;
pub mod notification;

use rishta_core::error::CoreError;
use rishta_core::types::DbId;
use rishta_db::models::connection::Connection;
use rishta_db::repositories::ConnectionRepo;
use rishta_db::DbPool;

use crate::error::AppError;

/// Load a connection and enforce the participant-only authorization rule.
///
/// Non-participants get `Forbidden` even when the connection exists; a
/// missing connection is `NotFound`.
pub async fn authorize_participant(
    pool: &DbPool,
    connection_id: DbId,
    user_id: DbId,
) -> Result<Connection, AppError> {
    let connection = ConnectionRepo::find_by_id(pool, connection_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Connection",
            id: connection_id,
        })?;

    if !connection.has_participant(user_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "not a participant of this connection".into(),
        )));
    }
    Ok(connection)
}

//! Route definitions for matches, connection lifecycle, and conversation
//! threads.
//!
//! All endpoints require authentication; reads and writes are restricted
//! to the connection's participants.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{matches, message};
use crate::state::AppState;

/// Routes mounted at the API root.
///
/// ```text
/// GET    /matches                      -> list_matches
/// POST   /connections/{id}/close       -> close_connection
/// GET    /connections/{id}/messages    -> list_messages
/// POST   /connections/{id}/messages    -> send_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/matches", get(matches::list_matches))
        .route("/connections/{id}/close", post(matches::close_connection))
        .route(
            "/connections/{id}/messages",
            get(message::list_messages).post(message::send_message),
        )
}

pub mod connection;
pub mod health;
pub mod like;
pub mod notification;

use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                  live channel (token query param)
///
/// /likes                               record a like (POST)
/// /passes                              acknowledge a pass (POST)
///
/// /matches                             accepted connections (GET)
/// /connections/{id}/close              close a connection (POST)
/// /connections/{id}/messages           history (GET, ?before=&limit=),
///                                      send (POST)
///
/// /notifications                       list (?unread_only, limit, offset)
/// /notifications/read-all              mark all read (POST)
/// /notifications/unread-count          unread count (GET)
/// /notifications/{id}/read             mark read (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Live conversation channel.
        .route("/ws", axum::routing::get(ws::ws_handler))
        // Interest flow: likes and passes.
        .merge(like::router())
        // Matches and connection lifecycle + conversation threads.
        .merge(connection::router())
        // Notifications.
        .nest("/notifications", notification::router())
}

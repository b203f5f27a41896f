//! Route definitions for the interest flow.
//!
//! All endpoints require authentication and an active account.

use axum::routing::post;
use axum::Router;

use crate::handlers::like;
use crate::state::AppState;

/// Routes mounted at the API root.
///
/// ```text
/// POST   /likes    -> create_like
/// POST   /passes   -> create_pass
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/likes", post(like::create_like))
        .route("/passes", post(like::create_pass))
}

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::ws::PresenceManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: rishta_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Presence and fan-out manager for live conversation rooms.
    pub presence: Arc<PresenceManager>,
    /// Event bus feeding the notification router.
    pub event_bus: Arc<rishta_events::EventBus>,
}

//! Event-to-notification routing engine.
//!
//! [`NotificationRouter`] subscribes to the event bus and routes each event
//! to the affected recipients. This is the consuming end of the
//! fire-and-forget notification hook: any failure here is logged and
//! swallowed, never propagated back to the write that produced the event.

use std::sync::Arc;

use tokio::sync::broadcast;

use rishta_core::types::DbId;
use rishta_db::repositories::NotificationRepo;
use rishta_db::DbPool;
use rishta_events::{DomainEvent, EVENT_MATCH_CREATED, EVENT_MESSAGE_CREATED};

use crate::ws::{PresenceManager, ServerFrame};

/// Routes domain events to user notifications.
///
/// Consumes events from the broadcast channel and, for each event,
/// determines the recipients, persists a notification row, and pushes a
/// live frame to any of the recipient's connected sessions.
pub struct NotificationRouter {
    pool: DbPool,
    presence: Arc<PresenceManager>,
}

impl NotificationRouter {
    /// Create a new router with the given database pool and presence manager.
    pub fn new(pool: DbPool, presence: Arc<PresenceManager>) -> Self {
        Self { pool, presence }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](rishta_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route a single event to all affected recipients.
    async fn route_event(&self, event: &DomainEvent) -> Result<(), sqlx::Error> {
        for user_id in determine_recipients(event) {
            self.deliver(user_id, event).await?;
        }
        Ok(())
    }

    /// Persist a notification row and push a live frame to the recipient.
    async fn deliver(&self, user_id: DbId, event: &DomainEvent) -> Result<(), sqlx::Error> {
        NotificationRepo::create(&self.pool, user_id, &event.event_type, &event.payload).await?;

        let frame = ServerFrame::Notification {
            kind: event.event_type.clone(),
            payload: event.payload.clone(),
        };
        let sent = self.presence.send_to_user(user_id, frame.into_message()).await;
        tracing::debug!(
            user_id,
            event_type = %event.event_type,
            live_sessions = sent,
            "notification delivered"
        );
        Ok(())
    }
}

/// Determine which users should be notified for an event.
///
/// The acting user is excluded: they already saw the outcome in their own
/// response.
fn determine_recipients(event: &DomainEvent) -> Vec<DbId> {
    match event.event_type.as_str() {
        // Match: notify the participant who did not trigger the match.
        EVENT_MATCH_CREATED => event
            .payload
            .get("participants")
            .and_then(|v| serde_json::from_value::<Vec<DbId>>(v.clone()).ok())
            .unwrap_or_default()
            .into_iter()
            .filter(|id| Some(*id) != event.actor_user_id)
            .collect(),

        // Message: notify the recipient named by the conversation ledger.
        EVENT_MESSAGE_CREATED => event
            .payload
            .get("recipient_id")
            .and_then(|v| v.as_i64())
            .into_iter()
            .collect(),

        _ => vec![],
    }
}

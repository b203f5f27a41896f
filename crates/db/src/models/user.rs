//! User rows. Profile CRUD lives in the external profile system; this core
//! keeps only what it needs for identity FKs and the account-status check.

use serde::Serialize;
use sqlx::FromRow;

use rishta_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub display_name: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

//! Repository for the `users` table.
//!
//! Profile management is external; this repository only covers identity
//! lookup, the account-status check, and row creation for fixtures.

use sqlx::PgPool;

use rishta_core::types::DbId;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "id, display_name, email, is_active, created_at, updated_at";

pub struct UserRepo;

impl UserRepo {
    /// Insert a user row, returning it.
    pub async fn create(
        pool: &PgPool,
        display_name: &str,
        email: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (display_name, email) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(display_name)
            .bind(email)
            .fetch_one(pool)
            .await
    }

    /// Find a user by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Account-status check. `None` means the user does not exist.
    pub async fn is_active(pool: &PgPool, id: DbId) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Pause or reactivate an account. Returns `true` if a row changed.
    pub async fn set_active(pool: &PgPool, id: DbId, is_active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(is_active)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

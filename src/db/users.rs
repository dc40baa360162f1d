//! User repository.
//!
//! Users are created on first sight of an authenticated username.

use super::DbError;
use sqlx::SqlitePool;

/// A site user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: i64,
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find or create the user with this name. The flag is true if the row
    /// was inserted by this call.
    pub async fn get_or_create(&self, username: &str) -> Result<(User, bool), DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, created_at)
            VALUES (?, ?)
            ON CONFLICT(username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(now)
        .execute(self.pool)
        .await?;

        let user = self
            .find_by_name(username)
            .await?
            .ok_or(DbError::UpsertLost("users"))?;

        Ok((user, result.rows_affected() == 1))
    }

    /// Find user by name (case-insensitive).
    pub async fn find_by_name(&self, username: &str) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            r#"
            SELECT id, username, created_at
            FROM users
            WHERE username = ? COLLATE NOCASE
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, username, created_at)| User {
            id,
            username,
            created_at,
        }))
    }

    /// Find user by ID.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            "SELECT id, username, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, username, created_at)| User {
            id,
            username,
            created_at,
        }))
    }
}

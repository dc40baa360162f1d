//! Bot repository for database queries.

use super::models::Bot;
use crate::db::DbError;
use crate::filter::FilterMode;
use sqlx::{SqliteConnection, SqlitePool};

type BotRow = (i64, i64, String, i64, String, String, bool, i64);

fn from_row(
    (id, network_id, location, filter_mode, project_list, custom_ruleset, show_project_names, created_at): BotRow,
) -> Result<Bot, DbError> {
    let filter_mode = FilterMode::from_code(filter_mode)
        .ok_or_else(|| DbError::InvalidRow(format!("bot {} has filter mode {}", id, filter_mode)))?;
    Ok(Bot {
        id,
        network_id,
        location,
        filter_mode,
        project_list,
        custom_ruleset,
        show_project_names,
        created_at,
    })
}

/// Repository for bot operations.
pub struct BotRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BotRepository<'a> {
    /// Create a new bot repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find bot by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Bot>, DbError> {
        let row = sqlx::query_as::<_, BotRow>(
            r#"
            SELECT id, network_id, location, filter_mode, project_list, custom_ruleset,
                   show_project_names, created_at
            FROM bots
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(from_row).transpose()
    }

    /// Find the bot at `location` on a network (case-insensitive).
    pub async fn find(&self, network_id: i64, location: &str) -> Result<Option<Bot>, DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut *conn, network_id, location).await
    }

    /// Find or create the bot at `location`. A new bot forwards everything.
    /// The flag is true if the row was inserted by this call.
    pub async fn get_or_create(&self, network_id: i64, location: &str) -> Result<(Bot, bool), DbError> {
        let mut conn = self.pool.acquire().await?;
        Self::get_or_create_in(&mut *conn, network_id, location).await
    }

    async fn find_in(conn: &mut SqliteConnection, network_id: i64, location: &str) -> Result<Option<Bot>, DbError> {
        let row = sqlx::query_as::<_, BotRow>(
            r#"
            SELECT id, network_id, location, filter_mode, project_list, custom_ruleset,
                   show_project_names, created_at
            FROM bots
            WHERE network_id = ? AND location = ? COLLATE NOCASE
            "#,
        )
        .bind(network_id)
        .bind(location)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(from_row).transpose()
    }

    /// [`get_or_create`](Self::get_or_create) on a caller-held connection, so
    /// the insert can share a transaction with the bot's creation changeset.
    pub async fn get_or_create_in(
        conn: &mut SqliteConnection,
        network_id: i64,
        location: &str,
    ) -> Result<(Bot, bool), DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO bots (network_id, location, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(network_id, location) DO NOTHING
            "#,
        )
        .bind(network_id)
        .bind(location)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        let bot = Self::find_in(conn, network_id, location)
            .await?
            .ok_or(DbError::UpsertLost("bots"))?;

        Ok((bot, result.rows_affected() == 1))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::filter::FilterMode;

    #[tokio::test]
    async fn test_get_or_create_bot() {
        let db = Database::new(":memory:").await.unwrap();
        let (net, _) = db
            .networks()
            .get_or_create("irc://irc.example.org/", "Example", None)
            .await
            .unwrap();
        let (other, _) = db
            .networks()
            .get_or_create("irc://irc.other.org/", "Other", None)
            .await
            .unwrap();

        let (bot, created) = db.bots().get_or_create(net.id, "cia").await.unwrap();
        assert!(created);
        assert_eq!(bot.filter_mode, FilterMode::AllowAll);
        assert!(!bot.show_project_names);

        let (same, created) = db.bots().get_or_create(net.id, "CIA").await.unwrap();
        assert!(!created);
        assert_eq!(same, bot);

        // Same channel on another network is a different bot.
        let (elsewhere, created) = db.bots().get_or_create(other.id, "cia").await.unwrap();
        assert!(created);
        assert_ne!(elsewhere.id, bot.id);

        assert_eq!(db.bots().get(bot.id).await.unwrap(), Some(bot));
        assert!(db.bots().find(net.id, "nothing").await.unwrap().is_none());
    }
}

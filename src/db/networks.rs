//! IRC network repository.
//!
//! A network is identified by its URI, `irc://<host>[:port]/`, compared
//! case-insensitively.

use super::DbError;
use sqlx::SqlitePool;
use tracing::info;

/// Networks offered before anyone has added one.
const DEFAULT_NETWORKS: &[(&str, &str, bool)] = &[
    ("irc.freenode.net", "Freenode", true),
    ("irc.oftc.net", "OFTC", true),
    ("irc.gimp.org", "GIMPNet", true),
    ("irc.efnet.org", "EFnet", false),
    ("irc.quakenet.org", "QuakeNet", false),
    ("irc.undernet.org", "Undernet", false),
    ("irc.rizon.net", "Rizon", false),
    ("irc.ircnet.com", "IRCnet", false),
];

/// A known IRC network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub id: i64,
    pub uri: String,
    pub description: String,
    pub is_popular: bool,
    pub created_by: Option<i64>,
    pub created_at: i64,
}

impl Network {
    /// URI for a server given as `host[:port]`.
    pub fn uri_for(server: &str) -> String {
        format!("irc://{}/", server)
    }

    /// The `host[:port]` part of the URI.
    pub fn host(&self) -> &str {
        let rest = match self.uri.get(..6) {
            Some(scheme) if scheme.eq_ignore_ascii_case("irc://") => &self.uri[6..],
            _ => self.uri.as_str(),
        };
        rest.split('/').next().unwrap_or(rest)
    }
}

type NetworkRow = (i64, String, String, bool, Option<i64>, i64);

fn from_row((id, uri, description, is_popular, created_by, created_at): NetworkRow) -> Network {
    Network {
        id,
        uri,
        description,
        is_popular,
        created_by,
        created_at,
    }
}

/// Repository for network operations.
pub struct NetworkRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> NetworkRepository<'a> {
    /// Create a new network repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find network by ID.
    pub async fn get(&self, id: i64) -> Result<Option<Network>, DbError> {
        let row = sqlx::query_as::<_, NetworkRow>(
            r#"
            SELECT id, uri, description, is_popular, created_by, created_at
            FROM networks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    /// Find network by URI (case-insensitive).
    pub async fn find_by_uri(&self, uri: &str) -> Result<Option<Network>, DbError> {
        let row = sqlx::query_as::<_, NetworkRow>(
            r#"
            SELECT id, uri, description, is_popular, created_by, created_at
            FROM networks
            WHERE uri = ? COLLATE NOCASE
            "#,
        )
        .bind(uri)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    /// Find or create the network with this URI. An existing network keeps
    /// its description. The flag is true if the row was inserted.
    pub async fn get_or_create(
        &self,
        uri: &str,
        description: &str,
        created_by: Option<i64>,
    ) -> Result<(Network, bool), DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO networks (uri, description, is_popular, created_by, created_at)
            VALUES (?, ?, 0, ?, ?)
            ON CONFLICT(uri) DO NOTHING
            "#,
        )
        .bind(uri)
        .bind(description)
        .bind(created_by)
        .bind(now)
        .execute(self.pool)
        .await?;

        let network = self
            .find_by_uri(uri)
            .await?
            .ok_or(DbError::UpsertLost("networks"))?;

        Ok((network, result.rows_affected() == 1))
    }

    /// All networks, popular first, then by description.
    pub async fn list(&self) -> Result<Vec<Network>, DbError> {
        let rows = sqlx::query_as::<_, NetworkRow>(
            r#"
            SELECT id, uri, description, is_popular, created_by, created_at
            FROM networks
            ORDER BY is_popular DESC, description COLLATE NOCASE, id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM networks")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Seed the built-in network list. Returns how many rows were added.
    pub async fn import_defaults(&self) -> Result<u64, DbError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut added = 0;

        for (host, description, popular) in DEFAULT_NETWORKS {
            let result = sqlx::query(
                r#"
                INSERT INTO networks (uri, description, is_popular, created_by, created_at)
                VALUES (?, ?, ?, NULL, ?)
                ON CONFLICT(uri) DO NOTHING
                "#,
            )
            .bind(Network::uri_for(host))
            .bind(*description)
            .bind(*popular)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            added += result.rows_affected();
        }

        tx.commit().await?;

        if added > 0 {
            info!(count = added, "Imported default networks");
        }
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_host() {
        let network = Network {
            id: 1,
            uri: "IRC://irc.example.org:6697/".to_string(),
            description: String::new(),
            is_popular: false,
            created_by: None,
            created_at: 0,
        };
        assert_eq!(network.host(), "irc.example.org:6697");
        assert_eq!(Network::uri_for("irc.oftc.net"), "irc://irc.oftc.net/");
    }

    #[tokio::test]
    async fn test_get_or_create_matches_case_insensitively() {
        let db = Database::new(":memory:").await.unwrap();

        let (net, created) = db
            .networks()
            .get_or_create("irc://irc.example.org/", "Example", None)
            .await
            .unwrap();
        assert!(created);

        let (again, created) = db
            .networks()
            .get_or_create("irc://IRC.Example.ORG/", "Another name", None)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, net.id);
        assert_eq!(again.description, "Example");
    }

    #[tokio::test]
    async fn test_import_defaults_and_ordering() {
        let db = Database::new(":memory:").await.unwrap();
        let repo = db.networks();

        let added = repo.import_defaults().await.unwrap();
        assert_eq!(added as usize, DEFAULT_NETWORKS.len());
        assert_eq!(repo.import_defaults().await.unwrap(), 0);

        let list = repo.list().await.unwrap();
        assert_eq!(list.len(), DEFAULT_NETWORKS.len());
        let first_unpopular = list.iter().position(|n| !n.is_popular).unwrap();
        assert!(list[first_unpopular..].iter().all(|n| !n.is_popular));
        assert_eq!(list[0].description, "Freenode");
        assert_eq!(list[first_unpopular].description, "EFnet");
    }
}

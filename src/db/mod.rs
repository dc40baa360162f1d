//! Database module for persistent storage.
//!
//! Provides async SQLite database access using SQLx for:
//! - Users known to the site
//! - IRC networks and the bots registered on them
//! - Ownership links between users and their assets
//! - The changeset ledger recording every asset mutation

mod assets;
mod bots;
mod changesets;
mod networks;
mod users;

pub use assets::{AssetKind, AssetRef, Claim, UserAsset, UserAssetRepository};
pub use bots::{Bot, BotRepository};
pub use changesets::{
    Asset, Change, ChangesetHandle, ChangesetRecord, ChangesetRepository, FieldValue, META_CREATED,
    META_RELEASED,
};
pub use networks::{Network, NetworkRepository};
pub use users::{User, UserRepository};

use sqlx::{Sqlite, SqlitePool, Transaction};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Distinguishes the memory databases opened by one process.
static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(0);

const MEMORY_PATH: &str = ":memory:";
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("integrity check failed: {0}")]
    Corrupt(String),
    #[error("{table} has no field named {field}")]
    UnknownField { table: &'static str, field: String },
    #[error("row vanished after upsert in {0}")]
    UpsertLost(&'static str),
    #[error("invalid stored value: {0}")]
    InvalidRow(String),
}

/// Shared handle to the account database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Connect options and pool size for a configured path.
///
/// `:memory:` maps to a uniquely named shared-cache database, so every
/// `Database::new(":memory:")` is isolated from the others. A memory database
/// lives only as long as a connection to it, hence the single pooled one.
fn connect_options(path: &str) -> (SqliteConnectOptions, u32) {
    if path == MEMORY_PATH {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!("file:cia-{}-{}?mode=memory&cache=shared", std::process::id(), seq);
        let options = SqliteConnectOptions::new()
            .filename(name)
            .shared_cache(true)
            .create_if_missing(true);
        return (options, 1);
    }

    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty())
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        warn!(dir = %dir.display(), error = %e, "Could not create database directory");
    }
    (SqliteConnectOptions::new().filename(path).create_if_missing(true), 5)
}

impl Database {
    /// Open the database at `path` (or `:memory:`) and bring the schema up to date.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let (options, max_connections) = connect_options(path);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(Some(IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect_with(options)
            .await?;
        info!(path, "Database opened");

        sqlx::migrate!("./migrations").run(&pool).await?;

        // WAL lets page reads proceed while a changeset commits.
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA foreign_keys=ON", "PRAGMA synchronous=NORMAL"] {
            sqlx::query(pragma).execute(&pool).await?;
        }

        let integrity: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(&pool)
            .await?;
        if integrity != "ok" {
            tracing::error!(path, integrity = %integrity, "Database failed its integrity check");
            return Err(DbError::Corrupt(integrity));
        }

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transaction. Dropping it uncommitted rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, DbError> {
        Ok(self.pool.begin().await?)
    }

    /// Get user repository.
    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.pool)
    }

    /// Get network repository.
    pub fn networks(&self) -> NetworkRepository<'_> {
        NetworkRepository::new(&self.pool)
    }

    /// Get bot repository.
    pub fn bots(&self) -> BotRepository<'_> {
        BotRepository::new(&self.pool)
    }

    /// Get user asset repository.
    pub fn user_assets(&self) -> UserAssetRepository<'_> {
        UserAssetRepository::new(&self.pool)
    }

    /// Get the changeset ledger.
    pub fn changesets(&self) -> ChangesetRepository<'_> {
        ChangesetRepository::new(&self.pool)
    }
}

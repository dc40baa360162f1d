//! Ownership links between users and the assets they manage.

use super::DbError;
use sqlx::SqlitePool;
use std::fmt;

/// The kinds of asset a user can own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Bot,
}

impl AssetKind {
    /// Name stored in the `asset_type` columns and used in URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Bot => "bot",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bot" => Some(AssetKind::Bot),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an asset: its kind and its row ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetRef {
    pub kind: AssetKind,
    pub id: i64,
}

impl AssetRef {
    pub fn new(kind: AssetKind, id: i64) -> Self {
        Self { kind, id }
    }
}

/// A user's claim on an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAsset {
    pub id: i64,
    pub user_id: i64,
    pub asset: AssetRef,
    pub created_at: i64,
}

/// Outcome of [`UserAssetRepository::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The user owns the asset. `created` is true if this call made the link.
    Owned { user_asset: UserAsset, created: bool },
    /// Someone else already owns it.
    Conflict { owner_id: i64 },
}

type UserAssetRow = (i64, i64, String, i64, i64);

fn from_row((id, user_id, asset_type, asset_id, created_at): UserAssetRow) -> Result<UserAsset, DbError> {
    let kind = AssetKind::from_name(&asset_type)
        .ok_or_else(|| DbError::InvalidRow(format!("unknown asset type '{}'", asset_type)))?;
    Ok(UserAsset {
        id,
        user_id,
        asset: AssetRef::new(kind, asset_id),
        created_at,
    })
}

/// Repository for ownership links.
pub struct UserAssetRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserAssetRepository<'a> {
    /// Create a new user asset repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a link by ID.
    pub async fn get(&self, id: i64) -> Result<Option<UserAsset>, DbError> {
        let row = sqlx::query_as::<_, UserAssetRow>(
            r#"
            SELECT id, user_id, asset_type, asset_id, created_at
            FROM user_assets
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(from_row).transpose()
    }

    /// Find a link by ID, only if it belongs to `user_id`.
    pub async fn get_for_user(&self, user_id: i64, id: i64) -> Result<Option<UserAsset>, DbError> {
        Ok(self.get(id).await?.filter(|ua| ua.user_id == user_id))
    }

    /// The link for an asset, whoever owns it.
    pub async fn owner_of(&self, asset: AssetRef) -> Result<Option<UserAsset>, DbError> {
        let row = sqlx::query_as::<_, UserAssetRow>(
            r#"
            SELECT id, user_id, asset_type, asset_id, created_at
            FROM user_assets
            WHERE asset_type = ? AND asset_id = ?
            "#,
        )
        .bind(asset.kind.as_str())
        .bind(asset.id)
        .fetch_optional(self.pool)
        .await?;

        row.map(from_row).transpose()
    }

    /// Claim an asset for a user.
    ///
    /// The insert and the uniqueness check are one statement, so two users
    /// racing for the same unowned asset see exactly one `Owned`.
    pub async fn claim(&self, user_id: i64, asset: AssetRef) -> Result<Claim, DbError> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO user_assets (user_id, asset_type, asset_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(asset_type, asset_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(asset.kind.as_str())
        .bind(asset.id)
        .bind(now)
        .execute(self.pool)
        .await?;

        let existing = self
            .owner_of(asset)
            .await?
            .ok_or(DbError::UpsertLost("user_assets"))?;

        if existing.user_id == user_id {
            Ok(Claim::Owned {
                user_asset: existing,
                created: result.rows_affected() == 1,
            })
        } else {
            Ok(Claim::Conflict {
                owner_id: existing.user_id,
            })
        }
    }

    /// Drop a user's link. Returns false if the user did not hold it.
    pub async fn release(&self, user_id: i64, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM user_assets WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All links held by a user, oldest first.
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<UserAsset>, DbError> {
        let rows = sqlx::query_as::<_, UserAssetRow>(
            r#"
            SELECT id, user_id, asset_type, asset_id, created_at
            FROM user_assets
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(from_row).collect()
    }
}

//! Changeset ledger.
//!
//! Every mutation of an asset goes through a [`ChangesetHandle`]: the handle
//! snapshots the asset's fields when it is opened, collects field changes and
//! meta tags, and on [`finish`](ChangesetHandle::finish) writes the changeset
//! and applies the new values to the asset row in a single transaction.

use super::{AssetKind, AssetRef, DbError};
use sqlx::{SqliteConnection, SqlitePool};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use std::fmt;
use tracing::debug;

/// Meta tag on the changeset that accompanies an asset's creation.
pub const META_CREATED: &str = "_created";
/// Meta tag on the changeset recorded when an owner lets go of an asset.
pub const META_RELEASED: &str = "_released";

/// A single editable value on an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => f.write_str(if *v { "1" } else { "0" }),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// A row whose edits are recorded in the ledger.
pub trait Asset {
    const KIND: AssetKind;
    /// Table holding the asset rows. Field names are its column names.
    const TABLE: &'static str;

    fn id(&self) -> i64;

    /// Current value of every editable field.
    fn fields(&self) -> Vec<(&'static str, FieldValue)>;

    fn asset_ref(&self) -> AssetRef {
        AssetRef::new(Self::KIND, self.id())
    }
}

#[derive(Debug, Clone)]
struct PendingChange {
    field: &'static str,
    old: FieldValue,
    new: FieldValue,
}

/// An open changeset. Dropping it without calling `finish` discards it.
#[derive(Debug)]
pub struct ChangesetHandle {
    pool: SqlitePool,
    asset: AssetRef,
    table: &'static str,
    user_id: i64,
    remote_addr: Option<String>,
    snapshot: Vec<(&'static str, FieldValue)>,
    meta: Vec<String>,
    pending: Vec<PendingChange>,
}

impl ChangesetHandle {
    pub fn asset(&self) -> AssetRef {
        self.asset
    }

    /// Record the client address the change came from.
    pub fn with_remote_addr(mut self, remote_addr: Option<String>) -> Self {
        self.remote_addr = remote_addr;
        self
    }

    /// Attach a meta tag such as [`META_CREATED`].
    pub fn set_meta(&mut self, tag: &str) {
        if !self.meta.iter().any(|m| m == tag) {
            self.meta.push(tag.to_string());
        }
    }

    pub fn has_meta(&self, tag: &str) -> bool {
        self.meta.iter().any(|m| m == tag)
    }

    /// Set one field. Setting it again replaces the earlier value.
    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), DbError> {
        let Some((field, old)) = self.snapshot.iter().find(|(f, _)| *f == name) else {
            return Err(DbError::UnknownField {
                table: self.table,
                field: name.to_string(),
            });
        };
        let change = PendingChange {
            field: *field,
            old: old.clone(),
            new: value.into(),
        };
        self.pending.retain(|c| c.field != change.field);
        self.pending.push(change);
        Ok(())
    }

    /// Set several fields. Stops at the first unknown name.
    pub fn set_fields<I, K>(&mut self, fields: I) -> Result<(), DbError>
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: AsRef<str>,
    {
        for (name, value) in fields {
            self.set_field(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Changes that will be written. On a created asset every set field is
    /// recorded with no old value; otherwise unchanged fields are dropped.
    fn effective_changes(&self) -> Vec<PendingChange> {
        let created = self.has_meta(META_CREATED);
        self.pending
            .iter()
            .filter(|c| created || c.old != c.new)
            .cloned()
            .collect()
    }

    /// True if finishing would record nothing.
    pub fn is_empty(&self) -> bool {
        self.meta.is_empty() && self.effective_changes().is_empty()
    }

    /// Commit the changeset and apply its field values to the asset row.
    ///
    /// An empty changeset is not written and returns `None`.
    pub async fn finish(self) -> Result<Option<ChangesetRecord>, DbError> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut tx = self.pool.begin().await?;
        let record = self.finish_in(&mut *tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Write the changeset on a connection the caller controls, typically
    /// inside a transaction that also created the asset. Nothing is visible
    /// until the caller commits.
    pub async fn finish_in(self, conn: &mut SqliteConnection) -> Result<Option<ChangesetRecord>, DbError> {
        if self.is_empty() {
            return Ok(None);
        }

        let created = self.has_meta(META_CREATED);
        let changes = self.effective_changes();
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO asset_changesets (asset_type, asset_id, user_id, remote_addr, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(self.asset.kind.as_str())
        .bind(self.asset.id)
        .bind(self.user_id)
        .bind(self.remote_addr.as_deref())
        .bind(now)
        .execute(&mut *conn)
        .await?;
        let changeset_id = result.last_insert_rowid();

        let mut recorded = Vec::with_capacity(self.meta.len() + changes.len());

        for tag in &self.meta {
            sqlx::query(
                "INSERT INTO asset_changes (changeset_id, item, old_value, new_value) VALUES (?, ?, NULL, NULL)",
            )
            .bind(changeset_id)
            .bind(tag.as_str())
            .execute(&mut *conn)
            .await?;
            recorded.push(Change {
                item: tag.clone(),
                old_value: None,
                new_value: None,
            });
        }

        for change in &changes {
            let old_value = if created {
                String::new()
            } else {
                change.old.to_string()
            };
            let new_value = change.new.to_string();

            sqlx::query(
                "INSERT INTO asset_changes (changeset_id, item, old_value, new_value) VALUES (?, ?, ?, ?)",
            )
            .bind(changeset_id)
            .bind(change.field)
            .bind(old_value.as_str())
            .bind(new_value.as_str())
            .execute(&mut *conn)
            .await?;

            // Field names come from the asset's own snapshot, never from input.
            let sql = format!("UPDATE {} SET {} = ? WHERE id = ?", self.table, change.field);
            bind_value(sqlx::query(&sql), &change.new)
                .bind(self.asset.id)
                .execute(&mut *conn)
                .await?;

            recorded.push(Change {
                item: change.field.to_string(),
                old_value: Some(old_value),
                new_value: Some(new_value),
            });
        }

        debug!(
            changeset = changeset_id,
            asset = %self.asset.kind,
            asset_id = self.asset.id,
            changes = recorded.len(),
            "Changeset written"
        );

        Ok(Some(ChangesetRecord {
            id: changeset_id,
            asset: self.asset,
            user_id: self.user_id,
            remote_addr: self.remote_addr,
            created_at: now,
            changes: recorded,
        }))
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &FieldValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Int(v) => query.bind(*v),
        FieldValue::Bool(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.clone()),
    }
}

/// One recorded item of a committed changeset. Meta tags have no values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub item: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl Change {
    pub fn is_meta(&self) -> bool {
        self.old_value.is_none() && self.new_value.is_none()
    }
}

/// A committed changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetRecord {
    pub id: i64,
    pub asset: AssetRef,
    pub user_id: i64,
    pub remote_addr: Option<String>,
    pub created_at: i64,
    pub changes: Vec<Change>,
}

impl ChangesetRecord {
    pub fn has_meta(&self, tag: &str) -> bool {
        self.changes.iter().any(|c| c.is_meta() && c.item == tag)
    }

    pub fn change(&self, field: &str) -> Option<&Change> {
        self.changes.iter().find(|c| !c.is_meta() && c.item == field)
    }
}

/// Repository for the changeset ledger.
pub struct ChangesetRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ChangesetRepository<'a> {
    /// Create a new changeset repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a changeset against `asset` on behalf of `user_id`.
    pub fn begin<A: Asset>(&self, user_id: i64, asset: &A) -> ChangesetHandle {
        ChangesetHandle {
            pool: self.pool.clone(),
            asset: asset.asset_ref(),
            table: A::TABLE,
            user_id,
            remote_addr: None,
            snapshot: asset.fields(),
            meta: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Committed changesets for an asset, oldest first.
    pub async fn history(&self, asset: AssetRef) -> Result<Vec<ChangesetRecord>, DbError> {
        let rows = sqlx::query_as::<_, (i64, i64, Option<String>, i64)>(
            r#"
            SELECT id, user_id, remote_addr, created_at
            FROM asset_changesets
            WHERE asset_type = ? AND asset_id = ?
            ORDER BY id
            "#,
        )
        .bind(asset.kind.as_str())
        .bind(asset.id)
        .fetch_all(self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, user_id, remote_addr, created_at) in rows {
            let changes = sqlx::query_as::<_, (String, Option<String>, Option<String>)>(
                r#"
                SELECT item, old_value, new_value
                FROM asset_changes
                WHERE changeset_id = ?
                ORDER BY id
                "#,
            )
            .bind(id)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(|(item, old_value, new_value)| Change {
                item,
                old_value,
                new_value,
            })
            .collect();

            records.push(ChangesetRecord {
                id,
                asset,
                user_id,
                remote_addr,
                created_at,
                changes,
            });
        }

        Ok(records)
    }
}

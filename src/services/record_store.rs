//! src/services/record_store.rs
//!
//! Persistence backends for the item collection. The whole collection lives in
//! one named record that is read in full and rewritten in full; backends only
//! need to make a single save atomic.

use crate::models::item::Item;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{future::Future, io, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Name of the record holding the item collection.
pub const ITEMS_RECORD: &str = "thing_finder_items";

const INIT_MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record `{record}` is corrupt: {source}")]
    Corrupt {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record `{record}`: {source}")]
    Encode {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("photo `{0}` not found")]
    PhotoNotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Load-all / save-all access to the persisted item collection.
///
/// `load` returns `None` when nothing has been saved yet. `save` must either
/// replace the whole collection or leave the previous one intact.
pub trait RecordStore: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = StorageResult<Option<Vec<Item>>>> + Send;

    fn save(&self, items: &[Item]) -> impl Future<Output = StorageResult<()>> + Send;
}

/// Keeps the collection in process memory. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    items: Arc<RwLock<Option<Vec<Item>>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    async fn load(&self) -> StorageResult<Option<Vec<Item>>> {
        Ok(self.items.read().await.clone())
    }

    async fn save(&self, items: &[Item]) -> StorageResult<()> {
        *self.items.write().await = Some(items.to_vec());
        Ok(())
    }
}

/// Stores the collection as a JSON document in a SQLite `records` table.
#[derive(Clone)]
pub struct SqliteRecordStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteRecordStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema. Safe to run on every startup.
    pub async fn migrate(&self) -> StorageResult<()> {
        let statements = INIT_MIGRATION
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Cheap connectivity probe used by readiness checks.
    pub async fn ping(&self) -> StorageResult<()> {
        let v = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        if v == 1 {
            Ok(())
        } else {
            Err(StorageError::Unavailable(format!("unexpected result: {}", v)))
        }
    }
}

impl RecordStore for SqliteRecordStore {
    async fn load(&self) -> StorageResult<Option<Vec<Item>>> {
        let body = sqlx::query_scalar::<_, String>("SELECT body FROM records WHERE name = ?")
            .bind(ITEMS_RECORD)
            .fetch_optional(&*self.db)
            .await?;

        let Some(body) = body else {
            debug!("record {} absent, starting empty", ITEMS_RECORD);
            return Ok(None);
        };

        let items = serde_json::from_str::<Vec<Item>>(&body).map_err(|source| {
            StorageError::Corrupt {
                record: ITEMS_RECORD,
                source,
            }
        })?;
        debug!("loaded {} items from {}", items.len(), ITEMS_RECORD);
        Ok(Some(items))
    }

    async fn save(&self, items: &[Item]) -> StorageResult<()> {
        let body = serde_json::to_string(items).map_err(|source| StorageError::Encode {
            record: ITEMS_RECORD,
            source,
        })?;

        sqlx::query(
            "INSERT INTO records (name, body, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at",
        )
        .bind(ITEMS_RECORD)
        .bind(&body)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        debug!("saved {} items to {}", items.len(), ITEMS_RECORD);
        Ok(())
    }
}

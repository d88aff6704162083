//! Storage layer: one SQLite table per identity behind an r2d2 pool.
//!
//! - `PartitionResolver` maps an identity to its table name (created lazily)
//! - `SnapshotStore` is the only writer: one upserted row per identity
//! - `CatalogReader` / `PartitionReader` are read-only observers
//!
//! Every component receives the pool at construction. SQLite is synchronous,
//! so each operation checks a connection out inside `spawn_blocking` and the
//! guard hands it back to the pool on every exit path.

pub mod catalog;
pub mod partition;
pub mod snapshots;

pub use catalog::{CatalogReader, PartitionReader};
pub use partition::{PartitionHandle, PartitionResolver};
pub use snapshots::{SnapshotStore, StoredSnapshot};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

pub type DbPool = Pool<SqliteConnectionManager>;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Payload sub-fields do not fit the snapshot schema
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Another partition already owns this name up to ASCII case
    #[error("partition name conflict: {0}")]
    PartitionConflict(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("timestamp format error: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Join(String),
}

/// Every identity-facing component, built around the same pool.
#[derive(Clone)]
pub struct Storage {
    pub resolver: PartitionResolver,
    pub snapshots: SnapshotStore,
    pub catalog: CatalogReader,
    pub partitions: PartitionReader,
}

impl Storage {
    pub fn new(pool: DbPool, partition_suffix: impl Into<String>) -> Self {
        Self {
            resolver: PartitionResolver::new(partition_suffix),
            snapshots: SnapshotStore::new(pool.clone()),
            catalog: CatalogReader::new(pool.clone()),
            partitions: PartitionReader::new(pool),
        }
    }
}

/// Opens (or creates) the database file and builds the pool.
pub fn initialize_pool(db_path: &Path, pool_size: u32) -> Result<DbPool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(db_path).with_init(apply_pragmas);
    let pool = Pool::builder()
        .max_size(pool_size.max(1))
        .connection_timeout(Duration::from_secs(10))
        .build(manager)?;
    Ok(pool)
}

fn apply_pragmas(conn: &mut Connection) -> rusqlite::Result<()> {
    // first, so the other pragmas already wait on a locked file
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

/// Runs a sync SQLite operation on the blocking pool.
pub async fn with_connection<F, T>(pool: &DbPool, f: F) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut *conn)
    })
    .await
    .map_err(|e| StoreError::Join(e.to_string()))?
}

/// Commits on `Ok`, rolls back (on drop) on `Err`.
pub fn execute_in_transaction<F, T>(
    conn: &mut Connection,
    behavior: TransactionBehavior,
    operation: F,
) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(behavior)?;
    let result = operation(&tx)?;
    tx.commit()?;
    Ok(result)
}

/// Double-quoted SQL identifier, embedded quotes doubled.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

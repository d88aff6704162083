use super::{execute_in_transaction, with_connection, DbPool, PartitionHandle, Result, StoreError};
use crate::models::Snapshot;
use crate::validator::Identity;
use rusqlite::{params, TransactionBehavior};
use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Result of an upsert: the row id (stable across replaces) and the stored document.
#[derive(Debug, Clone, Serialize)]
pub struct StoredSnapshot {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

/// Sole writer into partitions.
#[derive(Clone)]
pub struct SnapshotStore {
    pool: DbPool,
}

impl SnapshotStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert-or-replace the current snapshot of `identity`.
    ///
    /// The payload is checked against the snapshot schema first
    /// (`SchemaViolation`). Then, in one IMMEDIATE transaction, the partition
    /// table is created if needed and the row keyed by `Username` is inserted
    /// or fully overwritten. Old and new documents are never merged. A table
    /// that exists only under another ASCII case gives `PartitionConflict`.
    pub async fn upsert(
        &self,
        handle: &PartitionHandle,
        identity: &Identity,
        payload: Value,
    ) -> Result<StoredSnapshot> {
        let mut snapshot =
            Snapshot::from_payload(payload).map_err(|e| StoreError::SchemaViolation(e.to_string()))?;
        snapshot.username = identity.as_str().to_string();

        let document = serde_json::to_string(&snapshot)?;
        let timestamp = snapshot.timestamp.format(&Rfc3339)?;
        let username = snapshot.username.clone();
        let create_sql = handle.create_table_sql();
        let table = handle.quoted_name();
        let table_name = handle.name().to_string();
        let fresh_id = Uuid::new_v4().to_string();

        let id = with_connection(&self.pool, move |conn| {
            execute_in_transaction(conn, TransactionBehavior::Immediate, |tx| {
                tx.execute_batch(&create_sql)?;
                // table names match case-insensitively: the create above is a
                // no-op when a case variant already exists
                let exact: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                    params![table_name],
                    |row| row.get(0),
                )?;
                if !exact {
                    return Err(StoreError::PartitionConflict(table_name.clone()));
                }
                tx.execute(
                    &format!(
                        "INSERT INTO {table} (_id, Username, document, timestamp)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(Username) DO UPDATE SET
                             document = excluded.document,
                             timestamp = excluded.timestamp"
                    ),
                    params![fresh_id, username, document, timestamp],
                )?;
                let id: String = tx.query_row(
                    &format!("SELECT _id FROM {table} WHERE Username = ?1"),
                    params![username],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
        })
        .await?;

        Ok(StoredSnapshot { id, snapshot })
    }
}

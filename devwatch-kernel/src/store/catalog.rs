use super::{quote_ident, with_connection, DbPool, Result};
use rusqlite::params;
use serde_json::Value;

/// Lists every table of the backend, in backend order. Internal tables are
/// not filtered out; callers filter if they care.
#[derive(Clone)]
pub struct CatalogReader {
    pool: DbPool,
}

impl CatalogReader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_partitions(&self) -> Result<Vec<String>> {
        with_connection(&self.pool, |conn| {
            let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(names)
        })
        .await
    }

    /// Tables carrying the snapshot columns; foreign tables are skipped.
    pub async fn count_partitions(&self) -> Result<u64> {
        with_connection(&self.pool, |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master AS m
                 WHERE m.type = 'table'
                   AND (SELECT COUNT(*) FROM pragma_table_info(m.name)
                        WHERE name IN ('_id', 'Username', 'document')) = 3",
                [],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }
}

/// Full, unpaginated dump of one partition.
#[derive(Clone)]
pub struct PartitionReader {
    pool: DbPool,
}

impl PartitionReader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Each record is the stored document with its `_id`. A name that was
    /// never created yields an empty list, not an error.
    pub async fn read_partition(&self, name: &str) -> Result<Vec<Value>> {
        let name = name.to_string();
        with_connection(&self.pool, move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                params![name],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(Vec::new());
            }

            let mut stmt = conn.prepare(&format!("SELECT _id, document FROM {}", quote_ident(&name)))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(id, document)| into_record(id, &document))
                .collect()
        })
        .await
    }
}

fn into_record(id: String, document: &str) -> Result<Value> {
    let mut record: Value = serde_json::from_str(document)?;
    if let Value::Object(fields) = &mut record {
        fields.insert("_id".into(), Value::String(id));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snapshot;
    use crate::store::test_support::temp_storage;
    use crate::store::StoreError;
    use crate::validator::validate;
    use devwatch_devkit::SnapshotBuilder;
    use serde_json::json;

    #[tokio::test]
    async fn test_listing_contains_every_identity() {
        let (storage, _pool, _dir) = temp_storage();
        let users = ["alice", "bob", "carol", "dave"];
        for user in users {
            let payload = SnapshotBuilder::new(user).build();
            let identity = validate(&payload).unwrap();
            let handle = storage.resolver.resolve(&identity);
            storage.snapshots.upsert(&handle, &identity, payload).await.unwrap();
        }

        let mut names = storage.catalog.list_partitions().await.unwrap();
        names.sort();
        let mut expected: Vec<String> = users.iter().map(|u| format!("{u}_metrics")).collect();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_empty_backend_lists_nothing() {
        let (storage, _pool, _dir) = temp_storage();
        assert!(storage.catalog.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_partition_reads_empty() {
        let (storage, _pool, _dir) = temp_storage();
        let records = storage.partitions.read_partition("ghost_metrics").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_read_after_write_matches() {
        let (storage, _pool, _dir) = temp_storage();
        let payload = SnapshotBuilder::alice()
            .set_field("TopProcesses", json!([{"PID": 9, "Name": "sshd", "CPUPercent": 0.5, "Memory": "4.00 MB"}]))
            .build();
        let identity = validate(&payload).unwrap();
        let handle = storage.resolver.resolve(&identity);
        let stored = storage.snapshots.upsert(&handle, &identity, payload).await.unwrap();

        let records = storage.partitions.read_partition("alice_metrics").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["_id"], json!(stored.id));
        let read_back = Snapshot::from_payload(records[0].clone()).unwrap();
        assert_eq!(read_back, stored.snapshot);
    }

    #[tokio::test]
    async fn test_foreign_table_fails_read() {
        let (storage, pool, _dir) = temp_storage();
        with_connection(&pool, |conn| {
            conn.execute_batch("CREATE TABLE foreign_data (x INTEGER)")?;
            Ok(())
        })
        .await
        .unwrap();

        let names = storage.catalog.list_partitions().await.unwrap();
        assert!(names.contains(&"foreign_data".to_string()));

        let err = storage.partitions.read_partition("foreign_data").await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[tokio::test]
    async fn test_count_skips_foreign_tables() {
        let (storage, pool, _dir) = temp_storage();
        with_connection(&pool, |conn| {
            conn.execute_batch("CREATE TABLE legacy (x INTEGER)")?;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(storage.catalog.count_partitions().await.unwrap(), 0);

        for user in ["alice", "bob"] {
            let payload = SnapshotBuilder::new(user).build();
            let identity = validate(&payload).unwrap();
            let handle = storage.resolver.resolve(&identity);
            storage.snapshots.upsert(&handle, &identity, payload).await.unwrap();
        }
        assert_eq!(storage.catalog.count_partitions().await.unwrap(), 2);
        assert_eq!(storage.catalog.list_partitions().await.unwrap().len(), 3);
    }
}

use crate::store::Storage;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub partitions_tracked: u32,
    pub snapshots_received: u64,
    pub last_ingest: Option<String>,
    pub memory_usage_mb: f32,
    pub storage_status: String,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    snapshots_received: Arc<AtomicU64>,
    last_ingest: Arc<Mutex<Option<OffsetDateTime>>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            snapshots_received: Arc::new(AtomicU64::new(0)),
            last_ingest: Arc::new(Mutex::new(None)),
        }
    }

    /// Called after each acknowledged ingest.
    pub fn record_ingest(&self) {
        self.snapshots_received.fetch_add(1, Ordering::Relaxed);
        *self.last_ingest.lock() = Some(OffsetDateTime::now_utc());
    }

    pub async fn get_health(&self, storage: &Storage) -> KernelHealth {
        let (partitions_tracked, storage_status) = match storage.catalog.count_partitions().await {
            Ok(count) => (u32::try_from(count).unwrap_or(u32::MAX), "ok".to_string()),
            Err(e) => {
                warn!("health: storage unavailable: {e}");
                (0, "unavailable".to_string())
            }
        };
        let last_ingest = self
            .last_ingest
            .lock()
            .as_ref()
            .and_then(|ts| ts.format(&Rfc3339).ok());

        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            partitions_tracked,
            snapshots_received: self.snapshots_received.load(Ordering::Relaxed),
            last_ingest,
            memory_usage_mb: get_memory_usage_mb(),
            storage_status,
        }
    }
}

/// Resident set size from procfs; 0 where it is not available.
fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            let rss_kb = status
                .lines()
                .find_map(|line| line.strip_prefix("VmRSS:"))
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|kb| kb.parse::<u64>().ok());
            if let Some(kb) = rss_kb {
                return kb as f32 / 1024.0;
            }
        }
    }
    0.0
}

//! Device snapshot collection for DevWatch agents
//!
//! Builds the `POST /api/device-info` payload from `sysinfo`:
//! - CPU utilisation, frequency, uptime, process and core counts
//! - Memory totals
//! - Network byte counters summed over interfaces
//! - Disk usage per mounted device
//! - Firewall and battery state (OS-specific, see submodules)
//! - Top 5 processes by CPU

mod battery;
mod firewall;

pub use battery::BatteryDetails;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use sysinfo::{Disks, Networks, System};
use tracing::debug;

const TOP_PROCESS_COUNT: usize = 5;

/// One snapshot, serialized with the field names the kernel expects
#[derive(Debug, Serialize)]
pub struct DeviceSnapshot {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "CPUUsage")]
    pub cpu_usage: CpuUsage,
    #[serde(rename = "MemoryUsage")]
    pub memory_usage: MemoryUsage,
    #[serde(rename = "NetworkDataUsage")]
    pub network_data_usage: NetworkDataUsage,
    #[serde(rename = "DiskUsage")]
    pub disk_usage: BTreeMap<String, DiskEntry>,
    #[serde(rename = "FirewallStatus")]
    pub firewall_status: String,
    #[serde(rename = "TopProcesses")]
    pub top_processes: Vec<ProcessEntry>,
    #[serde(rename = "BatteryDetails")]
    pub battery_details: BatteryDetails,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CpuUsage {
    #[serde(rename = "Utilization")]
    pub utilization: String,
    #[serde(rename = "Speed")]
    pub speed: String,
    #[serde(rename = "Up Time")]
    pub up_time: String,
    #[serde(rename = "Processes")]
    pub processes: usize,
    #[serde(rename = "Cores")]
    pub cores: usize,
}

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    #[serde(rename = "TotalMemory")]
    pub total_memory: String,
    #[serde(rename = "AvailableMemory")]
    pub available_memory: String,
    #[serde(rename = "MemoryUsagePercent")]
    pub memory_usage_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct NetworkDataUsage {
    #[serde(rename = "SentBytes")]
    pub sent_bytes: String,
    #[serde(rename = "ReceivedBytes")]
    pub received_bytes: String,
}

#[derive(Debug, Serialize)]
pub struct DiskEntry {
    #[serde(rename = "Total")]
    pub total: String,
    #[serde(rename = "Used")]
    pub used: String,
    #[serde(rename = "Free")]
    pub free: String,
    #[serde(rename = "UsagePercent")]
    pub usage_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct ProcessEntry {
    #[serde(rename = "PID")]
    pub pid: u32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CPUPercent")]
    pub cpu_percent: f32,
    #[serde(rename = "Memory")]
    pub memory: String,
}

impl DeviceSnapshot {
    pub async fn collect() -> Result<Self> {
        debug!("Collecting device snapshot...");

        let mut sys = System::new_all();
        sys.refresh_all();

        // Second sample for CPU and per-process usage
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        sys.refresh_cpu_usage();
        sys.refresh_processes();

        Ok(DeviceSnapshot {
            username: current_username(),
            cpu_usage: CpuUsage::collect(&sys),
            memory_usage: MemoryUsage::collect(&sys),
            network_data_usage: NetworkDataUsage::collect(),
            disk_usage: collect_disks(),
            firewall_status: firewall::status(),
            top_processes: top_processes(&sys, TOP_PROCESS_COUNT),
            battery_details: BatteryDetails::collect(),
            timestamp: Utc::now(),
        })
    }
}

impl CpuUsage {
    fn collect(sys: &System) -> Self {
        let mhz = sys.cpus().first().map(|c| c.frequency()).unwrap_or(0);
        CpuUsage {
            utilization: format!("{:.1}%", sys.global_cpu_info().cpu_usage()),
            speed: format!("{:.2} GHz", mhz as f64 / 1000.0),
            up_time: format_uptime(System::uptime()),
            processes: sys.processes().len(),
            cores: sys.cpus().len(),
        }
    }
}

impl MemoryUsage {
    fn collect(sys: &System) -> Self {
        let total = sys.total_memory();
        let available = sys.available_memory();
        MemoryUsage {
            total_memory: format_bytes(total),
            available_memory: format_bytes(available),
            memory_usage_percent: percent(total.saturating_sub(available), total),
        }
    }
}

impl NetworkDataUsage {
    fn collect() -> Self {
        let networks = Networks::new_with_refreshed_list();
        let (sent, received) = networks
            .list()
            .values()
            .fold((0u64, 0u64), |(s, r), data| {
                (s + data.total_transmitted(), r + data.total_received())
            });
        NetworkDataUsage {
            sent_bytes: format_bytes(sent),
            received_bytes: format_bytes(received),
        }
    }
}

/// Keyed by device name; a device mounted twice keeps its last mount
fn collect_disks() -> BTreeMap<String, DiskEntry> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| disk.total_space() > 0)
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            let used = total.saturating_sub(free);
            let entry = DiskEntry {
                total: format_bytes(total),
                used: format_bytes(used),
                free: format_bytes(free),
                usage_percent: percent(used, total),
            };
            (disk.name().to_string_lossy().into_owned(), entry)
        })
        .collect()
}

fn top_processes(sys: &System, limit: usize) -> Vec<ProcessEntry> {
    let mut processes: Vec<_> = sys.processes().values().collect();
    processes.sort_by(|a, b| {
        b.cpu_usage()
            .partial_cmp(&a.cpu_usage())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    processes
        .into_iter()
        .take(limit)
        .map(|p| ProcessEntry {
            pid: p.pid().as_u32(),
            name: p.name().to_string(),
            cpu_percent: p.cpu_usage(),
            memory: format_bytes(p.memory()),
        })
        .collect()
}

/// Login name of the user running the agent
pub fn current_username() -> String {
    username_from(|key| std::env::var(key).ok())
}

fn username_from<F: Fn(&str) -> Option<String>>(lookup: F) -> String {
    ["LOGNAME", "USER", "LNAME", "USERNAME"]
        .iter()
        .filter_map(|key| lookup(key))
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Human-readable size, base 1024, two decimals
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

fn format_uptime(seconds: u64) -> String {
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(16 * 1024 * 1024 * 1024), "16.00 GB");
        assert_eq!(format_bytes(3 * 1024u64.pow(5)), "3072.00 TB");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "00:00:00");
        assert_eq!(format_uptime(3723), "01:02:03");
        assert_eq!(format_uptime(90_000), "25:00:00");
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(1, 3), 33.3);
        assert_eq!(percent(5, 0), 0.0);
    }

    #[test]
    fn test_username_lookup_order() {
        let env = |key: &str| match key {
            "LOGNAME" => Some(String::new()),
            "USER" => Some("alice".to_string()),
            "USERNAME" => Some("ALICE".to_string()),
            _ => None,
        };
        assert_eq!(username_from(env), "alice");
        assert_eq!(username_from(|_| None), "unknown");
    }

    #[tokio::test]
    async fn test_snapshot_collection() {
        let snapshot = DeviceSnapshot::collect().await.unwrap();
        assert!(snapshot.cpu_usage.cores > 0);
        assert!(snapshot.cpu_usage.processes > 0);
        assert!(snapshot.top_processes.len() <= TOP_PROCESS_COUNT);
        assert!(!snapshot.username.is_empty());

        let payload = serde_json::to_value(&snapshot).unwrap();
        for field in [
            "Username",
            "CPUUsage",
            "MemoryUsage",
            "NetworkDataUsage",
            "DiskUsage",
            "FirewallStatus",
            "TopProcesses",
            "BatteryDetails",
            "timestamp",
        ] {
            assert!(payload.get(field).is_some(), "missing {field}");
        }
        assert!(payload["BatteryDetails"]["PluggedIn"].is_boolean());
        assert!(payload["CPUUsage"]["Up Time"].is_string());
    }
}

//! Battery readings from `/sys/class/power_supply` (Linux only).
//!
//! Machines without a battery, and other platforms, report an `N/A`
//! placeholder shaped like a real reading.

use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryDetails {
    #[serde(rename = "Percentage")]
    pub percentage: String,
    #[serde(rename = "PluggedIn")]
    pub plugged_in: bool,
    #[serde(rename = "TimeLeft")]
    pub time_left: String,
}

impl BatteryDetails {
    pub fn collect() -> Self {
        if cfg!(target_os = "linux") {
            if let Some(details) = read_power_supply(Path::new("/sys/class/power_supply")) {
                return details;
            }
        }
        Self::unavailable()
    }

    pub fn unavailable() -> Self {
        BatteryDetails {
            percentage: "N/A".to_string(),
            plugged_in: true,
            time_left: "N/A".to_string(),
        }
    }
}

/// First supply whose `type` is `Battery`
fn read_power_supply(root: &Path) -> Option<BatteryDetails> {
    let mut entries: Vec<_> = std::fs::read_dir(root).ok()?.flatten().map(|e| e.path()).collect();
    entries.sort();
    entries
        .into_iter()
        .find(|dir| read_trimmed(&dir.join("type")).as_deref() == Some("Battery"))
        .map(|dir| {
            from_readings(
                read_trimmed(&dir.join("capacity")).as_deref(),
                read_trimmed(&dir.join("status")).as_deref(),
                read_number(&dir, &["energy_now", "charge_now"]),
                read_number(&dir, &["power_now", "current_now"]),
            )
        })
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_number(dir: &Path, candidates: &[&str]) -> Option<u64> {
    candidates
        .iter()
        .find_map(|name| read_trimmed(&dir.join(name))?.parse().ok())
}

fn from_readings(
    capacity: Option<&str>,
    status: Option<&str>,
    remaining: Option<u64>,
    drain_rate: Option<u64>,
) -> BatteryDetails {
    let plugged_in = !matches!(status, Some("Discharging"));
    let time_left = match (plugged_in, remaining, drain_rate) {
        (true, _, _) => "Unlimited".to_string(),
        (false, Some(left), Some(rate)) if rate > 0 => {
            let minutes = left.saturating_mul(60) / rate;
            format!("{}h {}m", minutes / 60, minutes % 60)
        }
        _ => "Unknown".to_string(),
    };
    BatteryDetails {
        percentage: capacity.map_or_else(|| "N/A".to_string(), |c| format!("{c}%")),
        plugged_in,
        time_left,
    }
}

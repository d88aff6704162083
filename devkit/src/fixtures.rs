/*!
Builders de payloads snapshot

Produit des payloads `POST /api/device-info` valides, à modifier champ par
champ pour fabriquer les cas limites.
*/

use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    payload: Map<String, Value>,
}

impl SnapshotBuilder {
    /// Snapshot complet et valide pour `username`.
    pub fn new<S: Into<String>>(username: S) -> Self {
        let payload = json!({
            "Username": username.into(),
            "CPUUsage": {
                "Utilization": "7.5%",
                "Speed": "2400.00 MHz",
                "Up Time": "01:02:03",
                "Processes": 212,
                "Cores": 8
            },
            "MemoryUsage": {
                "TotalMemory": "15.50 GB",
                "AvailableMemory": "9.25 GB",
                "MemoryUsagePercent": 40.3
            },
            "NetworkDataUsage": {
                "SentBytes": "1.20 GB",
                "ReceivedBytes": "3.40 GB"
            },
            "DiskUsage": {
                "/dev/sda1": {
                    "Total": "476.94 GB",
                    "Used": "210.00 GB",
                    "Free": "266.94 GB",
                    "UsagePercent": 44.0
                }
            },
            "FirewallStatus": "Active",
            "BatteryDetails": {
                "Percentage": "64%",
                "PluggedIn": false,
                "TimeLeft": "3h 12m"
            },
            "TopProcesses": []
        });
        match payload {
            Value::Object(payload) => Self { payload },
            _ => unreachable!("json! object literal"),
        }
    }

    /// Reference ingest: `alice`, firewall `on`, empty disk section.
    pub fn alice() -> Self {
        Self::new("alice")
            .set_field("CPUUsage", json!(12))
            .set_field(
                "MemoryUsage",
                json!({"TotalMemory": "16GB", "AvailableMemory": "8GB", "MemoryUsagePercent": 50}),
            )
            .set_field("NetworkDataUsage", json!({"SentBytes": "100", "ReceivedBytes": "200"}))
            .set_field("DiskUsage", json!({}))
            .set_field("FirewallStatus", json!("on"))
            .set_field(
                "BatteryDetails",
                json!({"Percentage": "80%", "PluggedIn": true, "TimeLeft": "2h"}),
            )
            .set_field("TopProcesses", json!([]))
    }

    /// Définit (ou remplace) un champ de premier niveau
    pub fn set_field<S: Into<String>>(mut self, field: S, value: Value) -> Self {
        self.payload.insert(field.into(), value);
        self
    }

    /// Retire un champ de premier niveau
    pub fn without(mut self, field: &str) -> Self {
        self.payload.remove(field);
        self
    }

    /// Ajoute un processus à `TopProcesses`
    pub fn with_process(mut self, pid: u32, name: &str, cpu_percent: f64, memory: &str) -> Self {
        let entry = json!({"PID": pid, "Name": name, "CPUPercent": cpu_percent, "Memory": memory});
        match self.payload.get_mut("TopProcesses") {
            Some(Value::Array(list)) => list.push(entry),
            _ => {
                self.payload.insert("TopProcesses".into(), Value::Array(vec![entry]));
            }
        }
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.payload)
    }
}

//! Snapshot schema: the single current-state record kept per identity.
//!
//! Wire keys are the agent's PascalCase names. Scalars are coerced leniently
//! (numbers into text fields, numeric strings into number fields) and the
//! loosely shaped sections (`CPUUsage`, `DiskUsage`) stay opaque JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "Username", deserialize_with = "coerce::required_string")]
    pub username: String,
    #[serde(rename = "CPUUsage", deserialize_with = "coerce::present")]
    pub cpu_usage: Value,
    #[serde(rename = "MemoryUsage")]
    pub memory_usage: MemoryUsage,
    #[serde(rename = "NetworkDataUsage")]
    pub network_data_usage: NetworkDataUsage,
    #[serde(rename = "DiskUsage", deserialize_with = "coerce::present")]
    pub disk_usage: Value,
    #[serde(rename = "FirewallStatus", deserialize_with = "coerce::required_string")]
    pub firewall_status: String,
    #[serde(rename = "BatteryDetails")]
    pub battery_details: BatteryDetails,
    #[serde(rename = "TopProcesses", default, deserialize_with = "coerce::list_or_null")]
    pub top_processes: Vec<ProcessEntry>,
    #[serde(default = "OffsetDateTime::now_utc", with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    #[serde(rename = "TotalMemory", deserialize_with = "coerce::required_string")]
    pub total_memory: String,
    #[serde(rename = "AvailableMemory", deserialize_with = "coerce::required_string")]
    pub available_memory: String,
    #[serde(rename = "MemoryUsagePercent", deserialize_with = "coerce::number")]
    pub memory_usage_percent: f64,
}

/// Byte counters travel as text (`"1.20 GB"`, `"100"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDataUsage {
    #[serde(rename = "SentBytes", deserialize_with = "coerce::required_string")]
    pub sent_bytes: String,
    #[serde(rename = "ReceivedBytes", deserialize_with = "coerce::required_string")]
    pub received_bytes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryDetails {
    #[serde(rename = "Percentage", deserialize_with = "coerce::required_string")]
    pub percentage: String,
    #[serde(rename = "PluggedIn", deserialize_with = "coerce::boolean")]
    pub plugged_in: bool,
    #[serde(rename = "TimeLeft", deserialize_with = "coerce::required_string")]
    pub time_left: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    #[serde(
        rename = "PID",
        default,
        deserialize_with = "coerce::opt_integer",
        skip_serializing_if = "Option::is_none"
    )]
    pub pid: Option<i64>,
    #[serde(
        rename = "Name",
        default,
        deserialize_with = "coerce::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "CPUPercent",
        alias = "CPU%",
        default,
        deserialize_with = "coerce::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cpu_percent: Option<f64>,
    #[serde(
        rename = "Memory",
        default,
        deserialize_with = "coerce::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub memory: Option<String>,
}

impl Snapshot {
    /// Schema check + coercion of an untyped payload. Unknown fields are dropped.
    pub fn from_payload(payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload)
    }
}

/// Lenient scalar casts used by the schema above.
pub(crate) mod coerce {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    pub(crate) fn scalar_text(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn scalar_number(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        n.is_finite().then_some(n)
    }

    fn scalar_integer(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    fn scalar_bool(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn present<'de, D: Deserializer<'de>>(d: D) -> Result<Value, D::Error> {
        let value = Value::deserialize(d)?;
        if value.is_null() {
            return Err(D::Error::custom("required value is null"));
        }
        Ok(value)
    }

    pub fn required_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let value = Value::deserialize(d)?;
        match scalar_text(&value) {
            Some(s) if !s.is_empty() => Ok(s),
            Some(_) => Err(D::Error::custom("required string is empty")),
            None => Err(D::Error::custom(format!("expected string, found {value}"))),
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(d)?;
        scalar_number(&value).ok_or_else(|| D::Error::custom(format!("expected number, found {value}")))
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let value = Value::deserialize(d)?;
        scalar_bool(&value).ok_or_else(|| D::Error::custom(format!("expected boolean, found {value}")))
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        optional(d, scalar_text, "string")
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        optional(d, scalar_number, "number")
    }

    pub fn opt_integer<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        optional(d, scalar_integer, "integer")
    }

    pub fn list_or_null<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
    }

    fn optional<'de, D, T>(d: D, cast: fn(&Value) -> Option<T>, kind: &str) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        if value.is_null() {
            return Ok(None);
        }
        cast(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected {kind}, found {value}")))
    }
}

//! Firewall state: `netsh` on Windows, `ufw` on Linux, `Unknown` elsewhere.

use std::process::Command;
use tracing::debug;

pub fn status() -> String {
    let probe = if cfg!(target_os = "windows") {
        Command::new("netsh")
            .args(["advfirewall", "show", "allprofiles"])
            .output()
            .map(|out| parse_netsh(&String::from_utf8_lossy(&out.stdout)))
    } else if cfg!(target_os = "linux") {
        Command::new("ufw")
            .arg("status")
            .output()
            .map(|out| parse_ufw(&String::from_utf8_lossy(&out.stdout)))
    } else {
        return "Unknown".to_string();
    };

    match probe {
        Ok(state) => state.to_string(),
        Err(e) => {
            debug!("firewall probe failed: {e}");
            "Unknown".to_string()
        }
    }
}

/// Active as soon as one profile reports `State ON`
fn parse_netsh(output: &str) -> &'static str {
    let active = output
        .lines()
        .filter(|line| line.trim_start().starts_with("State"))
        .any(|line| line.to_ascii_uppercase().contains("ON"));
    if active {
        "Active"
    } else {
        "Inactive"
    }
}

fn parse_ufw(output: &str) -> &'static str {
    match output.lines().next().map(str::trim) {
        Some("Status: active") => "Active",
        Some("Status: inactive") => "Inactive",
        _ => "Unknown",
    }
}

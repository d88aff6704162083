//! DevWatch Agent Host - periodic device snapshot reporter
//!
//! Collects a system snapshot every `DATA_INTERVAL_SECONDS` and posts it
//! to the kernel's `/api/device-info`. Failures are logged and the next
//! tick tries again.

mod config;
mod metrics;
mod sender;

use anyhow::{Context, Result};
use config::AgentConfig;
use metrics::DeviceSnapshot;
use sender::{MetricsSender, SendOutcome};
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

struct Agent {
    config: AgentConfig,
    sender: MetricsSender,
}

impl Agent {
    fn new(config: AgentConfig) -> Result<Self> {
        let sender = MetricsSender::new(&config)?;
        Ok(Agent { config, sender })
    }

    async fn run(&self) -> Result<()> {
        let period = Duration::from_secs(self.config.data_interval_seconds.max(1));
        let mut timer = interval(period);
        info!(
            "Reporting to {} every {}s",
            self.config.server_url,
            period.as_secs()
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if let Err(e) = self.report().await {
                        error!("Error sending data to server: {e:#}");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down agent");
                    return Ok(());
                }
            }
        }
    }

    async fn report(&self) -> Result<()> {
        let snapshot = DeviceSnapshot::collect()
            .await
            .context("Failed to collect device snapshot")?;

        match self.sender.send(&snapshot).await? {
            SendOutcome::Delivered(_) => info!("Data sent successfully for {}", snapshot.username),
            SendOutcome::Rejected(status) => warn!("Failed to send data. Status code: {status}"),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("DevWatch agent starting...");

    let config = AgentConfig::load().await.context("Failed to load agent config")?;
    let agent = Agent::new(config).context("Failed to create agent")?;

    agent.run().await.context("Agent execution failed")
}

//! Delivery of snapshots to the kernel ingest endpoint.

use crate::config::AgentConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered(u16),
    Rejected(u16),
}

pub struct MetricsSender {
    client: Client,
    url: String,
}

impl MetricsSender {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: config.server_url.clone(),
        })
    }

    /// Transport failures are errors; any HTTP answer is an outcome
    pub async fn send<T: Serialize>(&self, snapshot: &T) -> Result<SendOutcome> {
        let resp = self
            .client
            .post(&self.url)
            .json(snapshot)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.url))?;

        let status = resp.status().as_u16();
        Ok(match status {
            200 | 201 => SendOutcome::Delivered(status),
            _ => SendOutcome::Rejected(status),
        })
    }
}

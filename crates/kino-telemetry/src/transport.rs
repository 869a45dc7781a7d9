//! Event delivery
//!
//! A [`Transport`] receives one enriched event at a time from the dispatch
//! queue. Delivery is best-effort: a failed send is logged and counted by
//! the queue, never retried and never reported back to the player.

use crate::event::EnrichedEvent;
use crate::Result;
use async_trait::async_trait;
use tracing::info;

#[cfg(feature = "http")]
use crate::Error;
#[cfg(feature = "http")]
use reqwest::Client;
#[cfg(feature = "http")]
use std::time::Duration;
#[cfg(feature = "http")]
use tracing::debug;
#[cfg(feature = "http")]
use url::Url;

/// Delivers enriched events to a collector
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, event: &EnrichedEvent) -> Result<()>;
}

/// Writes every event to the log instead of the network
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    async fn send(&self, event: &EnrichedEvent) -> Result<()> {
        info!(
            session_id = %event.session_id,
            sequence = event.sequence,
            event = event.name(),
            payload = %serde_json::to_string(&event.event)?,
            "Telemetry event"
        );
        Ok(())
    }
}

/// POSTs each event as JSON to a collector endpoint
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Create a transport for `endpoint` with a per-request timeout
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, event: &EnrichedEvent) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::CollectorStatus {
                status: status.as_u16(),
            });
        }

        debug!(sequence = event.sequence, event = event.name(), "Event delivered");
        Ok(())
    }
}

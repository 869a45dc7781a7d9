//! Playback monitor
//!
//! One monitor per instrumented player. It owns the whole pipeline:
//! player signals go through the tracker, every resulting event is enriched
//! and handed to the dispatch queue, and nothing on this path ever waits on
//! the network.

use crate::adapter::{self, PlayerSignal};
use crate::clock::{Clock, SystemClock};
use crate::config::TelemetryConfig;
use crate::dispatch::{DispatchStats, EventDispatchQueue};
use crate::enricher::EventEnricher;
use crate::event::Event;
use crate::state::PlaybackState;
use crate::tracker::PlaybackStateTracker;
use crate::transport::{LogTransport, Transport};
use crate::types::{PlayerHandle, SessionId};
use crate::{Result, PLUGIN_VERSION};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

#[cfg(feature = "http")]
use crate::transport::HttpTransport;

/// Telemetry pipeline for a single player
pub struct PlaybackMonitor {
    tracker: PlaybackStateTracker,
    enricher: EventEnricher,
    queue: EventDispatchQueue,
    /// Sequence number of the last enriched event
    sequence: u64,
    released: bool,
}

impl PlaybackMonitor {
    /// Create a monitor using the system clock.
    ///
    /// Must be called within a Tokio runtime; emits `Initialized`.
    pub fn new(
        config: &TelemetryConfig,
        player: Weak<dyn PlayerHandle>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::with_clock(config, player, transport, Arc::new(SystemClock))
    }

    /// Create a monitor with an explicit time source
    pub fn with_clock(
        config: &TelemetryConfig,
        player: Weak<dyn PlayerHandle>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tracker = PlaybackStateTracker::new(clock.clone())
            .with_player(player)
            .with_protocol(config.protocol.clone());
        let enricher = EventEnricher::new(config.credentials.clone(), clock);
        let queue = EventDispatchQueue::spawn(&config.dispatch, transport);

        let mut monitor = Self {
            tracker,
            enricher,
            queue,
            sequence: 0,
            released: false,
        };

        info!(session_id = %monitor.session_id(), "Playback monitor created");
        monitor.submit(Event::Initialized {
            mp_version: config.player_version.clone(),
            plugin_version: PLUGIN_VERSION.to_string(),
        });
        monitor
    }

    /// Create a monitor delivering to the transport `config` selects
    pub fn from_config(config: &TelemetryConfig, player: Weak<dyn PlayerHandle>) -> Result<Self> {
        let transport = transport_for(config)?;
        Ok(Self::new(config, player, transport))
    }

    /// Process one player signal.
    ///
    /// Returns the number of events queued for delivery. Signals arriving
    /// after [`release`](Self::release) are ignored.
    pub fn handle(&mut self, signal: PlayerSignal) -> usize {
        if self.released {
            debug!(session_id = %self.session_id(), "Signal after release ignored");
            return 0;
        }

        let events = adapter::translate(&mut self.tracker, signal);
        let count = events.len();
        for event in events {
            self.submit(event);
        }
        count
    }

    /// Emit `Destroy` and drain the dispatch queue.
    ///
    /// Waits at most the configured grace period. Calling it again is a no-op.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.submit(Event::Destroy);
        self.released = true;

        self.queue.release().await;

        let stats = self.queue.stats();
        info!(
            session_id = %self.session_id(),
            delivered = stats.delivered,
            failed = stats.failed,
            dropped = stats.dropped,
            abandoned = stats.abandoned,
            "Playback monitor released"
        );
    }

    pub fn session_id(&self) -> SessionId {
        self.tracker.session().id()
    }

    pub fn state(&self) -> &PlaybackState {
        self.tracker.state()
    }

    pub fn tracker(&self) -> &PlaybackStateTracker {
        &self.tracker
    }

    pub fn stats(&self) -> DispatchStats {
        self.queue.stats()
    }

    /// Handle to the dispatch queue
    pub fn dispatcher(&self) -> EventDispatchQueue {
        self.queue.clone()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn submit(&mut self, event: Event) {
        self.sequence += 1;
        let enriched = self.enricher.enrich(self.tracker.session(), event, self.sequence);

        if let Err(e) = self.queue.enqueue(enriched) {
            warn!(session_id = %self.session_id(), error = %e, "Event not queued");
        }
    }
}

/// Pick the transport for `config`: HTTP when a collector is configured,
/// otherwise log-only
pub fn transport_for(config: &TelemetryConfig) -> Result<Arc<dyn Transport>> {
    match &config.collector_url {
        #[cfg(feature = "http")]
        Some(url) => Ok(Arc::new(HttpTransport::new(
            url.clone(),
            config.request_timeout(),
        )?)),
        #[cfg(not(feature = "http"))]
        Some(url) => {
            warn!(collector = %url, "Built without HTTP support, logging events instead");
            Ok(Arc::new(LogTransport))
        }
        None => Ok(Arc::new(LogTransport)),
    }
}

//! Kino Telemetry - Playback Telemetry for Kino
//!
//! This crate turns the raw lifecycle callbacks of a media player into an
//! ordered stream of semantic telemetry events:
//! - Playback state tracking (play, pause, rebuffer, seek, end)
//! - Stream switch detection on manifest changes
//! - Event enrichment with session and account metadata
//! - Ordered, non-blocking delivery to a collector
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Kino Telemetry                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   PlayerSignal ──► ┌──────────────┐                             │
//! │                    │   Adapter    │                             │
//! │                    └──────┬───────┘                             │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴───────┐  ┌──────────────┐           │
//! │  │    Stream    │◄─┤   Playback   ├─►│   Playback   │           │
//! │  │   Switch     │  │    State     │  │   Session    │           │
//! │  │  Detector    │  │   Tracker    │  │              │           │
//! │  └──────────────┘  └──────┬───────┘  └──────────────┘           │
//! │                           │ Event                               │
//! │                    ┌──────┴───────┐                             │
//! │                    │    Event     │                             │
//! │                    │   Enricher   │                             │
//! │                    └──────┬───────┘                             │
//! │                           │ EnrichedEvent                       │
//! │                    ┌──────┴───────┐  ┌──────────────┐           │
//! │                    │   Dispatch   ├─►│  Transport   │──► HTTP   │
//! │                    │    Queue     │  │  (async)     │           │
//! │                    └──────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`PlaybackMonitor`] wires the pipeline together for one player.

pub mod adapter;
pub mod clock;
pub mod config;
pub mod detector;
pub mod dispatch;
pub mod enricher;
pub mod error;
pub mod event;
pub mod logging;
pub mod monitor;
pub mod session;
pub mod state;
pub mod tracker;
pub mod transport;
pub mod types;

pub use adapter::{LoadEventInfo, PlayerPlaybackState, PlayerSignal};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{DispatchConfig, LogConfig, LogFormat, OverflowPolicy, TelemetryConfig};
pub use detector::StreamSwitchDetector;
pub use dispatch::{DispatchStats, EventDispatchQueue};
pub use enricher::EventEnricher;
pub use error::{Error, Result};
pub use event::{EnrichedEvent, Event, UrlRequestResult};
pub use logging::LogSink;
pub use monitor::PlaybackMonitor;
pub use session::PlaybackSession;
pub use state::{PlaybackState, SeekContext};
pub use tracker::PlaybackStateTracker;
pub use transport::{LogTransport, Transport};
pub use types::*;

#[cfg(feature = "http")]
pub use transport::HttpTransport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin version reported in `Initialized` events
pub const PLUGIN_VERSION: &str = concat!("kino-telemetry-", env!("CARGO_PKG_VERSION"));

/// Announce the library through the installed subscriber
pub fn init() {
    tracing::info!(version = VERSION, "Kino Telemetry initialized");
}

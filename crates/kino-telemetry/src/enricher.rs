//! Event enrichment
//!
//! Stamps a domain event with session metadata right before it is queued:
//! timestamp, account credentials and session id always; player id except on
//! instrumentation lifecycle events; stream id and url except on stream
//! switches, which already carry the identity being replaced.

use crate::clock::Clock;
use crate::event::{EnrichedEvent, Event};
use crate::session::PlaybackSession;
use crate::types::Credentials;
use chrono::DateTime;
use std::sync::Arc;
use tracing::trace;

/// Attaches session-scoped metadata to raw events
pub struct EventEnricher {
    credentials: Credentials,
    clock: Arc<dyn Clock>,
}

impl EventEnricher {
    pub fn new(credentials: Credentials, clock: Arc<dyn Clock>) -> Self {
        Self { credentials, clock }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Build the outgoing record for `event`.
    ///
    /// Empty or unknown metadata is left absent rather than sent as empty
    /// strings; the rest of the event is always produced.
    pub fn enrich(&self, session: &PlaybackSession, event: Event, sequence: u64) -> EnrichedEvent {
        let now_ms = self.clock.now_ms();
        let timestamp = DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default();

        let player_id = if event.carries_player_id() {
            present("player_id", session.player_id())
        } else {
            None
        };

        let (stream_id, url) = match &event {
            Event::StreamSwitch {
                old_url,
                old_stream_id,
                ..
            } => (
                present("stream_id", Some(old_stream_id.as_str())),
                present("url", Some(old_url.as_str())),
            ),
            _ => (
                present("stream_id", session.stream_id()),
                present("url", session.url()),
            ),
        };

        EnrichedEvent {
            sequence,
            timestamp,
            vid: self.credentials.vid.clone(),
            token: self.credentials.token.clone(),
            session_id: session.id(),
            player_id,
            stream_id,
            url,
            event,
        }
    }
}

fn present(field: &'static str, value: Option<&str>) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            trace!(field, "Enrichment field unavailable");
            None
        }
    }
}

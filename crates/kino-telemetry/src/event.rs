//! Playback telemetry events
//!
//! Domain events are produced by the state tracker, the stream switch
//! detector and the load-event adapter. They are immutable once built;
//! enrichment wraps them in an [`EnrichedEvent`] rather than mutating them.

use crate::types::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic playback event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Instrumentation attached to a player
    Initialized {
        mp_version: String,
        plugin_version: String,
    },

    /// Instrumentation detached
    Destroy,

    /// Playback started or resumed
    Play {
        protocol: String,
    },

    /// Playback paused. Position is absent when the player was unavailable.
    Pause {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position_ms: Option<u64>,
    },

    /// A rebuffer after playback had started
    Stuck {
        duration_ms: u64,
    },

    /// Seek started
    Seeking {
        from_position_ms: u64,
        to_position_ms: u64,
    },

    /// Seek completed
    Seeked {
        from_position_ms: u64,
        to_position_ms: u64,
        duration_ms: u64,
    },

    /// Playback reached the end of the media item
    End {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_seconds: Option<u64>,
    },

    /// Player reported an error
    Error {
        message: String,
    },

    /// A media or manifest request finished
    UrlRequest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        result: UrlRequestResult,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost_time_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        download_bytes: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure_reason: Option<String>,
    },

    /// Active rendition changed; carries the identity being replaced
    StreamSwitch {
        old_url: String,
        old_stream_id: String,
        new_stream_id: String,
    },

    /// First video frame reached the screen
    FirstFrameRendered {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost_time_ms: Option<u64>,
    },
}

impl Event {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Event::Initialized { .. } => "initialized",
            Event::Destroy => "destroy",
            Event::Play { .. } => "play",
            Event::Pause { .. } => "pause",
            Event::Stuck { .. } => "stuck",
            Event::Seeking { .. } => "seeking",
            Event::Seeked { .. } => "seeked",
            Event::End { .. } => "end",
            Event::Error { .. } => "error",
            Event::UrlRequest { .. } => "url_request",
            Event::StreamSwitch { .. } => "stream_switch",
            Event::FirstFrameRendered { .. } => "first_frame_rendered",
        }
    }

    /// Whether the event describes a media item. Lifecycle events of the
    /// instrumentation itself precede or outlive any media item.
    pub fn carries_player_id(&self) -> bool {
        !matches!(self, Event::Initialized { .. } | Event::Destroy)
    }
}

/// Outcome of a media request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrlRequestResult {
    Success,
    Cancel,
    Failed,
}

/// Event stamped with session metadata, ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    /// Per-session sequence number, starting at 1
    pub sequence: u64,
    /// Wall-clock time of enrichment
    pub timestamp: DateTime<Utc>,
    /// Account identifier
    pub vid: String,
    /// Account token
    pub token: String,
    /// Session the event belongs to
    pub session_id: SessionId,
    /// Content id of the active media item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    /// Content id of the active rendition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    /// Active playback URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// The event
    #[serde(flatten)]
    pub event: Event,
}

impl EnrichedEvent {
    pub fn name(&self) -> &'static str {
        self.event.name()
    }
}

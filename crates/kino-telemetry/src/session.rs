//! Playback Session - identity and timing of one instrumented player
//!
//! Holds:
//! - Session identity (generated once, never changes)
//! - Media item and rendition identity (player id, stream id, url)
//! - Current lifecycle state
//! - Startup timing used for first-frame and watch-time reporting
//!
//! A session is owned by exactly one [`PlaybackStateTracker`] and only
//! mutated through its transitions and the stream switch detector.
//!
//! [`PlaybackStateTracker`]: crate::tracker::PlaybackStateTracker

use crate::state::PlaybackState;
use crate::types::{content_id, SessionId};
use serde::Serialize;

/// Session-scoped telemetry context
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSession {
    /// Unique session ID
    id: SessionId,
    /// Content id of the active media item URL
    pub(crate) player_id: Option<String>,
    /// Content id of the active rendition base URI
    pub(crate) stream_id: Option<String>,
    /// Current playback URL
    pub(crate) url: Option<String>,
    /// Current lifecycle state
    pub(crate) state: PlaybackState,
    /// Start of the most recent initial buffering (epoch ms)
    pub(crate) first_buffering_at_ms: Option<u64>,
    /// First transition into PLAY since the last end (epoch ms)
    pub(crate) first_play_at_ms: Option<u64>,
}

impl PlaybackSession {
    /// Create a new session with a fresh id
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create a session with a known id
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            player_id: None,
            stream_id: None,
            url: None,
            state: PlaybackState::Init,
            first_buffering_at_ms: None,
            first_play_at_ms: None,
        }
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Get current state
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn first_buffering_at_ms(&self) -> Option<u64> {
        self.first_buffering_at_ms
    }

    pub fn first_play_at_ms(&self) -> Option<u64> {
        self.first_play_at_ms
    }

    /// Adopt a new media item.
    ///
    /// The player id and url follow the new item; the rendition identity is
    /// cleared so the item's first manifest is adopted without a switch.
    pub(crate) fn set_media_item(&mut self, url: &str) {
        self.player_id = Some(content_id(url));
        self.url = Some(url.to_string());
        self.stream_id = None;
    }

    /// Replace the rendition identity
    pub(crate) fn set_stream(&mut self, url: String, stream_id: String) {
        self.url = Some(url);
        self.stream_id = Some(stream_id);
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

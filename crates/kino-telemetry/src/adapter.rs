//! Player signal adapter
//!
//! Translates the player framework's callback surface into the tracker's
//! semantic transitions. Signals the telemetry does not care about are not
//! modelled at all.

use crate::event::{Event, UrlRequestResult};
use crate::tracker::PlaybackStateTracker;
use crate::state::PlaybackState;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Playback state as reported by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPlaybackState {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Why the playback position jumped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscontinuityReason {
    Seek,
    AutoTransition,
    Removal,
    Internal,
}

/// Why the player moved to another media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaItemTransitionReason {
    PlaylistChanged,
    Auto,
    Seek,
    Repeat,
}

/// Details of a single media or manifest load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadEventInfo {
    /// Requested URI, if the player knows it
    pub uri: Option<String>,
    /// Bytes loaded so far
    pub bytes_loaded: u64,
    /// Time spent loading in milliseconds
    pub load_duration_ms: u64,
}

/// Lifecycle notification from the instrumented player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerSignal {
    PlaybackStateChanged {
        state: PlayerPlaybackState,
    },
    IsPlayingChanged {
        is_playing: bool,
    },
    PositionDiscontinuity {
        old_position_ms: u64,
        new_position_ms: u64,
        reason: DiscontinuityReason,
    },
    TimelineChanged {
        #[serde(default)]
        base_uri: Option<String>,
    },
    MediaItemTransition {
        url: String,
        reason: MediaItemTransitionReason,
    },
    RenderedFirstFrame,
    PlayerError {
        message: String,
    },
    LoadStarted {
        info: LoadEventInfo,
    },
    LoadCompleted {
        info: LoadEventInfo,
    },
    LoadCanceled {
        info: LoadEventInfo,
    },
    LoadError {
        info: LoadEventInfo,
        error: String,
        was_canceled: bool,
    },
}

/// Route one player signal through the tracker.
///
/// Returns the events it produced, in emission order.
pub fn translate(tracker: &mut PlaybackStateTracker, signal: PlayerSignal) -> Vec<Event> {
    match signal {
        PlayerSignal::PlaybackStateChanged { state } => {
            debug!(state = ?state, "Playback state changed");
            match state {
                PlayerPlaybackState::Idle => {
                    if matches!(tracker.state(), PlaybackState::Play | PlaybackState::Playing) {
                        tracker.pause()
                    } else {
                        Vec::new()
                    }
                }
                PlayerPlaybackState::Buffering => tracker.buffering(),
                PlayerPlaybackState::Ready => tracker.pause(),
                PlayerPlaybackState::Ended => tracker.ended(),
            }
        }
        PlayerSignal::IsPlayingChanged { is_playing } => {
            debug!(is_playing, "Is playing changed");
            if is_playing {
                tracker.playing()
            } else {
                tracker.pause()
            }
        }
        PlayerSignal::PositionDiscontinuity {
            old_position_ms,
            new_position_ms,
            reason,
        } => {
            if reason == DiscontinuityReason::Seek {
                debug!(from = old_position_ms, to = new_position_ms, "Seek discontinuity");
                tracker.seeking(old_position_ms, new_position_ms)
            } else {
                Vec::new()
            }
        }
        PlayerSignal::TimelineChanged { base_uri } => match base_uri {
            Some(uri) => tracker.manifest_changed(&uri),
            None => Vec::new(),
        },
        PlayerSignal::MediaItemTransition { url, reason } => {
            if reason == MediaItemTransitionReason::PlaylistChanged {
                tracker.media_item_changed(&url);
            }
            Vec::new()
        }
        PlayerSignal::RenderedFirstFrame => tracker.rendered_first_frame(),
        PlayerSignal::PlayerError { message } => tracker.error(message),
        PlayerSignal::LoadStarted { info } => {
            debug!(uri = info.uri.as_deref().unwrap_or_default(), "Load started");
            Vec::new()
        }
        PlayerSignal::LoadCompleted { info } => load_completed(info).into_iter().collect(),
        PlayerSignal::LoadCanceled { info } => load_canceled(info).into_iter().collect(),
        PlayerSignal::LoadError {
            info,
            error,
            was_canceled,
        } => load_error(info, error, was_canceled).into_iter().collect(),
    }
}

fn load_completed(info: LoadEventInfo) -> Option<Event> {
    let Some(url) = valid_uri(info.uri) else {
        warn!("Load completed without a request URI, url_request suppressed");
        return None;
    };

    Some(Event::UrlRequest {
        url: Some(url),
        result: UrlRequestResult::Success,
        cost_time_ms: Some(info.load_duration_ms),
        download_bytes: Some(info.bytes_loaded),
        failure_reason: None,
    })
}

fn load_canceled(info: LoadEventInfo) -> Option<Event> {
    if valid_uri(info.uri).is_none() {
        warn!("Load canceled without a request URI, url_request suppressed");
        return None;
    }

    Some(Event::UrlRequest {
        url: None,
        result: UrlRequestResult::Cancel,
        cost_time_ms: None,
        download_bytes: None,
        failure_reason: None,
    })
}

fn load_error(info: LoadEventInfo, error: String, was_canceled: bool) -> Option<Event> {
    if was_canceled {
        debug!(uri = info.uri.as_deref().unwrap_or_default(), "Load error after cancel ignored");
        return None;
    }

    Some(Event::UrlRequest {
        url: None,
        result: UrlRequestResult::Failed,
        cost_time_ms: None,
        download_bytes: None,
        failure_reason: Some(error),
    })
}

fn valid_uri(uri: Option<String>) -> Option<String> {
    uri.filter(|u| !u.trim().is_empty())
}

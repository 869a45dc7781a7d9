//! Playback lifecycle states
//!
//! Seek and rebuffer bookkeeping lives inside the variants that need it,
//! so a session can never be "seeking" without a seek context or
//! "rebuffering" without a start time.

use serde::{Deserialize, Serialize};

/// Context of a seek that has started but not yet settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekContext {
    /// Position the seek started from (ms)
    pub from_position_ms: u64,
    /// Seek target (ms)
    pub to_position_ms: u64,
    /// Wall-clock time the seek started (epoch ms)
    pub started_at_ms: u64,
}

/// Playback state machine states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing has happened yet
    #[default]
    Init,
    /// Initial pre-roll buffering
    Buffering,
    /// Buffering after playback had started
    Rebuffering {
        started_at_ms: u64,
    },
    /// Playback paused
    Paused,
    /// Play requested, first frame of the resumed run not yet confirmed
    Play,
    /// Steady-state playback
    Playing,
    /// Seek in progress
    Seeking(SeekContext),
    /// Seek completed, waiting for the player to settle
    Seeked,
    /// Playback attempt failed
    Error,
    /// Playback attempt reached the end
    Ended,
}

impl PlaybackState {
    /// True only between a `seeking` transition and its `seeked`
    pub fn is_seeking(&self) -> bool {
        matches!(self, PlaybackState::Seeking(_))
    }

    /// True for states that end the current playback attempt
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Ended | PlaybackState::Error)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlaybackState::Init => "init",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Rebuffering { .. } => "rebuffering",
            PlaybackState::Paused => "paused",
            PlaybackState::Play => "play",
            PlaybackState::Playing => "playing",
            PlaybackState::Seeking(_) => "seeking",
            PlaybackState::Seeked => "seeked",
            PlaybackState::Error => "error",
            PlaybackState::Ended => "ended",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeking_flag_follows_variant() {
        let ctx = SeekContext {
            from_position_ms: 0,
            to_position_ms: 1_000,
            started_at_ms: 5,
        };
        assert!(PlaybackState::Seeking(ctx).is_seeking());
        assert!(!PlaybackState::Seeked.is_seeking());
        assert!(!PlaybackState::Playing.is_seeking());
    }

    #[test]
    fn test_terminal_states() {
        assert!(PlaybackState::Ended.is_terminal());
        assert!(PlaybackState::Error.is_terminal());
        assert!(!PlaybackState::Paused.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(PlaybackState::default().to_string(), "init");
        assert_eq!(
            PlaybackState::Rebuffering { started_at_ms: 1 }.to_string(),
            "rebuffering"
        );
    }
}

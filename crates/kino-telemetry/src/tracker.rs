//! Playback state tracker
//!
//! Collapses the raw, often redundant lifecycle notifications of a player
//! into semantic telemetry events. A seek, for instance, arrives from the
//! player as discontinuity + pause + buffering + ready, but must be reported
//! as exactly one `Seeking` and one `Seeked`.
//!
//! Transitions take `&mut self`: callbacks for one session are serialized by
//! the caller and the tracker does no locking of its own.

use crate::clock::Clock;
use crate::detector::StreamSwitchDetector;
use crate::event::Event;
use crate::session::PlaybackSession;
use crate::state::{PlaybackState, SeekContext};
use crate::types::PlayerHandle;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// Default streaming protocol reported in `Play` events
pub const DEFAULT_PROTOCOL: &str = "hls";

/// Finite-state machine over playback lifecycle signals
pub struct PlaybackStateTracker {
    /// Session context, owned exclusively by the tracker
    session: PlaybackSession,
    /// Time source
    clock: Arc<dyn Clock>,
    /// Instrumented player, if still alive
    player: Option<Weak<dyn PlayerHandle>>,
    /// Rendition change detection
    detector: StreamSwitchDetector,
    /// Protocol name for `Play` events
    protocol: String,
    /// Events produced by the transition in progress
    pending: Vec<Event>,
}

impl PlaybackStateTracker {
    /// Create a tracker for a fresh session
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_session(PlaybackSession::new(), clock)
    }

    /// Create a tracker around an existing session
    pub fn with_session(session: PlaybackSession, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            clock,
            player: None,
            detector: StreamSwitchDetector::new(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            pending: Vec::new(),
        }
    }

    /// Attach the instrumented player
    pub fn with_player(mut self, player: Weak<dyn PlayerHandle>) -> Self {
        self.player = Some(player);
        self
    }

    /// Set the protocol reported in `Play` events
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Get current state
    pub fn state(&self) -> &PlaybackState {
        &self.session.state
    }

    /// The player, if it has not been torn down
    pub fn player(&self) -> Option<Arc<dyn PlayerHandle>> {
        self.player.as_ref().and_then(Weak::upgrade)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Player started buffering.
    ///
    /// Initial buffering is recorded but not reported; buffering while
    /// playing starts a rebuffer, which is reported as `Stuck` when it ends.
    pub fn buffering(&mut self) -> Vec<Event> {
        self.on_buffering();
        self.take()
    }

    /// Player paused, or a seek settled.
    pub fn pause(&mut self) -> Vec<Event> {
        self.on_pause();
        self.take()
    }

    /// Playback requested.
    pub fn play(&mut self) -> Vec<Event> {
        self.on_play();
        self.take()
    }

    /// Player is actually rendering.
    pub fn playing(&mut self) -> Vec<Event> {
        self.on_playing();
        self.take()
    }

    /// A seek from `from_position_ms` to `to_position_ms` started.
    pub fn seeking(&mut self, from_position_ms: u64, to_position_ms: u64) -> Vec<Event> {
        self.on_seeking(from_position_ms, to_position_ms);
        self.take()
    }

    /// The seek in progress completed.
    pub fn seeked(&mut self) -> Vec<Event> {
        self.on_seeked();
        self.take()
    }

    /// Playback reached the end.
    pub fn ended(&mut self) -> Vec<Event> {
        self.on_ended();
        self.take()
    }

    /// Player reported an error. Never changes state.
    pub fn error(&mut self, message: impl Into<String>) -> Vec<Event> {
        self.pending.push(Event::Error {
            message: message.into(),
        });
        self.take()
    }

    /// First video frame was rendered.
    pub fn rendered_first_frame(&mut self) -> Vec<Event> {
        let cost_time_ms = self
            .session
            .first_buffering_at_ms
            .map(|started| self.clock.now_ms().saturating_sub(started));
        if cost_time_ms.is_none() {
            debug!(session_id = %self.session.id(), "First frame before any buffering");
        }
        self.pending.push(Event::FirstFrameRendered { cost_time_ms });
        self.take()
    }

    /// Player reported a new manifest/timeline with `base_uri`.
    pub fn manifest_changed(&mut self, base_uri: &str) -> Vec<Event> {
        if let Some(event) = self.detector.observe(&mut self.session, base_uri) {
            self.pending.push(event);
        }
        self.take()
    }

    /// Player moved to a new media item.
    ///
    /// The session id is kept; an ended or failed attempt restarts at INIT.
    pub fn media_item_changed(&mut self, url: &str) {
        self.session.set_media_item(url);
        if self.session.state.is_terminal() {
            self.set_state(PlaybackState::Init);
            self.session.first_buffering_at_ms = None;
        }
        debug!(
            session_id = %self.session.id(),
            player_id = self.session.player_id().unwrap_or_default(),
            "Media item changed"
        );
    }

    // =========================================================================
    // Transition bodies
    // =========================================================================

    fn on_buffering(&mut self) {
        match self.session.state {
            PlaybackState::Rebuffering { .. }
            | PlaybackState::Seeking(_)
            | PlaybackState::Seeked => {
                trace!(state = %self.session.state, "Buffering suppressed");
            }
            PlaybackState::Playing => self.rebuffering_started(),
            _ => {
                self.set_state(PlaybackState::Buffering);
                self.session.first_buffering_at_ms = Some(self.clock.now_ms());
            }
        }
    }

    fn on_pause(&mut self) {
        match self.session.state {
            PlaybackState::Seeked => {
                trace!("Pause after seek suppressed");
                return;
            }
            PlaybackState::Rebuffering { started_at_ms } => self.rebuffering_ended(started_at_ms),
            PlaybackState::Seeking(_) => {
                self.on_seeked();
                return;
            }
            _ => {}
        }

        self.set_state(PlaybackState::Paused);

        let position_ms = match self.player() {
            Some(player) => Some(player.current_position_ms()),
            None => {
                debug!(session_id = %self.session.id(), "Player unavailable, pause without position");
                None
            }
        };
        self.pending.push(Event::Pause { position_ms });
    }

    fn on_play(&mut self) {
        if matches!(
            self.session.state,
            PlaybackState::Rebuffering { .. } | PlaybackState::Seeking(_) | PlaybackState::Seeked
        ) {
            trace!(state = %self.session.state, "Play suppressed");
            return;
        }

        self.set_state(PlaybackState::Play);
        if self.session.first_play_at_ms.is_none() {
            self.session.first_play_at_ms = Some(self.clock.now_ms());
        }
        self.pending.push(Event::Play {
            protocol: self.protocol.clone(),
        });
    }

    fn on_playing(&mut self) {
        match self.session.state {
            PlaybackState::Seeking(_) => {
                trace!("Playing during seek suppressed");
                return;
            }
            PlaybackState::Paused => self.on_play(),
            PlaybackState::Rebuffering { started_at_ms } => self.rebuffering_ended(started_at_ms),
            _ => {}
        }

        self.set_state(PlaybackState::Playing);
    }

    /// The implicit pause reports the seek origin as its position: by the
    /// time the discontinuity arrives the player already sits at the target.
    fn on_seeking(&mut self, from_position_ms: u64, to_position_ms: u64) {
        if self.session.state == PlaybackState::Playing {
            self.pending.push(Event::Pause {
                position_ms: Some(from_position_ms),
            });
        }

        self.set_state(PlaybackState::Seeking(SeekContext {
            from_position_ms,
            to_position_ms,
            started_at_ms: self.clock.now_ms(),
        }));
        self.pending.push(Event::Seeking {
            from_position_ms,
            to_position_ms,
        });
    }

    fn on_seeked(&mut self) {
        let PlaybackState::Seeking(ctx) = self.session.state else {
            debug!(state = %self.session.state, "Seeked without a seek in progress");
            return;
        };

        self.pending.push(Event::Seeked {
            from_position_ms: ctx.from_position_ms,
            to_position_ms: ctx.to_position_ms,
            duration_ms: self.clock.now_ms().saturating_sub(ctx.started_at_ms),
        });
        self.set_state(PlaybackState::Seeked);
    }

    fn on_ended(&mut self) {
        let duration_seconds = self
            .session
            .first_play_at_ms
            .map(|started| self.clock.now_ms().saturating_sub(started) / 1000);

        self.pending.push(Event::End { duration_seconds });
        self.session.first_play_at_ms = None;
        self.set_state(PlaybackState::Ended);
    }

    fn rebuffering_started(&mut self) {
        self.set_state(PlaybackState::Rebuffering {
            started_at_ms: self.clock.now_ms(),
        });
    }

    fn rebuffering_ended(&mut self, started_at_ms: u64) {
        self.pending.push(Event::Stuck {
            duration_ms: self.clock.now_ms().saturating_sub(started_at_ms),
        });
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.session.state != state {
            trace!(from = %self.session.state, to = %state, "State transition");
        }
        self.session.state = state;
    }

    fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.pending)
    }
}

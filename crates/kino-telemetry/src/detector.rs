//! Stream switch detection
//!
//! Compares the rendition the player reports in a new manifest/timeline
//! against the session's current stream identity. A switch is reported with
//! the identity being replaced, then the session moves to the new one.

use crate::event::Event;
use crate::session::PlaybackSession;
use crate::types::content_id;
use tracing::debug;

/// Detects rendition changes from manifest base URIs
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamSwitchDetector;

impl StreamSwitchDetector {
    pub fn new() -> Self {
        Self
    }

    /// Observe a manifest base URI.
    ///
    /// Returns a `StreamSwitch` event only when the session already had a
    /// stream identity and the new URI hashes to a different one.
    pub fn observe(&self, session: &mut PlaybackSession, base_uri: &str) -> Option<Event> {
        if base_uri.is_empty() {
            debug!(session_id = %session.id(), "Manifest without base URI ignored");
            return None;
        }

        let new_stream_id = content_id(base_uri);

        let Some(old_stream_id) = session.stream_id.clone() else {
            debug!(
                session_id = %session.id(),
                stream_id = %new_stream_id,
                url = base_uri,
                "Initial stream identity adopted"
            );
            session.set_stream(base_uri.to_string(), new_stream_id);
            return None;
        };

        if old_stream_id == new_stream_id {
            return None;
        }

        let old_url = session.url.clone().unwrap_or_default();
        debug!(
            session_id = %session.id(),
            from = %old_stream_id,
            to = %new_stream_id,
            "Stream switch"
        );

        let event = Event::StreamSwitch {
            old_url,
            old_stream_id,
            new_stream_id: new_stream_id.clone(),
        };
        session.set_stream(base_uri.to_string(), new_stream_id);

        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "https://cdn.example.com/720p/index.m3u8";
    const B: &str = "https://cdn.example.com/1080p/index.m3u8";

    #[test]
    fn test_first_observation_is_silent() {
        let mut session = PlaybackSession::new();
        let detector = StreamSwitchDetector::new();

        assert!(detector.observe(&mut session, A).is_none());
        assert_eq!(session.url(), Some(A));
        assert_eq!(session.stream_id(), Some(content_id(A).as_str()));
    }

    #[test]
    fn test_switch_reports_previous_identity() {
        let mut session = PlaybackSession::new();
        let detector = StreamSwitchDetector::new();
        detector.observe(&mut session, A);

        let event = detector.observe(&mut session, B).unwrap();

        assert_eq!(
            event,
            Event::StreamSwitch {
                old_url: A.to_string(),
                old_stream_id: content_id(A),
                new_stream_id: content_id(B),
            }
        );
        assert_eq!(session.url(), Some(B));
        assert_eq!(session.stream_id(), Some(content_id(B).as_str()));
    }

    #[test]
    fn test_repeated_uri_is_idempotent() {
        let mut session = PlaybackSession::new();
        let detector = StreamSwitchDetector::new();
        detector.observe(&mut session, A);

        let switches = [B, B, B]
            .iter()
            .filter_map(|uri| detector.observe(&mut session, uri))
            .count();

        assert_eq!(switches, 1);
    }

    #[test]
    fn test_empty_uri_ignored() {
        let mut session = PlaybackSession::new();
        let detector = StreamSwitchDetector::new();
        detector.observe(&mut session, A);

        assert!(detector.observe(&mut session, "").is_none());
        assert_eq!(session.url(), Some(A));
    }
}

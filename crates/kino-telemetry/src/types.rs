//! Core types for Kino Telemetry

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an instrumented player instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account credentials attached to every outgoing event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Customer account identifier
    pub vid: String,
    /// Access token issued for the account
    pub token: String,
}

impl Credentials {
    pub fn new(vid: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            vid: vid.into(),
            token: token.into(),
        }
    }
}

/// Stable content-derived identifier for a URL (lowercase hex MD5).
///
/// Used for both player ids (media item URL) and stream ids (rendition
/// base URI), so the same input always maps to the same id across sessions.
pub fn content_id(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Live view of the instrumented player.
///
/// The tracker only ever holds a weak reference to the player; the
/// player may be torn down while telemetry is still draining.
pub trait PlayerHandle: Send + Sync {
    /// Current playback position in milliseconds
    fn current_position_ms(&self) -> u64;
}

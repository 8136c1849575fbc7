//! Playback-related type definitions

use serde::{Deserialize, Serialize};

/// Lifecycle status of a multi-event channel
///
/// Transitions:
/// - `Ready` → `Playing` (play)
/// - `Playing` → `Paused` (pause) / `Finished` (queue exhausted) / `Ready` (stop)
/// - `Paused` / `Finished` → `Playing` (play)
/// - any → `Reposition` → previous status (during a seek)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Initialized and parked at a position, not playing
    #[default]
    Ready,
    /// Playback loop running
    Playing,
    /// Playback loop stopped, position retained
    Paused,
    /// A seek is rebuilding the dispatch queue
    Reposition,
    /// All events dispatched
    Finished,
}

impl PlaybackStatus {
    /// True while the playback loop is expected to be running
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackStatus::Playing)
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Ready => write!(f, "ready"),
            PlaybackStatus::Playing => write!(f, "playing"),
            PlaybackStatus::Paused => write!(f, "paused"),
            PlaybackStatus::Reposition => write!(f, "reposition"),
            PlaybackStatus::Finished => write!(f, "finished"),
        }
    }
}

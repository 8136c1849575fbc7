//! Event types for hitmix notifications
//!
//! Channels publish these over a `tokio::sync::broadcast` channel; consumers
//! (UI, a reference-channel follower, recorders) subscribe as needed.

mod playback_types;

pub use playback_types::PlaybackStatus;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notifications published by a playback channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HitmixEvent {
    /// Playback position update
    ///
    /// Published once per loop iteration while playing (`discrete == false`)
    /// and once after every lifecycle transition or seek (`discrete == true`).
    PositionChanged {
        /// Channel that published the update
        channel_id: Uuid,
        /// Clock position in milliseconds
        position_ms: f64,
        /// True for jumps (play, pause, seek), false for routine ticks
        discrete: bool,
        /// When the update was published
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Lifecycle status changed
    StatusChanged {
        /// Channel whose status changed
        channel_id: Uuid,
        /// Status before the change
        old_status: PlaybackStatus,
        /// Status after the change
        new_status: PlaybackStatus,
        /// When the status changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl HitmixEvent {
    /// Channel that published this event
    pub fn channel_id(&self) -> Uuid {
        match self {
            HitmixEvent::PositionChanged { channel_id, .. }
            | HitmixEvent::StatusChanged { channel_id, .. } => *channel_id,
        }
    }

    /// Event type name as used in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            HitmixEvent::PositionChanged { .. } => "PositionChanged",
            HitmixEvent::StatusChanged { .. } => "StatusChanged",
        }
    }
}

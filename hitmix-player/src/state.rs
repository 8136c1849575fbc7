//! Shared channel state
//!
//! Status and the notification channel, shared between the engine's control
//! methods and its background playback loop.

use hitmix_common::events::{HitmixEvent, PlaybackStatus};
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use uuid::Uuid;

/// State shared by every component of one channel
pub struct SharedState {
    /// Identity stamped on every published event
    channel_id: Uuid,

    /// Lifecycle status
    status: RwLock<PlaybackStatus>,

    /// Notification broadcaster
    event_tx: broadcast::Sender<HitmixEvent>,
}

impl SharedState {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            channel_id: Uuid::new_v4(),
            status: RwLock::new(PlaybackStatus::Ready),
            event_tx,
        }
    }

    pub fn channel_id(&self) -> Uuid {
        self.channel_id
    }

    /// Publish to all subscribers
    pub fn broadcast_event(&self, event: HitmixEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<HitmixEvent> {
        self.event_tx.subscribe()
    }

    pub async fn status(&self) -> PlaybackStatus {
        *self.status.read().await
    }

    /// Set status, publishing `StatusChanged` when it actually changes
    ///
    /// Returns the previous status.
    pub async fn set_status(&self, new_status: PlaybackStatus) -> PlaybackStatus {
        let old_status = {
            let mut status = self.status.write().await;
            std::mem::replace(&mut *status, new_status)
        };

        if old_status != new_status {
            info!("Channel status: {} -> {}", old_status, new_status);
            self.broadcast_event(HitmixEvent::StatusChanged {
                channel_id: self.channel_id,
                old_status,
                new_status,
                timestamp: hitmix_common::time::now(),
            });
        }
        old_status
    }

    /// Publish a position update
    pub fn publish_position(&self, position_ms: f64, discrete: bool) {
        self.broadcast_event(HitmixEvent::PositionChanged {
            channel_id: self.channel_id,
            position_ms,
            discrete,
            timestamp: hitmix_common::time::now(),
        });
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(256)
    }
}

//! Mixing orchestrator
//!
//! Turns dispatched timeline events into mixing-graph operations on the
//! channel's bus:
//!
//! | Control            | Effect                                                   |
//! |--------------------|----------------------------------------------------------|
//! | `OneShot`          | attach a `SampleNode`, remember it for a later release   |
//! | `StopSustained`    | detach the remembered node, re-attach it under a fade    |
//! | `StartSustained`   | replace the sustained sounds with a new looping pair     |
//! | `StopAllSustained` | detach both sustained sounds                             |
//! | `ChangeBalance`    | set the live balance of the category's sustained sound   |
//! | `ChangeVolume`     | set the live volume of the category's sustained sound    |
//!
//! At most one sustained pair exists per `SustainCategory`.

use crate::audio::cache::SoundResolver;
use crate::audio::types::AudioBuffer;
use crate::error::{Error, Result};
use crate::playback::events::{ControlKind, EventId, ScheduledEvent, SoundKey, SustainCategory};
use crate::playback::fader::FadeOutNode;
use crate::playback::mixer::{MixingBus, NodeId};
use crate::playback::nodes::{BalanceNode, LoopStream, Param, SampleNode, VolumeNode};
use hitmix_common::FadeCurve;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Release envelope for stopped sustained nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleaseEnvelope {
    pub frames: usize,
    pub curve: FadeCurve,
}

/// A live sustained sound: loop → balance → volume, attached as one node
#[derive(Debug)]
struct SustainedPair {
    node: NodeId,
    sound: SoundKey,
    volume: Param,
    balance: Param,
}

/// Applies dispatched events to the channel's mixing bus
pub struct MixingOrchestrator {
    bus: Arc<dyn MixingBus>,
    resolver: Arc<dyn SoundResolver>,

    /// Multiplier applied to every event balance
    balance_factor: Param,

    release: ReleaseEnvelope,

    /// Nodes started by one-shots, keyed by the companion that releases them
    active: Mutex<HashMap<EventId, NodeId>>,

    /// Indexed by `SustainCategory::index()`
    sustained: Mutex<[Option<SustainedPair>; 2]>,
}

impl MixingOrchestrator {
    pub fn new(
        bus: Arc<dyn MixingBus>,
        resolver: Arc<dyn SoundResolver>,
        balance_factor: f32,
        release: ReleaseEnvelope,
    ) -> Self {
        Self {
            bus,
            resolver,
            balance_factor: Param::new(balance_factor),
            release,
            active: Mutex::new(HashMap::new()),
            sustained: Mutex::new([None, None]),
        }
    }

    pub fn balance_factor(&self) -> f32 {
        self.balance_factor.get()
    }

    /// Applies to sounds started afterwards and to later balance changes
    pub fn set_balance_factor(&self, factor: f32) {
        self.balance_factor.set(factor);
    }

    fn active(&self) -> MutexGuard<'_, HashMap<EventId, NodeId>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sustained(&self) -> MutexGuard<'_, [Option<SustainedPair>; 2]> {
        self.sustained.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn effective_balance(&self, balance: f32) -> f32 {
        balance * self.balance_factor.get()
    }

    /// Dispatch one event, logging instead of propagating failures
    pub async fn handle(&self, event: &ScheduledEvent) {
        if let Err(e) = self.dispatch(event).await {
            warn!(
                "Failed to dispatch {} event {} at {:.1}ms (sound {}): {}",
                event.control(),
                event.id,
                event.offset(),
                event.event.sound_label(),
                e
            );
        }
    }

    /// Apply one event to the bus
    pub async fn dispatch(&self, event: &ScheduledEvent) -> Result<()> {
        debug!(
            "Dispatch {} {} at {:.1}ms ({})",
            event.id,
            event.control(),
            event.offset(),
            event.event.sound_label()
        );

        match event.control() {
            ControlKind::OneShot => self.start_one_shot(event).await,
            ControlKind::StopSustained => {
                self.release(event.id);
                Ok(())
            }
            ControlKind::StartSustained => self.start_sustained(event).await,
            ControlKind::StopAllSustained => {
                self.stop_all_sustained();
                Ok(())
            }
            ControlKind::ChangeBalance => {
                let balance = self.effective_balance(event.event.balance);
                if let Some(pair) = &self.sustained()[event.event.category.index()] {
                    pair.balance.set(balance);
                }
                Ok(())
            }
            ControlKind::ChangeVolume => {
                if let Some(pair) = &self.sustained()[event.event.category.index()] {
                    pair.volume.set(event.event.volume);
                }
                Ok(())
            }
        }
    }

    /// Cached content first, then a full resolve
    async fn content(&self, key: &SoundKey) -> Result<Option<Arc<AudioBuffer>>> {
        if let Some(buffer) = self.resolver.cached(key) {
            return Ok(Some(buffer));
        }
        self.resolver.resolve(key).await
    }

    async fn start_one_shot(&self, event: &ScheduledEvent) -> Result<()> {
        let key = event
            .event
            .sound
            .as_ref()
            .ok_or_else(|| Error::InvalidInput(format!("One-shot {} has no sound", event.id)))?;

        let buffer = self
            .content(key)
            .await?
            .ok_or_else(|| Error::SoundNotFound(key.to_string()))?;

        let node = SampleNode::new(
            buffer,
            event.event.volume,
            self.effective_balance(event.event.balance),
        );
        let node_id = self.bus.add_node(Box::new(node));

        // only a companion release ever looks the node up again
        if let Some(companion) = event.companion_id {
            self.active().insert(companion, node_id);
        }
        Ok(())
    }

    /// Fade out the node recorded under `id`, if any
    fn release(&self, id: EventId) {
        let Some(node_id) = self.active().remove(&id) else {
            debug!("Nothing to release for {}", id);
            return;
        };

        match self.bus.remove_node(node_id) {
            Some(node) => {
                let faded = FadeOutNode::new(node, self.release.frames, self.release.curve);
                self.bus.add_node(Box::new(faded));
            }
            None => debug!("{} already ended before release", node_id),
        }
    }

    async fn start_sustained(&self, event: &ScheduledEvent) -> Result<()> {
        self.stop_all_sustained();

        let Some(key) = event.event.sound.as_ref() else {
            debug!("Sustained start {} has no sound, skipping", event.id);
            return Ok(());
        };
        let Some(buffer) = self.content(key).await? else {
            debug!("No content for sustained sound {}, skipping", key);
            return Ok(());
        };

        let volume = Param::new(event.event.volume);
        let balance = Param::new(self.effective_balance(event.event.balance));
        let chain = VolumeNode::new(
            Box::new(BalanceNode::new(
                Box::new(LoopStream::new(buffer)),
                balance.clone(),
            )),
            volume.clone(),
        );
        let node = self.bus.add_node(Box::new(chain));

        let category = event.event.category;
        let previous = self.sustained()[category.index()].replace(SustainedPair {
            node,
            sound: key.clone(),
            volume,
            balance,
        });
        // another start may have landed while content was resolving
        if let Some(stale) = previous {
            self.bus.remove_node(stale.node);
        }
        Ok(())
    }

    /// Detach both sustained sounds (idempotent)
    pub fn stop_all_sustained(&self) {
        let taken: Vec<SustainedPair> = self
            .sustained()
            .iter_mut()
            .filter_map(Option::take)
            .collect();

        for pair in taken {
            debug!("Stopping sustained sound {} ({})", pair.sound, pair.node);
            self.bus.remove_node(pair.node);
        }
    }

    /// Tear down sustained sounds and forget released-node bookkeeping
    pub fn reset(&self) {
        self.stop_all_sustained();
        self.active().clear();
    }

    pub fn is_sustaining(&self, category: SustainCategory) -> bool {
        self.sustained()[category.index()].is_some()
    }

    /// Number of live sustained sounds
    pub fn sustained_count(&self) -> usize {
        self.sustained().iter().filter(|slot| slot.is_some()).count()
    }

    /// Sound currently sustained in `category`
    pub fn sustained_sound(&self, category: SustainCategory) -> Option<SoundKey> {
        self.sustained()[category.index()]
            .as_ref()
            .map(|pair| pair.sound.clone())
    }

    /// Live (volume, balance) of the sustained sound in `category`
    pub fn sustained_params(&self, category: SustainCategory) -> Option<(f32, f32)> {
        self.sustained()[category.index()]
            .as_ref()
            .map(|pair| (pair.volume.get(), pair.balance.get()))
    }
}

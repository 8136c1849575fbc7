//! Core playback engine: construction, shared handles, observables, disposal
//!
//! **Responsibilities:**
//! - PlaybackEngine struct definition and initialization
//! - Lazy timeline construction and dispatch queue rebuilds
//! - Read-only observables (status, position, duration)
//! - Disposal (detaching the channel from the root graph)
//!
//! Lifecycle control lives in `playback.rs`, seeking and clock adjustment in
//! `seek.rs`.

use crate::audio::cache::{prewarm, SoundResolver};
use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use crate::playback::clock::{SystemTimeSource, TimeSource, VariableClock};
use crate::playback::mixer::{Mixer, MixingBus, NodeId, RootGraph};
use crate::playback::nodes::{AudioNode, Param, VolumeNode};
use crate::playback::orchestrator::MixingOrchestrator;
use crate::playback::source::EventSource;
use crate::playback::timeline::{DispatchQueue, Timeline};
use crate::state::SharedState;
use hitmix_common::events::{HitmixEvent, PlaybackStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock as StdRwLock};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, watch, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// A channel's own mixing bus and the node that renders it
///
/// `output` is wrapped in the channel's master volume and attached to the
/// root graph; `bus` receives the sound nodes.
pub struct ChannelBus {
    pub bus: Arc<dyn MixingBus>,
    pub output: Box<dyn AudioNode>,
}

impl ChannelBus {
    /// A software `Mixer` used as the channel bus
    pub fn mixer(sample_rate: u32) -> Self {
        Mixer::new(sample_rate).into()
    }
}

impl From<Mixer> for ChannelBus {
    fn from(mixer: Mixer) -> Self {
        Self {
            output: mixer.submix(),
            bus: Arc::new(mixer),
        }
    }
}

/// One running playback loop
pub(super) struct LoopSession {
    pub(super) cancel_tx: watch::Sender<bool>,
    pub(super) handle: JoinHandle<()>,
}

/// Multi-event sound channel
///
/// Owns the clock, the lazily built timeline and the current dispatch
/// queue, and drives a `MixingOrchestrator` from a background loop.
pub struct PlaybackEngine {
    /// Status and notifications
    pub(super) state: Arc<SharedState>,

    pub(super) clock: Arc<VariableClock>,

    /// Supplies events once, on first queue build
    pub(super) source: Arc<dyn EventSource>,

    pub(super) resolver: Arc<dyn SoundResolver>,

    pub(super) orchestrator: Arc<MixingOrchestrator>,

    /// Graph the channel output is attached to
    pub(super) root: Arc<dyn RootGraph>,

    /// Channel output node in `root`; `None` once disposed
    pub(super) root_node: Arc<StdMutex<Option<NodeId>>>,

    pub(super) master_volume: Param,

    /// Built once, kept for the engine's lifetime
    pub(super) timeline: Arc<OnceCell<Arc<Timeline>>>,

    /// Current dispatch queue, replaced wholesale on rebuild
    pub(super) queue: Arc<StdRwLock<Arc<DispatchQueue>>>,

    /// Excludes seeks from an in-flight dispatch batch
    pub(super) seek_lock: Arc<Mutex<()>>,

    /// Active playback loop, if any
    pub(super) session: Arc<Mutex<Option<LoopSession>>>,

    pub(super) disposed: Arc<AtomicBool>,

    /// Loop sleep between dispatch passes
    pub(super) loop_quantum: Duration,

    /// Concurrent loads during `initialize` (0 = available cores)
    pub(super) prewarm_concurrency: usize,
}

impl PlaybackEngine {
    /// Create an engine and attach its output to `root`
    pub fn new(
        config: &PlayerConfig,
        source: Arc<dyn EventSource>,
        resolver: Arc<dyn SoundResolver>,
        root: Arc<dyn RootGraph>,
        channel: ChannelBus,
        time_source: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(SharedState::new(config.event_channel_capacity));
        info!("Creating playback engine for channel {}", state.channel_id());

        let orchestrator = Arc::new(MixingOrchestrator::new(
            channel.bus,
            Arc::clone(&resolver),
            config.balance_factor,
            config.release_envelope(),
        ));

        let master_volume = Param::new(config.master_volume);
        let root_node = root.add_root_node(Box::new(VolumeNode::new(
            channel.output,
            master_volume.clone(),
        )));
        debug!("Channel output attached to root graph as {}", root_node);

        Ok(Self {
            state,
            clock: Arc::new(VariableClock::new(time_source)),
            source,
            resolver,
            orchestrator,
            root,
            root_node: Arc::new(StdMutex::new(Some(root_node))),
            master_volume,
            timeline: Arc::new(OnceCell::new()),
            queue: Arc::new(StdRwLock::new(Arc::new(DispatchQueue::empty()))),
            seek_lock: Arc::new(Mutex::new(())),
            session: Arc::new(Mutex::new(None)),
            disposed: Arc::new(AtomicBool::new(false)),
            loop_quantum: config.loop_quantum(),
            prewarm_concurrency: config.prewarm_concurrency,
        })
    }

    /// Engine with a software channel mixer and the system clock
    pub fn with_mixer(
        config: &PlayerConfig,
        source: Arc<dyn EventSource>,
        resolver: Arc<dyn SoundResolver>,
        root: Arc<dyn RootGraph>,
    ) -> Result<Self> {
        Self::new(
            config,
            source,
            resolver,
            root,
            ChannelBus::mixer(config.sample_rate),
            Arc::new(SystemTimeSource::new()),
        )
    }

    /// Build the timeline, pre-load its sounds and park at position 0
    pub async fn initialize(&self) -> Result<()> {
        self.ensure_live()?;
        let started = Instant::now();

        let timeline = self.ensure_timeline().await?;
        let keys = timeline.sound_keys();
        info!(
            "Initializing channel: {} events, {} distinct sounds",
            timeline.len(),
            keys.len()
        );
        prewarm(self.resolver.as_ref(), keys, self.prewarm_concurrency).await;

        self.clock.seek(0.0);
        self.rebuild_queue(0.0).await?;
        self.state.set_status(PlaybackStatus::Ready).await;
        self.state.publish_position(0.0, true);

        info!(
            "Channel ready in {:.2}ms (duration {:.0}ms)",
            started.elapsed().as_secs_f64() * 1000.0,
            self.duration()
        );
        Ok(())
    }

    /// The timeline, fetching events from the source on first use
    pub(super) async fn ensure_timeline(&self) -> Result<Arc<Timeline>> {
        let timeline = self
            .timeline
            .get_or_try_init(|| async {
                let events = self.source.sound_events().await?;
                debug!("Building timeline from {} source events", events.len());
                Ok::<_, Error>(Arc::new(Timeline::build(events)))
            })
            .await?;
        Ok(Arc::clone(timeline))
    }

    /// Replace the dispatch queue with one starting at `from_ms`
    pub(super) async fn rebuild_queue(&self, from_ms: f64) -> Result<()> {
        let timeline = self.ensure_timeline().await?;
        let queue = Arc::new(DispatchQueue::starting_at(timeline, from_ms));
        debug!("Dispatch queue rebuilt at {:.1}ms: {} events", from_ms, queue.len());
        *self.queue.write().unwrap_or_else(PoisonError::into_inner) = queue;
        Ok(())
    }

    pub(super) fn current_queue(&self) -> Arc<DispatchQueue> {
        Arc::clone(&self.queue.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(super) fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(Error::InvalidState("Channel has been disposed".to_string()));
        }
        Ok(())
    }

    pub fn channel_id(&self) -> Uuid {
        self.state.channel_id()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HitmixEvent> {
        self.state.subscribe_events()
    }

    pub async fn status(&self) -> PlaybackStatus {
        self.state.status().await
    }

    /// Clock position in milliseconds
    pub fn position(&self) -> f64 {
        self.clock.elapsed_ms()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Total length including the ring-out of trailing sounds; 0 before
    /// the timeline is built
    pub fn duration(&self) -> f64 {
        match self.timeline.get() {
            Some(timeline) => timeline.duration(|event| {
                event
                    .event
                    .sound
                    .as_ref()
                    .and_then(|key| self.resolver.cached(key))
                    .map(|buffer| buffer.duration_ms())
            }),
            None => 0.0,
        }
    }

    /// Events still waiting to be dispatched
    pub fn pending_events(&self) -> usize {
        self.current_queue().len()
    }

    pub fn clock(&self) -> &VariableClock {
        &self.clock
    }

    pub fn orchestrator(&self) -> &MixingOrchestrator {
        &self.orchestrator
    }

    /// Stop playback, drop sustained sounds and detach from the root graph
    ///
    /// Further lifecycle calls fail with `InvalidState`. Idempotent.
    pub async fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("Disposing channel {}", self.channel_id());

        self.cancel_loop().await;
        self.clock.stop();
        self.orchestrator.reset();

        let node = self
            .root_node
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(node) = node {
            self.root.remove_root_node(node);
            debug!("Channel output {} detached from root graph", node);
        }
        Ok(())
    }

    /// Clone the engine's handles for the background loop
    pub(super) fn clone_handles(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
            source: Arc::clone(&self.source),
            resolver: Arc::clone(&self.resolver),
            orchestrator: Arc::clone(&self.orchestrator),
            root: Arc::clone(&self.root),
            root_node: Arc::clone(&self.root_node),
            master_volume: self.master_volume.clone(),
            timeline: Arc::clone(&self.timeline),
            queue: Arc::clone(&self.queue),
            seek_lock: Arc::clone(&self.seek_lock),
            session: Arc::clone(&self.session),
            disposed: Arc::clone(&self.disposed),
            loop_quantum: self.loop_quantum,
            prewarm_concurrency: self.prewarm_concurrency,
        }
    }
}

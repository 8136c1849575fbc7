//! Test helpers for hitmix-player integration tests
//!
//! - `RecordingBus`: mixing bus spy over a real `Mixer`
//! - `MemoryResolver`: in-memory sound content
//! - `audio_generator`: synthetic buffers and WAV files
//! - `TestChannel`: an engine wired to the above and a manual clock

#![allow(dead_code)]

pub mod audio_generator;
pub mod memory_resolver;
pub mod recording_bus;

pub use audio_generator::{constant_buffer, generate_sine_wav, sine_buffer, TEST_SAMPLE_RATE};
pub use memory_resolver::{GatedResolver, MemoryResolver};
pub use recording_bus::{BusOp, RecordingBus};

use hitmix_common::PlaybackStatus;
use hitmix_player::audio::SoundResolver;
use hitmix_player::config::PlayerConfig;
use hitmix_player::playback::nodes::AudioNode;
use hitmix_player::playback::{
    ChannelBus, ManualTimeSource, Mixer, MixingBus, PlaybackEngine, SoundEvent,
    StaticEventSource,
};
use std::sync::Arc;
use std::time::Duration;

/// Real time the playback loop gets to catch up after the clock moves
const SETTLE: Duration = Duration::from_millis(25);

/// An engine driven by a manual clock, with its bus recorded
pub struct TestChannel {
    pub engine: PlaybackEngine,
    pub time: Arc<ManualTimeSource>,
    pub bus: Arc<RecordingBus>,
    pub root: Mixer,
}

impl TestChannel {
    pub fn new(events: Vec<SoundEvent>, resolver: MemoryResolver) -> Self {
        Self::with_config(events, resolver, PlayerConfig::default())
    }

    pub fn with_config(events: Vec<SoundEvent>, resolver: MemoryResolver, config: PlayerConfig) -> Self {
        Self::with_resolver(events, Arc::new(resolver), config)
    }

    pub fn with_resolver(
        events: Vec<SoundEvent>,
        resolver: Arc<dyn SoundResolver>,
        config: PlayerConfig,
    ) -> Self {
        let channel_mixer = Mixer::new(config.sample_rate);
        let output: Box<dyn AudioNode> = channel_mixer.submix();
        let bus = Arc::new(RecordingBus::new(channel_mixer));
        let time = Arc::new(ManualTimeSource::new());
        let root = Mixer::new(config.sample_rate);

        let engine = PlaybackEngine::new(
            &config,
            Arc::new(StaticEventSource::new(events)),
            resolver,
            Arc::new(root.clone()),
            ChannelBus {
                bus: bus.clone() as Arc<dyn MixingBus>,
                output,
            },
            time.clone(),
        )
        .expect("engine");

        Self {
            engine,
            time,
            bus,
            root,
        }
    }

    /// Advance the manual clock by `ms` and let the loop run
    pub async fn advance(&self, ms: u64) {
        self.time.advance(Duration::from_millis(ms));
        settle().await;
    }

    /// Wait until the engine reaches `status`, failing after a second
    pub async fn wait_for_status(&self, status: PlaybackStatus) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while self.engine.status().await != status {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {}, status is {}",
                status,
                self.engine.status().await
            );
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

/// Give spawned tasks real time to run
pub async fn settle() {
    tokio::time::sleep(SETTLE).await;
}

/// Resolver with a short "hit" and a long "slide" sound
pub fn standard_sounds() -> MemoryResolver {
    MemoryResolver::new()
        .with("hit", sine_buffer(880.0, 50))
        .with("slide", sine_buffer(220.0, 200))
        .with("whistle", sine_buffer(1760.0, 200))
}

//! Multi-event playback: clock, timeline, mixing graph and engine

pub mod clock;
pub mod engine;
pub mod events;
pub mod fader;
pub mod mixer;
pub mod nodes;
pub mod orchestrator;
pub mod source;
pub mod timeline;

pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource, VariableClock};
pub use engine::{ChannelBus, PlaybackEngine};
pub use events::{ControlKind, EventId, ScheduledEvent, SoundEvent, SoundKey, SustainCategory};
pub use mixer::{Mixer, MixingBus, NodeId, RootGraph};
pub use orchestrator::MixingOrchestrator;
pub use source::{ChartEventSource, EventSource, StaticEventSource};
pub use timeline::{DispatchQueue, Timeline};

//! Sound event data model
//!
//! A `SoundEvent` is the atomic scheduling unit: a timestamped instruction
//! to start, stop or modify audio on the channel's mixing bus. Event sources
//! produce them unordered; the timeline flattens companions and sorts them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an event inside a built timeline
///
/// Assigned in flattened source order during `Timeline::build`; used to
/// link a one-shot to the node it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to pre-decoded audio content
///
/// Resolved on demand through a `SoundResolver`; for the file-backed cache
/// this is a path relative to the sample directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundKey(String);

impl SoundKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SoundKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SoundKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What an event does when dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Play a sample once
    OneShot,
    /// Fade out and release the node started by the linked one-shot
    StopSustained,
    /// Start a looping sustained sound in the event's category
    StartSustained,
    /// Remove every sustained sound (both categories)
    #[serde(alias = "stop_running")]
    StopAllSustained,
    /// Adjust the pan of the active sustained sound
    ChangeBalance,
    /// Adjust the volume of the active sustained sound
    ChangeVolume,
}

impl ControlKind {
    /// Whether dispatch needs decoded audio content
    pub fn plays_sound(&self) -> bool {
        matches!(self, ControlKind::OneShot | ControlKind::StartSustained)
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlKind::OneShot => "one_shot",
            ControlKind::StopSustained => "stop_sustained",
            ControlKind::StartSustained => "start_sustained",
            ControlKind::StopAllSustained => "stop_all_sustained",
            ControlKind::ChangeBalance => "change_balance",
            ControlKind::ChangeVolume => "change_volume",
        };
        f.write_str(name)
    }
}

/// Independent slot for a concurrently active sustained sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SustainCategory {
    /// Slider body sound
    #[default]
    Slide,
    /// Slider whistle sound
    SlideWhistle,
}

impl SustainCategory {
    pub const ALL: [SustainCategory; 2] = [SustainCategory::Slide, SustainCategory::SlideWhistle];

    pub(crate) fn index(self) -> usize {
        match self {
            SustainCategory::Slide => 0,
            SustainCategory::SlideWhistle => 1,
        }
    }
}

/// A scheduled sound instruction
#[derive(Debug, Clone, PartialEq)]
pub struct SoundEvent {
    /// Scheduled time in milliseconds since channel start
    pub offset: f64,
    pub control: ControlKind,
    /// Playback volume, 0.0..=1.0
    pub volume: f32,
    /// Pan, -1.0 (left) ..= 1.0 (right), before the channel balance factor
    pub balance: f32,
    /// Audio content, `None` for pure control events
    pub sound: Option<SoundKey>,
    /// Sustain slot used by `StartSustained` / `ChangeBalance` / `ChangeVolume`
    pub category: SustainCategory,
    /// Linked event that must also be scheduled (e.g. a slider's end marker)
    pub companion: Option<Box<SoundEvent>>,
}

impl SoundEvent {
    fn control_only(offset: f64, control: ControlKind) -> Self {
        Self {
            offset,
            control,
            volume: 1.0,
            balance: 0.0,
            sound: None,
            category: SustainCategory::default(),
            companion: None,
        }
    }

    /// A one-shot sample
    pub fn one_shot(offset: f64, sound: impl Into<SoundKey>, volume: f32, balance: f32) -> Self {
        Self {
            volume,
            balance,
            sound: Some(sound.into()),
            ..Self::control_only(offset, ControlKind::OneShot)
        }
    }

    /// A looping sustained sound in `category`
    pub fn start_sustained(
        offset: f64,
        sound: impl Into<SoundKey>,
        category: SustainCategory,
        volume: f32,
        balance: f32,
    ) -> Self {
        Self {
            volume,
            balance,
            sound: Some(sound.into()),
            category,
            ..Self::control_only(offset, ControlKind::StartSustained)
        }
    }

    /// Release marker for the node started by the parent one-shot
    pub fn stop_sustained(offset: f64) -> Self {
        Self::control_only(offset, ControlKind::StopSustained)
    }

    /// Remove every sustained sound
    pub fn stop_all_sustained(offset: f64) -> Self {
        Self::control_only(offset, ControlKind::StopAllSustained)
    }

    /// Live pan change for the sustained sound in `category`
    pub fn change_balance(offset: f64, category: SustainCategory, balance: f32) -> Self {
        Self {
            balance,
            category,
            ..Self::control_only(offset, ControlKind::ChangeBalance)
        }
    }

    /// Live volume change for the sustained sound in `category`
    pub fn change_volume(offset: f64, category: SustainCategory, volume: f32) -> Self {
        Self {
            volume,
            category,
            ..Self::control_only(offset, ControlKind::ChangeVolume)
        }
    }

    /// Attach a companion event (builder style)
    pub fn with_companion(mut self, companion: SoundEvent) -> Self {
        self.companion = Some(Box::new(companion));
        self
    }

    /// Sound identity for log messages
    pub fn sound_label(&self) -> &str {
        self.sound.as_ref().map(SoundKey::as_str).unwrap_or("<none>")
    }
}

/// A timeline member: an event plus its assigned identity
///
/// Companions have been split out; `companion_id` records the link so the
/// orchestrator can hand the parent's node to the companion's release.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub id: EventId,
    pub companion_id: Option<EventId>,
    pub event: SoundEvent,
}

impl ScheduledEvent {
    pub fn offset(&self) -> f64 {
        self.event.offset
    }

    pub fn control(&self) -> ControlKind {
        self.event.control
    }
}

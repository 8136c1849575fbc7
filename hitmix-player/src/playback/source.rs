//! Event sources
//!
//! An `EventSource` supplies the raw, possibly unordered event set for a
//! channel. The engine asks for it once, the first time a dispatch queue is
//! built.
//!
//! `ChartEventSource` reads a JSON chart:
//!
//! ```json
//! {
//!   "title": "Example",
//!   "events": [
//!     { "offset": 0,    "control": "one_shot", "sound": "normal-hitnormal", "volume": 0.8 },
//!     { "offset": 120,  "control": "start_sustained", "sound": "normal-sliderslide", "category": "slide" },
//!     { "offset": 900,  "control": "stop_all_sustained" },
//!     { "offset": 1000, "control": "one_shot", "sound": "drum-hold", "stop_offset": 1400 }
//!   ]
//! }
//! ```
//!
//! `stop_offset` attaches a `stop_sustained` companion that releases the
//! one-shot's node at that time.

use crate::error::{Error, Result};
use crate::playback::events::{ControlKind, SoundEvent, SoundKey, SustainCategory};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub type EventsFuture<'a> = BoxFuture<'a, Result<Vec<SoundEvent>>>;

/// Capability of supplying a channel's sound events
pub trait EventSource: Send + Sync {
    fn sound_events(&self) -> EventsFuture<'_>;
}

/// Events fixed at construction
#[derive(Debug, Clone, Default)]
pub struct StaticEventSource {
    events: Vec<SoundEvent>,
}

impl StaticEventSource {
    pub fn new(events: Vec<SoundEvent>) -> Self {
        Self { events }
    }
}

impl EventSource for StaticEventSource {
    fn sound_events(&self) -> EventsFuture<'_> {
        let events = self.events.clone();
        Box::pin(async move { Ok(events) })
    }
}

fn default_volume() -> f32 {
    1.0
}

/// One event as written in a chart file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEntry {
    pub offset: f64,
    pub control: ControlKind,
    #[serde(default)]
    pub sound: Option<SoundKey>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub balance: f32,
    #[serde(default)]
    pub category: SustainCategory,
    /// Release time for the node this entry starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_offset: Option<f64>,
}

impl ChartEntry {
    fn into_event(self) -> SoundEvent {
        let event = SoundEvent {
            offset: self.offset,
            control: self.control,
            volume: self.volume,
            balance: self.balance,
            sound: self.sound,
            category: self.category,
            companion: None,
        };
        match self.stop_offset {
            Some(stop) => event.with_companion(SoundEvent::stop_sustained(stop)),
            None => event,
        }
    }
}

/// A parsed chart file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub title: Option<String>,
    pub events: Vec<ChartEntry>,
}

impl Chart {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Convert entries to sound events
    pub fn into_events(self) -> Vec<SoundEvent> {
        self.events.into_iter().map(ChartEntry::into_event).collect()
    }
}

/// Events loaded from a JSON chart file
#[derive(Debug, Clone)]
pub struct ChartEventSource {
    path: PathBuf,
}

impl ChartEventSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for ChartEventSource {
    fn sound_events(&self) -> EventsFuture<'_> {
        Box::pin(async move {
            debug!("Reading chart {}", self.path.display());
            let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                Error::Config(format!("Failed to read chart {}: {}", self.path.display(), e))
            })?;
            let chart = Chart::from_json(&text)?;
            info!(
                "Loaded chart {} ({} events)",
                chart.title.as_deref().unwrap_or("<untitled>"),
                chart.events.len()
            );
            Ok(chart.into_events())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    const CHART: &str = r#"{
        "title": "Test",
        "events": [
            { "offset": 0, "control": "one_shot", "sound": "hit", "volume": 0.5, "balance": -0.25 },
            { "offset": 100, "control": "start_sustained", "sound": "slide", "category": "slide_whistle" },
            { "offset": 500, "control": "stop_running" },
            { "offset": 600, "control": "one_shot", "sound": "hold", "stop_offset": 900 }
        ]
    }"#;

    #[test]
    fn test_chart_parses_with_defaults() {
        let events = Chart::from_json(CHART).unwrap().into_events();
        assert_eq!(events.len(), 4);

        assert_eq!(events[0], SoundEvent::one_shot(0.0, "hit", 0.5, -0.25));
        assert_eq!(events[1].category, SustainCategory::SlideWhistle);
        assert_eq!(events[1].volume, 1.0);
        assert_eq!(events[2].control, ControlKind::StopAllSustained);
    }

    #[test]
    fn test_stop_offset_becomes_companion() {
        let events = Chart::from_json(CHART).unwrap().into_events();
        let companion = events[3].companion.as_deref().unwrap();
        assert_eq!(companion.control, ControlKind::StopSustained);
        assert_eq!(companion.offset, 900.0);
    }

    #[test]
    fn test_unknown_control_is_rejected() {
        let bad = r#"{ "events": [ { "offset": 0, "control": "explode" } ] }"#;
        assert!(matches!(Chart::from_json(bad), Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn test_static_source_returns_events() {
        let source = StaticEventSource::new(vec![SoundEvent::stop_all_sustained(5.0)]);
        let events = source.sound_events().await.unwrap();
        assert_eq!(events, vec![SoundEvent::stop_all_sustained(5.0)]);
    }

    #[tokio::test]
    async fn test_chart_source_reads_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), CHART).unwrap();

        let events = ChartEventSource::new(file.path()).sound_events().await.unwrap();
        assert_eq!(events.len(), 4);
    }

    #[tokio::test]
    async fn test_chart_source_missing_file() {
        let source = ChartEventSource::new("/nonexistent/chart.json");
        assert!(matches!(source.sound_events().await, Err(Error::Config(_))));
    }
}

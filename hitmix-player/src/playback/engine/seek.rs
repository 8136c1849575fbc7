//! Seeking and clock adjustment for PlaybackEngine

use super::PlaybackEngine;
use crate::error::{Error, Result};
use hitmix_common::events::PlaybackStatus;
use tracing::{debug, info};

fn require_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("{} must be finite, got {}", name, value)))
    }
}

impl PlaybackEngine {
    /// Move playback to `position_ms`, rebuilding the dispatch queue
    ///
    /// Sustained sounds are dropped first. Events before the target are
    /// never dispatched; the status reads `Reposition` during the rebuild
    /// and is restored afterwards. No-op at the current position.
    pub async fn skip_to(&self, position_ms: f64) -> Result<()> {
        self.ensure_live()?;
        require_finite("Seek position", position_ms)?;

        if position_ms == self.clock.elapsed_ms() {
            debug!("Seek to {:.1}ms ignored: already there", position_ms);
            return Ok(());
        }

        self.reposition(position_ms).await?;
        info!("Seeked to {:.1}ms", position_ms);
        Ok(())
    }

    /// Drop sustained sounds, move the clock and rebuild the queue at `position_ms`
    pub(super) async fn reposition(&self, position_ms: f64) -> Result<()> {
        let rebuilt = {
            // An in-flight batch may still be attaching sustained sounds;
            // tear down only once it has finished.
            let _seek_guard = self.seek_lock.lock().await;
            self.orchestrator.reset();
            let previous = self.state.set_status(PlaybackStatus::Reposition).await;
            self.clock.seek(position_ms);
            let rebuilt = self.rebuild_queue(position_ms).await;
            self.state.set_status(previous).await;
            rebuilt
        };
        rebuilt?;

        self.state.publish_position(position_ms, true);
        Ok(())
    }

    /// Align the clock with an external reference without touching the queue
    pub fn sync(&self, position_ms: f64) -> Result<()> {
        require_finite("Sync position", position_ms)?;
        self.clock.seek(position_ms);
        Ok(())
    }

    /// Change the playback rate and tempo compensation
    pub fn set_playback_rate(&self, rate: f64, tempo_compensated: bool) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "Playback rate must be positive and finite, got {}",
                rate
            )));
        }
        self.clock.set_rate(rate);
        self.clock.set_tempo_compensated(tempo_compensated);
        info!(
            "Playback rate {} (tempo compensated: {}, offset {}ms)",
            rate,
            tempo_compensated,
            self.clock.variable_offset_ms()
        );
        Ok(())
    }

    /// User audio offset added to every clock reading
    pub fn set_manual_offset(&self, offset_ms: f64) -> Result<()> {
        require_finite("Manual offset", offset_ms)?;
        self.clock.set_manual_offset_ms(offset_ms);
        Ok(())
    }

    /// Multiplier applied to event balances from now on
    pub fn set_balance_factor(&self, factor: f32) -> Result<()> {
        if !factor.is_finite() {
            return Err(Error::InvalidInput(format!(
                "Balance factor must be finite, got {}",
                factor
            )));
        }
        self.orchestrator.set_balance_factor(factor);
        Ok(())
    }

    /// Channel master volume (0.0-1.0)
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(Error::InvalidInput(format!(
                "Volume must be within 0.0-1.0, got {}",
                volume
            )));
        }
        self.master_volume.set(volume);
        Ok(())
    }

    pub fn volume(&self) -> f32 {
        self.master_volume.get()
    }
}

//! Playback control methods for PlaybackEngine
//!
//! **Responsibilities:**
//! - Lifecycle transitions (play, pause, stop, restart)
//! - The background playback loop and its cancellation

use super::core::LoopSession;
use super::PlaybackEngine;
use crate::error::Result;
use hitmix_common::events::PlaybackStatus;
use tokio::sync::watch;
use tracing::{debug, error, info};

impl PlaybackEngine {
    /// Start (or resume) playback from the current position
    ///
    /// No-op while already playing.
    pub async fn play(&self) -> Result<()> {
        self.ensure_live()?;
        if self.state.status().await == PlaybackStatus::Playing {
            debug!("Play ignored: already playing");
            return Ok(());
        }

        let mut session = self.session.lock().await;
        // Another play may have won the session lock
        if self.state.status().await == PlaybackStatus::Playing {
            debug!("Play ignored: already playing");
            return Ok(());
        }

        // A loop that ended on its own still holds its session
        if let Some(finished) = session.take() {
            let _ = finished.cancel_tx.send(true);
            if let Err(e) = finished.handle.await {
                error!("Previous playback loop ended abnormally: {}", e);
            }
        }

        if self.timeline.get().is_none() {
            self.rebuild_queue(self.clock.elapsed_ms()).await?;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.clock.start();
        self.state.set_status(PlaybackStatus::Playing).await;

        let engine = self.clone_handles();
        let handle = tokio::spawn(async move {
            engine.playback_loop(cancel_rx).await;
        });
        *session = Some(LoopSession { cancel_tx, handle });
        drop(session);

        info!("Playback started at {:.1}ms", self.clock.elapsed_ms());
        self.state.publish_position(self.clock.elapsed_ms(), true);
        Ok(())
    }

    /// Stop the loop and the clock, keeping the position
    ///
    /// No-op unless playing.
    pub async fn pause(&self) -> Result<()> {
        self.ensure_live()?;
        if self.state.status().await != PlaybackStatus::Playing {
            debug!("Pause ignored: not playing");
            return Ok(());
        }

        self.cancel_loop().await;
        self.clock.stop();

        // The loop may have finished the chart while we waited
        if self.state.status().await == PlaybackStatus::Playing {
            self.state.set_status(PlaybackStatus::Paused).await;
        }
        info!("Playback paused at {:.1}ms", self.clock.elapsed_ms());
        self.state.publish_position(self.clock.elapsed_ms(), true);
        Ok(())
    }

    /// Stop playback and return to position 0 in `Ready`
    ///
    /// No-op when already stopped at rest.
    pub async fn stop(&self) -> Result<()> {
        self.ensure_live()?;
        if self.state.status().await == PlaybackStatus::Ready
            && !self.clock.is_running()
            && self.clock.elapsed_ms() == 0.0
        {
            debug!("Stop ignored: already stopped");
            return Ok(());
        }

        self.cancel_loop().await;
        self.clock.stop();
        self.reposition(0.0).await?;
        self.state.set_status(PlaybackStatus::Ready).await;

        info!("Playback stopped");
        self.state.publish_position(self.clock.elapsed_ms(), true);
        Ok(())
    }

    /// Seek to 0 and play
    pub async fn restart(&self) -> Result<()> {
        self.skip_to(0.0).await?;
        self.play().await
    }

    /// Signal the loop to stop and wait for it to exit
    ///
    /// Safe to call with no loop running or more than once.
    pub(super) async fn cancel_loop(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            // The loop may already be gone
            let _ = session.cancel_tx.send(true);
            if let Err(e) = session.handle.await {
                error!("Playback loop ended abnormally: {}", e);
            }
        }
    }

    /// Background loop: dispatch due events until cancelled or exhausted
    async fn playback_loop(&self, mut cancel_rx: watch::Receiver<bool>) {
        debug!("Playback loop started");

        loop {
            if *cancel_rx.borrow() {
                self.clock.stop();
                debug!("Playback loop cancelled");
                return;
            }

            let now = self.clock.elapsed_ms();
            self.state.publish_position(now, false);

            let exhausted = {
                let _seek_guard = self.seek_lock.lock().await;
                let queue = self.current_queue();
                for event in queue.take_due(now) {
                    self.orchestrator.handle(event).await;
                }
                queue.is_empty()
            };

            if exhausted {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.loop_quantum) => {}
                changed = cancel_rx.changed() => {
                    if changed.is_err() {
                        // Sender dropped without signalling: treat as cancel
                        self.clock.stop();
                        debug!("Playback loop orphaned, exiting");
                        return;
                    }
                }
            }
        }

        self.clock.stop();
        info!("All events dispatched at {:.1}ms", self.clock.elapsed_ms());
        self.state.set_status(PlaybackStatus::Finished).await;
        if let Err(e) = self.reposition(0.0).await {
            error!("Failed to rewind finished channel: {}", e);
        }
    }
}

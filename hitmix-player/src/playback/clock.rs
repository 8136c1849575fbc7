//! Variable-rate playback clock
//!
//! A stopwatch whose reading is scaled by a playback rate and shifted by a
//! manual offset plus a small rate-dependent correction:
//!
//! ```text
//! elapsed = running_time × rate + manual_offset + variable_offset
//! ```
//!
//! `variable_offset` compensates the perceived latency shift of specific
//! non-unity rates: −25 ms at exactly 0.75× without tempo compensation,
//! +15 ms at exactly 1.5× with tempo compensation, zero otherwise.
//!
//! Rate and offset changes never reset accumulated time; only `seek` does.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Correction applied at 0.75× when tempo compensation is off
pub const SLOW_RATE_OFFSET_MS: f64 = -25.0;

/// Correction applied at 1.5× when tempo compensation is on
pub const FAST_RATE_OFFSET_MS: f64 = 15.0;

/// Monotonic time source read by the clock
pub trait TimeSource: Send + Sync {
    /// Time since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall-clock time source backed by `Instant`
#[derive(Debug)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Time source that only moves when told to
///
/// Used to drive the playback loop deterministically (tests, offline tools).
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    nanos: AtomicU64,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.nanos
            .fetch_add(by.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute reading (may move backwards)
    pub fn set(&self, at: Duration) {
        self.nanos
            .store(at.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Rate-dependent latency correction in milliseconds
pub fn variable_offset_ms(rate: f64, tempo_compensated: bool) -> f64 {
    if rate == 0.75 && !tempo_compensated {
        SLOW_RATE_OFFSET_MS
    } else if rate == 1.5 && tempo_compensated {
        FAST_RATE_OFFSET_MS
    } else {
        0.0
    }
}

#[derive(Debug)]
struct ClockState {
    /// Scaled running time accumulated before the current segment (ms)
    base_ms: f64,
    /// Time source reading when the current running segment began
    started_at: Option<Duration>,
    rate: f64,
    manual_offset_ms: f64,
    tempo_compensated: bool,
}

impl ClockState {
    fn scaled_running_ms(&self, now: Duration) -> f64 {
        match self.started_at {
            Some(start) => {
                let segment = now.saturating_sub(start);
                self.base_ms + hitmix_common::time::duration_to_millis(segment) * self.rate
            }
            None => self.base_ms,
        }
    }

    fn offsets_ms(&self) -> f64 {
        self.manual_offset_ms + variable_offset_ms(self.rate, self.tempo_compensated)
    }

    /// Fold the running segment into `base_ms` and restart it at `now`
    fn fold(&mut self, now: Duration) {
        self.base_ms = self.scaled_running_ms(now);
        if self.started_at.is_some() {
            self.started_at = Some(now);
        }
    }
}

/// Variable-rate stopwatch shared between the playback loop and callers
pub struct VariableClock {
    source: Arc<dyn TimeSource>,
    state: Mutex<ClockState>,
}

impl VariableClock {
    /// Create a stopped clock at position zero, rate 1.0
    pub fn new(source: Arc<dyn TimeSource>) -> Self {
        Self {
            source,
            state: Mutex::new(ClockState {
                base_ms: 0.0,
                started_at: None,
                rate: 1.0,
                manual_offset_ms: 0.0,
                tempo_compensated: false,
            }),
        }
    }

    /// Create a clock reading wall-clock time
    pub fn system() -> Self {
        Self::new(Arc::new(SystemTimeSource::new()))
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start (or resume) running; no-op if already running
    pub fn start(&self) {
        let now = self.source.now();
        let mut state = self.lock();
        if state.started_at.is_none() {
            state.started_at = Some(now);
        }
    }

    /// Stop running, retaining the current position; no-op if stopped
    pub fn stop(&self) {
        let now = self.source.now();
        let mut state = self.lock();
        if state.started_at.is_some() {
            state.base_ms = state.scaled_running_ms(now);
            state.started_at = None;
        }
    }

    /// Whether the clock is running
    pub fn is_running(&self) -> bool {
        self.lock().started_at.is_some()
    }

    /// Reposition so that `elapsed_ms()` reads `position_ms` right now
    pub fn seek(&self, position_ms: f64) {
        let now = self.source.now();
        let mut state = self.lock();
        state.base_ms = position_ms - state.offsets_ms();
        if state.started_at.is_some() {
            state.started_at = Some(now);
        }
    }

    /// Current position in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        let now = self.source.now();
        let state = self.lock();
        state.scaled_running_ms(now) + state.offsets_ms()
    }

    /// Playback rate multiplier
    pub fn rate(&self) -> f64 {
        self.lock().rate
    }

    /// Change the playback rate without resetting accumulated time
    pub fn set_rate(&self, rate: f64) {
        let now = self.source.now();
        let mut state = self.lock();
        state.fold(now);
        state.rate = rate;
    }

    /// Manual offset in milliseconds
    pub fn manual_offset_ms(&self) -> f64 {
        self.lock().manual_offset_ms
    }

    pub fn set_manual_offset_ms(&self, offset_ms: f64) {
        self.lock().manual_offset_ms = offset_ms;
    }

    /// Whether tempo compensation (pitch-preserving speed change) is active
    pub fn tempo_compensated(&self) -> bool {
        self.lock().tempo_compensated
    }

    pub fn set_tempo_compensated(&self, enabled: bool) {
        self.lock().tempo_compensated = enabled;
    }

    /// Correction currently applied on top of the manual offset
    pub fn variable_offset_ms(&self) -> f64 {
        let state = self.lock();
        variable_offset_ms(state.rate, state.tempo_compensated)
    }
}

impl std::fmt::Debug for VariableClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("VariableClock")
            .field("base_ms", &state.base_ms)
            .field("running", &state.started_at.is_some())
            .field("rate", &state.rate)
            .field("manual_offset_ms", &state.manual_offset_ms)
            .field("tempo_compensated", &state.tempo_compensated)
            .finish()
    }
}

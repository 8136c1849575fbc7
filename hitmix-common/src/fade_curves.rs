//! Fade curves for release envelopes
//!
//! A released sustained sound is faded rather than cut. The curve maps the
//! normalized progress through the fade (0.0 = start, 1.0 = end) to a gain
//! multiplier.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Fade curve types
///
/// - Linear: constant rate of change (the default release shape)
/// - Logarithmic: fast drop, long tail
/// - SCurve: smooth start and finish
/// - EqualPower: cosine quarter-wave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// g(t) = 1 - t
    #[default]
    Linear,

    /// g(t) = (1 - t)²
    Logarithmic,

    /// g(t) = 0.5 × (1 + cos(π × t))
    SCurve,

    /// g(t) = cos(t × π/2)
    EqualPower,
}

impl FadeCurve {
    /// Gain at `progress` through a fade-out (0.0 → 1.0, 1.0 → 0.0)
    pub fn gain_out(&self, progress: f32) -> f32 {
        let t = progress.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Logarithmic => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::SCurve => 0.5 * (1.0 + (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// Configuration spelling, as serialized
    pub fn as_config_str(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    /// All available curves
    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_config_str())
    }
}

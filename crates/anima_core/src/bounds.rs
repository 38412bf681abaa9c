//! Bounded value model
//!
//! Every scalar in the affect state lives in one of two ranges:
//! - bipolar `[-1.0, 1.0]` (pleasure, arousal, dominance)
//! - unipolar `[0.0, 1.0]` (everything else)
//!
//! Out-of-range writes are saturated, never rejected. Upstream deltas come from
//! free-form classifier output and must not be able to crash the engine.

use serde::{Deserialize, Deserializer};

/// Saturate into `[-1.0, 1.0]`. Infinities saturate to the matching bound;
/// NaN becomes 0.
#[inline]
pub fn clamp_bipolar(x: f32) -> f32 {
    guard_nan(x).clamp(-1.0, 1.0)
}

/// Saturate into `[0.0, 1.0]`. Infinities saturate to the matching bound;
/// NaN becomes 0.
#[inline]
pub fn clamp_unipolar(x: f32) -> f32 {
    guard_nan(x).clamp(0.0, 1.0)
}

#[inline]
fn guard_nan(x: f32) -> f32 {
    if x.is_nan() {
        tracing::warn!("NaN detected in affect value, resetting to 0");
        0.0
    } else {
        x
    }
}

/// Guard against NaN and Infinity.
/// If the value is not finite, replace it with `fallback`.
#[inline]
pub fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in affect value, resetting to fallback {}", fallback);
        fallback
    }
}

/// Declared range of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Bipolar,
    Unipolar,
}

impl Polarity {
    #[inline]
    pub fn clamp(self, x: f32) -> f32 {
        match self {
            Polarity::Bipolar => clamp_bipolar(x),
            Polarity::Unipolar => clamp_unipolar(x),
        }
    }

    /// Neutral resting point before any personality influence.
    pub fn neutral(self) -> f32 {
        match self {
            Polarity::Bipolar => 0.0,
            Polarity::Unipolar => 0.5,
        }
    }

    pub fn contains(self, x: f32) -> bool {
        match self {
            Polarity::Bipolar => (-1.0..=1.0).contains(&x),
            Polarity::Unipolar => (0.0..=1.0).contains(&x),
        }
    }
}

/// Deserialize an f32 that may have been written as `null` (serde_json emits
/// `null` for NaN/Inf). Missing values come back as NaN and are sanitized by
/// the owning struct's `normalize`.
pub fn deserialize_safe_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<f32> = Option::deserialize(deserializer)?;
    Ok(v.unwrap_or(f32::NAN))
}

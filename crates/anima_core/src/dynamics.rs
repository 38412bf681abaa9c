//! Decay dynamics: exponential relaxation toward a resting point
//!
//! x(t) = b + (x0 - b) · e^(-k·t)
//!
//! where `b` is the baseline, `k` the per-hour rate and `t` elapsed hours.
//! Dimensions relax toward the personality baseline, basic emotions toward 0.
//! The closed form is exact for any step size, so a long pause between
//! updates gives the same result as many small ones.

use crate::persona::{DimensionRates, EmotionRates};
use crate::state::{BasicEmotions, Dimension, DimensionalState, Emotion};

pub const MS_PER_HOUR: f32 = 3_600_000.0;

/// Relax `current` toward `baseline`.
///
/// Non-positive elapsed time returns `current` unchanged, which guards
/// against clock skew and backdated timestamps.
#[inline]
pub fn decay_toward_baseline(current: f32, baseline: f32, rate: f32, elapsed_hours: f32) -> f32 {
    if elapsed_hours <= 0.0 || !elapsed_hours.is_finite() {
        return current;
    }
    let factor = (-rate.max(0.0) * elapsed_hours).exp();
    baseline + (current - baseline) * factor
}

/// Decay all seven dimensions toward their baseline. Missing rates leave the
/// dimension untouched.
pub fn decay_dimensions(
    current: &DimensionalState,
    baseline: &DimensionalState,
    rates: &DimensionRates,
    elapsed_hours: f32,
) -> DimensionalState {
    let mut next = *current;
    for dim in Dimension::ALL {
        if let Some(&rate) = rates.get(&dim) {
            let v = decay_toward_baseline(current.get(dim), baseline.get(dim), rate, elapsed_hours);
            next.set(dim, v);
        }
    }
    next
}

/// Decay all six basic emotions toward zero.
pub fn decay_emotions(current: &BasicEmotions, rates: &EmotionRates, elapsed_hours: f32) -> BasicEmotions {
    let mut next = *current;
    for emotion in Emotion::ALL {
        if let Some(&rate) = rates.get(&emotion) {
            let v = decay_toward_baseline(current.get(emotion), 0.0, rate, elapsed_hours);
            next.set(emotion, v);
        }
    }
    next
}

/// Hours between two Unix-millisecond timestamps, floored at zero.
pub fn elapsed_hours(from_ms: i64, to_ms: i64) -> f32 {
    (to_ms.saturating_sub(from_ms).max(0) as f32) / MS_PER_HOUR
}

//! Personality derivation
//!
//! The OCEAN profile is the slow, stable part of the self. Everything else that
//! depends on it is derived here as a pure function:
//! - resting baseline for each dimension
//! - per-dimension and per-emotion decay rates
//! - rumination probability
//! - response-intensity multiplier
//!
//! Each trait is centred on 0.5, so a neutral profile reproduces the neutral
//! baseline and the unmodified base rates exactly.

use crate::bounds::clamp_unipolar;
use crate::state::{DimensionalState, Dimension, Emotion, OceanProfile, Trait};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DimensionRates = BTreeMap<Dimension, f32>;
pub type EmotionRates = BTreeMap<Emotion, f32>;

/// A decay multiplier never drops below this, so no trait can stop decay.
pub const MIN_RATE_MULTIPLIER: f32 = 0.1;

/// `baseline[dim] += weight * (trait - 0.5)`
const BASELINE_INFLUENCE: &[(Trait, &[(Dimension, f32)])] = &[
    (
        Trait::Openness,
        &[(Dimension::Curiosity, 0.3), (Dimension::Arousal, 0.1)],
    ),
    (
        Trait::Conscientiousness,
        &[(Dimension::Dominance, 0.2), (Dimension::Energy, 0.1)],
    ),
    (
        Trait::Extraversion,
        &[
            (Dimension::Arousal, 0.2),
            (Dimension::Connection, 0.3),
            (Dimension::Energy, 0.2),
        ],
    ),
    (
        Trait::Agreeableness,
        &[
            (Dimension::Trust, 0.3),
            (Dimension::Pleasure, 0.1),
            (Dimension::Connection, 0.1),
        ],
    ),
    (
        Trait::Neuroticism,
        &[
            (Dimension::Pleasure, -0.2),
            (Dimension::Arousal, 0.2),
            (Dimension::Dominance, -0.2),
        ],
    ),
];

/// `rate *= max(0.1, 1 + weight * (trait - 0.5))`. Negative weights make a
/// field linger, positive weights make it fade faster.
const DIMENSION_RATE_INFLUENCE: &[(Trait, &[(Dimension, f32)])] = &[
    (Trait::Openness, &[(Dimension::Curiosity, -0.4)]),
    (Trait::Conscientiousness, &[(Dimension::Energy, -0.2)]),
    (
        Trait::Extraversion,
        &[(Dimension::Arousal, 0.2), (Dimension::Connection, -0.3)],
    ),
    (Trait::Agreeableness, &[(Dimension::Trust, -0.4)]),
    (
        Trait::Neuroticism,
        &[(Dimension::Pleasure, -0.4), (Dimension::Dominance, -0.3)],
    ),
];

const EMOTION_RATE_INFLUENCE: &[(Trait, &[(Emotion, f32)])] = &[
    (Trait::Openness, &[(Emotion::Surprise, 0.4)]),
    (Trait::Conscientiousness, &[(Emotion::Anger, 0.3)]),
    (Trait::Extraversion, &[(Emotion::Happiness, -0.3)]),
    (
        Trait::Agreeableness,
        &[(Emotion::Anger, 0.6), (Emotion::Disgust, 0.3)],
    ),
    (
        Trait::Neuroticism,
        &[
            (Emotion::Sadness, -0.6),
            (Emotion::Fear, -0.6),
            (Emotion::Anger, -0.3),
        ],
    ),
];

/// Half-lives (hours) the built-in base rates are derived from.
const DIMENSION_HALF_LIFE_HOURS: &[(Dimension, f32)] = &[
    (Dimension::Pleasure, 12.0),
    (Dimension::Arousal, 6.0),
    (Dimension::Dominance, 12.0),
    (Dimension::Connection, 24.0),
    (Dimension::Curiosity, 12.0),
    (Dimension::Energy, 8.0),
    (Dimension::Trust, 48.0),
];

const EMOTION_HALF_LIFE_HOURS: &[(Emotion, f32)] = &[
    (Emotion::Happiness, 12.0),
    (Emotion::Sadness, 24.0),
    (Emotion::Anger, 6.0),
    (Emotion::Fear, 12.0),
    (Emotion::Disgust, 12.0),
    (Emotion::Surprise, 3.0),
];

/// Convert a half-life in hours to a per-hour exponential rate.
pub fn rate_from_half_life(half_life_hours: f32) -> f32 {
    std::f32::consts::LN_2 / half_life_hours
}

/// Per-hour decay rates before personality is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRates {
    pub dimensions: DimensionRates,
    pub emotions: EmotionRates,
}

impl Default for BaseRates {
    fn default() -> Self {
        Self {
            dimensions: DIMENSION_HALF_LIFE_HOURS
                .iter()
                .map(|&(d, h)| (d, rate_from_half_life(h)))
                .collect(),
            emotions: EMOTION_HALF_LIFE_HOURS
                .iter()
                .map(|&(e, h)| (e, rate_from_half_life(h)))
                .collect(),
        }
    }
}

impl BaseRates {
    /// Replace the base rate of one dimension from a half-life.
    pub fn with_dimension_half_life(mut self, dim: Dimension, half_life_hours: f32) -> Self {
        self.dimensions.insert(dim, rate_from_half_life(half_life_hours));
        self
    }

    pub fn with_emotion_half_life(mut self, emotion: Emotion, half_life_hours: f32) -> Self {
        self.emotions.insert(emotion, rate_from_half_life(half_life_hours));
        self
    }

    fn dimension(&self, dim: Dimension) -> f32 {
        self.dimensions
            .get(&dim)
            .copied()
            .unwrap_or_else(|| BaseRates::default().dimensions[&dim])
    }

    fn emotion(&self, emotion: Emotion) -> f32 {
        self.emotions
            .get(&emotion)
            .copied()
            .unwrap_or_else(|| BaseRates::default().emotions[&emotion])
    }
}

/// Everything computed from a profile. Always produced as a unit so the three
/// maps can never disagree about which profile they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalityDerivation {
    pub baseline: DimensionalState,
    pub dimension_decay_rates: DimensionRates,
    pub emotion_decay_rates: EmotionRates,
}

impl PersonalityDerivation {
    pub fn derive(profile: &OceanProfile, base: &BaseRates) -> Self {
        Self {
            baseline: derive_baseline(profile),
            dimension_decay_rates: derive_dimension_decay_rates(profile, base),
            emotion_decay_rates: derive_emotion_decay_rates(profile, base),
        }
    }
}

pub fn derive_baseline(profile: &OceanProfile) -> DimensionalState {
    let mut baseline = DimensionalState::default();
    for &(t, influences) in BASELINE_INFLUENCE {
        let centred = profile.get(t) - 0.5;
        for &(dim, weight) in influences {
            baseline.add(dim, weight * centred);
        }
    }
    baseline
}

#[inline]
fn rate_multiplier(weight: f32, trait_value: f32) -> f32 {
    (1.0 + weight * (trait_value - 0.5)).max(MIN_RATE_MULTIPLIER)
}

pub fn derive_dimension_decay_rates(profile: &OceanProfile, base: &BaseRates) -> DimensionRates {
    let mut rates: DimensionRates = Dimension::ALL.iter().map(|&d| (d, base.dimension(d))).collect();
    for &(t, influences) in DIMENSION_RATE_INFLUENCE {
        for &(dim, weight) in influences {
            if let Some(rate) = rates.get_mut(&dim) {
                *rate *= rate_multiplier(weight, profile.get(t));
            }
        }
    }
    rates
}

pub fn derive_emotion_decay_rates(profile: &OceanProfile, base: &BaseRates) -> EmotionRates {
    let mut rates: EmotionRates = Emotion::ALL.iter().map(|&e| (e, base.emotion(e))).collect();
    for &(t, influences) in EMOTION_RATE_INFLUENCE {
        for &(emotion, weight) in influences {
            if let Some(rate) = rates.get_mut(&emotion) {
                *rate *= rate_multiplier(weight, profile.get(t));
            }
        }
    }
    rates
}

/// How prone this personality is to dwelling on intense experiences.
pub fn rumination_probability(profile: &OceanProfile) -> f32 {
    clamp_unipolar(
        0.5 + 0.6 * (profile.neuroticism - 0.5) + 0.2 * (profile.openness - 0.5)
            - 0.3 * (profile.conscientiousness - 0.5),
    )
}

/// Scales incoming stimulus intensity. Neurotic profiles over-react,
/// agreeable ones soften.
pub fn response_intensity_multiplier(profile: &OceanProfile) -> f32 {
    (1.0 + 0.4 * (profile.neuroticism - 0.5) - 0.2 * (profile.agreeableness - 0.5)).clamp(0.5, 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_profile_gives_neutral_baseline() {
        let baseline = derive_baseline(&OceanProfile::default());
        assert_eq!(baseline, DimensionalState::default());
    }

    #[test]
    fn test_neutral_profile_keeps_base_rates() {
        let base = BaseRates::default();
        let derived = PersonalityDerivation::derive(&OceanProfile::default(), &base);
        for dim in Dimension::ALL {
            assert!((derived.dimension_decay_rates[&dim] - base.dimensions[&dim]).abs() < 1e-7);
        }
        for e in Emotion::ALL {
            assert!((derived.emotion_decay_rates[&e] - base.emotions[&e]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_twelve_hour_half_life_rate() {
        let rate = BaseRates::default().emotions[&Emotion::Happiness];
        assert!((rate - 0.058).abs() < 0.001, "got {}", rate);
    }

    #[test]
    fn test_openness_raises_curiosity_baseline() {
        let curious = OceanProfile::default().with(Trait::Openness, 1.0);
        let baseline = derive_baseline(&curious);
        assert!((baseline.curiosity - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_neuroticism_lowers_pleasure_and_slows_sadness() {
        let anxious = OceanProfile::default().with(Trait::Neuroticism, 1.0);
        let base = BaseRates::default();
        let derived = PersonalityDerivation::derive(&anxious, &base);
        assert!(derived.baseline.pleasure < 0.0);
        assert!(derived.baseline.arousal > 0.0);
        assert!(derived.emotion_decay_rates[&Emotion::Sadness] < base.emotions[&Emotion::Sadness]);
    }

    #[test]
    fn test_rate_multiplier_floor() {
        // weight -4 at trait 1.0 would give 1 - 2 = -1 without the floor
        assert!((rate_multiplier(-4.0, 1.0) - MIN_RATE_MULTIPLIER).abs() < 1e-7);
    }

    #[test]
    fn test_rates_stay_positive_for_extreme_profiles() {
        let base = BaseRates::default();
        for corner in [0.0f32, 1.0] {
            let mut p = OceanProfile::default();
            for t in Trait::ALL {
                p = p.with(t, corner);
            }
            let derived = PersonalityDerivation::derive(&p, &base);
            assert!(derived.dimension_decay_rates.values().all(|r| *r > 0.0));
            assert!(derived.emotion_decay_rates.values().all(|r| *r > 0.0));
            assert!(derived.baseline.is_in_range());
        }
    }

    #[test]
    fn test_rumination_probability() {
        assert!((rumination_probability(&OceanProfile::default()) - 0.5).abs() < 1e-6);
        let brooding = OceanProfile::default()
            .with(Trait::Neuroticism, 1.0)
            .with(Trait::Conscientiousness, 0.0);
        // 0.5 + 0.3 + 0 + 0.15
        assert!((rumination_probability(&brooding) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_response_intensity_multiplier() {
        assert!((response_intensity_multiplier(&OceanProfile::default()) - 1.0).abs() < 1e-6);
        let reactive = OceanProfile::default()
            .with(Trait::Neuroticism, 1.0)
            .with(Trait::Agreeableness, 0.0);
        assert!((response_intensity_multiplier(&reactive) - 1.3).abs() < 1e-6);
    }

    #[test]
    fn test_half_life_override() {
        let base = BaseRates::default().with_dimension_half_life(Dimension::Trust, 1.0);
        assert!((base.dimensions[&Dimension::Trust] - std::f32::consts::LN_2).abs() < 1e-6);
    }
}

//! Affect state value types
//!
//! Three small value types make up the scalar part of the engine state:
//! - `DimensionalState`: seven named dimensions (PAD plus four unipolar drives)
//! - `BasicEmotions`: six discrete emotions, each decaying toward zero
//! - `OceanProfile`: the five-factor personality that shapes everything else
//!
//! All three are `Copy`. Every write routes through the field's clamp, so a
//! value of these types is always in range.

use crate::bounds::{deserialize_safe_f32, sanitize_f32, Polarity};
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn join_names<I: IntoIterator<Item = &'static str>>(names: I) -> String {
    names.into_iter().collect::<Vec<_>>().join(", ")
}

// =============================================================================
// Dimensions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Pleasure,
    Arousal,
    Dominance,
    Connection,
    Curiosity,
    Energy,
    Trust,
}

impl Dimension {
    pub const ALL: [Dimension; 7] = [
        Dimension::Pleasure,
        Dimension::Arousal,
        Dimension::Dominance,
        Dimension::Connection,
        Dimension::Curiosity,
        Dimension::Energy,
        Dimension::Trust,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Pleasure => "pleasure",
            Dimension::Arousal => "arousal",
            Dimension::Dominance => "dominance",
            Dimension::Connection => "connection",
            Dimension::Curiosity => "curiosity",
            Dimension::Energy => "energy",
            Dimension::Trust => "trust",
        }
    }

    pub fn polarity(self) -> Polarity {
        match self {
            Dimension::Pleasure | Dimension::Arousal | Dimension::Dominance => Polarity::Bipolar,
            _ => Polarity::Unipolar,
        }
    }

    pub fn valid_names() -> String {
        join_names(Self::ALL.iter().map(|d| d.name()))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name() == key)
            .ok_or_else(|| CoreError::UnknownDimension {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

/// The seven-dimensional core affect vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionalState {
    /// Pleasure / valence (-1.0 to 1.0)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub pleasure: f32,
    /// Arousal: calm ↔ activated (-1.0 to 1.0)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub arousal: f32,
    /// Dominance: submissive ↔ in control (-1.0 to 1.0)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub dominance: f32,
    /// Felt closeness to the conversation partner (0.0 to 1.0)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub connection: f32,
    /// Drive to explore (0.0 to 1.0)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub curiosity: f32,
    /// Vitality (0.0 to 1.0)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub energy: f32,
    /// Willingness to rely on the partner (0.0 to 1.0)
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub trust: f32,
}

impl Default for DimensionalState {
    /// The neutral vector: bipolar dimensions at 0, unipolar at 0.5.
    fn default() -> Self {
        Self {
            pleasure: 0.0,
            arousal: 0.0,
            dominance: 0.0,
            connection: 0.5,
            curiosity: 0.5,
            energy: 0.5,
            trust: 0.5,
        }
    }
}

impl DimensionalState {
    pub fn get(&self, dim: Dimension) -> f32 {
        match dim {
            Dimension::Pleasure => self.pleasure,
            Dimension::Arousal => self.arousal,
            Dimension::Dominance => self.dominance,
            Dimension::Connection => self.connection,
            Dimension::Curiosity => self.curiosity,
            Dimension::Energy => self.energy,
            Dimension::Trust => self.trust,
        }
    }

    /// Clamped write.
    pub fn set(&mut self, dim: Dimension, value: f32) {
        let value = dim.polarity().clamp(value);
        match dim {
            Dimension::Pleasure => self.pleasure = value,
            Dimension::Arousal => self.arousal = value,
            Dimension::Dominance => self.dominance = value,
            Dimension::Connection => self.connection = value,
            Dimension::Curiosity => self.curiosity = value,
            Dimension::Energy => self.energy = value,
            Dimension::Trust => self.trust = value,
        }
    }

    /// Copy with one field replaced (clamped).
    pub fn with(mut self, dim: Dimension, value: f32) -> Self {
        self.set(dim, value);
        self
    }

    pub fn add(&mut self, dim: Dimension, delta: f32) {
        self.set(dim, self.get(dim) + delta);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f32)> + '_ {
        Dimension::ALL.iter().map(move |&d| (d, self.get(d)))
    }

    /// Sanitize and clamp every field.
    pub fn normalize(&mut self) {
        let neutral = DimensionalState::default();
        for dim in Dimension::ALL {
            let v = sanitize_f32(self.get(dim), neutral.get(dim));
            self.set(dim, v);
        }
    }

    pub fn is_in_range(&self) -> bool {
        self.iter().all(|(d, v)| d.polarity().contains(v))
    }
}

// =============================================================================
// Basic emotions
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happiness,
    Sadness,
    Anger,
    Fear,
    Disgust,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Happiness,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Disgust,
        Emotion::Surprise,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Emotion::Happiness => "happiness",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Disgust => "disgust",
            Emotion::Surprise => "surprise",
        }
    }

    pub fn valid_names() -> String {
        join_names(Self::ALL.iter().map(|e| e.name()))
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Emotion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name() == key)
            .ok_or_else(|| CoreError::UnknownEmotion {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

/// Six basic emotions, each in `[0.0, 1.0]`, resting at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicEmotions {
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub happiness: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub sadness: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub anger: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub fear: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub disgust: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub surprise: f32,
}

impl BasicEmotions {
    pub fn get(&self, emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Happiness => self.happiness,
            Emotion::Sadness => self.sadness,
            Emotion::Anger => self.anger,
            Emotion::Fear => self.fear,
            Emotion::Disgust => self.disgust,
            Emotion::Surprise => self.surprise,
        }
    }

    /// Clamped write.
    pub fn set(&mut self, emotion: Emotion, value: f32) {
        let value = Polarity::Unipolar.clamp(value);
        match emotion {
            Emotion::Happiness => self.happiness = value,
            Emotion::Sadness => self.sadness = value,
            Emotion::Anger => self.anger = value,
            Emotion::Fear => self.fear = value,
            Emotion::Disgust => self.disgust = value,
            Emotion::Surprise => self.surprise = value,
        }
    }

    pub fn add(&mut self, emotion: Emotion, delta: f32) {
        self.set(emotion, self.get(emotion) + delta);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().map(move |&e| (e, self.get(e)))
    }

    pub fn normalize(&mut self) {
        for emotion in Emotion::ALL {
            let v = sanitize_f32(self.get(emotion), 0.0);
            self.set(emotion, v);
        }
    }

    pub fn is_in_range(&self) -> bool {
        self.iter().all(|(_, v)| (0.0..=1.0).contains(&v))
    }
}

// =============================================================================
// Personality
// =============================================================================

/// Big Five (OCEAN) personality trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Trait {
    pub const ALL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Trait::Openness => "openness",
            Trait::Conscientiousness => "conscientiousness",
            Trait::Extraversion => "extraversion",
            Trait::Agreeableness => "agreeableness",
            Trait::Neuroticism => "neuroticism",
        }
    }

    pub fn valid_names() -> String {
        join_names(Self::ALL.iter().map(|t| t.name()))
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Trait {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == key)
            .ok_or_else(|| CoreError::UnknownTrait {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

/// Five-factor personality profile, each trait in `[0.0, 1.0]`.
///
/// Only changed through the orchestrator's trait setter, which also
/// recomputes everything derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OceanProfile {
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub openness: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub conscientiousness: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub extraversion: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub agreeableness: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub neuroticism: f32,
}

impl Default for OceanProfile {
    fn default() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        }
    }
}

impl OceanProfile {
    pub fn get(&self, t: Trait) -> f32 {
        match t {
            Trait::Openness => self.openness,
            Trait::Conscientiousness => self.conscientiousness,
            Trait::Extraversion => self.extraversion,
            Trait::Agreeableness => self.agreeableness,
            Trait::Neuroticism => self.neuroticism,
        }
    }

    /// Copy with one trait replaced (clamped to `[0, 1]`).
    pub fn with(mut self, t: Trait, value: f32) -> Self {
        let value = Polarity::Unipolar.clamp(value);
        match t {
            Trait::Openness => self.openness = value,
            Trait::Conscientiousness => self.conscientiousness = value,
            Trait::Extraversion => self.extraversion = value,
            Trait::Agreeableness => self.agreeableness = value,
            Trait::Neuroticism => self.neuroticism = value,
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Trait, f32)> + '_ {
        Trait::ALL.iter().map(move |&t| (t, self.get(t)))
    }

    pub fn normalize(&mut self) {
        for t in Trait::ALL {
            let v = sanitize_f32(self.get(t), 0.5);
            *self = self.with(t, v);
        }
    }
}

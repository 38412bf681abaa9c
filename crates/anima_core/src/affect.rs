//! Emotion label → affect delta mapping
//!
//! A classifier reports discrete labels ("angry", "worried", "joy"). Each
//! canonical label maps to a sparse delta vector over the seven dimensions and
//! six basic emotions, calibrated at intensity 1.0. Surface forms are folded
//! onto canonical labels through an alias table.
//!
//! The built-in tables are process-wide constants. Custom labels from config
//! produce a new combined [`LabelTable`]; the built-ins are never mutated.

use crate::error::{CoreError, CoreResult};
use crate::state::{BasicEmotions, Dimension, DimensionalState, Emotion};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::state::Dimension::{Arousal, Connection, Curiosity, Dominance, Energy, Pleasure, Trust};
use crate::state::Emotion::{Anger, Disgust, Fear, Happiness, Sadness, Surprise};

type LabelRow = (
    &'static str,
    &'static [(Dimension, f32)],
    &'static [(Emotion, f32)],
);

#[rustfmt::skip]
const BUILTIN_LABELS: &[LabelRow] = &[
    // positive
    ("happy",        &[(Pleasure, 0.4), (Arousal, 0.2), (Dominance, 0.1), (Energy, 0.1)], &[(Happiness, 0.5)]),
    ("excited",      &[(Pleasure, 0.3), (Arousal, 0.5), (Energy, 0.2), (Curiosity, 0.1)], &[(Happiness, 0.3), (Surprise, 0.2)]),
    ("content",      &[(Pleasure, 0.3), (Arousal, -0.2), (Dominance, 0.1)], &[(Happiness, 0.3)]),
    ("grateful",     &[(Pleasure, 0.3), (Connection, 0.2), (Trust, 0.2)], &[(Happiness, 0.3)]),
    ("proud",        &[(Pleasure, 0.3), (Dominance, 0.4), (Energy, 0.1)], &[(Happiness, 0.3)]),
    ("amused",       &[(Pleasure, 0.3), (Arousal, 0.2), (Energy, 0.1)], &[(Happiness, 0.4), (Surprise, 0.1)]),
    ("loving",       &[(Pleasure, 0.4), (Connection, 0.4), (Trust, 0.2)], &[(Happiness, 0.4)]),
    ("hopeful",      &[(Pleasure, 0.2), (Arousal, 0.1), (Energy, 0.1)], &[(Happiness, 0.2)]),
    ("relieved",     &[(Pleasure, 0.2), (Arousal, -0.3), (Dominance, 0.1)], &[(Happiness, 0.2), (Fear, -0.2)]),
    ("playful",      &[(Pleasure, 0.3), (Arousal, 0.3), (Connection, 0.2), (Energy, 0.2)], &[(Happiness, 0.3)]),
    // low-arousal / cognitive
    ("calm",         &[(Pleasure, 0.1), (Arousal, -0.4)], &[(Fear, -0.1), (Anger, -0.1)]),
    ("curious",      &[(Curiosity, 0.4), (Arousal, 0.2), (Energy, 0.1)], &[(Surprise, 0.1)]),
    ("interested",   &[(Curiosity, 0.3), (Arousal, 0.1)], &[]),
    ("focused",      &[(Arousal, 0.1), (Dominance, 0.2), (Curiosity, 0.2), (Energy, 0.1)], &[]),
    ("surprised",    &[(Arousal, 0.4), (Curiosity, 0.2)], &[(Surprise, 0.6)]),
    ("confused",     &[(Dominance, -0.2), (Arousal, 0.1), (Curiosity, 0.1)], &[(Surprise, 0.2)]),
    ("bored",        &[(Arousal, -0.3), (Curiosity, -0.3), (Energy, -0.1)], &[]),
    ("tired",        &[(Energy, -0.4), (Arousal, -0.3)], &[]),
    ("neutral",      &[], &[]),
    // negative
    ("sad",          &[(Pleasure, -0.4), (Arousal, -0.2), (Energy, -0.2)], &[(Sadness, 0.5)]),
    ("lonely",       &[(Pleasure, -0.3), (Connection, -0.4)], &[(Sadness, 0.4)]),
    ("disappointed", &[(Pleasure, -0.3), (Trust, -0.1), (Energy, -0.1)], &[(Sadness, 0.3)]),
    ("hurt",         &[(Pleasure, -0.4), (Trust, -0.3), (Connection, -0.2)], &[(Sadness, 0.4), (Anger, 0.1)]),
    ("anxious",      &[(Pleasure, -0.2), (Arousal, 0.4), (Dominance, -0.3)], &[(Fear, 0.4)]),
    ("afraid",       &[(Pleasure, -0.4), (Arousal, 0.5), (Dominance, -0.4)], &[(Fear, 0.6)]),
    ("angry",        &[(Pleasure, -0.4), (Arousal, 0.5), (Dominance, 0.3), (Trust, -0.1)], &[(Anger, 0.6)]),
    ("frustrated",   &[(Pleasure, -0.3), (Arousal, 0.3), (Dominance, -0.1), (Energy, -0.1)], &[(Anger, 0.4)]),
    ("annoyed",      &[(Pleasure, -0.2), (Arousal, 0.2)], &[(Anger, 0.3), (Disgust, 0.1)]),
    ("disgusted",    &[(Pleasure, -0.4), (Arousal, 0.2), (Trust, -0.2)], &[(Disgust, 0.6)]),
    ("jealous",      &[(Pleasure, -0.3), (Arousal, 0.3), (Trust, -0.2)], &[(Anger, 0.3), (Sadness, 0.1)]),
    ("embarrassed",  &[(Pleasure, -0.2), (Arousal, 0.3), (Dominance, -0.3)], &[(Fear, 0.1), (Sadness, 0.1)]),
    ("ashamed",      &[(Pleasure, -0.3), (Dominance, -0.4), (Connection, -0.1)], &[(Sadness, 0.3)]),
    ("guilty",       &[(Pleasure, -0.3), (Dominance, -0.2)], &[(Sadness, 0.3), (Fear, 0.1)]),
];

#[rustfmt::skip]
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("joy", "happy"), ("joyful", "happy"), ("glad", "happy"), ("cheerful", "happy"),
    ("delighted", "happy"), ("happiness", "happy"),
    ("thrilled", "excited"), ("enthusiastic", "excited"), ("eager", "excited"),
    ("satisfied", "content"), ("pleased", "content"),
    ("thankful", "grateful"), ("appreciative", "grateful"),
    ("accomplished", "proud"),
    ("funny", "amused"), ("entertained", "amused"), ("laughing", "amused"),
    ("love", "loving"), ("affectionate", "loving"), ("caring", "loving"), ("warm", "loving"),
    ("optimistic", "hopeful"),
    ("reassured", "relieved"),
    ("silly", "playful"), ("mischievous", "playful"),
    ("relaxed", "calm"), ("serene", "calm"), ("peaceful", "calm"),
    ("intrigued", "curious"), ("fascinated", "curious"), ("inquisitive", "curious"),
    ("engaged", "interested"),
    ("determined", "focused"), ("concentrated", "focused"),
    ("shocked", "surprised"), ("astonished", "surprised"), ("amazed", "surprised"),
    ("startled", "surprised"), ("surprise", "surprised"),
    ("puzzled", "confused"), ("perplexed", "confused"), ("uncertain", "confused"),
    ("uninterested", "bored"), ("apathetic", "bored"),
    ("exhausted", "tired"), ("sleepy", "tired"), ("drained", "tired"), ("fatigued", "tired"),
    ("indifferent", "neutral"), ("none", "neutral"),
    ("unhappy", "sad"), ("sorrow", "sad"), ("sadness", "sad"), ("down", "sad"),
    ("depressed", "sad"), ("grief", "sad"), ("melancholy", "sad"), ("upset", "sad"),
    ("isolated", "lonely"),
    ("letdown", "disappointed"),
    ("wounded", "hurt"), ("betrayed", "hurt"),
    ("worried", "anxious"), ("nervous", "anxious"), ("stressed", "anxious"),
    ("uneasy", "anxious"), ("tense", "anxious"),
    ("scared", "afraid"), ("fearful", "afraid"), ("terrified", "afraid"),
    ("frightened", "afraid"), ("fear", "afraid"),
    ("rage", "angry"), ("furious", "angry"), ("mad", "angry"), ("irate", "angry"),
    ("enraged", "angry"), ("anger", "angry"),
    ("irritated", "frustrated"), ("exasperated", "frustrated"),
    ("bothered", "annoyed"), ("irked", "annoyed"),
    ("repulsed", "disgusted"), ("revolted", "disgusted"), ("disgust", "disgusted"),
    ("envious", "jealous"),
    ("awkward", "embarrassed"), ("flustered", "embarrassed"),
    ("shame", "ashamed"),
    ("remorseful", "guilty"), ("regretful", "guilty"),
];

static BUILTIN_TABLE: Lazy<LabelTable> = Lazy::new(|| {
    let mappings = BUILTIN_LABELS
        .iter()
        .map(|&(label, dims, emotions)| {
            let mapping = EmotionMapping {
                dimensions: dims.iter().copied().collect(),
                emotions: emotions.iter().copied().collect(),
            };
            (label.to_string(), mapping)
        })
        .collect();
    let aliases = BUILTIN_ALIASES
        .iter()
        .map(|&(alias, canonical)| (alias.to_string(), canonical.to_string()))
        .collect();
    LabelTable { mappings, aliases }
});

/// Either side of the affect state a delta can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AffectTarget {
    Dimension(Dimension),
    Emotion(Emotion),
}

impl FromStr for AffectTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(dim) = s.parse::<Dimension>() {
            return Ok(AffectTarget::Dimension(dim));
        }
        if let Ok(emotion) = s.parse::<Emotion>() {
            return Ok(AffectTarget::Emotion(emotion));
        }
        Err(CoreError::UnknownTarget {
            name: s.to_string(),
            valid: format!("{}, {}", Dimension::valid_names(), Emotion::valid_names()),
        })
    }
}

/// Sparse delta vector for one canonical label, calibrated at intensity 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionMapping {
    #[serde(default)]
    pub dimensions: BTreeMap<Dimension, f32>,
    #[serde(default)]
    pub emotions: BTreeMap<Emotion, f32>,
}

impl EmotionMapping {
    /// Build from `{target name → delta}` pairs, as written in config files.
    pub fn from_named<'a, I>(deltas: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a f32)>,
    {
        let mut mapping = EmotionMapping::default();
        for (name, &delta) in deltas {
            match name.parse::<AffectTarget>()? {
                AffectTarget::Dimension(d) => {
                    mapping.dimensions.insert(d, delta);
                }
                AffectTarget::Emotion(e) => {
                    mapping.emotions.insert(e, delta);
                }
            }
        }
        Ok(mapping)
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty() && self.emotions.is_empty()
    }

    /// `new = clamp(old + delta * intensity)` for every present delta.
    pub fn apply(
        &self,
        dims: &DimensionalState,
        emotions: &BasicEmotions,
        intensity: f32,
    ) -> (DimensionalState, BasicEmotions) {
        let mut next_dims = *dims;
        let mut next_emotions = *emotions;
        for (&dim, &delta) in &self.dimensions {
            next_dims.add(dim, delta * intensity);
        }
        for (&emotion, &delta) in &self.emotions {
            next_emotions.add(emotion, delta * intensity);
        }
        (next_dims, next_emotions)
    }
}

/// Canonical label table plus aliases.
#[derive(Debug, Clone)]
pub struct LabelTable {
    mappings: HashMap<String, EmotionMapping>,
    aliases: HashMap<String, String>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl LabelTable {
    /// The shared built-in table.
    pub fn builtin() -> &'static LabelTable {
        &BUILTIN_TABLE
    }

    /// A new table with `custom` labels and `aliases` layered over `self`.
    /// Later entries override earlier ones for the same key.
    pub fn with_custom<L, A>(&self, custom: L, aliases: A) -> LabelTable
    where
        L: IntoIterator<Item = (String, EmotionMapping)>,
        A: IntoIterator<Item = (String, String)>,
    {
        let mut merged = self.clone();
        for (label, mapping) in custom {
            let key = normalize_label(&label);
            // A custom canonical label shadows any alias of the same spelling.
            merged.aliases.remove(&key);
            merged.mappings.insert(key, mapping);
        }
        for (alias, canonical) in aliases {
            merged
                .aliases
                .insert(normalize_label(&alias), normalize_label(&canonical));
        }
        merged
    }

    /// Canonical label for `label`, or `None` when it is unknown.
    ///
    /// Unknown labels are not an error: they originate from free-form
    /// classifier output and must degrade to "no effect". Unknown *field*
    /// names, by contrast, are rejected (see [`CoreError`]).
    pub fn resolve(&self, label: &str) -> Option<&str> {
        let key = normalize_label(label);
        let canonical = self.aliases.get(&key).unwrap_or(&key);
        self.mappings
            .get_key_value(canonical.as_str())
            .map(|(k, _)| k.as_str())
    }

    pub fn mapping(&self, label: &str) -> Option<&EmotionMapping> {
        let canonical = self.resolve(label)?;
        self.mappings.get(canonical)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.resolve(label).is_some()
    }

    /// Apply `label` at `intensity`. Unknown labels return the inputs unchanged.
    pub fn apply(
        &self,
        label: &str,
        dims: &DimensionalState,
        emotions: &BasicEmotions,
        intensity: f32,
    ) -> (DimensionalState, BasicEmotions) {
        match self.mapping(label) {
            Some(mapping) => mapping.apply(dims, emotions, intensity),
            None => {
                tracing::debug!("Unknown emotion label '{}', no effect", label);
                (*dims, *emotions)
            }
        }
    }

    pub fn canonical_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.mappings.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Number of surface forms that resolve to a mapping.
    pub fn surface_forms(&self) -> usize {
        let live_aliases = self
            .aliases
            .iter()
            .filter(|(alias, canonical)| {
                !self.mappings.contains_key(alias.as_str()) && self.mappings.contains_key(canonical.as_str())
            })
            .count();
        self.mappings.len() + live_aliases
    }

    /// Aliases whose target is not a known canonical label.
    pub fn dangling_aliases(&self) -> Vec<(&str, &str)> {
        let mut dangling: Vec<(&str, &str)> = self
            .aliases
            .iter()
            .filter(|(_, canonical)| !self.mappings.contains_key(canonical.as_str()))
            .map(|(a, c)| (a.as_str(), c.as_str()))
            .collect();
        dangling.sort_unstable();
        dangling
    }
}

/// Lowercase and trim.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

//! Engine state aggregate and its records
//!
//! `EngineState` is the single persisted document per agent identity. It is a
//! plain value: every orchestrator operation takes `&EngineState` and returns a
//! new one, so an older snapshot held elsewhere is never affected.

use anima_core::bounds::{clamp_unipolar, deserialize_safe_f32, sanitize_f32};
use anima_core::persona::{BaseRates, DimensionRates, EmotionRates};
use anima_core::{
    response_intensity_multiplier, rumination_probability, BasicEmotions, DimensionalState,
    OceanProfile, PersonalityDerivation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current persisted schema. Older documents are migrated before they reach
/// the engine; newer ones are rejected by the store.
pub const SCHEMA_VERSION: u32 = 2;

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Who a stimulus or classification is attributed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRole {
    #[default]
    User,
    Agent,
    System,
}

impl SourceRole {
    /// Key of this role's identity bucket.
    pub fn key(self) -> &'static str {
        match self {
            SourceRole::User => "user",
            SourceRole::Agent => "agent",
            SourceRole::System => "system",
        }
    }
}

/// Immutable record of one applied stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionStimulus {
    pub id: Uuid,
    pub timestamp: i64,
    pub label: String,
    /// Effective intensity after personality scaling
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub intensity: f32,
    pub trigger: String,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub confidence: f32,
    pub source: SourceRole,
}

/// Result handed over by an external emotion classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub intensity: f32,
    #[serde(default)]
    pub reason: String,
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, intensity: f32, confidence: f32) -> Self {
        Self {
            label: label.into(),
            intensity: clamp_unipolar(intensity),
            reason: String::new(),
            confidence: clamp_unipolar(confidence),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// A classification stamped with when it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityEmotion {
    pub label: String,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub intensity: f32,
    #[serde(default)]
    pub reason: String,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub confidence: f32,
    pub timestamp: i64,
}

impl IdentityEmotion {
    pub fn from_classification(c: &Classification, timestamp: i64) -> Self {
        Self {
            label: c.label.clone(),
            intensity: clamp_unipolar(c.intensity),
            reason: c.reason.clone(),
            confidence: clamp_unipolar(c.confidence),
            timestamp,
        }
    }
}

/// Latest plus capped history (newest first) of one identity's emotions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityBucket {
    pub latest: Option<IdentityEmotion>,
    #[serde(default)]
    pub history: Vec<IdentityEmotion>,
}

/// An active echo of an intense stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuminationEntry {
    pub stimulus_id: Uuid,
    pub label: String,
    pub stage: u32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub intensity: f32,
    pub last_stage_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMeta {
    pub total_updates: u64,
    pub created_at: i64,
}

/// Aggregate root: everything persisted for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub version: u32,
    pub last_updated: i64,
    pub personality: OceanProfile,
    pub dimensions: DimensionalState,
    /// Derived; repaired by `normalize` when missing or stale
    #[serde(default)]
    pub baseline: DimensionalState,
    #[serde(default)]
    pub dimension_decay_rates: DimensionRates,
    #[serde(default)]
    pub emotion_decay_rates: EmotionRates,
    pub basic_emotions: BasicEmotions,
    /// Newest first
    #[serde(default)]
    pub stimulus_history: Vec<EmotionStimulus>,
    #[serde(default)]
    pub rumination: Vec<RuminationEntry>,
    /// Per-identity buckets, keyed by role (`user`, `agent`, ...)
    #[serde(default)]
    pub identities: BTreeMap<String, IdentityBucket>,
    pub meta: EngineMeta,
}

impl Default for EngineState {
    /// The canonical empty state: neutral personality, dimensions at baseline,
    /// no emotions, no history.
    fn default() -> Self {
        Self::new_at(OceanProfile::default(), &BaseRates::default(), now_ms())
    }
}

impl EngineState {
    pub fn new_at(personality: OceanProfile, base_rates: &BaseRates, now: i64) -> Self {
        let derived = PersonalityDerivation::derive(&personality, base_rates);
        Self {
            version: SCHEMA_VERSION,
            last_updated: now,
            personality,
            dimensions: derived.baseline,
            baseline: derived.baseline,
            dimension_decay_rates: derived.dimension_decay_rates,
            emotion_decay_rates: derived.emotion_decay_rates,
            basic_emotions: BasicEmotions::default(),
            stimulus_history: Vec::new(),
            rumination: Vec::new(),
            identities: BTreeMap::new(),
            meta: EngineMeta {
                total_updates: 0,
                created_at: now,
            },
        }
    }

    /// Copy with the personality replaced and every derived field recomputed
    /// together.
    pub fn with_personality(&self, personality: OceanProfile, base_rates: &BaseRates) -> Self {
        let derived = PersonalityDerivation::derive(&personality, base_rates);
        Self {
            personality,
            baseline: derived.baseline,
            dimension_decay_rates: derived.dimension_decay_rates,
            emotion_decay_rates: derived.emotion_decay_rates,
            ..self.clone()
        }
    }

    /// True when baseline and both rate maps are exactly what `base_rates`
    /// derives from the stored personality.
    pub fn derived_matches(&self, base_rates: &BaseRates) -> bool {
        let derived = PersonalityDerivation::derive(&self.personality, base_rates);
        derived.baseline == self.baseline
            && derived.dimension_decay_rates == self.dimension_decay_rates
            && derived.emotion_decay_rates == self.emotion_decay_rates
    }

    pub fn rumination_probability(&self) -> f32 {
        rumination_probability(&self.personality)
    }

    pub fn response_multiplier(&self) -> f32 {
        response_intensity_multiplier(&self.personality)
    }

    pub fn identity(&self, key: &str) -> Option<&IdentityBucket> {
        self.identities.get(key)
    }

    pub fn normalize(&mut self, base: &BaseRates) {
        self.normalize_at(base, now_ms())
    }

    /// Sanitize a freshly loaded document in place: NaN guard and clamp every
    /// scalar, pull timestamps into `[0, now]`, and re-derive baseline and
    /// both rate maps unless they are exactly what `personality` and `base`
    /// produce.
    pub fn normalize_at(&mut self, base: &BaseRates, now: i64) {
        self.personality.normalize();
        self.dimensions.normalize();
        self.baseline.normalize();
        self.basic_emotions.normalize();

        let now = now.max(0);
        if !(0..=now).contains(&self.last_updated) {
            tracing::warn!(
                "Stored lastUpdated {} is outside [0, {}], clamping",
                self.last_updated,
                now
            );
            self.last_updated = self.last_updated.clamp(0, now);
        }
        self.meta.created_at = self.meta.created_at.clamp(0, now);

        if !self.derived_matches(base) {
            tracing::warn!("Stored baseline or decay rates do not match personality, re-deriving");
            let derived = PersonalityDerivation::derive(&self.personality, base);
            self.baseline = derived.baseline;
            self.dimension_decay_rates = derived.dimension_decay_rates;
            self.emotion_decay_rates = derived.emotion_decay_rates;
        }

        for stimulus in &mut self.stimulus_history {
            stimulus.intensity = clamp_unipolar(stimulus.intensity);
            stimulus.confidence = clamp_unipolar(sanitize_f32(stimulus.confidence, 1.0));
        }
        self.rumination.retain_mut(|entry| {
            entry.intensity = clamp_unipolar(entry.intensity);
            entry.intensity > 0.0
        });
        for bucket in self.identities.values_mut() {
            for e in bucket.latest.iter_mut().chain(bucket.history.iter_mut()) {
                e.intensity = clamp_unipolar(e.intensity);
                e.confidence = clamp_unipolar(e.confidence);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anima_core::{Emotion, Trait};

    #[test]
    fn test_default_is_canonical_empty() {
        let s = EngineState::default();
        assert_eq!(s.version, SCHEMA_VERSION);
        assert_eq!(s.dimensions, DimensionalState::default());
        assert_eq!(s.baseline, DimensionalState::default());
        assert_eq!(s.basic_emotions, BasicEmotions::default());
        assert!(s.stimulus_history.is_empty());
        assert!(s.rumination.is_empty());
        assert_eq!(s.meta.total_updates, 0);
        assert!(s.derived_matches(&BaseRates::default()));
    }

    #[test]
    fn test_with_personality_recomputes_everything() {
        let s = EngineState::new_at(OceanProfile::default(), &BaseRates::default(), 0);
        let anxious = s.personality.with(Trait::Neuroticism, 0.9);
        let s2 = s.with_personality(anxious, &BaseRates::default());
        assert!(s2.derived_matches(&BaseRates::default()));
        assert_ne!(s2.baseline, s.baseline);
        // original untouched
        assert_eq!(s.personality.neuroticism, 0.5);
    }

    #[test]
    fn test_document_uses_camel_case_keys() {
        let s = EngineState::new_at(OceanProfile::default(), &BaseRates::default(), 42);
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("lastUpdated").is_some());
        assert!(json.get("dimensionDecayRates").is_some());
        assert!(json.get("basicEmotions").is_some());
        assert_eq!(json["meta"]["createdAt"], 42);
        assert!(json["dimensionDecayRates"].get("pleasure").is_some());
    }

    #[test]
    fn test_normalize_repairs_corruption() {
        let mut s = EngineState::new_at(OceanProfile::default(), &BaseRates::default(), 0);
        s.dimensions.pleasure = f32::NAN;
        s.basic_emotions.fear = 7.0;
        s.baseline.trust = 0.99;
        s.emotion_decay_rates.remove(&Emotion::Fear);
        s.normalize_at(&BaseRates::default(), 1_000);

        assert_eq!(s.dimensions.pleasure, 0.0);
        assert_eq!(s.basic_emotions.fear, 1.0);
        assert!(s.derived_matches(&BaseRates::default()));
    }

    #[test]
    fn test_normalize_keeps_rates_for_matching_base() {
        let base = BaseRates::default().with_emotion_half_life(Emotion::Anger, 1.0);
        let mut s = EngineState::new_at(OceanProfile::default(), &base, 0);
        let before = s.clone();
        s.normalize_at(&base, 1_000);
        assert_eq!(s, before);
    }

    #[test]
    fn test_normalize_rederives_for_edited_personality() {
        let mut s = EngineState::new_at(OceanProfile::default(), &BaseRates::default(), 0);
        let neutral_sadness = s.emotion_decay_rates[&Emotion::Sadness];
        s.personality.neuroticism = 1.0;
        s.normalize_at(&BaseRates::default(), 1_000);

        assert!(s.derived_matches(&BaseRates::default()));
        assert!((s.emotion_decay_rates[&Emotion::Sadness] - neutral_sadness).abs() > 1e-4);
    }

    #[test]
    fn test_normalize_rederives_for_other_base() {
        let custom = BaseRates::default().with_emotion_half_life(Emotion::Anger, 1.0);
        let mut s = EngineState::new_at(OceanProfile::default(), &custom, 0);
        s.normalize_at(&BaseRates::default(), 1_000);
        assert!(s.derived_matches(&BaseRates::default()));
    }

    #[test]
    fn test_normalize_clamps_timestamps() {
        let mut s = EngineState::new_at(OceanProfile::default(), &BaseRates::default(), 0);
        s.last_updated = i64::MIN;
        s.meta.created_at = i64::MAX;
        s.normalize_at(&BaseRates::default(), 5_000);
        assert_eq!(s.last_updated, 0);
        assert_eq!(s.meta.created_at, 5_000);

        s.last_updated = 9_000;
        s.normalize_at(&BaseRates::default(), 5_000);
        assert_eq!(s.last_updated, 5_000);
    }

    #[test]
    fn test_role_keys() {
        assert_eq!(SourceRole::User.key(), "user");
        assert_eq!(SourceRole::Agent.key(), "agent");
        let json = serde_json::to_string(&SourceRole::Agent).unwrap();
        assert_eq!(json, "\"agent\"");
    }
}

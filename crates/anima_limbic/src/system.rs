//! State orchestrator
//!
//! `AffectEngine` composes personality, decay, label mapping and rumination
//! into transactional operations over `EngineState`. Every operation takes the
//! state by reference and returns a new value; nothing is mutated in place and
//! nothing here touches the filesystem or spawns work.
//!
//! Time-dependent operations come in two forms: `op(..)` reads the wall clock,
//! `op_at(.., now_ms)` takes an explicit Unix-millisecond timestamp.

use crate::record::{
    now_ms, Classification, EmotionStimulus, EngineState, IdentityEmotion, SourceRole,
};
use crate::rumination::RuminationAutomaton;
use anima_core::bounds::clamp_unipolar;
use anima_core::dynamics::{decay_dimensions, decay_emotions, elapsed_hours};
use anima_core::{AnimaConfig, BaseRates, CoreResult, Dimension, LabelTable, Trait};
use uuid::Uuid;

/// A stimulus about to be applied.
#[derive(Debug, Clone)]
pub struct Stimulus {
    /// Emotion label, canonical or alias
    pub label: String,
    /// Raw intensity (0.0 to 1.0), before personality scaling
    pub intensity: f32,
    /// Text that provoked it
    pub trigger: String,
    /// Classifier confidence (0.0 to 1.0)
    pub confidence: f32,
    pub source: SourceRole,
}

impl Default for Stimulus {
    fn default() -> Self {
        Self {
            label: "neutral".to_string(),
            intensity: 0.5,
            trigger: String::new(),
            confidence: 1.0,
            source: SourceRole::User,
        }
    }
}

impl Stimulus {
    pub fn new(label: impl Into<String>, intensity: f32) -> Self {
        Self {
            label: label.into(),
            intensity,
            ..Default::default()
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn with_source(mut self, source: SourceRole) -> Self {
        self.source = source;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// The affect engine: configuration plus the tables derived from it.
#[derive(Debug, Clone)]
pub struct AffectEngine {
    config: AnimaConfig,
    labels: LabelTable,
    base_rates: BaseRates,
    rumination: RuminationAutomaton,
}

impl Default for AffectEngine {
    fn default() -> Self {
        Self {
            config: AnimaConfig::default(),
            labels: LabelTable::builtin().clone(),
            base_rates: BaseRates::default(),
            rumination: RuminationAutomaton::new(Default::default()),
        }
    }
}

impl AffectEngine {
    /// Build from a config, resolving custom labels and half-life overrides.
    pub fn new(config: AnimaConfig) -> CoreResult<Self> {
        config.validate()?;
        let labels = config.label_table()?;
        let base_rates = config.base_rates()?;
        let rumination = RuminationAutomaton::new(config.rumination.clone());
        Ok(Self {
            config,
            labels,
            base_rates,
            rumination,
        })
    }

    pub fn config(&self) -> &AnimaConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn base_rates(&self) -> &BaseRates {
        &self.base_rates
    }

    /// Fresh state with the configured base rates.
    pub fn new_state(&self) -> EngineState {
        self.new_state_at(now_ms())
    }

    pub fn new_state_at(&self, now: i64) -> EngineState {
        EngineState::new_at(Default::default(), &self.base_rates, now)
    }

    /// Bring a loaded state in line with this engine's configuration:
    /// derived fields recomputed from the configured base rates when they
    /// differ, histories truncated to their caps, rumination entries already
    /// at or past the stage cap dropped.
    pub fn reconcile(&self, state: &EngineState) -> EngineState {
        let mut next = if state.derived_matches(&self.base_rates) {
            state.clone()
        } else {
            tracing::debug!("Re-deriving personality fields for configured base rates");
            state.with_personality(state.personality, &self.base_rates)
        };
        next.stimulus_history.truncate(self.config.history.max_stimuli);
        let cap = self.config.history.max_identity_history;
        for bucket in next.identities.values_mut() {
            bucket.history.truncate(cap);
        }
        let max_stages = self.config.rumination.max_stages;
        next.rumination.retain(|entry| entry.stage < max_stages);
        next
    }

    // ========================================================================
    // Decay
    // ========================================================================

    pub fn apply_decay(&self, state: &EngineState) -> EngineState {
        self.apply_decay_at(state, now_ms())
    }

    /// Relax dimensions toward baseline and emotions toward zero for the time
    /// elapsed since `last_updated`. No-op when no time has passed.
    pub fn apply_decay_at(&self, state: &EngineState, now: i64) -> EngineState {
        let hours = elapsed_hours(state.last_updated, now);
        if hours <= 0.0 {
            return state.clone();
        }
        tracing::debug!("Applying {:.3}h of decay", hours);
        EngineState {
            dimensions: decay_dimensions(
                &state.dimensions,
                &state.baseline,
                &state.dimension_decay_rates,
                hours,
            ),
            basic_emotions: decay_emotions(&state.basic_emotions, &state.emotion_decay_rates, hours),
            last_updated: now,
            ..state.clone()
        }
    }

    // ========================================================================
    // Stimuli
    // ========================================================================

    pub fn apply_stimulus(
        &self,
        state: &EngineState,
        label: &str,
        intensity: f32,
        trigger: &str,
    ) -> EngineState {
        let stimulus = Stimulus::new(label, intensity).with_trigger(trigger);
        self.apply_stimulus_at(state, &stimulus, now_ms())
    }

    /// Scale by the personality's response multiplier, apply the label's
    /// deltas, record the stimulus and maybe start rumination.
    ///
    /// Unknown labels are still recorded but change nothing and never
    /// ruminate.
    pub fn apply_stimulus_at(&self, state: &EngineState, stimulus: &Stimulus, now: i64) -> EngineState {
        let effective = (clamp_unipolar(stimulus.intensity) * state.response_multiplier()).min(1.0);
        let canonical = self.labels.resolve(&stimulus.label).map(str::to_string);

        let record = EmotionStimulus {
            id: Uuid::new_v4(),
            timestamp: now,
            label: canonical
                .clone()
                .unwrap_or_else(|| anima_core::affect::normalize_label(&stimulus.label)),
            intensity: effective,
            trigger: stimulus.trigger.clone(),
            confidence: clamp_unipolar(stimulus.confidence),
            source: stimulus.source,
        };

        let mut next = state.clone();
        match &canonical {
            Some(label) => {
                let (dims, emotions) =
                    self.labels
                        .apply(label, &state.dimensions, &state.basic_emotions, effective);
                next.dimensions = dims;
                next.basic_emotions = emotions;
                if let Some(entry) = self.rumination.try_start(
                    &state.rumination,
                    &record,
                    state.rumination_probability(),
                    now,
                ) {
                    next.rumination.push(entry);
                }
                tracing::debug!(
                    "Stimulus applied: label={} raw={:.2} effective={:.2}",
                    label,
                    stimulus.intensity,
                    effective
                );
            }
            None => {
                tracing::warn!("Unknown emotion label '{}', recorded without effect", stimulus.label);
            }
        }

        next.stimulus_history.insert(0, record);
        next.stimulus_history.truncate(self.config.history.max_stimuli);
        next.meta.total_updates += 1;
        next
    }

    // ========================================================================
    // Rumination
    // ========================================================================

    pub fn advance_rumination(&self, state: &EngineState) -> EngineState {
        self.advance_rumination_at(state, now_ms())
    }

    /// One rumination tick. Passive: the update counter is not bumped.
    pub fn advance_rumination_at(&self, state: &EngineState, now: i64) -> EngineState {
        if state.rumination.is_empty() {
            return state.clone();
        }
        let step = self.rumination.advance(
            &state.rumination,
            &state.dimensions,
            &state.basic_emotions,
            &self.labels,
            now,
        );
        EngineState {
            dimensions: step.dimensions,
            basic_emotions: step.emotions,
            rumination: step.entries,
            ..state.clone()
        }
    }

    // ========================================================================
    // Direct edits
    // ========================================================================

    /// Override one dimension (clamped).
    pub fn set_dimension(&self, state: &EngineState, dim: Dimension, value: f32) -> EngineState {
        let mut next = state.clone();
        next.dimensions.set(dim, value);
        next.meta.total_updates += 1;
        next
    }

    /// Nudge one dimension by `delta` (clamped).
    pub fn apply_dimension_delta(&self, state: &EngineState, dim: Dimension, delta: f32) -> EngineState {
        let mut next = state.clone();
        next.dimensions.add(dim, delta);
        next.meta.total_updates += 1;
        next
    }

    /// Replace one trait and recompute baseline plus both rate maps together.
    pub fn set_personality_trait(&self, state: &EngineState, t: Trait, value: f32) -> EngineState {
        let personality = state.personality.with(t, value);
        let mut next = state.with_personality(personality, &self.base_rates);
        next.meta.total_updates += 1;
        tracing::debug!("Personality trait {} set to {:.2}", t, personality.get(t));
        next
    }

    /// Reset the named dimensions (all when `None`) to baseline.
    ///
    /// A full reset also zeroes the basic emotions and clears rumination; a
    /// partial reset touches only the named dimensions.
    pub fn reset_to_baseline(&self, state: &EngineState, dims: Option<&[Dimension]>) -> EngineState {
        let mut next = state.clone();
        match dims {
            Some(dims) => {
                for &dim in dims {
                    next.dimensions.set(dim, state.baseline.get(dim));
                }
            }
            None => {
                next.dimensions = state.baseline;
                next.basic_emotions = Default::default();
                next.rumination.clear();
            }
        }
        next
    }

    // ========================================================================
    // Identities
    // ========================================================================

    pub fn record_identity_emotion(
        &self,
        state: &EngineState,
        identity: &str,
        classification: &Classification,
    ) -> EngineState {
        self.record_identity_emotion_at(state, identity, classification, now_ms())
    }

    /// Set `latest` and push onto the identity's capped history.
    pub fn record_identity_emotion_at(
        &self,
        state: &EngineState,
        identity: &str,
        classification: &Classification,
        now: i64,
    ) -> EngineState {
        let entry = IdentityEmotion::from_classification(classification, now);
        let mut next = state.clone();
        let bucket = next.identities.entry(identity.to_string()).or_default();
        bucket.history.insert(0, entry.clone());
        bucket.history.truncate(self.config.history.max_identity_history);
        bucket.latest = Some(entry);
        next
    }

    // ========================================================================
    // Full pipeline
    // ========================================================================

    pub fn ingest_classification(
        &self,
        state: &EngineState,
        classification: &Classification,
        role: SourceRole,
        trigger: &str,
    ) -> EngineState {
        self.ingest_classification_at(state, classification, role, trigger, now_ms())
    }

    /// decay → stimulus → identity record → rumination tick.
    pub fn ingest_classification_at(
        &self,
        state: &EngineState,
        classification: &Classification,
        role: SourceRole,
        trigger: &str,
        now: i64,
    ) -> EngineState {
        let stimulus = Stimulus {
            label: classification.label.clone(),
            intensity: classification.intensity,
            trigger: trigger.to_string(),
            confidence: classification.confidence,
            source: role,
        };
        let decayed = self.apply_decay_at(state, now);
        let stimulated = self.apply_stimulus_at(&decayed, &stimulus, now);
        let recorded = self.record_identity_emotion_at(&stimulated, role.key(), classification, now);
        self.advance_rumination_at(&recorded, now)
    }
}

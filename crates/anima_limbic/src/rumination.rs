//! Rumination automaton
//!
//! An intense stimulus does not vanish once applied: it echoes forward for a
//! few ticks, re-applying a shrinking copy of its own effect.
//!
//! Per stimulus the automaton moves through
//! `Absent → Active(0) → Active(1) → … → Expired`.
//! An entry is created when effective intensity exceeds the personality-adjusted
//! threshold, and removed once its stage reaches `max_stages` or its intensity
//! falls under [`INTENSITY_FLOOR`].

use crate::record::{EmotionStimulus, RuminationEntry};
use anima_core::config::RuminationConfig;
use anima_core::{BasicEmotions, DimensionalState, LabelTable};
use uuid::Uuid;

/// Intensity multiplier applied on every advance.
pub const STAGE_DECAY: f32 = 0.8;
/// Entries weaker than this are dropped.
pub const INTENSITY_FLOOR: f32 = 0.05;
/// How strongly the personality's rumination probability raises the threshold.
pub const PERSONALITY_THRESHOLD_WEIGHT: f32 = 0.3;

/// Where a given stimulus is in its rumination lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuminationPhase {
    /// Never started, or already expired and removed.
    Absent,
    Active { stage: u32 },
}

/// Output of one advance tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RuminationStep {
    pub dimensions: DimensionalState,
    pub emotions: BasicEmotions,
    pub entries: Vec<RuminationEntry>,
    pub expired: usize,
}

#[derive(Debug, Clone)]
pub struct RuminationAutomaton {
    config: RuminationConfig,
}

impl RuminationAutomaton {
    pub fn new(config: RuminationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuminationConfig {
        &self.config
    }

    pub fn adjusted_threshold(&self, personality_probability: f32) -> f32 {
        self.config.threshold + personality_probability * PERSONALITY_THRESHOLD_WEIGHT
    }

    pub fn phase(entries: &[RuminationEntry], stimulus_id: Uuid) -> RuminationPhase {
        entries
            .iter()
            .find(|e| e.stimulus_id == stimulus_id)
            .map(|e| RuminationPhase::Active { stage: e.stage })
            .unwrap_or(RuminationPhase::Absent)
    }

    /// Entry to add for a just-applied stimulus, if it qualifies.
    ///
    /// Returns `None` when rumination is disabled, the intensity does not
    /// strictly exceed the adjusted threshold, or the stimulus is already
    /// ruminating.
    pub fn try_start(
        &self,
        entries: &[RuminationEntry],
        stimulus: &EmotionStimulus,
        personality_probability: f32,
        now: i64,
    ) -> Option<RuminationEntry> {
        if !self.config.enabled || self.config.max_stages == 0 {
            return None;
        }
        let threshold = self.adjusted_threshold(personality_probability);
        if stimulus.intensity <= threshold {
            return None;
        }
        if Self::phase(entries, stimulus.id) != RuminationPhase::Absent {
            return None;
        }
        tracing::debug!(
            "Rumination started: label={} intensity={:.2} > threshold={:.2}",
            stimulus.label,
            stimulus.intensity,
            threshold
        );
        Some(RuminationEntry {
            stimulus_id: stimulus.id,
            label: stimulus.label.clone(),
            stage: 0,
            intensity: stimulus.intensity,
            last_stage_at: now,
        })
    }

    /// One tick: apply each entry's current effect, then decay and advance it,
    /// dropping terminal entries. An empty list is a no-op.
    pub fn advance(
        &self,
        entries: &[RuminationEntry],
        dimensions: &DimensionalState,
        emotions: &BasicEmotions,
        labels: &LabelTable,
        now: i64,
    ) -> RuminationStep {
        let mut dims = *dimensions;
        let mut emos = *emotions;
        let mut survivors = Vec::with_capacity(entries.len());
        let mut expired = 0;

        for entry in entries {
            let (d, e) = labels.apply(&entry.label, &dims, &emos, entry.intensity);
            dims = d;
            emos = e;

            let next = RuminationEntry {
                stage: entry.stage.saturating_add(1),
                intensity: entry.intensity * STAGE_DECAY,
                last_stage_at: now,
                ..entry.clone()
            };
            if next.stage >= self.config.max_stages || next.intensity < INTENSITY_FLOOR {
                tracing::debug!(
                    "Rumination expired: label={} stage={} intensity={:.3}",
                    next.label,
                    next.stage,
                    next.intensity
                );
                expired += 1;
            } else {
                survivors.push(next);
            }
        }

        RuminationStep {
            dimensions: dims,
            emotions: emos,
            entries: survivors,
            expired,
        }
    }
}

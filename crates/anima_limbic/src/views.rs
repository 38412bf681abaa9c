//! Read-only views over the engine state for presentation layers.

use crate::record::EngineState;
use anima_core::{BasicEmotions, Emotion};
use serde::Serialize;

/// Emotions below this are treated as absent.
pub const EMOTION_EPSILON: f32 = 0.05;

/// Strongest basic emotion, or `None` ("neutral") when all are below epsilon.
pub fn primary_emotion(emotions: &BasicEmotions) -> Option<Emotion> {
    emotions
        .iter()
        .filter(|(_, v)| *v >= EMOTION_EPSILON)
        .fold(None, |best: Option<(Emotion, f32)>, (e, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((e, v)),
        })
        .map(|(e, _)| e)
}

pub fn primary_emotion_label(emotions: &BasicEmotions) -> &'static str {
    primary_emotion(emotions).map(Emotion::name).unwrap_or("neutral")
}

/// Peak basic-emotion value.
pub fn overall_intensity(emotions: &BasicEmotions) -> f32 {
    emotions.iter().map(|(_, v)| v).fold(0.0, f32::max)
}

pub fn mean_intensity(emotions: &BasicEmotions) -> f32 {
    let sum: f32 = emotions.iter().map(|(_, v)| v).sum();
    sum / Emotion::ALL.len() as f32
}

/// Top `n` emotions above epsilon, strongest first.
pub fn dominant_emotions(emotions: &BasicEmotions, n: usize) -> Vec<(Emotion, f32)> {
    let mut present: Vec<(Emotion, f32)> = emotions
        .iter()
        .filter(|(_, v)| *v >= EMOTION_EPSILON)
        .collect();
    present.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    present.truncate(n);
    present
}

/// Compact snapshot for status output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub primary_emotion: &'static str,
    pub intensity: f32,
    pub pleasure: f32,
    pub arousal: f32,
    pub dominance: f32,
    pub active_ruminations: usize,
    pub total_updates: u64,
    pub last_updated: i64,
}

impl EngineState {
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            primary_emotion: primary_emotion_label(&self.basic_emotions),
            intensity: overall_intensity(&self.basic_emotions),
            pleasure: self.dimensions.pleasure,
            arousal: self.dimensions.arousal,
            dominance: self.dimensions.dominance,
            active_ruminations: self.rumination.len(),
            total_updates: self.meta.total_updates,
            last_updated: self.last_updated,
        }
    }
}

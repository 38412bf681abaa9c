//! # Anima Limbic
//!
//! The stateful layer of the affect engine. `anima_core` supplies the values
//! and the pure math; this crate owns the persisted aggregate and the
//! operations that move it forward:
//!
//! - **Stimuli**: a label at some intensity, scaled by personality, applied as
//!   deltas and recorded in a capped history
//! - **Decay**: dimensions relax toward the personality baseline, emotions
//!   toward zero, at personality-tuned rates
//! - **Rumination**: intense stimuli echo for a few ticks with shrinking
//!   intensity
//! - **Identities**: the latest classified emotion per participant role
//!
//! ## Time Scales
//!
//! - Fast (hours): arousal, surprise, anger
//! - Medium (half a day to a day): pleasure, happiness, sadness, connection
//! - Slow (days): trust

pub mod record;
pub mod rumination;
mod system;
pub mod views;

pub use record::{
    now_ms, Classification, EmotionStimulus, EngineMeta, EngineState, IdentityBucket,
    IdentityEmotion, RuminationEntry, SourceRole, SCHEMA_VERSION,
};
pub use rumination::{RuminationAutomaton, RuminationPhase, RuminationStep};
pub use system::{AffectEngine, Stimulus};
pub use views::{
    dominant_emotions, mean_intensity, overall_intensity, primary_emotion, primary_emotion_label,
    StateSummary,
};

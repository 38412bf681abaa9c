//! # Anima Core
//!
//! The value layer of the affect engine: bounded scalars, the OCEAN
//! personality and what it derives, exponential decay, and the emotion-label
//! table. Everything here is a pure function over `Copy` values.

pub mod affect;
pub mod bounds;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod persona;
pub mod state;

pub use affect::{AffectTarget, EmotionMapping, LabelTable};
pub use bounds::{clamp_bipolar, clamp_unipolar, Polarity};
pub use config::AnimaConfig;
pub use dynamics::{decay_dimensions, decay_emotions, decay_toward_baseline};
pub use error::{CoreError, CoreResult};
pub use persona::{
    response_intensity_multiplier, rumination_probability, BaseRates, DimensionRates,
    EmotionRates, PersonalityDerivation,
};
pub use state::{BasicEmotions, Dimension, DimensionalState, Emotion, OceanProfile, Trait};

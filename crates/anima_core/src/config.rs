use crate::affect::{EmotionMapping, LabelTable};
use crate::error::{CoreError, CoreResult};
use crate::persona::BaseRates;
use crate::state::{Dimension, Emotion};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnimaConfig {
    pub decay: DecayConfig,
    pub rumination: RuminationConfig,
    pub history: HistoryConfig,
    pub labels: LabelConfig,
    pub storage: StorageConfig,
}

impl AnimaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and names are validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: AnimaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists; only an absent file falls back to
    /// defaults (with env overrides). A file that exists but cannot be read,
    /// parsed or validated is an error.
    pub fn load_if_exists<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config file at {}, using defaults", path.display());
            let mut cfg = Self::default();
            cfg.apply_env_overrides();
            return Ok(cfg);
        }
        Self::load(path)
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ANIMA_RUMINATION_ENABLED") {
            if let Ok(b) = v.parse() {
                self.rumination.enabled = b;
            }
        }
        if let Ok(v) = std::env::var("ANIMA_RUMINATION_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.rumination.threshold = n;
            }
        }
        if let Ok(v) = std::env::var("ANIMA_RUMINATION_MAX_STAGES") {
            if let Ok(n) = v.parse() {
                self.rumination.max_stages = n;
            }
        }
        if let Ok(v) = std::env::var("ANIMA_MAX_HISTORY") {
            if let Ok(n) = v.parse() {
                self.history.max_stimuli = n;
            }
        }
        if let Ok(v) = std::env::var("ANIMA_STATE_PATH") {
            self.storage.state_path = PathBuf::from(v);
        }
    }

    /// Resolve every name used in the config. Unknown dimension, emotion or
    /// affect-target names are errors naming the valid set.
    pub fn validate(&self) -> CoreResult<()> {
        self.base_rates()?;
        let table = self.label_table()?;
        if let Some((alias, canonical)) = table.dangling_aliases().first() {
            return Err(CoreError::InvalidConfig(format!(
                "alias '{}' points at unknown label '{}'",
                alias, canonical
            )));
        }
        if !(0.0..=1.0).contains(&self.rumination.threshold) {
            return Err(CoreError::InvalidConfig(format!(
                "rumination.threshold must be in [0, 1], got {}",
                self.rumination.threshold
            )));
        }
        Ok(())
    }

    /// Built-in base rates with half-life overrides applied.
    pub fn base_rates(&self) -> CoreResult<BaseRates> {
        let mut rates = BaseRates::default();
        for (name, &hours) in &self.decay.dimension_half_life_hours {
            let dim: Dimension = name.parse()?;
            check_half_life(name, hours)?;
            rates = rates.with_dimension_half_life(dim, hours);
        }
        for (name, &hours) in &self.decay.emotion_half_life_hours {
            let emotion: Emotion = name.parse()?;
            check_half_life(name, hours)?;
            rates = rates.with_emotion_half_life(emotion, hours);
        }
        Ok(rates)
    }

    /// Built-in label table with custom labels and aliases merged in.
    pub fn label_table(&self) -> CoreResult<LabelTable> {
        let mut custom = Vec::with_capacity(self.labels.custom.len());
        for (label, deltas) in &self.labels.custom {
            custom.push((label.clone(), EmotionMapping::from_named(deltas)?));
        }
        let aliases = self
            .labels
            .aliases
            .iter()
            .map(|(a, c)| (a.clone(), c.clone()));
        Ok(LabelTable::builtin().with_custom(custom, aliases))
    }
}

fn check_half_life(name: &str, hours: f32) -> CoreResult<()> {
    if hours.is_finite() && hours > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidConfig(format!(
            "half-life for '{}' must be a positive number of hours, got {}",
            name, hours
        )))
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Per-dimension half-life overrides, keyed by dimension name.
    pub dimension_half_life_hours: BTreeMap<String, f32>,
    /// Per-emotion half-life overrides, keyed by emotion name.
    pub emotion_half_life_hours: BTreeMap<String, f32>,
    /// Lock markers older than this are treated as abandoned.
    pub lock_stale_ms: u64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            dimension_half_life_hours: BTreeMap::new(),
            emotion_half_life_hours: BTreeMap::new(),
            lock_stale_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuminationConfig {
    pub enabled: bool,
    /// Effective intensity a stimulus must exceed (before the personality
    /// adjustment) to start echoing.
    pub threshold: f32,
    pub max_stages: u32,
}

impl Default for RuminationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.6,
            max_stages: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_stimuli: usize,
    pub max_identity_history: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_stimuli: 100,
            max_identity_history: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// `label → { target name → delta }`
    pub custom: BTreeMap<String, BTreeMap<String, f32>>,
    /// `alias → canonical label`
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            state_path: base.join("anima").join("state.json"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

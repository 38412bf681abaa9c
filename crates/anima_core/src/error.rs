use thiserror::Error;

/// Errors raised for caller misuse of structural names.
///
/// Emotion *labels* are deliberately not part of this taxonomy: they come from
/// free-form classifier output and resolve to "no effect" when unknown (see
/// [`crate::affect::LabelTable::resolve`]). Dimension, emotion and trait *names*
/// come from trusted callers and config files, so a typo there is an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("unknown dimension '{name}' (valid: {valid})")]
    UnknownDimension { name: String, valid: String },

    #[error("unknown emotion '{name}' (valid: {valid})")]
    UnknownEmotion { name: String, valid: String },

    #[error("unknown personality trait '{name}' (valid: {valid})")]
    UnknownTrait { name: String, valid: String },

    #[error("unknown affect target '{name}' (valid dimensions or emotions: {valid})")]
    UnknownTarget { name: String, valid: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the durable store.
///
/// Parse failures are absent on purpose: a document that cannot be read back
/// degrades to the default state on load instead of surfacing here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer holds a fresh lock. The caller decides whether to retry.
    #[error("state file {} is locked by another writer, could not save", path.display())]
    LockBusy { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_lock_busy(&self) -> bool {
        matches!(self, StoreError::LockBusy { .. })
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

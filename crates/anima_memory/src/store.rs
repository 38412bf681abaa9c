//! JSON file persistence for `EngineState`
//!
//! Reads are lenient and lock-free: a missing, unreadable, malformed or
//! too-new document yields the default state. Writes are atomic (temp sibling
//! plus rename) and happen under the advisory lock.

use crate::error::{StoreError, StoreResult};
use crate::lock::{acquire_lock, lock_path_for, LockOutcome, DEFAULT_STALE_MS};
use anima_core::{AnimaConfig, BaseRates, CoreResult};
use anima_limbic::{EngineState, SCHEMA_VERSION};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Where engine state lives between process runs.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current state, or the default state when nothing usable is stored.
    async fn load(&self) -> EngineState;

    /// Persist `state` under the lock. `LockBusy` means nothing was written.
    async fn save(&self, state: &EngineState) -> StoreResult<()>;
}

/// Load the document at `path`, degrading to the default state. Derived
/// fields that do not match the stored personality under `base_rates` are
/// re-derived.
pub async fn load_state(path: &Path, base_rates: &BaseRates) -> EngineState {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("No state at {}, starting from defaults", path.display());
            return EngineState::default();
        }
        Err(e) => {
            tracing::warn!("Failed to read state {}: {}, using defaults", path.display(), e);
            return EngineState::default();
        }
    };

    let mut state: EngineState = match serde_json::from_slice(&bytes) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("Corrupt state file {}: {}, using defaults", path.display(), e);
            return EngineState::default();
        }
    };
    if state.version > SCHEMA_VERSION {
        tracing::warn!(
            "State file {} has schema version {} (supported: {}), using defaults",
            path.display(),
            state.version,
            SCHEMA_VERSION
        );
        return EngineState::default();
    }

    state.normalize(base_rates);
    state.version = SCHEMA_VERSION;
    state
}

/// Atomically replace the document at `path`. Parent directories are created;
/// a failed write leaves the previous document intact.
pub async fn save_state(path: &Path, state: &EngineState) -> StoreResult<()> {
    let json = serde_json::to_vec_pretty(state)?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| StoreError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    if let Err(e) = write_synced(&tmp, &json).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, e));
    }
    tracing::debug!("State saved to {}", path.display());
    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.sync_all().await.map_err(|e| StoreError::io(path, e))
}

/// The state document at one path, with its lock marker beside it.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    stale_ms: u64,
    base_rates: BaseRates,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            lock_path: lock_path_for(&path),
            path,
            stale_ms: DEFAULT_STALE_MS,
            base_rates: BaseRates::default(),
        }
    }

    /// Store at the configured path, loading with the configured base rates.
    pub fn from_config(config: &AnimaConfig) -> CoreResult<Self> {
        Ok(Self::new(config.storage.state_path.clone())
            .with_stale_ms(config.decay.lock_stale_ms)
            .with_base_rates(config.base_rates()?))
    }

    pub fn with_base_rates(mut self, base_rates: BaseRates) -> Self {
        self.base_rates = base_rates;
        self
    }

    pub fn with_stale_ms(mut self, stale_ms: u64) -> Self {
        self.stale_ms = stale_ms;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Load, transform and save with the lock held throughout, so no other
    /// writer can interleave between read and write.
    ///
    /// Returns the saved state. A busy lock returns `LockBusy` without
    /// calling `f` and without retrying.
    pub async fn transact<F>(&self, f: F) -> StoreResult<EngineState>
    where
        F: FnOnce(EngineState) -> EngineState + Send,
    {
        let guard = match acquire_lock(&self.lock_path, self.stale_ms).await? {
            LockOutcome::Acquired(guard) => guard,
            LockOutcome::Busy => {
                return Err(StoreError::LockBusy {
                    path: self.path.clone(),
                })
            }
        };

        let current = load_state(&self.path, &self.base_rates).await;
        let next = f(current);
        let saved = save_state(&self.path, &next).await;
        let released = guard.release().await;
        saved?;
        released?;
        Ok(next)
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> EngineState {
        load_state(&self.path, &self.base_rates).await
    }

    async fn save(&self, state: &EngineState) -> StoreResult<()> {
        let guard = match acquire_lock(&self.lock_path, self.stale_ms).await? {
            LockOutcome::Acquired(guard) => guard,
            LockOutcome::Busy => {
                tracing::warn!("Could not save {}: lock busy", self.path.display());
                return Err(StoreError::LockBusy {
                    path: self.path.clone(),
                });
            }
        };
        let saved = save_state(&self.path, state).await;
        let released = guard.release().await;
        saved?;
        released
    }
}

//! Advisory lock marker
//!
//! Cross-process mutual exclusion for writers of one state file. The lock is a
//! sibling marker file created with `create_new`; whoever creates it owns the
//! lock until the marker is removed. A marker whose mtime is older than the
//! staleness window is considered abandoned by a crashed writer and may be
//! taken over.
//!
//! Each acquisition writes its own token into the marker. A guard only
//! removes a marker that still carries its token, so a writer whose lock was
//! broken as stale cannot delete the marker of the process that took over.
//!
//! Acquisition never blocks: contention is reported as [`LockOutcome::Busy`]
//! and retry policy is left to the caller.

use crate::error::{StoreError, StoreResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

pub const DEFAULT_STALE_MS: u64 = 10_000;

/// `state.json` → `state.json.lock`
pub fn lock_path_for(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    state_path.with_file_name(name)
}

/// Result of a non-blocking acquire.
#[derive(Debug)]
pub enum LockOutcome {
    Acquired(LockGuard),
    Busy,
}

impl LockOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, LockOutcome::Acquired(_))
    }
}

/// Held lock. Removes the marker on `release`, or on drop as a fallback so
/// every exit path gives the lock back. Either way the marker is only removed
/// while it still carries this guard's token.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    token: Uuid,
    released: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub async fn release(mut self) -> StoreResult<()> {
        self.released = true;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if owns(&content, self.token) => release_lock(&self.path).await,
            Ok(_) => {
                tracing::warn!("Lock {} was taken over, leaving it in place", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::read_to_string(&self.path) {
            Ok(content) if owns(&content, self.token) => {}
            Ok(_) => {
                tracing::warn!("Lock {} was taken over, leaving it in place", self.path.display());
                return;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!("Failed to read lock {}: {}", self.path.display(), e);
                return;
            }
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Lock released on drop: {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove lock {}: {}", self.path.display(), e),
        }
    }
}

/// Marker content is `<pid> <token>`.
fn owns(content: &str, token: Uuid) -> bool {
    content
        .split_whitespace()
        .nth(1)
        .and_then(|t| t.parse::<Uuid>().ok())
        == Some(token)
}

/// Try to take the lock at `path`.
///
/// Creates the marker exclusively. If it already exists and is older than
/// `stale_ms`, it is removed and creation is retried once; a fresh marker, or
/// losing the retry race to another process, yields `Busy`.
pub async fn acquire_lock(path: &Path, stale_ms: u64) -> StoreResult<LockOutcome> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let token = Uuid::new_v4();
    if try_create(path, token).await? {
        return Ok(acquired(path, token));
    }

    if !is_stale(path, Duration::from_millis(stale_ms)).await? {
        tracing::debug!("Lock busy: {}", path.display());
        return Ok(LockOutcome::Busy);
    }

    tracing::info!("Breaking stale lock: {}", path.display());
    release_lock(path).await?;
    if try_create(path, token).await? {
        Ok(acquired(path, token))
    } else {
        Ok(LockOutcome::Busy)
    }
}

/// Remove the marker whoever owns it. Absent markers are not an error.
pub async fn release_lock(path: &Path) -> StoreResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!("Lock released: {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

fn acquired(path: &Path, token: Uuid) -> LockOutcome {
    tracing::debug!("Lock acquired: {}", path.display());
    LockOutcome::Acquired(LockGuard {
        path: path.to_path_buf(),
        token,
        released: false,
    })
}

/// `Ok(false)` when the marker already exists.
async fn try_create(path: &Path, token: Uuid) -> StoreResult<bool> {
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await;
    match file {
        Ok(mut file) => {
            // Pid for whoever finds the marker by hand; token for release.
            let content = format!("{} {}\n", std::process::id(), token);
            let written = match file.write_all(content.as_bytes()).await {
                Ok(()) => file.sync_all().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                drop(file);
                let _ = tokio::fs::remove_file(path).await;
                return Err(StoreError::io(path, e));
            }
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

async fn is_stale(path: &Path, window: Duration) -> StoreResult<bool> {
    let modified = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.modified().map_err(|e| StoreError::io(path, e))?,
        // Released between our create attempt and now.
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    Ok(age > window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_for() {
        assert_eq!(
            lock_path_for(Path::new("/data/anima/state.json")),
            PathBuf::from("/data/anima/state.json.lock")
        );
        assert_eq!(lock_path_for(Path::new("s.json")), PathBuf::from("s.json.lock"));
    }

    #[tokio::test]
    async fn test_guard_drop_releases() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json.lock");
        {
            let outcome = acquire_lock(&path, DEFAULT_STALE_MS).await.unwrap();
            assert!(outcome.is_acquired());
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_acquire_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a/b/state.json.lock");
        match acquire_lock(&path, DEFAULT_STALE_MS).await.unwrap() {
            LockOutcome::Acquired(guard) => {
                assert_eq!(guard.path(), path.as_path());
                guard.release().await.unwrap();
            }
            LockOutcome::Busy => panic!("fresh path reported busy"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_owns_matches_token_only() {
        let token = Uuid::new_v4();
        assert!(owns(&format!("42 {}\n", token), token));
        assert!(!owns(&format!("42 {}\n", Uuid::new_v4()), token));
        assert!(!owns("42\n", token));
        assert!(!owns("", token));
    }

    #[tokio::test]
    async fn test_marker_carries_guard_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json.lock");
        match acquire_lock(&path, DEFAULT_STALE_MS).await.unwrap() {
            LockOutcome::Acquired(guard) => {
                let content = std::fs::read_to_string(&path).unwrap();
                assert!(owns(&content, guard.token()));
                assert!(content.starts_with(&std::process::id().to_string()));
                guard.release().await.unwrap();
            }
            LockOutcome::Busy => panic!("fresh path reported busy"),
        }
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.lock");
        release_lock(&path).await.unwrap();
        release_lock(&path).await.unwrap();
    }
}

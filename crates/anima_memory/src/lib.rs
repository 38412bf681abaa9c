//! # Anima Memory
//!
//! Durable storage for the engine state: one JSON document per agent, written
//! atomically and guarded by an advisory lock marker so independent processes
//! can safely run load → transform → save against the same file.

pub mod error;
pub mod lock;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use lock::{acquire_lock, lock_path_for, release_lock, LockGuard, LockOutcome, DEFAULT_STALE_MS};
pub use store::{load_state, save_state, JsonFileStore, StateStore};

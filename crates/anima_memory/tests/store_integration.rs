//! Integration tests for JsonFileStore and the advisory lock
//!
//! Uses tempfile::TempDir for isolated state files.

use anima_core::{AnimaConfig, BaseRates, Emotion};
use anima_limbic::{AffectEngine, EngineState, RuminationEntry, Stimulus};
use anima_memory::{
    acquire_lock, load_state, release_lock, save_state, JsonFileStore, LockOutcome, StateStore,
    StoreError, DEFAULT_STALE_MS,
};
use filetime::FileTime;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn backdate(path: &std::path::Path, by: Duration) {
    let then = SystemTime::now() - by;
    filetime::set_file_mtime(path, FileTime::from_system_time(then)).unwrap();
}

/// Test 1: fresh acquire, busy second acquire, release, re-acquire
#[tokio::test]
async fn test_lock_lifecycle() {
    let dir = tempfile::TempDir::new().unwrap();
    let lock = dir.path().join("state.json.lock");

    let first = acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap();
    assert!(first.is_acquired());

    let second = acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap();
    assert!(matches!(second, LockOutcome::Busy));

    // Release through the free function; the guard's drop is then a no-op.
    release_lock(&lock).await.unwrap();
    release_lock(&lock).await.unwrap();
    drop(first);

    let third = acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap();
    assert!(third.is_acquired());
}

/// Test 2: a marker older than the staleness window is taken over
#[tokio::test]
async fn test_stale_lock_is_broken() {
    let dir = tempfile::TempDir::new().unwrap();
    let lock = dir.path().join("state.json.lock");
    std::fs::write(&lock, "12345\n").unwrap();
    backdate(&lock, Duration::from_secs(60));

    let outcome = acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap();
    assert!(outcome.is_acquired());
    assert!(lock.exists());
}

/// Test 3: a marker inside the staleness window is respected
#[tokio::test]
async fn test_fresh_foreign_lock_is_busy() {
    let dir = tempfile::TempDir::new().unwrap();
    let lock = dir.path().join("state.json.lock");
    std::fs::write(&lock, "12345\n").unwrap();
    backdate(&lock, Duration::from_secs(2));

    let outcome = acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap();
    assert!(matches!(outcome, LockOutcome::Busy));
    // Foreign marker untouched
    assert!(lock.exists());
}

/// Test 4: malformed content loads as the canonical default state
#[tokio::test]
async fn test_malformed_file_loads_default() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let state = load_state(&path, &BaseRates::default()).await;
    let default = EngineState::default();
    assert_eq!(state.dimensions, default.dimensions);
    assert_eq!(state.baseline, default.baseline);
    assert_eq!(state.personality, default.personality);
    assert_eq!(state.basic_emotions, default.basic_emotions);
    assert!(state.stimulus_history.is_empty());
    assert_eq!(state.meta.total_updates, 0);
}

/// Test 5: save then load returns an equal state
#[tokio::test]
async fn test_save_and_reload() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path().join("agent/state.json"));
    let engine = AffectEngine::default();

    let state = engine.apply_stimulus_at(&engine.new_state_at(1_000), &Stimulus::new("angry", 0.8), 1_000);
    store.save(&state).await.unwrap();
    assert!(!store.lock_path().exists());

    let loaded = store.load().await;
    assert_eq!(loaded, state);
}

/// Test 6: out-of-range and null values in a hand-edited file are repaired
#[tokio::test]
async fn test_load_sanitizes_document() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    let mut doc = serde_json::to_value(EngineState::default()).unwrap();
    doc["dimensions"]["pleasure"] = serde_json::json!(4.2);
    doc["basicEmotions"]["fear"] = serde_json::Value::Null;
    doc["baseline"]["trust"] = serde_json::json!(0.01);
    doc.as_object_mut().unwrap().remove("emotionDecayRates");
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

    let state = load_state(&path, &BaseRates::default()).await;
    assert_eq!(state.dimensions.pleasure, 1.0);
    assert_eq!(state.basic_emotions.fear, 0.0);
    assert_eq!(state.baseline, EngineState::default().baseline);
    assert!(state.derived_matches(&Default::default()));
}

/// Test 7: transact under a held lock fails without calling the closure
#[tokio::test]
async fn test_transact_busy() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path().join("state.json"));
    let _held = acquire_lock(store.lock_path(), DEFAULT_STALE_MS).await.unwrap();

    let mut called = false;
    let result = store
        .transact(|s| {
            called = true;
            s
        })
        .await;
    assert!(matches!(result, Err(StoreError::LockBusy { .. })));
    assert!(!called);
    assert!(!store.path().exists());
}

/// Test 8: sequential transactions accumulate and release the lock
#[tokio::test]
async fn test_transact_accumulates() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path().join("state.json"));
    let engine = AffectEngine::default();

    for _ in 0..3 {
        store
            .transact(|s| engine.apply_stimulus(&s, "happy", 0.3, "good news"))
            .await
            .unwrap();
    }
    let state = store.load().await;
    assert_eq!(state.meta.total_updates, 3);
    assert_eq!(state.stimulus_history.len(), 3);
    assert!(!store.lock_path().exists());
}

/// Test 9: concurrent writers never corrupt the file; losers see LockBusy
#[tokio::test]
async fn test_concurrent_transactions() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("state.json")));

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let engine = AffectEngine::default();
            store
                .transact(move |s| engine.apply_stimulus(&s, "curious", 0.1 * i as f32, ""))
                .await
        }));
    }

    let mut committed = 0u64;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => assert!(e.is_lock_busy(), "unexpected error: {}", e),
        }
    }
    assert!(committed >= 1);

    let raw = std::fs::read(store.path()).unwrap();
    let state: EngineState = serde_json::from_slice(&raw).unwrap();
    assert_eq!(state.meta.total_updates, committed);
}

/// Test 10: a guard whose stale lock was broken must not delete the new owner's marker
#[tokio::test]
async fn test_broken_guard_leaves_new_owner_marker() {
    let dir = tempfile::TempDir::new().unwrap();
    let lock = dir.path().join("state.json.lock");

    let first = match acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap() {
        LockOutcome::Acquired(guard) => guard,
        LockOutcome::Busy => panic!("fresh path reported busy"),
    };
    backdate(&lock, Duration::from_secs(60));

    let second = match acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap() {
        LockOutcome::Acquired(guard) => guard,
        LockOutcome::Busy => panic!("stale lock was not broken"),
    };
    assert_ne!(first.token(), second.token());

    first.release().await.unwrap();
    assert!(lock.exists());
    let content = std::fs::read_to_string(&lock).unwrap();
    assert!(content.contains(&second.token().to_string()));

    // A busy store sees the surviving marker.
    let store = JsonFileStore::new(dir.path().join("state.json"));
    assert!(matches!(
        store.save(&EngineState::default()).await,
        Err(StoreError::LockBusy { .. })
    ));

    second.release().await.unwrap();
    assert!(!lock.exists());
}

/// Test 11: the same takeover through the drop path
#[tokio::test]
async fn test_dropped_broken_guard_leaves_new_owner_marker() {
    let dir = tempfile::TempDir::new().unwrap();
    let lock = dir.path().join("state.json.lock");

    let first = acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap();
    assert!(first.is_acquired());
    backdate(&lock, Duration::from_secs(60));
    let second = acquire_lock(&lock, DEFAULT_STALE_MS).await.unwrap();
    assert!(second.is_acquired());

    drop(first);
    assert!(lock.exists());
    drop(second);
    assert!(!lock.exists());
}

/// Test 12: extreme stage and timestamp values load, decay and ruminate without overflow
#[tokio::test]
async fn test_extreme_counters_survive_load_and_ticks() {
    let dir = tempfile::TempDir::new().unwrap();
    let engine = AffectEngine::default();

    let mut base = engine.new_state_at(0);
    base.rumination.push(RuminationEntry {
        stimulus_id: uuid::Uuid::new_v4(),
        label: "sad".to_string(),
        stage: u32::MAX,
        intensity: 0.9,
        last_stage_at: 0,
    });
    let mut doc = serde_json::to_value(&base).unwrap();

    for last_updated in [i64::MIN, i64::MAX, -1] {
        doc["lastUpdated"] = serde_json::json!(last_updated);
        let path = dir.path().join(format!("state{}.json", last_updated));
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let loaded = load_state(&path, engine.base_rates()).await;
        assert!(loaded.last_updated >= 0);
        assert!(loaded.last_updated <= anima_limbic::now_ms());

        // Raw loaded state, before reconcile drops the over-cap entry.
        let ticked = engine.advance_rumination_at(&loaded, i64::MAX);
        assert!(ticked.rumination.is_empty());
        let decayed = engine.apply_decay_at(&loaded, i64::MAX);
        assert!(decayed.dimensions.pleasure.is_finite());

        let reconciled = engine.reconcile(&loaded);
        assert!(reconciled.rumination.is_empty());
        let decayed = engine.apply_decay_at(&reconciled, i64::MIN);
        assert_eq!(decayed.dimensions, reconciled.dimensions);
    }
}

/// Test 13: a hand-edited personality gets matching baseline and rates on load
#[tokio::test]
async fn test_load_rederives_for_edited_personality() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    let neutral = EngineState::default();
    let mut doc = serde_json::to_value(&neutral).unwrap();
    doc["personality"]["neuroticism"] = serde_json::json!(1.0);
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

    let state = load_state(&path, &BaseRates::default()).await;
    assert_eq!(state.personality.neuroticism, 1.0);
    assert!(state.derived_matches(&BaseRates::default()));
    let sadness = state.emotion_decay_rates[&Emotion::Sadness];
    assert!((sadness - neutral.emotion_decay_rates[&Emotion::Sadness]).abs() > 1e-4);
    assert_ne!(state.baseline, neutral.baseline);
}

/// Test 14: a store built from config loads with the configured half-lives
#[tokio::test]
async fn test_store_from_config_uses_configured_rates() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = AnimaConfig::default();
    config.storage.state_path = dir.path().join("state.json");
    config
        .decay
        .emotion_half_life_hours
        .insert("anger".to_string(), 1.0);
    let store = JsonFileStore::from_config(&config).unwrap();

    save_state(store.path(), &EngineState::default()).await.unwrap();
    let loaded = store.load().await;
    assert!(loaded.derived_matches(&config.base_rates().unwrap()));
    assert!(!loaded.derived_matches(&BaseRates::default()));
}

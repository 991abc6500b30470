//! Tests for Engine
//!
//! These tests verify:
//! - Point operations (count/get/exists/put/remove)
//! - Sort and parity invariants across mixed workloads
//! - Overwrite semantics
//! - Recovery: create on first open, reattach afterwards
//! - Atomicity of put/remove under injected faults and capacity exhaustion

use std::path::Path;

use sortkv::config::{Config, PoolSyncStrategy};
use sortkv::engine::{Engine, Status};
use sortkv::pool::FaultInjector;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(dir: &Path) -> Config {
    Config::builder()
        .data_dir(dir)
        .sync_strategy(PoolSyncStrategy::EveryCommit)
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(temp_dir.path())).unwrap();
    (temp_dir, engine)
}

fn all_entries(engine: &Engine) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    let status = engine.get_all(|k, v| {
        out.push((k.to_vec(), v.to_vec()));
        0
    });
    assert_eq!(status, Status::Ok);
    out
}

/// Deterministic pseudo-random sequence (64-bit LCG)
fn lcg(seed: &mut u64) -> u64 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *seed >> 33
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_pool_files() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let engine = Engine::open(test_config(&data_dir)).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("pool.log").exists());
    assert_eq!(engine.count_all(), 0);
    assert_eq!(engine.name(), "svector");
}

#[test]
fn test_engine_put_get() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.put(b"hello", b"world").unwrap();

    let mut seen = None;
    let status = engine.get(b"hello", |v| seen = Some(v.to_vec()));
    assert_eq!(status, Status::Ok);
    assert_eq!(seen, Some(b"world".to_vec()));
}

#[test]
fn test_engine_get_missing_key_skips_visitor() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.put(b"a", b"1").unwrap();

    let mut called = false;
    let status = engine.get(b"b", |_| called = true);

    assert!(status.is_not_found());
    assert!(!called);
}

#[test]
fn test_engine_exists() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.put(b"key", b"value").unwrap();

    assert_eq!(engine.exists(b"key"), Status::Ok);
    assert_eq!(engine.exists(b"ke"), Status::NotFound);
    assert_eq!(engine.exists(b"key\0"), Status::NotFound);
}

#[test]
fn test_engine_put_overwrite_keeps_count() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.put(b"key", b"value1").unwrap();
    engine.put(b"other", b"x").unwrap();
    assert_eq!(engine.count_all(), 2);

    engine.put(b"key", b"value2").unwrap();

    assert_eq!(engine.count_all(), 2);
    assert_eq!(engine.get_value(b"key"), Some(b"value2".to_vec()));
    let keys: Vec<_> = all_entries(&engine).into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![b"key".to_vec(), b"other".to_vec()]);
}

#[test]
fn test_engine_remove() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.put(b"c", b"3").unwrap();

    assert_eq!(engine.remove(b"b").unwrap(), Status::Ok);

    assert_eq!(engine.exists(b"b"), Status::NotFound);
    assert_eq!(engine.count_all(), 2);
    assert_eq!(
        all_entries(&engine),
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"c".to_vec(), b"3".to_vec())
        ]
    );
}

#[test]
fn test_engine_remove_missing_key_has_no_effect() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.put(b"a", b"1").unwrap();
    let lsn_before = engine.pool_stats().lsn;

    assert_eq!(engine.remove(b"zzz").unwrap(), Status::NotFound);

    assert_eq!(engine.count_all(), 1);
    assert_eq!(engine.pool_stats().lsn, lsn_before);
}

#[test]
fn test_engine_empty_key_and_value() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.put(b"", b"").unwrap();
    engine.put(b"a", b"").unwrap();

    assert_eq!(engine.get_value(b""), Some(Vec::new()));
    assert_eq!(engine.count_all(), 2);
    assert_eq!(all_entries(&engine)[0].0, Vec::<u8>::new());
}

#[test]
fn test_engine_binary_keys_sort_bytewise() {
    let (_temp, mut engine) = setup_temp_engine();

    for key in [&[0xffu8][..], &[0x00, 0x01][..], &[0x00][..], &[0x7f, 0xff][..]] {
        engine.put(key, b"v").unwrap();
    }

    let keys: Vec<_> = all_entries(&engine).into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        keys,
        vec![vec![0x00], vec![0x00, 0x01], vec![0x7f, 0xff], vec![0xff]]
    );
}

// =============================================================================
// Invariant Tests
// =============================================================================

#[test]
fn test_engine_invariants_hold_under_mixed_workload() {
    let (_temp, mut engine) = setup_temp_engine();
    let mut model = std::collections::BTreeMap::new();
    let mut seed = 42u64;

    for _ in 0..600 {
        let key = format!("k{:03}", lcg(&mut seed) % 120).into_bytes();
        if lcg(&mut seed) % 3 == 0 {
            let expected = if model.remove(&key).is_some() {
                Status::Ok
            } else {
                Status::NotFound
            };
            assert_eq!(engine.remove(&key).unwrap(), expected);
        } else {
            let value = lcg(&mut seed).to_le_bytes().to_vec();
            engine.put(&key, &value).unwrap();
            model.insert(key, value);
        }
    }

    let view = engine.container_view();
    assert!(view.is_consistent());
    assert_eq!(view.keys().len(), view.values().len());
    assert_eq!(engine.count_all(), model.len());
    assert_eq!(all_entries(&engine), model.into_iter().collect::<Vec<_>>());
}

#[test]
fn test_engine_reverse_order_inserts_stay_sorted() {
    let (_temp, mut engine) = setup_temp_engine();

    for i in (0..100).rev() {
        engine.put(format!("{:04}", i).as_bytes(), b"v").unwrap();
    }

    assert!(engine.container_view().is_consistent());
    assert_eq!(all_entries(&engine)[0].0, b"0000".to_vec());
}

#[test]
fn test_engine_reads_from_inside_visitor() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();

    // Not inside a transaction, so nested reads are allowed
    let mut hits = 0;
    engine.get_all(|k, _| {
        if engine.exists(k).is_ok() {
            hits += 1;
        }
        0
    });
    assert_eq!(hits, 2);
    assert!(!engine.tx_context().is_active());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_engine_reopen_after_close_preserves_entries() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    let mut engine = Engine::open(config.clone()).unwrap();
    for key in ["delta", "alpha", "charlie", "bravo"] {
        engine.put(key.as_bytes(), key.to_uppercase().as_bytes()).unwrap();
    }
    engine.remove(b"charlie").unwrap();
    let before = all_entries(&engine);
    engine.close().unwrap();

    let engine = Engine::open(config).unwrap();
    assert_eq!(all_entries(&engine), before);
    assert_eq!(engine.count_all(), 3);
}

#[test]
fn test_engine_reopen_without_close_replays_log() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    {
        let mut engine = Engine::open(config.clone()).unwrap();
        engine.put(b"k1", b"v1").unwrap();
        engine.put(b"k2", b"v2").unwrap();
        engine.put(b"k1", b"v1b").unwrap();
        // Dropped without close: nothing checkpointed
    }

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.get_value(b"k1"), Some(b"v1b".to_vec()));
    assert_eq!(engine.get_value(b"k2"), Some(b"v2".to_vec()));
    assert_eq!(engine.count_all(), 2);
}

#[test]
fn test_engine_reopen_reattaches_without_new_transaction() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    let engine = Engine::open(config.clone()).unwrap();
    // First open committed exactly one transaction: root creation
    assert_eq!(engine.pool_stats().lsn, 1);
    engine.close().unwrap();

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.pool_stats().lsn, 1);
    assert_eq!(engine.count_all(), 0);
}

#[test]
fn test_engine_open_without_create_fails_on_missing_pool() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path().join("absent"))
        .create_if_missing(false)
        .build();

    assert!(Engine::open(config).is_err());
}

// =============================================================================
// Atomicity Tests
// =============================================================================

#[test]
fn test_engine_put_new_key_aborted_mid_transaction() {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());

    {
        let mut engine = Engine::open(config.clone()).unwrap();
        engine.put(b"a", b"1").unwrap();
        engine.put(b"c", b"3").unwrap();

        // Key insert succeeds, value insert fails
        engine.inject_fault(FaultInjector::AfterOps(1));
        let err = engine.put(b"b", b"2").unwrap_err();

        assert!(err.is_aborted());
        assert_eq!(engine.count_all(), 2);
        assert_eq!(engine.exists(b"b"), Status::NotFound);
        assert!(engine.container_view().is_consistent());
    }

    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.count_all(), 2);
    assert_eq!(engine.exists(b"b"), Status::NotFound);
}

#[test]
fn test_engine_overwrite_aborted_before_commit_keeps_old_value() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.put(b"key", b"old").unwrap();

    engine.inject_fault(FaultInjector::BeforeCommit);
    assert!(engine.put(b"key", b"new").is_err());

    assert_eq!(engine.get_value(b"key"), Some(b"old".to_vec()));

    // The fault is one-shot
    engine.put(b"key", b"new").unwrap();
    assert_eq!(engine.get_value(b"key"), Some(b"new".to_vec()));
}

#[test]
fn test_engine_remove_aborted_mid_transaction() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();

    engine.inject_fault(FaultInjector::AfterOps(1));
    assert!(engine.remove(b"a").unwrap_err().is_aborted());

    assert_eq!(engine.get_value(b"a"), Some(b"1".to_vec()));
    assert_eq!(engine.count_all(), 2);
}

#[test]
fn test_engine_capacity_exhaustion_aborts_put() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .pool_capacity(16)
        .build();
    let mut engine = Engine::open(config).unwrap();

    engine.put(b"aaaa", b"bbbb").unwrap();
    let err = engine.put(b"cccc", b"dddddddddd").unwrap_err();

    assert!(err.is_aborted());
    assert_eq!(engine.count_all(), 1);
    assert_eq!(engine.pool_stats().used_bytes, 8);

    // Shrinking a value frees room
    engine.put(b"aaaa", b"b").unwrap();
    engine.put(b"cccc", b"dddd").unwrap();
    assert_eq!(engine.pool_stats().used_bytes, 13);
}

#[test]
fn test_engine_remove_frees_capacity() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .pool_capacity(10)
        .build();
    let mut engine = Engine::open(config).unwrap();

    engine.put(b"k1", b"123456").unwrap();
    assert!(engine.put(b"k2", b"123456").is_err());

    engine.remove(b"k1").unwrap();
    engine.put(b"k2", b"123456").unwrap();
    assert_eq!(engine.pool_stats().used_bytes, 8);
}

//! Registry tests
//!
//! Each test drives a private `Registry` with its own dispatcher and
//! output directory, covering the public lifecycle end to end.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bulk_pipeline::DispatcherConfig;
use tempfile::tempdir;

use super::Registry;
use crate::handle::ContextHandle;

fn registry_in(dir: &Path) -> Registry {
    let registry = Registry::new();
    assert!(registry.configure(DispatcherConfig::default().with_output_dir(dir)));
    registry
}

/// Map `(context_id, sequence)` to file contents for one worker's files
fn worker_output(dir: &Path, worker: usize) -> BTreeMap<(String, u64), String> {
    let mut out = BTreeMap::new();
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().into_string().unwrap();
        let stem = name.strip_suffix(".log").unwrap();
        let parts: Vec<&str> = stem.split('_').collect();
        let (context, sequence, widx) = (parts[2], parts[3], parts[4]);
        if widx.parse::<usize>().unwrap() != worker {
            continue;
        }
        let contents = fs::read_to_string(entry.path()).unwrap();
        out.insert((context.to_string(), sequence.parse().unwrap()), contents);
    }
    out
}

#[test]
fn test_connect_mints_distinct_handles() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let a = registry.connect(3);
    let b = registry.connect(3);
    assert!(!a.is_null());
    assert!(!b.is_null());
    assert_ne!(a, b);
    assert_eq!(registry.context_count(), 2);

    registry.shutdown();
    assert_eq!(registry.context_count(), 0);
}

#[test]
fn test_unknown_and_null_handles_are_noops() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    registry.receive(ContextHandle::NULL, b"ignored\n");
    registry.disconnect(ContextHandle::NULL);

    let handle = registry.connect(1);
    registry.disconnect(handle);
    // Idempotent: a second disconnect of the same handle is harmless.
    registry.disconnect(handle);
    // As is receiving on it after disconnection.
    registry.receive(handle, b"too late\n");

    registry.shutdown();
}

#[test]
fn test_empty_receive_is_a_noop() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let handle = registry.connect(1);
    registry.receive(handle, b"");
    registry.disconnect(handle);
    registry.shutdown();

    assert!(worker_output(dir.path(), 1).is_empty());
}

#[test]
fn test_static_blocks_reach_disk() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let handle = registry.connect(3);
    registry.receive(handle, b"1\n2\n3\n4\n5\n");
    registry.disconnect(handle);
    registry.shutdown();

    for worker in [1, 2] {
        let output = worker_output(dir.path(), worker);
        let lines: Vec<&String> = output.values().collect();
        assert_eq!(lines, ["bulk: 1, 2, 3\n", "bulk: 4, 5\n"], "worker {worker}");
    }
}

#[test]
fn test_dynamic_block_chunked_over_receives() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let handle = registry.connect(3);
    registry.receive(handle, b"1\n2\n{\na\nb");
    registry.receive(handle, b"\nc\nd\n}");
    registry.receive(handle, b"\n3\n");
    registry.disconnect(handle);
    registry.shutdown();

    let output = worker_output(dir.path(), 1);
    let lines: Vec<&String> = output.values().collect();
    assert_eq!(lines, ["bulk: 1, 2\n", "bulk: a, b, c, d\n", "bulk: 3\n"]);
}

#[test]
fn test_disconnect_discards_open_dynamic_block() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let handle = registry.connect(2);
    registry.receive(handle, b"a\n{\nb\nc\n");
    registry.disconnect(handle);
    registry.shutdown();

    let output = worker_output(dir.path(), 1);
    let lines: Vec<&String> = output.values().collect();
    assert_eq!(lines, ["bulk: a\n"]);
}

#[test]
fn test_contexts_have_independent_sequences() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let first = registry.connect(1);
    let second = registry.connect(1);
    registry.receive(first, b"a1\na2\n");
    registry.receive(second, b"b1\n");
    registry.disconnect(first);
    registry.disconnect(second);
    registry.shutdown();

    let output = worker_output(dir.path(), 1);
    let contexts: std::collections::BTreeMap<&String, Vec<u64>> =
        output
            .keys()
            .fold(std::collections::BTreeMap::new(), |mut acc, (ctx, seq)| {
                acc.entry(ctx).or_default().push(*seq);
                acc
            });

    assert_eq!(contexts.len(), 2);
    // Both contexts number their bulks from zero, gap-free.
    let sequence_sets: Vec<&Vec<u64>> = contexts.values().collect();
    assert_eq!(sequence_sets[0], &[0, 1][..]);
    assert_eq!(sequence_sets[1], &[0][..]);
}

#[test]
fn test_connect_after_shutdown_restarts_dispatcher() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let handle = registry.connect(1);
    registry.receive(handle, b"before\n");
    registry.shutdown();

    // The registry remains usable; a fresh dispatcher is created lazily
    // with the retained configuration.
    let handle = registry.connect(1);
    assert!(!handle.is_null());
    registry.receive(handle, b"after\n");
    registry.shutdown();

    let lines: Vec<String> = worker_output(dir.path(), 1).into_values().collect();
    assert!(lines.contains(&"bulk: before\n".to_string()));
    assert!(lines.contains(&"bulk: after\n".to_string()));
}

#[test]
fn test_configure_is_refused_once_running() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let _handle = registry.connect(1);
    let other = tempdir().unwrap();
    assert!(!registry.configure(DispatcherConfig::default().with_output_dir(other.path())));

    registry.shutdown();
}

#[test]
fn test_shutdown_flushes_still_connected_contexts() {
    let dir = tempdir().unwrap();
    let registry = registry_in(dir.path());

    let handle = registry.connect(10);
    registry.receive(handle, b"x\ny\n");
    // No disconnect: shutdown must flush the context itself.
    registry.shutdown();

    let lines: Vec<String> = worker_output(dir.path(), 1).into_values().collect();
    assert_eq!(lines, ["bulk: x, y\n"]);
}

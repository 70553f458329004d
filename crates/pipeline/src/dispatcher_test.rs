//! Dispatcher tests
//!
//! Cover fan-out to all workers, per-worker FIFO consumption, quiesce,
//! drain-on-stop, and submit-after-stop behavior.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use bulk_protocol::{Assembler, Bulk, BulkBuilder, ContextId};
use tempfile::tempdir;

use crate::{Dispatcher, DispatcherConfig, DispatcherError};

/// Dispatcher whose console output goes nowhere, for quiet tests
fn quiet_dispatcher(config: DispatcherConfig) -> Dispatcher {
    Dispatcher::with_console_writer(config, Box::new(io::sink())).unwrap()
}

fn bulk_of(context: u64, sequence: u64, commands: &[&str]) -> Bulk {
    let mut builder = BulkBuilder::new();
    for c in commands {
        builder.push(c.to_string());
    }
    builder
        .finish(&ContextId::from_index(context), sequence)
        .unwrap()
}

fn filenames(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect()
}

/// Parse `(sequence, worker_index, counter)` from a sink filename
fn parse_name(name: &str) -> (u64, usize, u64) {
    let stem = name.strip_suffix(".log").unwrap();
    let parts: Vec<&str> = stem.split('_').collect();
    (
        parts[3].parse().unwrap(),
        parts[4].parse().unwrap(),
        parts[5].parse().unwrap(),
    )
}

#[test]
fn test_zero_file_workers_is_rejected() {
    let config = DispatcherConfig::default().with_file_workers(0);
    assert!(matches!(
        Dispatcher::new(config),
        Err(DispatcherError::EmptyPool)
    ));
}

#[test]
fn test_fanout_reaches_every_worker() {
    let dir = tempdir().unwrap();
    let config = DispatcherConfig::default().with_output_dir(dir.path());
    let dispatcher = quiet_dispatcher(config);
    assert_eq!(dispatcher.file_worker_count(), 2);

    for i in 0..3 {
        dispatcher.submit(bulk_of(0, i, &["a", "b"]));
    }
    dispatcher.shutdown();

    assert_eq!(dispatcher.console_metrics().snapshot().bulks_received, 3);
    for metrics in dispatcher.file_metrics() {
        assert_eq!(metrics.snapshot().files_created, 3);
    }

    // One file per bulk per worker, all names distinct.
    let names = filenames(dir.path());
    assert_eq!(names.len(), 6);
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), 6);
}

#[test]
fn test_fifo_order_within_each_worker() {
    let dir = tempdir().unwrap();
    let config = DispatcherConfig::default().with_output_dir(dir.path());
    let dispatcher = quiet_dispatcher(config);

    for i in 0..20 {
        dispatcher.submit(bulk_of(0, i, &["x"]));
    }
    dispatcher.shutdown();

    // Within one worker, ascending local counters must see ascending
    // sequences: consumption order equals enqueue order.
    for worker in 1..=2 {
        let mut deliveries: Vec<(u64, u64)> = filenames(dir.path())
            .iter()
            .map(|n| parse_name(n))
            .filter(|&(_, w, _)| w == worker)
            .map(|(seq, _, ctr)| (ctr, seq))
            .collect();
        deliveries.sort_unstable();
        let sequences: Vec<u64> = deliveries.iter().map(|&(_, seq)| seq).collect();
        let expected: Vec<u64> = (0..20).collect();
        assert_eq!(sequences, expected, "worker {worker}");
    }
}

#[test]
fn test_quiesce_observes_empty_queues() {
    let dir = tempdir().unwrap();
    let config = DispatcherConfig::default().with_output_dir(dir.path());
    let dispatcher = quiet_dispatcher(config);

    for i in 0..50 {
        dispatcher.submit(bulk_of(0, i, &["cmd"]));
    }
    dispatcher.quiesce();

    // Quiesce observes momentary emptiness: every queue has been drained.
    // (The last popped bulk may still be in flight inside a worker, so
    // totals are only asserted after shutdown below.)
    assert!(dispatcher.is_running());
    assert!(dispatcher.console_metrics().snapshot().bulks_received >= 49);

    // Quiescing does not stop the dispatcher; it still accepts bulks.
    dispatcher.submit(bulk_of(0, 50, &["late"]));
    dispatcher.shutdown();
    assert_eq!(dispatcher.console_metrics().snapshot().bulks_received, 51);
}

#[test]
fn test_stop_drains_queues_before_joining() {
    let dir = tempdir().unwrap();
    let config = DispatcherConfig::default().with_output_dir(dir.path());
    let dispatcher = quiet_dispatcher(config);

    for i in 0..100 {
        dispatcher.submit(bulk_of(0, i, &["cmd"]));
    }
    // No quiesce: stop itself must not lose queued bulks.
    dispatcher.stop();

    assert_eq!(dispatcher.console_metrics().snapshot().bulks_received, 100);
    for metrics in dispatcher.file_metrics() {
        assert_eq!(metrics.snapshot().files_created, 100);
    }
    assert_eq!(filenames(dir.path()).len(), 200);
}

#[test]
fn test_submit_after_stop_drops_bulk() {
    let dir = tempdir().unwrap();
    let config = DispatcherConfig::default().with_output_dir(dir.path());
    let dispatcher = quiet_dispatcher(config);

    dispatcher.stop();
    assert!(!dispatcher.is_running());

    dispatcher.submit(bulk_of(0, 0, &["ignored"]));
    assert_eq!(dispatcher.console_metrics().snapshot().bulks_received, 0);
    assert!(filenames(dir.path()).is_empty());
}

#[test]
fn test_stop_is_idempotent() {
    let dir = tempdir().unwrap();
    let config = DispatcherConfig::default().with_output_dir(dir.path());
    let dispatcher = quiet_dispatcher(config);

    dispatcher.submit(bulk_of(0, 0, &["once"]));
    dispatcher.shutdown();
    dispatcher.stop();
    dispatcher.shutdown();

    assert_eq!(dispatcher.console_metrics().snapshot().bulks_received, 1);
}

#[test]
fn test_custom_worker_pool_size() {
    let dir = tempdir().unwrap();
    let config = DispatcherConfig::default()
        .with_file_workers(4)
        .with_output_dir(dir.path());
    let dispatcher = quiet_dispatcher(config);
    assert_eq!(dispatcher.file_worker_count(), 4);

    dispatcher.submit(bulk_of(0, 0, &["cmd"]));
    dispatcher.shutdown();

    assert_eq!(filenames(dir.path()).len(), 4);
}

#[test]
fn test_assembled_bulks_flow_through() {
    let dir = tempdir().unwrap();
    let config = DispatcherConfig::default().with_output_dir(dir.path());
    let dispatcher = quiet_dispatcher(config);

    let mut assembler = Assembler::new(ContextId::from_index(1), 3);
    for bulk in assembler.ingest(b"1\n2\n{\na\nb\nc\nd\n}\n3\n") {
        dispatcher.submit(bulk);
    }
    for bulk in assembler.flush() {
        dispatcher.submit(bulk);
    }
    dispatcher.shutdown();

    // Three bulks, delivered to both file workers.
    assert_eq!(dispatcher.console_metrics().snapshot().bulks_received, 3);
    assert_eq!(filenames(dir.path()).len(), 6);

    // The dynamic block arrived intact on disk.
    let dynamic = filenames(dir.path())
        .into_iter()
        .find(|n| parse_name(n) == (1, 1, 2))
        .unwrap();
    let contents = fs::read_to_string(dir.path().join(dynamic)).unwrap();
    assert_eq!(contents, "bulk: a, b, c, d\n");
}

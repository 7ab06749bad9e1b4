use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install the global `tracing` subscriber, honoring `RUST_LOG` (default `info`).
pub fn init_tracing_once() {
    init_tracing_with_default("info");
}

/// Same as [`init_tracing_once`] but with a caller-chosen fallback level.
/// Only the first call in a process has any effect.
pub fn init_tracing_with_default(default_level: &str) {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

// -------- file opens that survive transient OS errors --------

/// Transient failures worth another attempt: interrupted calls everywhere, plus
/// the sharing/lock/device-not-ready codes antivirus scanners and network
/// volumes produce on Windows.
fn is_transient(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::Interrupted {
        return true;
    }
    // 5 access denied, 21 device not ready, 32 sharing violation,
    // 33 lock violation, 1006 volume externally altered, 1117 I/O device error
    cfg!(windows) && matches!(err.raw_os_error(), Some(5 | 21 | 32 | 33 | 1006 | 1117))
}

/// Run `op` up to `attempts` times, sleeping `step_ms * attempt` between transient failures.
fn retry_transient<T>(attempts: usize, step_ms: u64, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(err) if attempt < attempts && is_transient(&err) => {
                tracing::debug!(attempt, error=%err, "Transient I/O error, retrying");
                sleep(Duration::from_millis(step_ms.saturating_mul(attempt as u64)));
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Open a source file for reading.
pub fn open_with_backoff(source: &Path, attempts: usize, step_ms: u64) -> io::Result<File> {
    retry_transient(attempts, step_ms, || File::open(source))
}

/// Open a destination file in append mode, creating it on first use.
pub fn open_append_with_backoff(target: &Path, attempts: usize, step_ms: u64) -> io::Result<File> {
    retry_transient(attempts, step_ms, || OpenOptions::new().create(true).append(true).open(target))
}

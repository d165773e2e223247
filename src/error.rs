//! Structured error taxonomy for the mirroring engine.
//!
//! Shaped after the teacher's `TransferError`/`MkdirError`: hand-written
//! enums with a manual `Display`, propagated through the crate via
//! `anyhow::Result`. The durable session (see [`crate::session`]) only
//! needs to know which of these are retriable; everything else is fatal
//! and propagates to the caller unchanged (spec §4.2, §7).

use std::fmt;
use std::path::PathBuf;

fn display_path(p: &std::path::Path) -> String {
    let s = p.to_string_lossy().to_string();
    if s.contains('\\') { s.replace('\\', "/") } else { s }
}

/// Transport-level faults the durable session recovers from by reconnecting.
///
/// The Rust analogue of `durasftp`'s `retry_on_fail` catch clause
/// (`AttributeError, SSHException, ConnectionRefusedError, socket.gaierror,
/// socket.timeout`): every variant here is something a dropped connection,
/// a DNS hiccup, or a stalled socket can produce, none of which imply the
/// remote path or the credentials are wrong.
#[derive(Debug, Clone)]
pub enum TransportFault {
    Disconnected,
    HostResolution(String),
    ConnectionRefused(String),
    ConnectTimeout(String),
    /// A read (or write) on an established socket exceeded the configured
    /// read timeout — how a stalled transfer surfaces (spec §4.2).
    ReadTimeout,
    NotConnected,
    /// Catch-all for the SSH/SFTP layer signalling a failure that isn't
    /// obviously an auth rejection (the analogue of paramiko's generic
    /// `SSHException` when it isn't about credentials).
    Protocol(String),
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFault::Disconnected => write!(f, "transport disconnected"),
            TransportFault::HostResolution(h) => write!(f, "host resolution failed: {h}"),
            TransportFault::ConnectionRefused(a) => write!(f, "connection refused: {a}"),
            TransportFault::ConnectTimeout(a) => write!(f, "connect timed out: {a}"),
            TransportFault::ReadTimeout => write!(f, "read timed out"),
            TransportFault::NotConnected => write!(f, "operation attempted on closed transport"),
            TransportFault::Protocol(msg) => write!(f, "ssh protocol error: {msg}"),
        }
    }
}

impl std::error::Error for TransportFault {}

/// Errors specific to ensuring a directory exists (locally or remotely).
#[derive(Debug, Clone)]
pub enum MkdirError {
    /// The target already exists as a file where a directory is expected.
    ExistsAsFile(PathBuf),
    /// The transport rejected the mkdir for some other reason.
    TransportError(PathBuf, String),
}

impl fmt::Display for MkdirError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MkdirError::ExistsAsFile(p) => {
                write!(f, "path exists as a file where a directory was expected: {}", display_path(p))
            }
            MkdirError::TransportError(p, msg) => {
                write!(f, "failed to create directory {}: {msg}", display_path(p))
            }
        }
    }
}

impl std::error::Error for MkdirError {}

/// Top-level error type for every engine operation — one-to-one with
/// spec.md §7's error kinds.
#[derive(Debug, Clone)]
pub enum MirrorError {
    /// Retriable transport fault; only ever observed by a caller once
    /// `maxAttempts` is exhausted.
    Transport(TransportFault),
    /// Credentials were rejected outright.
    Auth(String),
    /// The plan referenced a remote path that no longer exists.
    RemoteNotFound(String),
    /// The remote side rejected the operation on permission grounds.
    RemoteAccessDenied(String),
    /// A local filesystem operation failed (disk full, permission denied, ...).
    LocalIo(PathBuf, String),
    /// A caller-supplied callback raised an error while handling an action.
    Callback(String),
    /// A directory could not be made to exist on one side of the mirror.
    Mkdir(MkdirError),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::Transport(t) => write!(f, "transport fault (retries exhausted): {t}"),
            MirrorError::Auth(addr) => write!(f, "authentication failed: {addr}"),
            MirrorError::RemoteNotFound(p) => write!(f, "remote path not found: {p}"),
            MirrorError::RemoteAccessDenied(p) => write!(f, "remote access denied: {p}"),
            MirrorError::LocalIo(p, msg) => {
                write!(f, "local I/O error at {}: {msg}", display_path(p))
            }
            MirrorError::Callback(msg) => write!(f, "action callback failed: {msg}"),
            MirrorError::Mkdir(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for MirrorError {}

impl From<TransportFault> for MirrorError {
    fn from(t: TransportFault) -> Self {
        MirrorError::Transport(t)
    }
}

impl From<MkdirError> for MirrorError {
    fn from(e: MkdirError) -> Self {
        MirrorError::Mkdir(e)
    }
}

impl MirrorError {
    /// Whether the session should retry-and-reconnect on this error, per
    /// spec.md §4.2's fault classification. Only `Transport` faults are
    /// retriable; everything else (auth, not-found, permission, local I/O,
    /// callback) is fatal and propagates immediately.
    pub fn is_retriable(&self) -> bool {
        matches!(self, MirrorError::Transport(_))
    }
}

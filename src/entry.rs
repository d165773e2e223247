//! The unified view of a filesystem entry (C3), shared between the local
//! and remote sides of a mirror.
//!
//! Grounded on `durasftp`'s `entry_is_dir`/`entry_is_file` helpers
//! (`durasftp/common/sftp/mirrorer.py`), generalised from "a `pysftp`
//! attr object or an `os.DirEntry`" to one immutable Rust type both sides
//! get converted into.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// The kind of filesystem object an [`Entry`] describes.
///
/// Symlinks and special files (sockets, devices, FIFOs) map to `Other` and
/// are skipped by the planner (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Other,
}

impl EntryKind {
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Dir)
    }

    pub fn is_file(self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// An immutable record of one entry in either tree, keyed externally by its
/// canonical remote-relative path (spec §3).
#[derive(Debug, Clone)]
pub struct Entry {
    path: String,
    kind: EntryKind,
    size: u64,
    /// Modification time, rounded down to whole seconds (spec §4.2): SFTP
    /// attrs only carry second resolution, so both sides are truncated to
    /// the same precision before they're ever compared.
    mtime: u64,
}

impl Entry {
    pub fn new(path: impl Into<String>, kind: EntryKind, size: u64, mtime_secs: u64) -> Self {
        Entry { path: path.into(), kind, size, mtime: mtime_secs }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Entry::new(path, EntryKind::Dir, 0, 0)
    }

    pub fn file(path: impl Into<String>, size: u64, mtime_secs: u64) -> Self {
        Entry::new(path, EntryKind::File, size, mtime_secs)
    }

    pub fn other(path: impl Into<String>) -> Self {
        Entry::new(path, EntryKind::Other, 0, 0)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Build an `Entry` from local filesystem metadata, rounding mtime down
    /// to whole seconds so it is directly comparable to a remote `Entry`.
    pub fn from_local_metadata(path: &str, meta: &std::fs::Metadata) -> Self {
        let kind = if meta.is_dir() {
            EntryKind::Dir
        } else if meta.file_type().is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Entry::new(path, kind, meta.len(), mtime)
    }
}

/// Two entries at the same path are equivalent iff both are directories, or
/// both are files with matching size and whole-second mtime (spec §4.3).
/// A directory never matches a file; any combination involving `Other` is
/// non-equivalent. Symmetric by construction.
pub fn entries_match(a: &Entry, b: &Entry) -> bool {
    match (a.kind(), b.kind()) {
        (EntryKind::Dir, EntryKind::Dir) => true,
        (EntryKind::File, EntryKind::File) => a.size() == b.size() && a.mtime() == b.mtime(),
        _ => false,
    }
}

/// Join a remote-relative parent path and a child name into a canonical
/// remote-relative path, always starting with `/` and never ending with
/// `/` (except the root itself never appears as a child path here).
pub fn join_remote(parent: &str, name: &str) -> String {
    if parent == "/" { format!("/{name}") } else { format!("{}/{}", parent.trim_end_matches('/'), name) }
}

/// The local filesystem path for a remote-relative path `p`, given an
/// absolute, canonicalised `local_base` (spec §3).
pub fn local_path_from_remote(local_base: &Path, remote_relative: &str) -> std::path::PathBuf {
    let tail = remote_relative.trim_start_matches('/');
    if tail.is_empty() { local_base.to_path_buf() } else { local_base.join(tail) }
}

/// The remote-relative path for a local absolute path, defined only when
/// `local_path` begins with `local_base` (spec §3).
pub fn remote_relative_from_local(local_base: &Path, local_path: &Path) -> Option<String> {
    let rel = local_path.strip_prefix(local_base).ok()?;
    if rel.as_os_str().is_empty() {
        return Some("/".to_string());
    }
    let mut out = String::from("/");
    for (i, comp) in rel.components().enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(&comp.as_os_str().to_string_lossy());
    }
    Some(out)
}

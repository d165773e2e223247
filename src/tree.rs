//! Tree loader (C4): recursively loads both sides of a mirror into
//! `path → Entry` maps keyed by canonical remote-relative path.
//!
//! Grounded on `durasftp/common/sftp/mirrorer.py`'s `_build_remote_tree`/
//! `_build_local_tree` walkers, generalised from a pair of private helper
//! methods on one `Mirrorer` class into a free function per side that
//! takes the pieces it needs (a [`DurableSession`] for remote, a
//! `local_base` path for local) so the planner can be tested against
//! hand-built trees without a transport at all.

use std::collections::BTreeMap;
use std::path::Path;

use crate::entry::{Entry, EntryKind, join_remote, remote_relative_from_local};
use crate::error::MirrorError;
use crate::session::DurableSession;
use crate::transport::Transport;

/// An ordered `path → Entry` map. A `BTreeMap` gives us insertion-order-
/// independent ascending iteration for free, which the planner needs
/// anyway (spec §3: "the planner does not rely on map order; it sorts
/// explicitly") — using a sorted map just means that sort is free.
pub type Tree = BTreeMap<String, Entry>;

/// Populate the remote tree by a depth-first walk starting at `/`,
/// retrying transport faults via `session` (spec §4.4).
pub fn load_remote_tree<T: Transport>(session: &mut DurableSession<T>) -> Result<Tree, MirrorError> {
    let mut tree = Tree::new();
    let mut stack = vec!["/".to_string()];
    while let Some(dir) = stack.pop() {
        for (name, child) in session.list_dir_attr(&dir)? {
            let path = join_remote(&dir, &name);
            let entry = Entry::new(path.clone(), child.kind(), child.size(), child.mtime());
            if entry.kind() == EntryKind::Dir {
                stack.push(path.clone());
            }
            tree.insert(path, entry);
        }
    }
    Ok(tree)
}

/// Populate the local tree by a depth-first walk of `local_base`,
/// recording each child's canonical remote-relative path (spec §4.4).
/// Entries that aren't plain files or directories (symlinks, sockets,
/// devices) map to `EntryKind::Other`.
///
/// Grounded on `hostpilot::transfer::enumeration::enumerate_local_sources`,
/// which drives `walkdir::WalkDir` over a local source tree to build its
/// own flat entry list; used here the same way, with `follow_links(false)`
/// left at its default so a symlink's own metadata (not its target's) is
/// what decides `EntryKind::Other` (spec §3: "symlinks ... map to `Other`").
pub fn load_local_tree(local_base: &Path) -> Result<Tree, MirrorError> {
    use walkdir::WalkDir;
    let mut tree = Tree::new();
    for entry in WalkDir::new(local_base).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| local_base.to_path_buf());
            MirrorError::LocalIo(path, e.to_string())
        })?;
        let child_path = entry.path();
        let Some(remote_path) = remote_relative_from_local(local_base, child_path) else {
            continue;
        };
        let meta = entry
            .metadata()
            .map_err(|e| MirrorError::LocalIo(child_path.to_path_buf(), e.to_string()))?;
        let parsed = if meta.file_type().is_symlink() {
            Entry::other(remote_path.clone())
        } else {
            Entry::from_local_metadata(&remote_path, &meta)
        };
        tree.insert(remote_path, parsed);
    }
    Ok(tree)
}

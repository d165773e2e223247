//! Planner (C5): compares two [`Tree`]s and emits a flat, unordered-by-kind
//! sequence of typed actions. Ordering into OK/dir/file buckets is
//! [`crate::action::ActionList`]'s job (spec §3); this module only decides
//! *what* to do at each path, not in what order to run it.
//!
//! Grounded on `durasftp/common/sftp/mirrorer.py`'s `mirror_from_remote`/
//! `mirror_to_remote`, which walk one tree and consult the other inline;
//! here the two trees are built up-front by [`crate::tree`] so the two
//! planner variants reduce to a pure, side-effect-free comparison.

use crate::entry::{Entry, EntryKind, entries_match};
use crate::tree::Tree;

/// What to do with one path in the plan (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCode {
    /// Both sides agree; no work.
    Ok,
    /// Ensure a local directory exists at this path.
    LMkdir,
    /// Ensure a remote directory exists at this path.
    RMkdir,
    /// Copy the remote file to local.
    Get,
    /// Copy the local file to remote.
    Put,
}

impl ActionCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionCode::Ok => "OK",
            ActionCode::LMkdir => "LMKDIR",
            ActionCode::RMkdir => "RMKDIR",
            ActionCode::Get => "GET",
            ActionCode::Put => "PUT",
        }
    }
}

/// One unit of planned work: a code plus the path it applies to, and
/// whichever source-side entries are available for the executor and
/// callback to inspect.
#[derive(Debug, Clone)]
pub struct Action {
    pub code: ActionCode,
    pub path: String,
    pub local_entry: Option<Entry>,
    pub remote_entry: Option<Entry>,
}

impl Action {
    fn new(code: ActionCode, path: impl Into<String>, local: Option<Entry>, remote: Option<Entry>) -> Self {
        Action { code, path: path.into(), local_entry: local, remote_entry: remote }
    }

    /// Textual rendering per spec §6: `Action(code=CODE,path=PATH[,k=v]*)`,
    /// the contract between the engine and any observing callback.
    pub fn render(&self) -> String {
        let mut extras = String::new();
        if let Some(e) = &self.remote_entry
            && e.kind() == EntryKind::File
        {
            extras.push_str(&format!(",size={}", e.size()));
        }
        format!("Action(code={},path={}{})", self.code.as_str(), self.path, extras)
    }
}

/// Plan a remote-to-local mirror: walk the remote tree, consult the local
/// tree, emit `OK`/`LMKDIR`/`GET` (spec §4.5). Remote `Other` entries are
/// skipped entirely.
pub fn plan_from_remote(remote: &Tree, local: &Tree) -> Vec<Action> {
    let mut actions = Vec::with_capacity(remote.len());
    for (path, remote_entry) in remote.iter() {
        let local_entry = local.get(path);
        match remote_entry.kind() {
            EntryKind::Other => continue,
            EntryKind::Dir => {
                let code = if local_entry.is_some_and(|l| entries_match(l, remote_entry)) {
                    ActionCode::Ok
                } else {
                    ActionCode::LMkdir
                };
                actions.push(Action::new(code, path.clone(), local_entry.cloned(), Some(remote_entry.clone())));
            }
            EntryKind::File => {
                let code = if local_entry.is_some_and(|l| entries_match(l, remote_entry)) {
                    ActionCode::Ok
                } else {
                    ActionCode::Get
                };
                actions.push(Action::new(code, path.clone(), local_entry.cloned(), Some(remote_entry.clone())));
            }
        }
    }
    actions
}

/// Plan a local-to-remote mirror: mirror image of [`plan_from_remote`]
/// (spec §4.5).
pub fn plan_to_remote(local: &Tree, remote: &Tree) -> Vec<Action> {
    let mut actions = Vec::with_capacity(local.len());
    for (path, local_entry) in local.iter() {
        let remote_entry = remote.get(path);
        match local_entry.kind() {
            EntryKind::Other => continue,
            EntryKind::Dir => {
                let code = if remote_entry.is_some_and(|r| entries_match(local_entry, r)) {
                    ActionCode::Ok
                } else {
                    ActionCode::RMkdir
                };
                actions.push(Action::new(code, path.clone(), Some(local_entry.clone()), remote_entry.cloned()));
            }
            EntryKind::File => {
                let code = if remote_entry.is_some_and(|r| entries_match(local_entry, r)) {
                    ActionCode::Ok
                } else {
                    ActionCode::Put
                };
                actions.push(Action::new(code, path.clone(), Some(local_entry.clone()), remote_entry.cloned()));
            }
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_down_yields_get() {
        let mut remote = Tree::new();
        remote.insert("/temp.txt".into(), Entry::file("/temp.txt", 11, 1_700_000_000));
        let local = Tree::new();

        let plan = plan_from_remote(&remote, &local);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].code, ActionCode::Get);
        assert_eq!(plan[0].path, "/temp.txt");
    }

    #[test]
    fn matching_file_yields_ok() {
        let mut remote = Tree::new();
        remote.insert("/temp.txt".into(), Entry::file("/temp.txt", 11, 1_700_000_000));
        let mut local = Tree::new();
        local.insert("/temp.txt".into(), Entry::file("/temp.txt", 11, 1_700_000_000));

        let plan = plan_from_remote(&remote, &local);
        assert_eq!(plan[0].code, ActionCode::Ok);
    }

    #[test]
    fn nested_structure_emits_dirs_before_mismatch_detected() {
        let mut remote = Tree::new();
        remote.insert("/a".into(), Entry::dir("/a"));
        remote.insert("/a/b".into(), Entry::dir("/a/b"));
        remote.insert("/a/b/c.txt".into(), Entry::file("/a/b/c.txt", 3, 1));
        remote.insert("/a/d".into(), Entry::dir("/a/d"));
        let local = Tree::new();

        let plan = plan_from_remote(&remote, &local);
        let codes: Vec<_> = plan.iter().map(|a| (a.path.clone(), a.code)).collect();
        assert_eq!(
            codes,
            vec![
                ("/a".to_string(), ActionCode::LMkdir),
                ("/a/b".to_string(), ActionCode::LMkdir),
                ("/a/b/c.txt".to_string(), ActionCode::Get),
                ("/a/d".to_string(), ActionCode::LMkdir),
            ]
        );
    }

    #[test]
    fn file_dir_swap_emits_lmkdir_not_ok() {
        let mut remote = Tree::new();
        remote.insert("/x".into(), Entry::dir("/x"));
        let mut local = Tree::new();
        local.insert("/x".into(), Entry::file("/x", 4, 1));

        let plan = plan_from_remote(&remote, &local);
        assert_eq!(plan[0].code, ActionCode::LMkdir);
    }

    #[test]
    fn missing_destination_entries_are_never_deleted() {
        // Additive mirror (spec invariant 6): plan_from_remote never looks
        // at local-only paths at all.
        let remote = Tree::new();
        let mut local = Tree::new();
        local.insert("/only-local.txt".into(), Entry::file("/only-local.txt", 1, 1));

        let plan = plan_from_remote(&remote, &local);
        assert!(plan.is_empty());
    }

    #[test]
    fn to_remote_is_mirror_image() {
        let mut local = Tree::new();
        local.insert("/new.txt".into(), Entry::file("/new.txt", 2, 2));
        let remote = Tree::new();

        let plan = plan_to_remote(&local, &remote);
        assert_eq!(plan[0].code, ActionCode::Put);
    }

    #[test]
    fn render_matches_contract() {
        let a = Action::new(ActionCode::Get, "/a/b.txt", None, Some(Entry::file("/a/b.txt", 5, 1)));
        assert_eq!(a.render(), "Action(code=GET,path=/a/b.txt,size=5)");
        let b = Action::new(ActionCode::Ok, "/a", None, Some(Entry::dir("/a")));
        assert_eq!(b.render(), "Action(code=OK,path=/a)");
    }
}

//! Action (C6) and action list (C7): the idempotent execution half of the
//! engine. `Action::execute` runs the side effect the planner decided on
//! a single path; [`ActionList`] owns the full plan, enforces the
//! OK → directories → files ordering spec §3 requires, and drives
//! execution end to end with the caller's callback.
//!
//! Grounded on `durasftp/common/sftp/action.py`/`action_list.py`: the
//! Python `Action` class held a back-reference to its `Mirrorer` to reach
//! the session; here that becomes a `&mut DurableSession<T>` borrowed for
//! the duration of one `execute` call instead of a stored reference,
//! since Rust's borrow checker makes the "weak back-reference" spec §9
//! describes unnecessary — the action simply never outlives the call.

use std::path::Path;

use crate::entry::{EntryKind, local_path_from_remote};
use crate::error::MirrorError;
use crate::plan::{Action, ActionCode};
use crate::session::DurableSession;
use crate::transport::Transport;

/// Per-action callback: called once after each action's side effect (or
/// would-be side effect, in dry-run) has been attempted. Returning an
/// error stops the run (spec §4.8: "a callback that throws terminates the
/// run with that error; partially completed actions remain applied").
pub type ActionCallback<'a> = dyn FnMut(&Action) -> Result<(), MirrorError> + 'a;

impl Action {
    /// Run this action's side effect against `local_base`/`session`. A
    /// no-op in `dry_run` mode (spec §4.6).
    pub fn execute<T: Transport>(
        &self,
        session: &mut DurableSession<T>,
        local_base: &Path,
        dry_run: bool,
    ) -> Result<(), MirrorError> {
        if dry_run {
            return Ok(());
        }
        let local_path = local_path_from_remote(local_base, &self.path);
        match self.code {
            ActionCode::Ok => Ok(()),
            ActionCode::LMkdir => {
                remove_conflicting_local_file(&local_path)?;
                std::fs::create_dir_all(&local_path)
                    .map_err(|e| MirrorError::LocalIo(local_path.clone(), e.to_string()))
            }
            ActionCode::RMkdir => {
                remove_conflicting_remote_file(session, &self.path)?;
                session.makedirs(&self.path)
            }
            ActionCode::Get => {
                remove_conflicting_local_path(&local_path)?;
                session.get(&self.path, &local_path, true)
            }
            ActionCode::Put => {
                remove_conflicting_remote_path(session, &self.path)?;
                session.put(&local_path, &self.path, true)
            }
        }
    }
}

fn remove_conflicting_local_file(local_path: &Path) -> Result<(), MirrorError> {
    match std::fs::symlink_metadata(local_path) {
        Ok(meta) if meta.is_file() || meta.file_type().is_symlink() => std::fs::remove_file(local_path)
            .map_err(|e| MirrorError::LocalIo(local_path.to_path_buf(), e.to_string())),
        _ => Ok(()),
    }
}

/// `GET`'s pre-cleanup (spec §4.6): remove whatever currently occupies
/// `local_path`, whether it's a stray file or a whole directory subtree.
fn remove_conflicting_local_path(local_path: &Path) -> Result<(), MirrorError> {
    match std::fs::symlink_metadata(local_path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(local_path)
            .map_err(|e| MirrorError::LocalIo(local_path.to_path_buf(), e.to_string())),
        Ok(_) => std::fs::remove_file(local_path)
            .map_err(|e| MirrorError::LocalIo(local_path.to_path_buf(), e.to_string())),
        Err(_) => Ok(()),
    }
}

fn remote_stat_kind<T: Transport>(
    session: &mut DurableSession<T>,
    path: &str,
) -> Result<Option<EntryKind>, MirrorError> {
    match session.stat(path) {
        Ok(entry) => Ok(Some(entry.kind())),
        Err(MirrorError::RemoteNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_conflicting_remote_file<T: Transport>(
    session: &mut DurableSession<T>,
    path: &str,
) -> Result<(), MirrorError> {
    if remote_stat_kind(session, path)? == Some(EntryKind::File) {
        session.remove(path)?;
    }
    Ok(())
}

/// `PUT`'s pre-cleanup (spec §4.6, §4.7): remove whatever currently
/// occupies `path` remotely, recursing depth-first (deepest paths first)
/// when it's a directory.
fn remove_conflicting_remote_path<T: Transport>(
    session: &mut DurableSession<T>,
    path: &str,
) -> Result<(), MirrorError> {
    match remote_stat_kind(session, path)? {
        Some(EntryKind::Dir) => session.remove_tree(path),
        Some(_) => session.remove(path),
        None => Ok(()),
    }
}

/// Owns a full plan split into its three ordered buckets (spec §3): all
/// `OK` actions, then directory actions (`LMKDIR`/`RMKDIR`), then file
/// actions (`GET`/`PUT`), each sorted by path ascending.
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    /// Build the list from a raw planner output, enforcing the required
    /// bucket order. The planner already emits paths in ascending order
    /// (it walks a sorted [`crate::tree::Tree`]), so a stable sort that
    /// only distinguishes bucket membership is sufficient and preserves
    /// per-bucket ascending order.
    pub fn new(mut raw: Vec<Action>) -> Self {
        fn bucket(code: ActionCode) -> u8 {
            match code {
                ActionCode::Ok => 0,
                ActionCode::LMkdir | ActionCode::RMkdir => 1,
                ActionCode::Get | ActionCode::Put => 2,
            }
        }
        raw.sort_by_key(|a| bucket(a.code));
        ActionList { actions: raw }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Count of actions that are not `OK` — used by callers checking
    /// idempotence (spec invariant 2: a clean re-run plans zero work).
    pub fn pending_count(&self) -> usize {
        self.actions.iter().filter(|a| a.code != ActionCode::Ok).count()
    }

    /// Execute every action in order, invoking `callback` after each one's
    /// side effect. Stops at the first error (fail-fast, spec §7): actions
    /// whose callback already fired are reflected in the filesystem;
    /// later actions never ran.
    pub fn execute_all<T: Transport>(
        &self,
        session: &mut DurableSession<T>,
        local_base: &Path,
        dry_run: bool,
        callback: &mut ActionCallback<'_>,
    ) -> Result<(), MirrorError> {
        for action in &self.actions {
            action.execute(session, local_base, dry_run)?;
            callback(action).map_err(|e| MirrorError::Callback(e.to_string()))?;
        }
        Ok(())
    }
}

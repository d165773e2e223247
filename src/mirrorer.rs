//! Mirrorer (C8): the façade that wires the durable session, tree loader,
//! planner, and action list together and exposes the two public mirror
//! operations.
//!
//! Grounded on `durasftp/common/sftp/mirrorer.py`'s `Mirrorer` class,
//! generalised from a class that directly embedded `pysftp.Connection`
//! into one that's generic over any [`Transport`] implementation, so the
//! production binary uses [`crate::transport::Ssh2Transport`] and the
//! test suite uses the mock transport without either side knowing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::action::{ActionCallback, ActionList};
use crate::error::MirrorError;
use crate::plan::{plan_from_remote, plan_to_remote};
use crate::session::DurableSession;
use crate::transport::{ConnectParams, Credentials, Ssh2Transport, Transport};
use crate::tree::{load_local_tree, load_remote_tree};

/// Constructor parameters for a [`Mirrorer`] (spec §6: programmatic
/// surface).
pub struct MirrorerConfig {
    pub local_base: PathBuf,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<PathBuf>,
    pub private_key_pass: Option<String>,
    /// TCP connect timeout (CLI `--timeout`, default 5s).
    pub timeout: Duration,
    /// Per-socket read timeout used by every SFTP primitive after connect
    /// (CLI `--read-timeout`, default 15s). Kept distinct from `timeout`:
    /// this is what bounds a stalled transfer to a retriable fault instead
    /// of an indefinite hang (spec §4.2).
    pub read_timeout: Duration,
    pub max_attempts: usize,
    /// Strict host-key verification is the default (spec §9 redesign
    /// flag); set to `false` only to reproduce the original's behaviour.
    pub verify_host_key: bool,
}

/// Façade that owns one durable session and exposes `mirrorFromRemote`/
/// `mirrorToRemote` (spec §4.8). Generic over the transport so it can run
/// against a real SSH connection or an injected-fault mock.
pub struct Mirrorer<T: Transport> {
    session: DurableSession<T>,
    local_base: PathBuf,
}

impl Mirrorer<Ssh2Transport> {
    /// Open a session over `ssh2`, canonicalise `local_base`, and probe
    /// `listDirAttr("/")` so authentication failures surface at
    /// construction time rather than on the first mirror call (spec
    /// §4.8).
    pub fn connect(config: MirrorerConfig) -> Result<Self, MirrorError> {
        let local_base = std::fs::canonicalize(&config.local_base)
            .map_err(|e| MirrorError::LocalIo(config.local_base.clone(), e.to_string()))?;
        let params = ConnectParams {
            host: config.host,
            port: config.port,
            credentials: Credentials {
                username: config.username,
                password: config.password,
                private_key: config.private_key,
                private_key_pass: config.private_key_pass,
            },
            connect_timeout: config.timeout,
            read_timeout: config.read_timeout,
            verify_host_key: config.verify_host_key,
        };
        let transport = Ssh2Transport::connect(params)?;
        let mut session = DurableSession::new(transport, config.max_attempts);
        session.list_dir_attr("/")?;
        Ok(Mirrorer { session, local_base })
    }
}

impl<T: Transport> Mirrorer<T> {
    /// Build a `Mirrorer` around an already-connected transport — used by
    /// tests to drive the façade against a mock (spec's fault-injection
    /// substitute, since the original's port-forwarding proxy is out of
    /// scope).
    pub fn from_transport(transport: T, local_base: PathBuf, max_attempts: usize) -> Result<Self, MirrorError> {
        let mut session = DurableSession::new(transport, max_attempts);
        session.list_dir_attr("/")?;
        Ok(Mirrorer { session, local_base })
    }

    pub fn local_base(&self) -> &Path {
        &self.local_base
    }

    pub fn reconnects(&self) -> u64 {
        self.session.reconnects()
    }

    /// Mirror the remote tree onto the local filesystem (spec §4.8):
    /// reload both trees, build a plan, execute it, invoking `callback`
    /// after each action.
    pub fn mirror_from_remote(
        &mut self,
        callback: Option<&mut ActionCallback<'_>>,
        dry_run: bool,
    ) -> Result<ActionList, MirrorError> {
        let remote = load_remote_tree(&mut self.session)?;
        let local = load_local_tree(&self.local_base)?;
        let list = ActionList::new(plan_from_remote(&remote, &local));
        self.run(&list, dry_run, callback)?;
        Ok(list)
    }

    /// Mirror the local tree onto the remote filesystem; mirror image of
    /// [`Mirrorer::mirror_from_remote`].
    pub fn mirror_to_remote(
        &mut self,
        callback: Option<&mut ActionCallback<'_>>,
        dry_run: bool,
    ) -> Result<ActionList, MirrorError> {
        let remote = load_remote_tree(&mut self.session)?;
        let local = load_local_tree(&self.local_base)?;
        let list = ActionList::new(plan_to_remote(&local, &remote));
        self.run(&list, dry_run, callback)?;
        Ok(list)
    }

    fn run(
        &mut self,
        list: &ActionList,
        dry_run: bool,
        callback: Option<&mut ActionCallback<'_>>,
    ) -> Result<(), MirrorError> {
        match callback {
            Some(cb) => list.execute_all(&mut self.session, &self.local_base, dry_run, cb),
            None => list.execute_all(&mut self.session, &self.local_base, dry_run, &mut |_| Ok(())),
        }
    }

    pub fn close(&mut self) {
        self.session.close();
    }
}

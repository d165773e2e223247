//! Transport abstraction (C1): one method per SFTP primitive, a pure
//! interface with a single production implementation over `ssh2`.
//!
//! Grounded on `hostpilot::transfer::sftp_like::{SftpLike, Ssh2Adapter}`,
//! generalised from the small read/write/stat/mkdir surface the teacher's
//! upload/download workers needed into the full primitive set spec.md
//! §4.1 requires (`walkTree`, `makedirs`, `isConnected`, `reconnect`,
//! `close`), and from a boxed-trait-object shape into the durable session's
//! actual dependency.

use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::entry::{Entry, EntryKind};
use crate::error::{MirrorError, TransportFault};

/// Fault-injecting test double. Always compiled (not `#[cfg(test)]`) so
/// both unit tests and the `tests/` integration suite can depend on it.
pub mod mock;

/// Credentials retained on the session so that reconnect is self-contained
/// (spec §4.2: "Credentials ... are retained on the session object
/// precisely so that reconnect has no external dependency").
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<PathBuf>,
    pub private_key_pass: Option<String>,
}

/// The capability set consumed by the core (spec §4.1). A pure interface;
/// `Ssh2Transport` is the production implementation, `MockTransport` (test
/// module) the fault-injecting stand-in used by the retry/reconnect tests.
pub trait Transport: Send {
    fn list_dir_attr(&mut self, path: &str) -> Result<Vec<(String, Entry)>, MirrorError>;
    fn stat(&mut self, path: &str) -> Result<Entry, MirrorError>;
    fn get(&mut self, remote: &str, local: &Path, preserve_mtime: bool) -> Result<(), MirrorError>;
    fn put(&mut self, local: &Path, remote: &str, preserve_mtime: bool) -> Result<(), MirrorError>;
    fn mkdir(&mut self, path: &str) -> Result<(), MirrorError>;
    fn makedirs(&mut self, path: &str) -> Result<(), MirrorError>;
    fn rmdir(&mut self, path: &str) -> Result<(), MirrorError>;
    fn remove(&mut self, path: &str) -> Result<(), MirrorError>;
    /// Depth-first walk from `root`, invoking `on_file`/`on_dir`/`on_other`
    /// with the full remote path of each entry encountered.
    fn walk_tree(
        &mut self,
        root: &str,
        on_file: &mut dyn FnMut(&str, &Entry),
        on_dir: &mut dyn FnMut(&str, &Entry),
        on_other: &mut dyn FnMut(&str, &Entry),
    ) -> Result<(), MirrorError>;
    fn is_connected(&self) -> bool;
    fn reconnect(&mut self) -> Result<(), MirrorError>;
    fn close(&mut self);
}

/// Parameters needed to (re)establish the underlying connection, kept
/// alongside the session so `reconnect` never needs anything the caller
/// hasn't already provided once.
#[derive(Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub verify_host_key: bool,
}

/// Production transport backed by `ssh2::Session` + `ssh2::Sftp`.
///
/// Grounded on `hostpilot::transfer::session::{connect_session,
/// create_tcp_connection}` for the connect sequence, generalised to also
/// support password auth (the teacher only tries key files) and strict
/// host-key verification (spec §9's redesign flag).
pub struct Ssh2Transport {
    params: ConnectParams,
    session: Option<ssh2::Session>,
    sftp: Option<ssh2::Sftp>,
}

impl Ssh2Transport {
    pub fn connect(params: ConnectParams) -> Result<Self, MirrorError> {
        let mut t = Ssh2Transport { params, session: None, sftp: None };
        t.reconnect()?;
        Ok(t)
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.params.host, self.params.port)
    }

    fn tcp_connect(&self) -> Result<TcpStream, MirrorError> {
        let addr = self.addr();
        let mut addrs = addr.to_socket_addrs().map_err(|_| {
            MirrorError::Transport(TransportFault::HostResolution(addr.clone()))
        })?;
        let sock = addrs
            .next()
            .ok_or_else(|| MirrorError::Transport(TransportFault::HostResolution(addr.clone())))?;
        let tcp = TcpStream::connect_timeout(&sock, self.params.connect_timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionRefused {
                MirrorError::Transport(TransportFault::ConnectionRefused(addr.clone()))
            } else {
                MirrorError::Transport(TransportFault::ConnectTimeout(addr.clone()))
            }
        })?;
        let _ = tcp.set_read_timeout(Some(self.params.read_timeout));
        let _ = tcp.set_write_timeout(Some(self.params.read_timeout));
        Ok(tcp)
    }

    fn verify_host_key(&self, sess: &ssh2::Session) -> Result<(), MirrorError> {
        if !self.params.verify_host_key {
            return Ok(());
        }
        let mut known_hosts = sess
            .known_hosts()
            .map_err(|e| MirrorError::Transport(TransportFault::Protocol(e.to_string())))?;
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".ssh").join("known_hosts");
            let _ = known_hosts.read_file(&path, ssh2::KnownHostFileKind::OpenSSH);
        }
        let (key, _key_type) = sess
            .host_key()
            .ok_or_else(|| MirrorError::Transport(TransportFault::Protocol("no host key presented".into())))?;
        use ssh2::CheckResult;
        match known_hosts.check(&self.params.host, key) {
            CheckResult::Match => Ok(()),
            CheckResult::NotFound => {
                Err(MirrorError::Auth(format!(
                    "host key for {} is not in known_hosts (pass --verify-host-key=no to skip)",
                    self.params.host
                )))
            }
            CheckResult::Mismatch => {
                Err(MirrorError::Auth(format!(
                    "host key for {} does NOT match known_hosts — possible MITM",
                    self.params.host
                )))
            }
            CheckResult::Failure => {
                Err(MirrorError::Transport(TransportFault::Protocol("host key check failed".into())))
            }
        }
    }

    fn authenticate(&self, sess: &mut ssh2::Session) -> Result<(), MirrorError> {
        let creds = &self.params.credentials;
        if let Some(key) = &creds.private_key {
            let _ = sess.userauth_pubkey_file(
                &creds.username,
                None,
                key,
                creds.private_key_pass.as_deref(),
            );
        }
        if !sess.authenticated()
            && let Some(password) = &creds.password
        {
            let _ = sess.userauth_password(&creds.username, password);
        }
        if sess.authenticated() {
            Ok(())
        } else {
            tracing::debug!("SSH authentication failed for {}@{}", creds.username, self.addr());
            Err(MirrorError::Auth(self.addr()))
        }
    }

    fn map_ssh2_err(e: ssh2::Error) -> MirrorError {
        use ssh2::ErrorCode;
        // libssh2 SFTP status codes: 2 = NO_SUCH_FILE, 3 = PERMISSION_DENIED.
        match e.code() {
            ErrorCode::SFTP(2) => MirrorError::RemoteNotFound(e.message().to_string()),
            ErrorCode::SFTP(3) => MirrorError::RemoteAccessDenied(e.message().to_string()),
            _ => MirrorError::Transport(TransportFault::Protocol(e.message().to_string())),
        }
    }

    fn sftp(&mut self) -> Result<&ssh2::Sftp, MirrorError> {
        if self.sftp.is_none() {
            return Err(MirrorError::Transport(TransportFault::NotConnected));
        }
        Ok(self.sftp.as_ref().unwrap())
    }

    fn entry_from_stat(path: &str, stat: &ssh2::FileStat) -> Entry {
        let kind = if stat.is_dir() {
            EntryKind::Dir
        } else if stat.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        Entry::new(path, kind, stat.size.unwrap_or(0), stat.mtime.unwrap_or(0))
    }
}

impl Transport for Ssh2Transport {
    fn list_dir_attr(&mut self, path: &str) -> Result<Vec<(String, Entry)>, MirrorError> {
        let sftp = self.sftp()?;
        let entries = sftp.readdir(Path::new(path)).map_err(Self::map_ssh2_err)?;
        let mut out = Vec::with_capacity(entries.len());
        for (pathbuf, stat) in entries {
            let Some(name) = pathbuf.file_name().and_then(|n| n.to_str()) else { continue };
            if name == "." || name == ".." {
                continue;
            }
            out.push((name.to_string(), Self::entry_from_stat(name, &stat)));
        }
        Ok(out)
    }

    fn stat(&mut self, path: &str) -> Result<Entry, MirrorError> {
        let sftp = self.sftp()?;
        let stat = sftp.stat(Path::new(path)).map_err(Self::map_ssh2_err)?;
        Ok(Self::entry_from_stat(path, &stat))
    }

    fn get(&mut self, remote: &str, local: &Path, preserve_mtime: bool) -> Result<(), MirrorError> {
        let sftp = self.sftp()?;
        let mut remote_file = sftp.open(Path::new(remote)).map_err(Self::map_ssh2_err)?;
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MirrorError::LocalIo(parent.to_path_buf(), e.to_string()))?;
        }
        let mut local_file = std::fs::File::create(local)
            .map_err(|e| MirrorError::LocalIo(local.to_path_buf(), e.to_string()))?;
        std::io::copy(&mut remote_file, &mut local_file)
            .map_err(|e| MirrorError::LocalIo(local.to_path_buf(), e.to_string()))?;
        if preserve_mtime {
            let stat = remote_file.stat().map_err(Self::map_ssh2_err)?;
            if let Some(mtime) = stat.mtime {
                let atime = stat.atime.unwrap_or(mtime);
                let mtime_st = std::time::UNIX_EPOCH + Duration::from_secs(mtime);
                let atime_st = std::time::UNIX_EPOCH + Duration::from_secs(atime);
                let _ = filetime_set(local, atime_st, mtime_st);
            }
        }
        Ok(())
    }

    fn put(&mut self, local: &Path, remote: &str, preserve_mtime: bool) -> Result<(), MirrorError> {
        let meta = std::fs::metadata(local)
            .map_err(|e| MirrorError::LocalIo(local.to_path_buf(), e.to_string()))?;
        let mtime_secs = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs());
        let mut local_file = std::fs::File::open(local)
            .map_err(|e| MirrorError::LocalIo(local.to_path_buf(), e.to_string()))?;
        let sftp = self.sftp()?;
        let mut remote_file = sftp.create(Path::new(remote)).map_err(Self::map_ssh2_err)?;
        std::io::copy(&mut local_file, &mut remote_file).map_err(|e| {
            MirrorError::Transport(TransportFault::Protocol(format!("upload failed: {e}")))
        })?;
        if preserve_mtime
            && let Some(mtime) = mtime_secs
        {
            let stat = ssh2::FileStat {
                size: None,
                uid: None,
                gid: None,
                perm: None,
                atime: Some(mtime),
                mtime: Some(mtime),
            };
            let _ = sftp.setstat(Path::new(remote), stat);
        }
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), MirrorError> {
        let sftp = self.sftp()?;
        match sftp.mkdir(Path::new(path), 0o755) {
            Ok(()) => Ok(()),
            Err(e) => {
                // Succeed if it already exists as a directory (spec §4.6: "succeeding if it already exists").
                if let Ok(stat) = sftp.stat(Path::new(path))
                    && stat.is_dir()
                {
                    return Ok(());
                }
                Err(Self::map_ssh2_err(e))
            }
        }
    }

    fn makedirs(&mut self, path: &str) -> Result<(), MirrorError> {
        let mut accum = String::new();
        for seg in path.trim_start_matches('/').split('/').filter(|s| !s.is_empty()) {
            accum.push('/');
            accum.push_str(seg);
            self.mkdir(&accum)?;
        }
        if accum.is_empty() {
            self.mkdir("/")?;
        }
        Ok(())
    }

    fn rmdir(&mut self, path: &str) -> Result<(), MirrorError> {
        let sftp = self.sftp()?;
        sftp.rmdir(Path::new(path)).map_err(Self::map_ssh2_err)
    }

    fn remove(&mut self, path: &str) -> Result<(), MirrorError> {
        let sftp = self.sftp()?;
        sftp.unlink(Path::new(path)).map_err(Self::map_ssh2_err)
    }

    fn walk_tree(
        &mut self,
        root: &str,
        on_file: &mut dyn FnMut(&str, &Entry),
        on_dir: &mut dyn FnMut(&str, &Entry),
        on_other: &mut dyn FnMut(&str, &Entry),
    ) -> Result<(), MirrorError> {
        let mut stack = vec![root.to_string()];
        while let Some(dir) = stack.pop() {
            for (name, entry) in self.list_dir_attr(&dir)? {
                let full = crate::entry::join_remote(&dir, &name);
                let entry = Entry::new(full.clone(), entry.kind(), entry.size(), entry.mtime());
                match entry.kind() {
                    EntryKind::Dir => {
                        on_dir(&full, &entry);
                        stack.push(full);
                    }
                    EntryKind::File => on_file(&full, &entry),
                    EntryKind::Other => on_other(&full, &entry),
                }
            }
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some() && self.sftp.is_some()
    }

    fn reconnect(&mut self) -> Result<(), MirrorError> {
        self.close();
        let tcp = self.tcp_connect()?;
        let mut sess = ssh2::Session::new()
            .map_err(|e| MirrorError::Transport(TransportFault::Protocol(e.to_string())))?;
        sess.set_tcp_stream(tcp);
        sess.set_timeout(self.params.read_timeout.as_millis() as u32);
        sess.handshake()
            .map_err(|e| MirrorError::Transport(TransportFault::Protocol(e.to_string())))?;
        self.verify_host_key(&sess)?;
        self.authenticate(&mut sess)?;
        let sftp = sess.sftp().map_err(Self::map_ssh2_err)?;
        self.session = Some(sess);
        self.sftp = Some(sftp);
        tracing::info!("connected to {}", self.addr());
        Ok(())
    }

    fn close(&mut self) {
        self.sftp = None;
        self.session = None;
    }
}

/// Minimal `utimensat`-free mtime setter: writes via `std::fs::File` isn't
/// enough to set mtime portably without a crate, so we shell out to the
/// platform call via `std::fs::FileTimes` (stable since Rust 1.75), which
/// is sufficient for whole-second precision and keeps the dependency list
/// unchanged from the teacher's.
fn filetime_set(
    path: &Path,
    atime: std::time::SystemTime,
    mtime: std::time::SystemTime,
) -> std::io::Result<()> {
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    let times = std::fs::FileTimes::new().set_accessed(atime).set_modified(mtime);
    file.set_times(times)
}

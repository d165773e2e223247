//! In-memory [`Transport`] double used by the test suite, standing in for
//! `durasftp`'s TCP fault-injection proxy (`port_forwarder.py`), which is
//! out of scope for this crate (spec §1: named only by its interface).
//! Grounded on the same idea the teacher's worker-pool mock I/O used —
//! wrap a real operation with a scriptable failure queue — but over the
//! whole [`Transport`] surface instead of just `Read`/`Write`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::entry::{Entry, EntryKind, join_remote};
use crate::error::{MirrorError, TransportFault};
use crate::transport::Transport;

#[derive(Clone)]
enum Node {
    Dir,
    File { data: Vec<u8>, mtime: u64 },
}

/// A single scripted failure: the Nth call to `method` returns this fault
/// instead of running normally.
#[derive(Clone)]
pub struct Fault {
    pub method: &'static str,
    pub fault: TransportFault,
}

struct Inner {
    nodes: BTreeMap<String, Node>,
    connected: bool,
    reconnect_count: u64,
    /// Faults still queued per method name; popped (in order) on each
    /// matching call.
    queued_faults: Vec<Fault>,
    calls: Vec<&'static str>,
}

/// A cheap-to-clone handle around a shared in-memory filesystem, so a test
/// can both hand a `MockTransport` to a [`crate::mirrorer::Mirrorer`] and
/// separately script/inspect it afterwards.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        MockTransport {
            inner: Arc::new(Mutex::new(Inner {
                nodes,
                connected: true,
                reconnect_count: 0,
                queued_faults: Vec::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Seed a remote file at `path` (parent directories are created
    /// implicitly) with the given contents and whole-second mtime.
    pub fn put_file(&self, path: &str, data: &[u8], mtime: u64) {
        let mut inner = self.inner.lock().unwrap();
        ensure_ancestors(&mut inner.nodes, path);
        inner.nodes.insert(path.to_string(), Node::File { data: data.to_vec(), mtime });
    }

    /// Seed a remote directory at `path`.
    pub fn put_dir(&self, path: &str) {
        let mut inner = self.inner.lock().unwrap();
        ensure_ancestors(&mut inner.nodes, path);
        inner.nodes.insert(path.to_string(), Node::Dir);
    }

    /// Queue a fault: the next call to `method` (one of `"list_dir_attr"`,
    /// `"get"`, `"put"`, `"mkdir"`, `"stat"`) fails with `fault` instead of
    /// running; the call after that runs normally unless another fault is
    /// queued for the same method.
    pub fn queue_fault(&self, method: &'static str, fault: TransportFault) {
        self.inner.lock().unwrap().queued_faults.push(Fault { method, fault });
    }

    pub fn reconnect_count(&self) -> u64 {
        self.inner.lock().unwrap().reconnect_count
    }

    pub fn call_count(&self, method: &'static str) -> usize {
        self.inner.lock().unwrap().calls.iter().filter(|m| **m == method).count()
    }

    fn take_fault(&self, method: &'static str) -> Option<TransportFault> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(method);
        if !inner.connected {
            return Some(TransportFault::NotConnected);
        }
        if let Some(pos) = inner.queued_faults.iter().position(|f| f.method == method) {
            return Some(inner.queued_faults.remove(pos).fault);
        }
        None
    }
}

fn ensure_ancestors(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let mut accum = String::new();
    for seg in path.trim_start_matches('/').split('/').filter(|s| !s.is_empty()) {
        accum.push('/');
        accum.push_str(seg);
        nodes.entry(accum.clone()).or_insert(Node::Dir);
    }
}

fn children_of<'a>(nodes: &'a BTreeMap<String, Node>, parent: &str) -> Vec<(&'a str, &'a Node)> {
    let prefix = if parent == "/" { "/".to_string() } else { format!("{parent}/") };
    nodes
        .iter()
        .filter_map(|(p, n)| {
            if p == parent || !p.starts_with(&prefix) {
                return None;
            }
            let rest = &p[prefix.len()..];
            if rest.contains('/') { None } else { Some((rest, n)) }
        })
        .collect()
}

impl Transport for MockTransport {
    fn list_dir_attr(&mut self, path: &str) -> Result<Vec<(String, Entry)>, MirrorError> {
        if let Some(f) = self.take_fault("list_dir_attr") {
            return Err(f.into());
        }
        let inner = self.inner.lock().unwrap();
        if !inner.nodes.contains_key(path) {
            return Err(MirrorError::RemoteNotFound(path.to_string()));
        }
        let mut out = Vec::new();
        for (name, node) in children_of(&inner.nodes, path) {
            let full = join_remote(path, name);
            let entry = match node {
                Node::Dir => Entry::dir(full),
                Node::File { data, mtime } => Entry::file(full, data.len() as u64, *mtime),
            };
            out.push((name.to_string(), entry));
        }
        Ok(out)
    }

    fn stat(&mut self, path: &str) -> Result<Entry, MirrorError> {
        if let Some(f) = self.take_fault("stat") {
            return Err(f.into());
        }
        let inner = self.inner.lock().unwrap();
        match inner.nodes.get(path) {
            Some(Node::Dir) => Ok(Entry::dir(path)),
            Some(Node::File { data, mtime }) => Ok(Entry::file(path, data.len() as u64, *mtime)),
            None => Err(MirrorError::RemoteNotFound(path.to_string())),
        }
    }

    fn get(&mut self, remote: &str, local: &Path, preserve_mtime: bool) -> Result<(), MirrorError> {
        if let Some(f) = self.take_fault("get") {
            return Err(f.into());
        }
        let (data, mtime) = {
            let inner = self.inner.lock().unwrap();
            match inner.nodes.get(remote) {
                Some(Node::File { data, mtime }) => (data.clone(), *mtime),
                Some(Node::Dir) => {
                    return Err(MirrorError::Transport(TransportFault::Protocol(format!(
                        "{remote} is a directory"
                    ))));
                }
                None => return Err(MirrorError::RemoteNotFound(remote.to_string())),
            }
        };
        if let Some(parent) = local.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MirrorError::LocalIo(parent.to_path_buf(), e.to_string()))?;
        }
        std::fs::write(local, &data).map_err(|e| MirrorError::LocalIo(local.to_path_buf(), e.to_string()))?;
        if preserve_mtime {
            let mtime_st = std::time::UNIX_EPOCH + std::time::Duration::from_secs(mtime);
            if let Ok(file) = std::fs::OpenOptions::new().write(true).open(local) {
                let times = std::fs::FileTimes::new().set_modified(mtime_st);
                let _ = file.set_times(times);
            }
        }
        Ok(())
    }

    fn put(&mut self, local: &Path, remote: &str, preserve_mtime: bool) -> Result<(), MirrorError> {
        if let Some(f) = self.take_fault("put") {
            return Err(f.into());
        }
        let data = std::fs::read(local).map_err(|e| MirrorError::LocalIo(local.to_path_buf(), e.to_string()))?;
        let mtime = if preserve_mtime {
            std::fs::metadata(local)
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0)
        } else {
            0
        };
        let mut inner = self.inner.lock().unwrap();
        ensure_ancestors(&mut inner.nodes, remote);
        inner.nodes.insert(remote.to_string(), Node::File { data, mtime });
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> Result<(), MirrorError> {
        if let Some(f) = self.take_fault("mkdir") {
            return Err(f.into());
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.nodes.get(path) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File { .. }) => {
                Err(MirrorError::Transport(TransportFault::Protocol(format!("{path} exists as a file"))))
            }
            None => {
                inner.nodes.insert(path.to_string(), Node::Dir);
                Ok(())
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
        Ok(())
    }

    fn rmdir(&mut self, path: &str) -> Result<(), MirrorError> {
        if let Some(f) = self.take_fault("rmdir") {
            return Err(f.into());
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.nodes.remove(path) {
            Some(Node::Dir) => Ok(()),
            Some(other) => {
                inner.nodes.insert(path.to_string(), other);
                Err(MirrorError::Transport(TransportFault::Protocol(format!("{path} is not a directory"))))
            }
            None => Err(MirrorError::RemoteNotFound(path.to_string())),
        }
    }

    fn remove(&mut self, path: &str) -> Result<(), MirrorError> {
        if let Some(f) = self.take_fault("remove") {
            return Err(f.into());
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.nodes.remove(path) {
            Some(Node::File { .. }) => Ok(()),
            Some(other) => {
                inner.nodes.insert(path.to_string(), other);
                Err(MirrorError::Transport(TransportFault::Protocol(format!("{path} is a directory"))))
            }
            None => Err(MirrorError::RemoteNotFound(path.to_string())),
        }
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
                let full = join_remote(&dir, &name);
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
        self.inner.lock().unwrap().connected
    }

    fn reconnect(&mut self) -> Result<(), MirrorError> {
        let mut inner = self.inner.lock().unwrap();
        inner.connected = true;
        inner.reconnect_count += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.inner.lock().unwrap().connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_fault_fires_once() {
        let mut mock = MockTransport::new();
        mock.queue_fault("list_dir_attr", TransportFault::Disconnected);
        assert!(mock.list_dir_attr("/").is_err());
        assert!(mock.list_dir_attr("/").is_ok());
    }

    #[test]
    fn put_then_get_roundtrip() {
        let mock = MockTransport::new();
        mock.put_file("/a.txt", b"hi", 42);
        let mut t = mock.clone();
        let entries = t.list_dir_attr("/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.size(), 2);
        assert_eq!(entries[0].1.mtime(), 42);
    }
}

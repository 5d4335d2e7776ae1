//! In-memory remote tree.
//!
//! Behaves like a strict SFTP server (non-recursive `mkdir`, `put` needs an
//! existing parent) and records every `mkdir` / `put` so tests can assert on
//! the exact calls made. Individual paths can be set to fail.

use std::collections::{BTreeMap, HashSet};
use std::io::{ErrorKind, Read};

use chrono::{DateTime, Utc};

use stagesync_core::FileMetadata;

use super::{RemoteError, RemoteFileSystem};
use crate::path::RemotePosixPath;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File {
        data: Vec<u8>,
        modified_at: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
pub struct MemoryRemote {
    nodes: BTreeMap<String, Node>,
    clock: Option<DateTime<Utc>>,
    mkdir_calls: Vec<String>,
    put_calls: Vec<String>,
    fail_stat: HashSet<String>,
    fail_put: HashSet<String>,
}

fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/" || path == "."
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-existing directory (ancestors are not implied).
    pub fn with_dir(mut self, path: &str) -> Self {
        self.nodes.insert(path.to_string(), Node::Dir);
        self
    }

    /// Pre-existing file.
    pub fn with_file(mut self, path: &str, data: &[u8], modified_at: DateTime<Utc>) -> Self {
        self.nodes.insert(
            path.to_string(),
            Node::File {
                data: data.to_vec(),
                modified_at,
            },
        );
        self
    }

    /// Fix the mtime assigned to uploaded files (defaults to `Utc::now()`).
    pub fn set_clock(&mut self, now: DateTime<Utc>) {
        self.clock = Some(now);
    }

    /// Make `stat(path)` fail with an I/O error.
    pub fn fail_stat(&mut self, path: &str) {
        self.fail_stat.insert(path.to_string());
    }

    /// Make `put(path)` fail with an I/O error.
    pub fn fail_put(&mut self, path: &str) {
        self.fail_put.insert(path.to_string());
    }

    pub fn mkdir_calls(&self) -> &[String] {
        &self.mkdir_calls
    }

    pub fn put_calls(&self) -> &[String] {
        &self.put_calls
    }

    pub fn is_dir(&self, path: &str) -> bool {
        is_root(path) || self.nodes.get(path) == Some(&Node::Dir)
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        match self.nodes.get(path) {
            Some(Node::File { data, .. }) => Some(data),
            _ => None,
        }
    }

    /// All directory paths, sorted.
    pub fn dirs(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::Dir))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::File { .. }))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn parent_exists(&self, path: &RemotePosixPath) -> bool {
        match path.parent() {
            Some(parent) => self.is_dir(parent.as_str()),
            None => true,
        }
    }

    fn injected(path: &RemotePosixPath, what: &str) -> RemoteError {
        RemoteError::io(path, std::io::Error::other(format!("injected {what} failure")))
    }
}

impl RemoteFileSystem for MemoryRemote {
    fn stat(&mut self, path: &RemotePosixPath) -> Result<FileMetadata, RemoteError> {
        if self.fail_stat.contains(path.as_str()) {
            return Err(Self::injected(path, "stat"));
        }
        if is_root(path.as_str()) {
            return Ok(FileMetadata::new(0, DateTime::<Utc>::default()));
        }
        match self.nodes.get(path.as_str()) {
            Some(Node::Dir) => Ok(FileMetadata::new(0, DateTime::<Utc>::default())),
            Some(Node::File { data, modified_at }) => {
                Ok(FileMetadata::new(data.len() as u64, *modified_at))
            }
            None => Err(RemoteError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    fn mkdir(&mut self, path: &RemotePosixPath) -> Result<(), RemoteError> {
        self.mkdir_calls.push(path.to_string());
        if is_root(path.as_str()) || self.nodes.contains_key(path.as_str()) {
            return Err(RemoteError::AlreadyExists {
                path: path.to_string(),
            });
        }
        if !self.parent_exists(path) {
            return Err(RemoteError::io(
                path,
                std::io::Error::new(ErrorKind::NotFound, "parent directory missing"),
            ));
        }
        self.nodes.insert(path.to_string(), Node::Dir);
        Ok(())
    }

    fn put(&mut self, contents: &mut dyn Read, path: &RemotePosixPath) -> Result<u64, RemoteError> {
        self.put_calls.push(path.to_string());
        if self.fail_put.contains(path.as_str()) {
            return Err(Self::injected(path, "put"));
        }
        if !self.parent_exists(path) {
            return Err(RemoteError::io(
                path,
                std::io::Error::new(ErrorKind::NotFound, "parent directory missing"),
            ));
        }
        if self.is_dir(path.as_str()) {
            return Err(RemoteError::io(
                path,
                std::io::Error::other("is a directory"),
            ));
        }
        let mut data = Vec::new();
        contents
            .read_to_end(&mut data)
            .map_err(|e| RemoteError::io(path, e))?;
        let len = data.len() as u64;
        let modified_at = self.clock.unwrap_or_else(Utc::now);
        self.nodes
            .insert(path.to_string(), Node::File { data, modified_at });
        Ok(len)
    }
}

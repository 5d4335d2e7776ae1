//! A remote tree realized inside a local directory.
//!
//! Absolute and relative remote paths both land under `root`; `..` segments
//! are refused so nothing escapes it.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use stagesync_core::FileMetadata;

use super::{RemoteError, RemoteFileSystem};
use crate::path::RemotePosixPath;

#[derive(Debug, Clone)]
pub struct LocalRoot {
    root: PathBuf,
}

impl LocalRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path for a remote path.
    pub fn host_path(&self, path: &RemotePosixPath) -> Result<PathBuf, RemoteError> {
        let mut out = self.root.clone();
        for segment in path.as_str().split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(RemoteError::io(
                        path,
                        std::io::Error::new(ErrorKind::InvalidInput, "path escapes the local root"),
                    ))
                }
                s => out.push(s),
            }
        }
        Ok(out)
    }
}

fn map_err(path: &RemotePosixPath, e: std::io::Error) -> RemoteError {
    match e.kind() {
        ErrorKind::NotFound => RemoteError::NotFound {
            path: path.to_string(),
        },
        ErrorKind::AlreadyExists => RemoteError::AlreadyExists {
            path: path.to_string(),
        },
        _ => RemoteError::io(path, e),
    }
}

impl RemoteFileSystem for LocalRoot {
    fn stat(&mut self, path: &RemotePosixPath) -> Result<FileMetadata, RemoteError> {
        let host = self.host_path(path)?;
        FileMetadata::from_local(&host).map_err(|e| map_err(path, e))
    }

    fn mkdir(&mut self, path: &RemotePosixPath) -> Result<(), RemoteError> {
        let host = self.host_path(path)?;
        match std::fs::create_dir(&host) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(RemoteError::AlreadyExists {
                path: path.to_string(),
            }),
            // A missing parent is a plain I/O failure for mkdir, not "absent".
            Err(e) => Err(RemoteError::io(path, e)),
        }
    }

    fn put(&mut self, contents: &mut dyn Read, path: &RemotePosixPath) -> Result<u64, RemoteError> {
        let host = self.host_path(path)?;
        let mut file = std::fs::File::create(&host).map_err(|e| RemoteError::io(path, e))?;
        std::io::copy(contents, &mut file).map_err(|e| RemoteError::io(path, e))
    }
}

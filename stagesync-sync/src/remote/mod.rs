//! The remote filesystem capability and its backends.
//!
//! | Backend          | Realizes the remote tree in…                      |
//! |------------------|---------------------------------------------------|
//! | [`LocalRoot`]    | a local directory (mounted share, tests)          |
//! | [`MemoryRemote`] | memory, with call recording and fault injection   |
//! | `SftpRemote`     | an SFTP server (`sftp` feature)                   |

use std::io::Read;

use thiserror::Error;

use stagesync_core::FileMetadata;

use crate::path::RemotePosixPath;

pub mod local;
pub mod memory;
#[cfg(feature = "sftp")]
pub mod sftp;

pub use local::LocalRoot;
pub use memory::MemoryRemote;
#[cfg(feature = "sftp")]
pub use sftp::SftpRemote;

/// Backend-level failures. "Path absent" is its own variant so callers can
/// branch on it instead of treating it as an error.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote path not found: {path}")]
    NotFound { path: String },

    #[error("remote path already exists: {path}")]
    AlreadyExists { path: String },

    #[error("remote I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The session itself is unusable (connect, handshake, auth).
    #[error("remote session error: {0}")]
    Session(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }

    pub(crate) fn io(path: &RemotePosixPath, source: std::io::Error) -> Self {
        RemoteError::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Path-oriented, directory-aware remote file access.
///
/// `mkdir` is not recursive: the parent must already exist. Nothing here
/// promises atomic rename or replace semantics.
pub trait RemoteFileSystem {
    /// Size and mtime of `path`, or [`RemoteError::NotFound`].
    fn stat(&mut self, path: &RemotePosixPath) -> Result<FileMetadata, RemoteError>;

    /// Create a single directory.
    fn mkdir(&mut self, path: &RemotePosixPath) -> Result<(), RemoteError>;

    /// Write `contents` to `path`, replacing any existing file. Returns the
    /// number of bytes written.
    fn put(&mut self, contents: &mut dyn Read, path: &RemotePosixPath) -> Result<u64, RemoteError>;
}

impl<T: RemoteFileSystem + ?Sized> RemoteFileSystem for Box<T> {
    fn stat(&mut self, path: &RemotePosixPath) -> Result<FileMetadata, RemoteError> {
        (**self).stat(path)
    }

    fn mkdir(&mut self, path: &RemotePosixPath) -> Result<(), RemoteError> {
        (**self).mkdir(path)
    }

    fn put(&mut self, contents: &mut dyn Read, path: &RemotePosixPath) -> Result<u64, RemoteError> {
        (**self).put(contents, path)
    }
}

//! Error types for stagesync-sync.

use std::path::PathBuf;

use thiserror::Error;

use stagesync_core::{ConfigError, ItemError};
use stagesync_stage::StageError;

use crate::mirror::FailedTransfer;
use crate::remote::RemoteError;

/// All errors that can abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required external parameter is missing or unusable.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A declared item is missing, or is neither a file nor a directory.
    #[error(transparent)]
    Item(#[from] ItemError),

    /// Building the snapshot failed.
    #[error("stage error: {0}")]
    Stage(#[from] StageError),

    /// `stat` / `mkdir` failed for a reason other than "path absent".
    #[error("remote I/O error: {0}")]
    RemoteIo(#[from] RemoteError),

    /// The byte transfer itself failed after its preconditions were met.
    #[error("transfer of {local} to {remote} failed: {source}")]
    Transfer {
        local: PathBuf,
        remote: String,
        #[source]
        source: RemoteError,
    },

    /// Reading the local side failed.
    #[error("I/O error at {path}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transfers failed under the `continue` failure policy.
    #[error("{} file transfer(s) failed", .failures.len())]
    PartialFailure { failures: Vec<FailedTransfer> },
}

/// Convenience constructor for [`SyncError::LocalIo`].
pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::LocalIo {
        path: path.into(),
        source,
    }
}

pub(crate) fn walk_err(root: &std::path::Path, err: walkdir::Error) -> SyncError {
    let path = err.path().unwrap_or(root).to_path_buf();
    local_io(path, err.into())
}

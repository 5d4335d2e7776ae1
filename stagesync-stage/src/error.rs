//! Error types for stagesync-stage.

use std::path::PathBuf;

use thiserror::Error;

use stagesync_core::ItemError;

/// All errors that can arise while staging a build.
#[derive(Debug, Error)]
pub enum StageError {
    /// A declared item is missing or of an unsupported kind.
    #[error(transparent)]
    Item(#[from] ItemError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cleaning the build directory would delete (or recurse into) a source item.
    #[error("build directory {build_dir} overlaps source item {item}")]
    BuildDirOverlapsSource { build_dir: PathBuf, item: PathBuf },

    /// The substituted text cannot be written back in the file's encoding.
    #[error("cannot re-encode {path} as {encoding} after substitution")]
    Unencodable {
        path: PathBuf,
        encoding: &'static str,
    },
}

/// Convenience constructor for [`StageError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StageError {
    StageError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn walk_err(root: &std::path::Path, err: walkdir::Error) -> StageError {
    let path = err.path().unwrap_or(root).to_path_buf();
    io_err(path, err.into())
}

//! Domain types shared by the stager and the synchronizer.
//!
//! Local filesystem paths are always `PathBuf`. Remote paths never appear
//! here; they live in `stagesync-sync` as `RemotePosixPath`.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ItemError;

// ---------------------------------------------------------------------------
// Build version
// ---------------------------------------------------------------------------

/// Format of generated build versions: a sortable UTC timestamp.
pub const BUILD_VERSION_FORMAT: &str = "%Y%m%d%H%M%S";

/// The version string stamped into every staged text file of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildVersion(pub String);

impl BuildVersion {
    /// Generate a version from the current UTC time.
    pub fn generate() -> Self {
        Self::at(Utc::now())
    }

    /// Version for a fixed instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant.format(BUILD_VERSION_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BuildVersion {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BuildVersion {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Local items
// ---------------------------------------------------------------------------

/// Kind of a declared local item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Directory,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::File => write!(f, "file"),
            ItemKind::Directory => write!(f, "directory"),
        }
    }
}

/// An absolute, resolved local path tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalItem {
    pub path: PathBuf,
    pub kind: ItemKind,
}

impl LocalItem {
    /// Resolve `path` (following symlinks) and classify it.
    ///
    /// Returns [`ItemError::MissingSource`] if nothing exists at `path` and
    /// [`ItemError::UnsupportedKind`] for sockets, devices and the like.
    pub fn resolve(path: &Path) -> Result<Self, ItemError> {
        let resolved = match path.canonicalize() {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ItemError::MissingSource {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(ItemError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        let meta = std::fs::metadata(&resolved).map_err(|e| ItemError::Io {
            path: resolved.clone(),
            source: e,
        })?;
        let kind = if meta.is_file() {
            ItemKind::File
        } else if meta.is_dir() {
            ItemKind::Directory
        } else {
            return Err(ItemError::UnsupportedKind { path: resolved });
        };
        Ok(Self {
            path: resolved,
            kind,
        })
    }

    /// Final path segment, used as the remote name of the item.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or(self.path.as_os_str())
            .to_string_lossy()
            .into_owned()
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Size and modification time of a file, local or remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

impl FileMetadata {
    pub fn new(size: u64, modified_at: DateTime<Utc>) -> Self {
        Self { size, modified_at }
    }

    /// Read size and mtime of a local path.
    pub fn from_local(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let modified = meta.modified()?;
        Ok(Self {
            size: meta.len(),
            modified_at: DateTime::<Utc>::from(modified),
        })
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// Which properties of a remote file are compared before skipping an upload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangeCriteria {
    pub compare_size: bool,
    pub compare_mtime: bool,
    /// Local may be newer than remote by up to this many seconds without
    /// triggering an upload.
    pub mtime_grace_seconds: f64,
}

impl Default for ChangeCriteria {
    fn default() -> Self {
        Self {
            compare_size: true,
            compare_mtime: true,
            mtime_grace_seconds: 2.0,
        }
    }
}

/// Whether file uploads are unconditional or gated by change detection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum UploadPolicy {
    /// Upload every file on every run.
    #[default]
    Always,
    /// Skip files whose remote copy looks unchanged.
    SkipUnchanged(ChangeCriteria),
}

/// What to do when a single file transfer fails mid-walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failure.
    #[default]
    Abort,
    /// Record the failure and keep mirroring remaining files.
    Continue,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Local → remote tree mirroring.
//!
//! Remote nodes are created or overwritten, never deleted. Every action is
//! recorded in a [`MirrorReport`] so callers can print what happened.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use stagesync_core::{FailurePolicy, ItemError, ItemKind, LocalItem, UploadPolicy};

use crate::detect;
use crate::directory;
use crate::error::{local_io, walk_err, SyncError};
use crate::path::RemotePosixPath;
use crate::remote::RemoteFileSystem;

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// Knobs for a mirror run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MirrorOptions {
    pub upload: UploadPolicy,
    pub on_error: FailurePolicy,
    /// Stat the remote side but never `mkdir` or `put`.
    pub dry_run: bool,
}

/// Outcome of an individual file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    /// Bytes were sent.
    Uploaded {
        local: PathBuf,
        remote: RemotePosixPath,
        bytes: u64,
    },
    /// Remote copy judged unchanged by change detection.
    Skipped {
        local: PathBuf,
        remote: RemotePosixPath,
    },
    /// Dry-run: the file *would* have been sent.
    WouldUpload {
        local: PathBuf,
        remote: RemotePosixPath,
    },
    /// Transfer failed and the failure policy said to keep going.
    Failed(FailedTransfer),
}

/// A transfer that failed under [`FailurePolicy::Continue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTransfer {
    pub local: PathBuf,
    pub remote: RemotePosixPath,
    pub reason: String,
}

/// Everything a mirror run did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
    /// Directories created (or, in dry-run, that would be created).
    pub created_dirs: Vec<RemotePosixPath>,
    pub transfers: Vec<TransferResult>,
}

impl MirrorReport {
    pub fn uploaded(&self) -> usize {
        self.count(|t| matches!(t, TransferResult::Uploaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|t| matches!(t, TransferResult::Skipped { .. }))
    }

    pub fn would_upload(&self) -> usize {
        self.count(|t| matches!(t, TransferResult::WouldUpload { .. }))
    }

    pub fn failures(&self) -> Vec<FailedTransfer> {
        self.transfers
            .iter()
            .filter_map(|t| match t {
                TransferResult::Failed(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn bytes_sent(&self) -> u64 {
        self.transfers
            .iter()
            .map(|t| match t {
                TransferResult::Uploaded { bytes, .. } => *bytes,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&TransferResult) -> bool) -> usize {
        self.transfers.iter().filter(|t| pred(t)).count()
    }
}

// ---------------------------------------------------------------------------
// TreeMirror
// ---------------------------------------------------------------------------

/// Mirrors local files and directories onto one remote session.
pub struct TreeMirror<'a, R: RemoteFileSystem + ?Sized> {
    remote: &'a mut R,
    options: MirrorOptions,
    report: MirrorReport,
    /// Directories known to exist (or planned, in dry-run) on the remote.
    known_dirs: HashSet<RemotePosixPath>,
}

impl<'a, R: RemoteFileSystem + ?Sized> TreeMirror<'a, R> {
    pub fn new(remote: &'a mut R, options: MirrorOptions) -> Self {
        Self {
            remote,
            options,
            report: MirrorReport::default(),
            known_dirs: HashSet::new(),
        }
    }

    pub fn report(&self) -> &MirrorReport {
        &self.report
    }

    pub fn into_report(self) -> MirrorReport {
        self.report
    }

    fn ensure(&mut self, dir: &RemotePosixPath) -> Result<(), SyncError> {
        if self.known_dirs.contains(dir) {
            return Ok(());
        }
        let created = directory::ensure_dir(&mut *self.remote, dir, self.options.dry_run)?;
        for d in created {
            if self.known_dirs.insert(d.clone()) {
                self.report.created_dirs.push(d);
            }
        }
        self.known_dirs.insert(dir.clone());
        Ok(())
    }

    /// Ensure the parent of `target` exists, then transfer `local` to it
    /// (subject to the upload policy).
    pub fn mirror_file(&mut self, local: &Path, target: &RemotePosixPath) -> Result<(), SyncError> {
        if let Some(parent) = target.parent() {
            self.ensure(&parent)?;
        }

        if let UploadPolicy::SkipUnchanged(criteria) = self.options.upload {
            if !detect::should_upload(&mut *self.remote, local, target, &criteria)? {
                tracing::debug!("unchanged: {target}");
                self.report.transfers.push(TransferResult::Skipped {
                    local: local.to_path_buf(),
                    remote: target.clone(),
                });
                return Ok(());
            }
        }

        if self.options.dry_run {
            tracing::info!("[dry-run] would upload: {} -> {target}", local.display());
            self.report.transfers.push(TransferResult::WouldUpload {
                local: local.to_path_buf(),
                remote: target.clone(),
            });
            return Ok(());
        }

        let mut file = std::fs::File::open(local).map_err(|e| local_io(local, e))?;
        match self.remote.put(&mut file, target) {
            Ok(bytes) => {
                tracing::debug!("sent {bytes} byte(s): {} -> {target}", local.display());
                self.report.transfers.push(TransferResult::Uploaded {
                    local: local.to_path_buf(),
                    remote: target.clone(),
                    bytes,
                });
                Ok(())
            }
            Err(source) => match self.options.on_error {
                FailurePolicy::Abort => Err(SyncError::Transfer {
                    local: local.to_path_buf(),
                    remote: target.to_string(),
                    source,
                }),
                FailurePolicy::Continue => {
                    tracing::warn!("upload failed, continuing: {} -> {target}: {source}", local.display());
                    self.report.transfers.push(TransferResult::Failed(FailedTransfer {
                        local: local.to_path_buf(),
                        remote: target.clone(),
                        reason: source.to_string(),
                    }));
                    Ok(())
                }
            },
        }
    }

    /// Mirror the whole tree under `local_dir` onto `target`, empty
    /// directories included.
    pub fn mirror_directory(
        &mut self,
        local_dir: &Path,
        target: &RemotePosixPath,
    ) -> Result<(), SyncError> {
        self.ensure(target)?;

        for entry in WalkDir::new(local_dir).min_depth(1) {
            let entry = entry.map_err(|e| walk_err(local_dir, e))?;
            let rel = entry.path().strip_prefix(local_dir).map_err(|_| {
                local_io(
                    entry.path(),
                    std::io::Error::other("entry outside walk root"),
                )
            })?;
            let remote = target.join_relative(rel);
            let kind = entry.file_type();
            if kind.is_dir() {
                self.ensure(&remote)?;
            } else if kind.is_file() {
                self.mirror_file(entry.path(), &remote)?;
            } else {
                return Err(ItemError::UnsupportedKind {
                    path: entry.path().to_path_buf(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Mirror one item to `remote_base/<item name>`.
    ///
    /// Dispatches on the kind recorded at resolve time. The path is stat-ed
    /// again so an item that vanished or changed kind since then fails with
    /// `MissingSource` or `UnsupportedKind`.
    pub fn mirror_item(
        &mut self,
        item: &LocalItem,
        remote_base: &RemotePosixPath,
    ) -> Result<(), SyncError> {
        let target = remote_base.join(&item.name());
        let meta = match std::fs::metadata(&item.path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ItemError::MissingSource {
                    path: item.path.clone(),
                }
                .into())
            }
            Err(e) => return Err(local_io(&item.path, e)),
        };

        let unchanged_kind = match item.kind {
            ItemKind::File => meta.is_file(),
            ItemKind::Directory => meta.is_dir(),
        };
        if !unchanged_kind {
            return Err(ItemError::UnsupportedKind {
                path: item.path.clone(),
            }
            .into());
        }

        match item.kind {
            ItemKind::File => {
                tracing::info!("[upload] file: {} -> {target}", item.path.display());
                self.mirror_file(&item.path, &target)
            }
            ItemKind::Directory => {
                tracing::info!("[upload] directory: {} -> {target}/", item.path.display());
                self.mirror_directory(&item.path, &target)
            }
        }
    }

    /// Normalize `remote_base`, ensure it exists, then mirror every item in
    /// declared order.
    ///
    /// Under [`FailurePolicy::Continue`] all items are attempted and the
    /// recorded failures are returned as [`SyncError::PartialFailure`].
    pub fn mirror_all(&mut self, items: &[LocalItem], remote_base: &str) -> Result<(), SyncError> {
        let base = RemotePosixPath::base(remote_base);
        self.ensure(&base)?;

        for item in items {
            self.mirror_item(item, &base)?;
        }

        let failures = self.report.failures();
        if !failures.is_empty() {
            return Err(SyncError::PartialFailure { failures });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

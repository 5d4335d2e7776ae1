//! Idempotent remote `mkdir -p`.

use crate::error::SyncError;
use crate::path::RemotePosixPath;
use crate::remote::{RemoteError, RemoteFileSystem};

/// Create every missing directory along `path`, one segment at a time.
///
/// Returns the directories that were created. Calling it again for the same
/// or an overlapping path only `stat`s; existing prefixes are never
/// `mkdir`ed. A leading `/` is kept, doubled separators are skipped, and an
/// empty path (or `/`) is a no-op.
pub fn ensure<R>(remote: &mut R, path: &RemotePosixPath) -> Result<Vec<RemotePosixPath>, SyncError>
where
    R: RemoteFileSystem + ?Sized,
{
    ensure_dir(remote, path, false)
}

/// [`ensure`], optionally without mutating the remote side.
///
/// In dry-run mode absent prefixes are reported as if created but `mkdir` is
/// never called.
pub fn ensure_dir<R>(
    remote: &mut R,
    path: &RemotePosixPath,
    dry_run: bool,
) -> Result<Vec<RemotePosixPath>, SyncError>
where
    R: RemoteFileSystem + ?Sized,
{
    let trimmed = path.as_str().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let absolute = trimmed.starts_with('/');

    let mut created = Vec::new();
    let mut prefix = String::with_capacity(trimmed.len());
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        if !prefix.is_empty() || absolute {
            prefix.push('/');
        }
        prefix.push_str(segment);
        let dir = RemotePosixPath::new(prefix.clone());

        match remote.stat(&dir) {
            Ok(_) => continue,
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        if dry_run {
            tracing::info!("[dry-run] would create: {dir}/");
            created.push(dir);
            continue;
        }
        match remote.mkdir(&dir) {
            Ok(()) => {
                tracing::info!("created: {dir}/");
                created.push(dir);
            }
            // Someone else created it between our stat and mkdir.
            Err(RemoteError::AlreadyExists { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(created)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

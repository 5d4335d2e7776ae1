//! Change detection for skipping unchanged uploads.
//!
//! The mtime check is one-sided: only a local file newer than the remote copy
//! by more than the grace window forces an upload. A remote copy that is
//! newer than local never does.

use std::path::Path;

use stagesync_core::{ChangeCriteria, FileMetadata};

use crate::error::{local_io, SyncError};
use crate::path::RemotePosixPath;
use crate::remote::RemoteFileSystem;

/// Pure upload decision. `remote == None` means the remote file is absent.
pub fn needs_upload(
    local: &FileMetadata,
    remote: Option<&FileMetadata>,
    criteria: &ChangeCriteria,
) -> bool {
    let Some(remote) = remote else {
        return true;
    };
    if criteria.compare_size && local.size != remote.size {
        return true;
    }
    if criteria.compare_mtime {
        let ahead = local.modified_at - remote.modified_at;
        let ahead_secs = ahead.num_milliseconds() as f64 / 1000.0;
        if ahead_secs > criteria.mtime_grace_seconds {
            return true;
        }
    }
    false
}

/// Stat both sides and decide whether `local` must be sent to `remote_path`.
pub fn should_upload<R>(
    remote: &mut R,
    local: &Path,
    remote_path: &RemotePosixPath,
    criteria: &ChangeCriteria,
) -> Result<bool, SyncError>
where
    R: RemoteFileSystem + ?Sized,
{
    let remote_meta = match remote.stat(remote_path) {
        Ok(meta) => meta,
        Err(e) if e.is_not_found() => return Ok(true),
        Err(e) => return Err(e.into()),
    };
    let local_meta = FileMetadata::from_local(local).map_err(|e| local_io(local, e))?;
    Ok(needs_upload(&local_meta, Some(&remote_meta), criteria))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemote;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rstest::rstest;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn mtime_only(grace: f64) -> ChangeCriteria {
        ChangeCriteria {
            compare_size: false,
            compare_mtime: true,
            mtime_grace_seconds: grace,
        }
    }

    #[rstest]
    #[case(-1, false)] // remote one second older: inside grace
    #[case(-2, false)] // exactly at the grace boundary
    #[case(-5, true)] // remote well behind local
    #[case(10, false)] // remote newer than local
    fn grace_window(#[case] remote_offset_secs: i64, #[case] expected: bool) {
        let local = FileMetadata::new(10, t0());
        let remote = FileMetadata::new(10, t0() + Duration::seconds(remote_offset_secs));
        assert_eq!(needs_upload(&local, Some(&remote), &mtime_only(2.0)), expected);
    }

    #[test]
    fn absent_remote_always_uploads() {
        let local = FileMetadata::new(10, t0());
        let nothing = ChangeCriteria {
            compare_size: false,
            compare_mtime: false,
            mtime_grace_seconds: 0.0,
        };
        assert!(needs_upload(&local, None, &nothing));
        assert!(needs_upload(&local, None, &ChangeCriteria::default()));
    }

    #[test]
    fn size_difference_uploads_only_when_compared() {
        let local = FileMetadata::new(10, t0());
        let remote = FileMetadata::new(11, t0());
        let sizes = ChangeCriteria {
            compare_size: true,
            compare_mtime: false,
            mtime_grace_seconds: 2.0,
        };
        assert!(needs_upload(&local, Some(&remote), &sizes));
        assert!(!needs_upload(&local, Some(&remote), &mtime_only(2.0)));
    }

    #[test]
    fn should_upload_stats_the_remote() {
        let tmp = TempDir::new().unwrap();
        let local = tmp.path().join("a.txt");
        std::fs::write(&local, "abc").unwrap();
        let local_mtime = FileMetadata::from_local(&local).unwrap().modified_at;

        let mut fs = MemoryRemote::new()
            .with_file("/same.txt", b"abc", local_mtime)
            .with_file("/stale.txt", b"abc", local_mtime - Duration::seconds(60));
        let criteria = ChangeCriteria::default();

        assert!(!should_upload(&mut fs, &local, &"/same.txt".into(), &criteria).unwrap());
        assert!(should_upload(&mut fs, &local, &"/stale.txt".into(), &criteria).unwrap());
        assert!(should_upload(&mut fs, &local, &"/absent.txt".into(), &criteria).unwrap());
    }

    #[test]
    fn should_upload_propagates_other_stat_errors() {
        let tmp = TempDir::new().unwrap();
        let local = tmp.path().join("a.txt");
        std::fs::write(&local, "abc").unwrap();
        let mut fs = MemoryRemote::new();
        fs.fail_stat("/x.txt");
        let err = should_upload(&mut fs, &local, &"/x.txt".into(), &ChangeCriteria::default())
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteIo(_)), "got: {err}");
    }
}

//! Build snapshot staging.
//!
//! ## `BuildStager::stage`: 4-step protocol
//!
//! 1. Refuse a build directory that overlaps any source item.
//! 2. Delete the build directory and recreate it empty.
//! 3. Copy every item into it (files keep their mtime, directories are
//!    copied recursively with symlinks resolved to their targets).
//! 4. Stamp the build version over the placeholder in every text file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use stagesync_core::{BuildVersion, ItemError, LocalItem};

use crate::error::{io_err, walk_err, StageError};
use crate::text::{rewrite_placeholder, RewriteOutcome};

/// Produces version-stamped snapshots inside a disposable build directory.
#[derive(Debug, Clone)]
pub struct BuildStager {
    build_dir: PathBuf,
    placeholder: String,
}

impl BuildStager {
    pub fn new(build_dir: impl Into<PathBuf>, placeholder: impl Into<String>) -> Self {
        Self {
            build_dir: build_dir.into(),
            placeholder: placeholder.into(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Stage `items` and return `build_dir/<name>` for each, in input order.
    pub fn stage(
        &self,
        items: &[LocalItem],
        version: &BuildVersion,
    ) -> Result<Vec<PathBuf>, StageError> {
        self.check_overlap(items)?;
        self.reset_build_dir()?;

        let mut outputs = Vec::with_capacity(items.len());
        for item in items {
            let dest = self.build_dir.join(item.name());
            copy_item(&item.path, &dest)?;
            tracing::debug!("staged {} -> {}", item.path.display(), dest.display());
            outputs.push(dest);
        }

        let mut stamped = 0usize;
        for entry in WalkDir::new(&self.build_dir) {
            let entry = entry.map_err(|e| walk_err(&self.build_dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let outcome = rewrite_placeholder(entry.path(), &self.placeholder, version.as_str())?;
            if matches!(outcome, RewriteOutcome::Rewritten { .. }) {
                stamped += 1;
            }
        }

        tracing::info!(
            "staged {} item(s) into {} (version {}, {} file(s) stamped)",
            outputs.len(),
            self.build_dir.display(),
            version,
            stamped
        );
        Ok(outputs)
    }

    fn check_overlap(&self, items: &[LocalItem]) -> Result<(), StageError> {
        let build = absolute(&self.build_dir)?;
        for item in items {
            if item.path.starts_with(&build) || build.starts_with(&item.path) {
                return Err(StageError::BuildDirOverlapsSource {
                    build_dir: self.build_dir.clone(),
                    item: item.path.clone(),
                });
            }
        }
        Ok(())
    }

    fn reset_build_dir(&self) -> Result<(), StageError> {
        match std::fs::remove_dir_all(&self.build_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&self.build_dir, e)),
        }
        std::fs::create_dir_all(&self.build_dir).map_err(|e| io_err(&self.build_dir, e))
    }
}

/// Best-effort absolute form: canonical when the path exists, otherwise
/// the canonical parent joined with the final component.
fn absolute(path: &Path) -> Result<PathBuf, StageError> {
    if let Ok(p) = path.canonicalize() {
        return Ok(p);
    }
    let joined = std::path::absolute(path).map_err(|e| io_err(path, e))?;
    match (joined.parent(), joined.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(p) => Ok(p.join(name)),
            Err(_) => Ok(joined.clone()),
        },
        _ => Ok(joined),
    }
}

fn copy_item(src: &Path, dest: &Path) -> Result<(), StageError> {
    let meta = match std::fs::metadata(src) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ItemError::MissingSource {
                path: src.to_path_buf(),
            }
            .into())
        }
        Err(e) => return Err(io_err(src, e)),
    };

    if meta.is_file() {
        copy_file(src, dest)
    } else if meta.is_dir() {
        copy_tree(src, dest)
    } else {
        Err(ItemError::UnsupportedKind {
            path: src.to_path_buf(),
        }
        .into())
    }
}

fn copy_file(src: &Path, dest: &Path) -> Result<(), StageError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::copy(src, dest).map_err(|e| io_err(src, e))?;
    let meta = std::fs::metadata(src).map_err(|e| io_err(src, e))?;
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_mtime(dest, mtime).map_err(|e| io_err(dest, e))?;
    Ok(())
}

fn copy_tree(src: &Path, dest: &Path) -> Result<(), StageError> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| walk_err(src, e))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| io_err(entry.path(), std::io::Error::other("entry outside walk root")))?;
        let target = dest.join(rel);
        let kind = entry.file_type();
        if kind.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| io_err(&target, e))?;
        } else if kind.is_file() {
            copy_file(entry.path(), &target)?;
        } else {
            return Err(ItemError::UnsupportedKind {
                path: entry.path().to_path_buf(),
            }
            .into());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const TOKEN: &str = "__PLACEHOLDER_BUILD_VERSION__";

    fn item(path: &Path) -> LocalItem {
        LocalItem::resolve(path).expect("resolve")
    }

    #[test]
    fn file_item_keeps_mtime() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let file = src.path().join("index.php");
        fs::write(&file, "<?php echo 1;").unwrap();
        let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(3600));
        filetime::set_file_mtime(&file, old).unwrap();

        let stager = BuildStager::new(out.path().join("build"), TOKEN);
        let outputs = stager.stage(&[item(&file)], &"v1".into()).unwrap();

        assert_eq!(outputs, vec![out.path().join("build").join("index.php")]);
        let staged = fs::metadata(&outputs[0]).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&staged), old);
    }

    #[test]
    fn build_dir_inside_source_is_refused() {
        let src = TempDir::new().unwrap();
        let app = src.path().join("app");
        fs::create_dir_all(&app).unwrap();

        let stager = BuildStager::new(app.join("build"), TOKEN);
        let err = stager.stage(&[item(&app)], &"v1".into()).unwrap_err();
        assert!(matches!(err, StageError::BuildDirOverlapsSource { .. }), "got: {err}");
    }

    #[test]
    fn build_dir_equal_to_source_is_refused_and_source_survives() {
        let src = TempDir::new().unwrap();
        let app = src.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("keep.txt"), "keep").unwrap();

        let stager = BuildStager::new(&app, TOKEN);
        assert!(stager.stage(&[item(&app)], &"v1".into()).is_err());
        assert!(app.join("keep.txt").exists());
    }

    #[test]
    fn vanished_item_is_missing_source() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let file = src.path().join("gone.txt");
        fs::write(&file, "x").unwrap();
        let resolved = item(&file);
        fs::remove_file(&file).unwrap();

        let stager = BuildStager::new(out.path().join("build"), TOKEN);
        let err = stager.stage(&[resolved], &"v1".into()).unwrap_err();
        assert!(
            matches!(err, StageError::Item(ItemError::MissingSource { .. })),
            "got: {err}"
        );
    }

    #[test]
    #[cfg(unix)]
    fn symlinked_file_inside_directory_is_copied_as_regular_file() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let app = src.path().join("app");
        fs::create_dir_all(&app).unwrap();
        let real = src.path().join("real.txt");
        fs::write(&real, "real").unwrap();
        std::os::unix::fs::symlink(&real, app.join("link.txt")).unwrap();

        let stager = BuildStager::new(out.path().join("build"), TOKEN);
        stager.stage(&[item(&app)], &"v1".into()).unwrap();

        let staged = out.path().join("build").join("app").join("link.txt");
        let meta = fs::symlink_metadata(&staged).unwrap();
        assert!(meta.file_type().is_file());
        assert_eq!(fs::read_to_string(staged).unwrap(), "real");
    }
}

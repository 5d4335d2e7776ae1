//! Stage-then-mirror pipeline entrypoint used by the CLI.

use std::path::PathBuf;

use stagesync_core::{BuildVersion, DeployConfig, LocalItem};
use stagesync_stage::BuildStager;

use crate::mirror::{MirrorOptions, MirrorReport, TreeMirror};
use crate::remote::RemoteFileSystem;
use crate::SyncError;

/// Result of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub version: BuildVersion,
    /// `build_dir/<name>` for every declared item, in order.
    pub staged: Vec<PathBuf>,
    pub report: MirrorReport,
}

/// Mirror options derived from the config file, plus the run's dry-run flag.
pub fn options_for(config: &DeployConfig, dry_run: bool) -> MirrorOptions {
    MirrorOptions {
        upload: config.upload.policy(),
        on_error: config.on_error,
        dry_run,
    }
}

fn resolve_all(paths: &[PathBuf]) -> Result<Vec<LocalItem>, SyncError> {
    paths
        .iter()
        .map(|p| LocalItem::resolve(p).map_err(SyncError::from))
        .collect()
}

/// Resolve the declared items and stage them under `version`.
pub fn stage_only(config: &DeployConfig, version: &BuildVersion) -> Result<Vec<PathBuf>, SyncError> {
    let items = resolve_all(&config.items)?;
    let stager = BuildStager::new(&config.build_dir, &config.placeholder);
    Ok(stager.stage(&items, version)?)
}

/// Generate a fresh build version, stage, then mirror onto `remote`.
pub fn run<R>(config: &DeployConfig, remote: &mut R, dry_run: bool) -> Result<RunSummary, SyncError>
where
    R: RemoteFileSystem + ?Sized,
{
    run_with_version(config, remote, BuildVersion::generate(), dry_run)
}

/// [`run`] with a caller-chosen build version.
///
/// Any error aborts the run. Nothing already sent is rolled back.
pub fn run_with_version<R>(
    config: &DeployConfig,
    remote: &mut R,
    version: BuildVersion,
    dry_run: bool,
) -> Result<RunSummary, SyncError>
where
    R: RemoteFileSystem + ?Sized,
{
    tracing::info!("build version: {version}");
    let staged = stage_only(config, &version)?;
    mirror_staged(config, remote, version, staged, dry_run)
}

/// Acquire a session with `connect`, run the pipeline on it, and release it
/// before returning, whatever the outcome.
///
/// Items are resolved and staged before connecting, so a bad item never
/// opens a session.
pub fn run_with_session<R, F>(
    config: &DeployConfig,
    connect: F,
    dry_run: bool,
) -> Result<RunSummary, SyncError>
where
    R: RemoteFileSystem,
    F: FnOnce() -> Result<R, SyncError>,
{
    let version = BuildVersion::generate();
    tracing::info!("build version: {version}");
    let staged = stage_only(config, &version)?;

    let mut remote = connect()?;
    let summary = mirror_staged(config, &mut remote, version, staged, dry_run);
    drop(remote);
    summary
}

/// Mirror an already staged snapshot onto `remote`.
fn mirror_staged<R>(
    config: &DeployConfig,
    remote: &mut R,
    version: BuildVersion,
    staged: Vec<PathBuf>,
    dry_run: bool,
) -> Result<RunSummary, SyncError>
where
    R: RemoteFileSystem + ?Sized,
{
    let snapshot = resolve_all(&staged)?;

    let mut mirror = TreeMirror::new(remote, options_for(config, dry_run));
    mirror.mirror_all(&snapshot, &config.remote_base)?;
    let report = mirror.into_report();

    tracing::info!(
        "mirrored {} item(s) to {}: {} uploaded, {} skipped, {} director(ies) created",
        snapshot.len(),
        config.remote_base,
        report.uploaded(),
        report.skipped(),
        report.created_dirs.len()
    );
    Ok(RunSummary {
        version,
        staged,
        report,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! `stagesync deploy`: stage the build and mirror it onto the target.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use stagesync_core::{DeployConfig, TargetConfig};
use stagesync_sync::remote::LocalRoot;
use stagesync_sync::{pipeline, RunSummary, SyncError, TransferResult};

use super::{default_config_path, load_config, load_dotenv};

/// Arguments for `stagesync deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    #[arg(long, short = 'c', default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Stage and report what would be uploaded without touching the remote.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit a machine-readable JSON summary.
    #[arg(long)]
    pub json: bool,
}

impl DeployArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config(&self.config)?;
        load_dotenv(&self.config);
        let outcome = match &config.target {
            TargetConfig::Local { root } => deploy_local(&config, root.clone(), self.dry_run),
            TargetConfig::Sftp(_) => deploy_sftp(&config, self.dry_run)?,
        };

        let summary = match outcome {
            Ok(summary) => summary,
            Err(SyncError::PartialFailure { failures }) => {
                for f in &failures {
                    eprintln!(
                        "  {}  {} -> {}: {}",
                        "✗".red().bold(),
                        f.local.display(),
                        f.remote,
                        f.reason
                    );
                }
                bail!("deploy incomplete: {} file transfer(s) failed", failures.len());
            }
            Err(e) => return Err(e).context("deploy failed"),
        };

        if self.json {
            print_json(&config, &summary, self.dry_run)?;
        } else {
            print_results(&config, &summary, self.dry_run);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

fn deploy_local(
    config: &DeployConfig,
    root: PathBuf,
    dry_run: bool,
) -> Result<RunSummary, SyncError> {
    if !dry_run {
        std::fs::create_dir_all(&root).map_err(|e| SyncError::LocalIo {
            path: root.clone(),
            source: e,
        })?;
    }
    log::debug!("local target root: {}", root.display());
    let mut remote = LocalRoot::new(root);
    pipeline::run(config, &mut remote, dry_run)
}

#[cfg(feature = "sftp")]
fn deploy_sftp(config: &DeployConfig, dry_run: bool) -> Result<Result<RunSummary, SyncError>> {
    use stagesync_sync::remote::SftpRemote;

    let TargetConfig::Sftp(target) = &config.target else {
        bail!("target is not sftp");
    };
    let params = target
        .resolve()
        .context("incomplete SSH connection parameters")?;
    log::debug!("session: {params:?}");
    Ok(pipeline::run_with_session(
        config,
        || SftpRemote::connect(&params).map_err(SyncError::from),
        dry_run,
    ))
}

#[cfg(not(feature = "sftp"))]
fn deploy_sftp(config: &DeployConfig, _dry_run: bool) -> Result<Result<RunSummary, SyncError>> {
    // A missing key is reported ahead of the missing feature.
    if let TargetConfig::Sftp(target) = &config.target {
        target
            .resolve()
            .context("incomplete SSH connection parameters")?;
    }
    bail!("this build has no SFTP support; rebuild with `--features sftp` or use a `local` target")
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_results(config: &DeployConfig, summary: &RunSummary, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let report = &summary.report;
    let sent = report.uploaded() + report.would_upload();

    println!(
        "{prefix}{} version {} -> {} ({} uploaded, {} unchanged, {} dir(s) created)",
        "✓".green().bold(),
        summary.version,
        config.remote_base,
        sent,
        report.skipped(),
        report.created_dirs.len()
    );

    for dir in &report.created_dirs {
        println!("  +  {dir}/");
    }
    for t in &report.transfers {
        match t {
            TransferResult::Uploaded { remote, bytes, .. } => {
                println!("  ↑  {remote} ({bytes} B)")
            }
            TransferResult::WouldUpload { remote, .. } => println!("  ~  {remote}"),
            TransferResult::Skipped { remote, .. } => {
                println!("  {}", format!("·  {remote}").bright_black())
            }
            TransferResult::Failed(f) => println!("  {}  {}", "✗".red(), f.remote),
        }
    }
}

#[derive(Serialize)]
struct DeployJson {
    version: String,
    remote_base: String,
    dry_run: bool,
    staged: Vec<String>,
    created_dirs: Vec<String>,
    transfers: Vec<TransferJson>,
    bytes_sent: u64,
}

#[derive(Serialize)]
struct TransferJson {
    status: &'static str,
    local: String,
    remote: String,
}

fn print_json(config: &DeployConfig, summary: &RunSummary, dry_run: bool) -> Result<()> {
    let report = &summary.report;
    let payload = DeployJson {
        version: summary.version.to_string(),
        remote_base: config.remote_base.clone(),
        dry_run,
        staged: summary
            .staged
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        created_dirs: report.created_dirs.iter().map(|d| d.to_string()).collect(),
        transfers: report.transfers.iter().map(transfer_json).collect(),
        bytes_sent: report.bytes_sent(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize deploy JSON")?
    );
    Ok(())
}

fn transfer_json(t: &TransferResult) -> TransferJson {
    let (status, local, remote) = match t {
        TransferResult::Uploaded { local, remote, .. } => ("uploaded", local, remote),
        TransferResult::WouldUpload { local, remote } => ("would_upload", local, remote),
        TransferResult::Skipped { local, remote } => ("skipped", local, remote),
        TransferResult::Failed(f) => ("failed", &f.local, &f.remote),
    };
    TransferJson {
        status,
        local: local.display().to_string(),
        remote: remote.to_string(),
    }
}

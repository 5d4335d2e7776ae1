//! `stagesync stage`: build the snapshot only.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stagesync_core::BuildVersion;
use stagesync_sync::pipeline;

use super::{default_config_path, load_config};

/// Arguments for `stagesync stage`.
#[derive(Args, Debug)]
pub struct StageArgs {
    #[arg(long, short = 'c', default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Stamp this version instead of a generated timestamp.
    #[arg(long = "build-version", value_name = "V")]
    pub version: Option<String>,
}

impl StageArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config(&self.config)?;
        let version = self
            .version
            .map(BuildVersion::from)
            .unwrap_or_else(BuildVersion::generate);

        let staged = pipeline::stage_only(&config, &version).context("staging failed")?;

        println!(
            "✓ Staged {} item(s) into {} (version {version})",
            staged.len(),
            config.build_dir.display()
        );
        for path in &staged {
            println!("  +  {}", path.display());
        }
        Ok(())
    }
}

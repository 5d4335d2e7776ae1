//! `stagesync init [--config PATH] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use stagesync_core::{config, DeployConfig};

use super::default_config_path;

/// Write a starter config file.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the config.
    #[arg(long, short = 'c', default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        if self.config.exists() && !self.force {
            bail!(
                "'{}' already exists (use --force to overwrite)",
                self.config.display()
            );
        }
        config::save_at(&self.config, &DeployConfig::sample())
            .with_context(|| format!("failed to write '{}'", self.config.display()))?;

        println!("✓ Wrote {}", self.config.display());
        println!("  Edit `items` and `remote_base`, then run `stagesync deploy --dry-run`.");
        Ok(())
    }
}

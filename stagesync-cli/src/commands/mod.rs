pub mod deploy;
pub mod init;
pub mod stage;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stagesync_core::{config, DeployConfig};

/// Config path used when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(config::DEFAULT_CONFIG_FILE)
}

/// Load the deploy config, with a hint when it does not exist yet.
pub fn load_config(path: &Path) -> Result<DeployConfig> {
    config::load_at(path).with_context(|| {
        format!(
            "failed to load '{}' (run `stagesync init` to create one)",
            path.display()
        )
    })
}

/// Load `.env` from the config file's directory, then from the working
/// directory. Variables already set in the environment win.
pub fn load_dotenv(config_path: &Path) {
    let mut candidates = Vec::new();
    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        candidates.push(dir.join(".env"));
    }
    candidates.push(PathBuf::from(".env"));

    for path in candidates {
        match dotenvy::from_path(&path) {
            Ok(()) => log::debug!("loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("ignoring {}: {e}", path.display()),
        }
    }
}

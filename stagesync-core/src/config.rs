//! Deploy configuration file.
//!
//! # File layout
//!
//! ```yaml
//! items:
//!   - ./index.php
//!   - ./app
//! remote_base: /var/www/html/app/
//! build_dir: build
//! placeholder: __PLACEHOLDER_BUILD_VERSION__
//! upload:
//!   skip_unchanged: false
//!   compare_size: true
//!   compare_mtime: true
//!   mtime_grace_seconds: 2.0
//! on_error: abort
//! target:
//!   kind: sftp
//!   host: example.org
//!   port: 22
//!   user: deploy
//!   password_env: SSH_PASS
//! ```
//!
//! A leading `~` in `items`, `build_dir` or a local target root expands to the
//! home directory. Other relative paths are resolved against
//! the directory containing the config file. SFTP parameters left out of the
//! file fall back to `SSH_HOST`, `SSH_PORT`, `SSH_USER` and the variable
//! named by `password_env`.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::{ChangeCriteria, FailurePolicy, UploadPolicy};

pub const DEFAULT_CONFIG_FILE: &str = "stagesync.yaml";
pub const DEFAULT_BUILD_DIR: &str = "build";
pub const DEFAULT_PLACEHOLDER: &str = "__PLACEHOLDER_BUILD_VERSION__";
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_PASSWORD_ENV: &str = "SSH_PASS";

pub const ENV_SSH_HOST: &str = "SSH_HOST";
pub const ENV_SSH_PORT: &str = "SSH_PORT";
pub const ENV_SSH_USER: &str = "SSH_USER";

// ---------------------------------------------------------------------------
// 1. Config structs
// ---------------------------------------------------------------------------

/// Root of the deploy configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Local files and directories to stage and upload, in order.
    pub items: Vec<PathBuf>,
    /// Remote directory the items are placed under.
    pub remote_base: String,
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default)]
    pub upload: UploadSettings,
    #[serde(default)]
    pub on_error: FailurePolicy,
    #[serde(default)]
    pub target: TargetConfig,
}

fn default_build_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUILD_DIR)
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

/// Upload gating as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    /// Off by default: every build is pushed in full.
    pub skip_unchanged: bool,
    pub compare_size: bool,
    pub compare_mtime: bool,
    pub mtime_grace_seconds: f64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        let criteria = ChangeCriteria::default();
        Self {
            skip_unchanged: false,
            compare_size: criteria.compare_size,
            compare_mtime: criteria.compare_mtime,
            mtime_grace_seconds: criteria.mtime_grace_seconds,
        }
    }
}

impl UploadSettings {
    pub fn policy(&self) -> UploadPolicy {
        if !self.skip_unchanged {
            return UploadPolicy::Always;
        }
        UploadPolicy::SkipUnchanged(ChangeCriteria {
            compare_size: self.compare_size,
            compare_mtime: self.compare_mtime,
            mtime_grace_seconds: self.mtime_grace_seconds,
        })
    }
}

/// Where the mirror is realized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TargetConfig {
    /// A local directory standing in for the remote root.
    Local { root: PathBuf },
    /// An SFTP server.
    Sftp(SftpTarget),
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig::Sftp(SftpTarget::default())
    }
}

/// SFTP connection parameters. Anything left out comes from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SftpTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Name of the environment variable holding the password.
    pub password_env: String,
}

impl Default for SftpTarget {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            user: None,
            password_env: DEFAULT_PASSWORD_ENV.to_string(),
        }
    }
}

/// Fully resolved SFTP session parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SftpTarget {
    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<SessionParams, ConfigError> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve with an explicit variable lookup (tests inject a map).
    pub fn resolve_with<F>(&self, lookup: F) -> Result<SessionParams, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = self
            .host
            .clone()
            .or_else(|| env(ENV_SSH_HOST))
            .ok_or_else(|| missing(ENV_SSH_HOST))?;
        let user = self
            .user
            .clone()
            .or_else(|| env(ENV_SSH_USER))
            .ok_or_else(|| missing(ENV_SSH_USER))?;
        let port = match (self.port, env(ENV_SSH_PORT)) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_SSH_PORT} is not a port number: '{raw}'"))
            })?,
            (None, None) => DEFAULT_SSH_PORT,
        };
        let password = env(self.password_env.as_str()).ok_or_else(|| missing(&self.password_env))?;

        Ok(SessionParams {
            host,
            port,
            user,
            password,
        })
    }
}

fn missing(key: &str) -> ConfigError {
    ConfigError::MissingParameter {
        key: key.to_string(),
    }
}

impl DeployConfig {
    /// Starter config written by `stagesync init`.
    pub fn sample() -> Self {
        Self {
            items: vec![PathBuf::from("./index.php"), PathBuf::from("./app")],
            remote_base: "/var/www/html/app/".to_string(),
            build_dir: default_build_dir(),
            placeholder: default_placeholder(),
            upload: UploadSettings::default(),
            on_error: FailurePolicy::Abort,
            target: TargetConfig::default(),
        }
    }

    /// Reject configs that cannot drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.items.is_empty() {
            return Err(ConfigError::Invalid("no items declared".to_string()));
        }
        if self.placeholder.is_empty() {
            return Err(ConfigError::Invalid("placeholder must not be empty".to_string()));
        }
        if self.build_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("build_dir must not be empty".to_string()));
        }
        if !self.upload.mtime_grace_seconds.is_finite() || self.upload.mtime_grace_seconds < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "mtime_grace_seconds must be a non-negative number, got {}",
                self.upload.mtime_grace_seconds
            )));
        }
        Ok(())
    }

    /// Make every relative local path absolute against `base`, after
    /// expanding a leading `~` to the user's home directory.
    pub fn rebase(&mut self, base: &Path) {
        self.rebase_with_home(base, dirs::home_dir().as_deref());
    }

    /// [`DeployConfig::rebase`] with an explicit home directory.
    pub fn rebase_with_home(&mut self, base: &Path, home: Option<&Path>) {
        let resolve = |path: &Path| -> PathBuf {
            let expanded = expand_home(path, home);
            if expanded.is_relative() {
                base.join(expanded)
            } else {
                expanded
            }
        };
        for item in &mut self.items {
            *item = resolve(item);
        }
        self.build_dir = resolve(&self.build_dir);
        if let TargetConfig::Local { root } = &mut self.target {
            *root = resolve(root);
        }
    }
}

/// Replace a leading `~` component with `home`. Paths like `~user/x` and
/// paths without a home directory are returned unchanged.
fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load, validate and rebase the config at `path`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(path: &Path) -> Result<DeployConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(io_err(path, e)),
    };
    let mut config: DeployConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
    config.validate()?;

    let base = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir().map_err(|e| io_err(path, e))?,
    };
    config.rebase(&base);
    Ok(config)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `path`.
///
/// Write flow: serialize → `<name>.tmp` sibling → `rename`.
pub fn save_at(path: &Path, config: &DeployConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let yaml = serde_yaml::to_string(config)?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! stagesync core library: domain types, deploy configuration, errors.
//!
//! Public API surface:
//! - [`types`]: local items, build versions, metadata and policies
//! - [`error`]: [`ConfigError`] and [`ItemError`]
//! - [`config`]: load / save / resolve the deploy configuration file

pub mod config;
pub mod error;
pub mod types;

pub use config::{DeployConfig, SessionParams, SftpTarget, TargetConfig, UploadSettings};
pub use error::{ConfigError, ItemError};
pub use types::{
    BuildVersion, ChangeCriteria, FailurePolicy, FileMetadata, ItemKind, LocalItem, UploadPolicy,
};

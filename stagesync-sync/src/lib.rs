//! # stagesync-sync
//!
//! Remote tree mirroring and deploy orchestration.
//!
//! Call [`pipeline::run`] to stage the configured items and mirror the
//! snapshot onto a [`RemoteFileSystem`], or drive a [`TreeMirror`] directly
//! to mirror an arbitrary local tree.

pub mod detect;
pub mod directory;
pub mod error;
pub mod mirror;
pub mod path;
pub mod pipeline;
pub mod remote;

pub use error::SyncError;
pub use mirror::{FailedTransfer, MirrorOptions, MirrorReport, TransferResult, TreeMirror};
pub use path::RemotePosixPath;
pub use pipeline::RunSummary;
pub use remote::{RemoteError, RemoteFileSystem};

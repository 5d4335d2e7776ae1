//! # stagesync-stage
//!
//! Builds the versioned snapshot that gets uploaded.
//!
//! [`BuildStager::stage`] wipes the build directory, copies every declared
//! item into it, then replaces the placeholder token with the run's build
//! version in every text file that contains it.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stagesync_core::{BuildVersion, LocalItem};
//! use stagesync_stage::BuildStager;
//!
//! fn build(items: &[LocalItem]) {
//!     let stager = BuildStager::new(Path::new("build"), "__PLACEHOLDER_BUILD_VERSION__");
//!     if let Ok(outputs) = stager.stage(items, &BuildVersion::generate()) {
//!         for path in outputs {
//!             println!("staged {}", path.display());
//!         }
//!     }
//! }
//! ```

pub mod error;
pub mod stager;
pub mod text;

pub use error::StageError;
pub use stager::BuildStager;
pub use text::{try_decode, Decoded, RewriteOutcome};

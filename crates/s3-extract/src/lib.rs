//! # s3-extract
//!
//! Download a zip archive from an S3 bucket, extract it into an ephemeral
//! workspace and copy a selected subset of its files and directories to
//! the local filesystem.
//!
//! The pipeline runs in three steps:
//!
//! 1. [`fetch`] retrieves the object as a byte stream
//! 2. [`extract`] writes it to a scoped directory and unpacks it into a
//!    second, nested one ([`workspace`])
//! 3. [`resolve`] copies every mapped `source=destination` pair that exists
//!    in the extracted tree
//!
//! Both scoped directories are removed before the pipeline returns.
//!
//! ## Example
//!
//! ```rust,no_run
//! use s3_extract::{ActionInputs, S3ObjectStore};
//!
//! # async fn demo() -> Result<(), s3_extract::ExtractError> {
//! let config = ActionInputs {
//!     bucket: Some("build-artifacts".to_string()),
//!     key: Some("app/latest.zip".to_string()),
//!     target_base_directory: Some("dist".to_string()),
//!     files: Some("bin/app=app\nREADME.md=README.md".to_string()),
//!     directories: Some("assets=assets".to_string()),
//!     ..ActionInputs::default()
//! }
//! .into_config()?;
//!
//! let store = S3ObjectStore::from_env().await;
//! let outcome = s3_extract::run(&config, &store).await?;
//! println!("copied {} files", outcome.copied_files.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod copy;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod resolve;
pub mod safety;
pub mod types;
pub mod workspace;

// Re-export main types
pub use config::{ActionInputs, Config};
pub use error::{ExtractError, SecurityError};
pub use fetch::{ObjectBody, ObjectResponse, ObjectStore, ObjectStream, S3ObjectStore};
pub use pipeline::{run, with_extracted_object};
pub use resolve::{CopyPlan, Mapping, MappingKind};
pub use types::{CopyOutcome, ExtractStats, ObjectRef};

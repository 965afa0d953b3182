//! Error types for the download, extract and copy pipeline.

use crate::resolve::MappingKind;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A required step input was absent or empty.
    #[error("Input required and not supplied: {0}")]
    MissingInput(&'static str),

    /// A step input could not be interpreted.
    #[error(
        "Input does not meet YAML 1.2 \"Core Schema\" specification: {name} \
         (got '{value}', expected one of true | True | TRUE | false | False | FALSE)"
    )]
    InvalidInput {
        /// Name of the offending input
        name: &'static str,
        /// Raw value that was supplied
        value: String,
    },

    /// A `source=destination` line could not be split into two halves.
    #[error("Invalid mapping '{line}': {reason}")]
    InvalidMappingSyntax {
        /// The configuration line as written
        line: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// The storage backend answered but handed back nothing streamable.
    #[error("Unable to read bucket {bucket} key {key}")]
    ObjectUnreadable {
        /// Bucket the object was requested from
        bucket: String,
        /// Key of the requested object
        key: String,
    },

    /// The storage backend call itself failed.
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The archive is corrupted or malformed.
    #[error("Corrupted archive: {0}")]
    Corrupted(String),

    /// An archive entry tried to escape the extraction root.
    #[error("Security violation: {0}")]
    Security(#[from] SecurityError),

    /// An I/O error occurred while writing or copying.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A mapped source was absent and the not-found policy is fail-fast.
    #[error("The {kind} {} was not found in bucket {bucket} key {key}", .path.display())]
    SourceNotFound {
        /// Whether the mapping named a file or a directory
        kind: MappingKind,
        /// Resolved source path that does not exist
        path: PathBuf,
        /// Bucket the archive came from
        bucket: String,
        /// Key of the archive
        key: String,
    },
}

/// Security-related errors during extraction.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Path traversal attempt detected (e.g., "../../../etc/passwd").
    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    /// Absolute path not allowed in archive entries.
    #[error("Absolute path not allowed: {0}")]
    AbsolutePath(String),
}

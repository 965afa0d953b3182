//! Type definitions shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Address of an object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Bucket holding the object
    pub bucket: String,

    /// Key of the object within the bucket
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Destinations that were actually copied, in mapping order.
///
/// Entries whose source did not exist in the archive are absent. The two
/// sequences keep the order of the `directories` and `files` inputs
/// respectively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOutcome {
    /// Destination paths written by file mappings
    pub copied_files: Vec<PathBuf>,

    /// Destination paths written by directory mappings
    pub copied_directories: Vec<PathBuf>,
}

/// Statistics about a completed archive extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractStats {
    /// Number of file entries written
    pub files_extracted: u64,

    /// Number of directory markers materialized
    pub directories_created: u64,

    /// Total bytes written to disk
    pub bytes_written: u64,

    /// Duration of the extraction (in seconds)
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl Default for ExtractStats {
    fn default() -> Self {
        Self {
            files_extracted: 0,
            directories_created: 0,
            bytes_written: 0,
            duration: Duration::from_secs(0),
        }
    }
}

// Helper module for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

//! Step inputs and the validated configuration record built from them.
//!
//! The invocation layer collects raw strings (flags or `INPUT_*` variables)
//! into [`ActionInputs`]; [`ActionInputs::into_config`] turns them into a
//! [`Config`] that is passed explicitly into the pipeline.

use crate::error::ExtractError;
use crate::types::ObjectRef;
use std::path::PathBuf;

const TRUE_VALUES: [&str; 3] = ["true", "True", "TRUE"];
const FALSE_VALUES: [&str; 3] = ["false", "False", "FALSE"];

/// Raw step inputs, as supplied by the caller.
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, Default)]
pub struct ActionInputs {
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub source_base_directory: Option<String>,
    pub target_base_directory: Option<String>,
    /// Older name of `target_base_directory`, used when the latter is unset.
    pub directory: Option<String>,
    /// Newline-separated `source=destination` lines.
    pub files: Option<String>,
    /// Newline-separated `source=destination` lines.
    pub directories: Option<String>,
    pub fail_on_not_found: Option<String>,
    /// Where ephemeral download/extraction directories are created.
    pub workspace_directory: Option<String>,
}

/// Validated configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub object: ObjectRef,
    pub source_base_dir: PathBuf,
    pub target_base_dir: PathBuf,
    pub files: Vec<String>,
    pub directories: Vec<String>,
    pub fail_on_not_found: bool,
    pub workspace_dir: PathBuf,
}

impl ActionInputs {
    /// Validate the inputs.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::MissingInput`] when `bucket` or `key` is absent
    /// - [`ExtractError::InvalidInput`] when `fail_on_not_found` is not a
    ///   recognised boolean
    pub fn into_config(self) -> Result<Config, ExtractError> {
        let bucket = non_empty(self.bucket).ok_or(ExtractError::MissingInput("bucket"))?;
        let key = non_empty(self.key).ok_or(ExtractError::MissingInput("key"))?;

        let target_base_dir =
            non_empty(self.target_base_directory).or_else(|| non_empty(self.directory));

        Ok(Config {
            object: ObjectRef::new(bucket, key),
            source_base_dir: dir_or_current(non_empty(self.source_base_directory)),
            target_base_dir: dir_or_current(target_base_dir),
            files: parse_multiline(self.files.as_deref().unwrap_or_default()),
            directories: parse_multiline(self.directories.as_deref().unwrap_or_default()),
            fail_on_not_found: parse_bool("fail_on_not_found", self.fail_on_not_found)?,
            workspace_dir: non_empty(self.workspace_directory)
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
        })
    }
}

/// Split a multi-line input into trimmed, non-empty lines.
pub fn parse_multiline(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(name: &'static str, value: Option<String>) -> Result<bool, ExtractError> {
    let Some(value) = non_empty(value) else {
        return Ok(false);
    };
    if TRUE_VALUES.contains(&value.as_str()) {
        Ok(true)
    } else if FALSE_VALUES.contains(&value.as_str()) {
        Ok(false)
    } else {
        Err(ExtractError::InvalidInput { name, value })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn dir_or_current(value: Option<String>) -> PathBuf {
    PathBuf::from(value.unwrap_or_else(|| ".".to_string()))
}

//! Path checks for archive entries.
//!
//! Every entry name is validated before anything is written so that a
//! crafted archive cannot place files outside the extraction root
//! (zip-slip).

use crate::error::SecurityError;
use std::path::{Component, Path, PathBuf};

/// Validates and normalizes an archive entry path.
///
/// This function performs the following checks:
/// - Rejects absolute paths
/// - Rejects paths containing ".." components (path traversal)
/// - Drops "." components and redundant separators
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use s3_extract::safety::validate_entry_path;
///
/// let safe_path = validate_entry_path(Path::new("dir/file.txt")).unwrap();
/// assert_eq!(safe_path, Path::new("dir/file.txt"));
///
/// assert!(validate_entry_path(Path::new("../../etc/passwd")).is_err());
/// assert!(validate_entry_path(Path::new("/etc/passwd")).is_err());
/// ```
pub fn validate_entry_path(path: &Path) -> Result<PathBuf, SecurityError> {
    if path.is_absolute() {
        return Err(SecurityError::AbsolutePath(path.display().to_string()));
    }

    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => continue,
            Component::ParentDir => {
                return Err(SecurityError::PathTraversal(format!(
                    "Path contains '..' component: {}",
                    path.display()
                )));
            }
            // Windows drive prefixes and stray roots are absolute in disguise
            Component::RootDir | Component::Prefix(_) => {
                return Err(SecurityError::AbsolutePath(path.display().to_string()));
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(SecurityError::PathTraversal(
            "Path normalizes to empty".to_string(),
        ));
    }

    Ok(normalized)
}

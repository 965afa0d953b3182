//! Ephemeral directories bound to a scope.
//!
//! A [`ScopedDir`] is created with a unique name under a parent directory
//! and is removed when the scope ends, whether the work inside it succeeded
//! or not. Scopes nest by calling one helper from inside the body of
//! another.

use crate::error::ExtractError;
use std::future::Future;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Uniquely named directory owned by one scope.
#[derive(Debug)]
pub struct ScopedDir {
    inner: TempDir,
}

impl ScopedDir {
    /// Create `parent/<prefix><random>`. The parent must already exist.
    pub fn create(parent: &Path, prefix: &str) -> Result<Self, ExtractError> {
        let inner = tempfile::Builder::new().prefix(prefix).tempdir_in(parent)?;
        debug!(path = %inner.path().display(), "created scoped directory");
        Ok(Self { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Recursively remove the directory.
    ///
    /// Removal failures are logged and swallowed so that teardown never
    /// replaces the outcome of the work done inside the scope.
    pub fn close(self) {
        let path = self.inner.path().to_path_buf();
        match self.inner.close() {
            Ok(()) => debug!(path = %path.display(), "removed scoped directory"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove scoped directory"),
        }
    }
}

/// Run `body` with a fresh directory that is removed once `body` returns.
///
/// # Example
///
/// ```
/// use s3_extract::workspace::with_scoped_dir;
///
/// # fn main() -> Result<(), s3_extract::ExtractError> {
/// let parent = std::env::temp_dir();
/// let used = with_scoped_dir(&parent, "demo-", |dir| {
///     std::fs::write(dir.join("scratch.txt"), "data")?;
///     Ok(dir.to_path_buf())
/// })?;
/// assert!(!used.exists());
/// # Ok(())
/// # }
/// ```
pub fn with_scoped_dir<F, R>(parent: &Path, prefix: &str, body: F) -> Result<R, ExtractError>
where
    F: FnOnce(&Path) -> Result<R, ExtractError>,
{
    let dir = ScopedDir::create(parent, prefix)?;
    let result = body(dir.path());
    dir.close();
    result
}

/// Async variant of [`with_scoped_dir`].
///
/// The body receives an owned path so that the returned future does not
/// borrow the scope. If the future is dropped before completion the
/// directory is still removed; work handed to another thread must not write
/// into it after that, see [`crate::extract::extract_zip_blocking`].
pub async fn with_scoped_dir_async<F, Fut, R>(
    parent: &Path,
    prefix: &str,
    body: F,
) -> Result<R, ExtractError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<R, ExtractError>>,
{
    let dir = ScopedDir::create(parent, prefix)?;
    let result = body(dir.path().to_path_buf()).await;
    dir.close();
    result
}

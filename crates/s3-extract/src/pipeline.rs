//! Fetch, materialize and copy, wired together.

use crate::config::Config;
use crate::error::ExtractError;
use crate::extract::materialize;
use crate::fetch::{fetch_object, ObjectStore};
use crate::resolve::CopyPlan;
use crate::types::{CopyOutcome, ObjectRef};
use crate::workspace::{with_scoped_dir_async, ScopedDir};
use std::path::Path;
use tracing::info;

/// Prefix of the scope holding the downloaded archive.
pub const DOWNLOAD_DIR_PREFIX: &str = "s3-extract-download-";

/// Prefix of the scope holding the extracted tree.
pub const EXTRACT_DIR_PREFIX: &str = "s3-extract-unzip-";

/// File name of the downloaded archive inside its scope.
pub const ARCHIVE_FILE_NAME: &str = "download.zip";

/// Download `object`, extract it and run `body` against the extracted tree.
///
/// Two nested scopes are created under `workspace_dir`: one for the
/// downloaded archive and one for its extracted contents. Both are removed
/// before this returns, whether `body` succeeded or not, so `body` must not
/// keep the path it is given. If the returned future is dropped while the
/// archive is being unpacked, the extraction scope is removed as soon as the
/// unpacking thread finishes.
pub async fn with_extracted_object<S, F, R>(
    store: &S,
    object: &ObjectRef,
    workspace_dir: &Path,
    body: F,
) -> Result<R, ExtractError>
where
    S: ObjectStore + ?Sized,
    F: FnOnce(&Path) -> Result<R, ExtractError>,
{
    let stream = fetch_object(store, object).await?;

    with_scoped_dir_async(workspace_dir, DOWNLOAD_DIR_PREFIX, |download_dir| async move {
        let extract_dir = ScopedDir::create(workspace_dir, EXTRACT_DIR_PREFIX)?;
        let (extract_dir, _stats) =
            materialize(stream, &download_dir, ARCHIVE_FILE_NAME, extract_dir).await?;

        let result = body(extract_dir.path());
        extract_dir.close();
        result
    })
    .await
}

/// Run one invocation: copy the configured mappings out of the configured
/// object.
///
/// Mapping lines are parsed before the object is requested, so a
/// configuration error never costs a download.
pub async fn run<S>(config: &Config, store: &S) -> Result<CopyOutcome, ExtractError>
where
    S: ObjectStore + ?Sized,
{
    let plan = CopyPlan::new(
        config.object.clone(),
        &config.source_base_dir,
        &config.target_base_dir,
        &config.files,
        &config.directories,
        config.fail_on_not_found,
    )?;

    let outcome = with_extracted_object(store, &config.object, &config.workspace_dir, |root| {
        plan.execute(root)
    })
    .await?;

    info!(
        object = %config.object,
        files = outcome.copied_files.len(),
        directories = outcome.copied_directories.len(),
        "copy finished"
    );
    Ok(outcome)
}

//! Archive materialization: persist a fetched stream, then unpack it.
//!
//! The stream is written to a file first because the zip central directory
//! sits at the end of the archive and reading it needs random access.

use crate::error::ExtractError;
use crate::fetch::ObjectStream;
use crate::safety::validate_entry_path;
use crate::types::ExtractStats;
use crate::workspace::ScopedDir;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use zip::result::ZipError;

/// Write `stream` into a new file at `path` and return the number of bytes.
///
/// The file is flushed before this returns, so it can be reopened for
/// reading right away.
pub async fn download_to_file(mut stream: ObjectStream, path: &Path) -> Result<u64, ExtractError> {
    let mut file = tokio::fs::File::create(path).await?;
    let bytes = tokio::io::copy(&mut stream, &mut file).await?;
    file.flush().await?;

    debug!(path = %path.display(), bytes, "archive downloaded");
    Ok(bytes)
}

/// Extract the zip archive at `archive_path` into `output_dir`.
///
/// Entries are processed in archive order:
/// - a directory marker (name ending in `/`) creates that directory and its
///   ancestors
/// - a file entry creates its parent directory, then streams its
///   decompressed bytes into a new file
///
/// Entry names are validated first; one that would land outside
/// `output_dir` aborts the extraction. On Unix, permission bits stored in the
/// archive are applied to extracted files.
///
/// # Errors
///
/// - [`ExtractError::Corrupted`] for malformed archive structure
/// - [`ExtractError::Security`] for unsafe entry names
/// - [`ExtractError::Io`] for filesystem failures
///
/// Extraction stops at the first error; files already written stay on disk
/// for the enclosing scope to clean up.
pub fn extract_zip(archive_path: &Path, output_dir: &Path) -> Result<ExtractStats, ExtractError> {
    let start_time = Instant::now();
    let mut stats = ExtractStats::default();

    fs::create_dir_all(output_dir)?;

    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(map_zip_error)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(map_zip_error)?;
        let name = entry.name().to_string();
        let relative = validate_entry_path(Path::new(&name))?;
        let output_path = output_dir.join(&relative);

        if name.ends_with('/') {
            fs::create_dir_all(&output_path)?;
            stats.directories_created += 1;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&output_path)?;
        let written = io::copy(&mut entry, &mut out).map_err(|e| {
            // The zip reader reports checksum and inflate failures as I/O errors
            if e.kind() == io::ErrorKind::InvalidData {
                ExtractError::Corrupted(format!("{name}: {e}"))
            } else {
                ExtractError::Io(e)
            }
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode().map(|m| m & 0o777).filter(|m| *m != 0) {
                fs::set_permissions(&output_path, fs::Permissions::from_mode(mode))?;
            }
        }

        stats.files_extracted += 1;
        stats.bytes_written += written;
    }

    stats.duration = start_time.elapsed();
    Ok(stats)
}

/// Run [`extract_zip`] into `output` on the blocking thread pool.
///
/// The blocking task owns `output` while it runs. If the caller stops
/// waiting, extraction still finishes and the directory is removed
/// afterwards instead of being recreated behind a scope that already closed.
/// On success the scope is handed back to the caller; on failure it is
/// closed before this returns.
pub async fn extract_zip_blocking(
    archive_path: PathBuf,
    output: ScopedDir,
) -> Result<(ScopedDir, ExtractStats), ExtractError> {
    tokio::task::spawn_blocking(move || match extract_zip(&archive_path, output.path()) {
        Ok(stats) => Ok((output, stats)),
        Err(e) => {
            output.close();
            Err(e)
        }
    })
    .await
    .map_err(|e| ExtractError::Io(io::Error::other(e)))?
}

/// Persist `stream` as `download_dir/archive_name` and unpack it into
/// `extract_dir`.
///
/// `extract_dir` is returned with the stats once the tree is in place and
/// is closed on any failure.
pub async fn materialize(
    stream: ObjectStream,
    download_dir: &Path,
    archive_name: &str,
    extract_dir: ScopedDir,
) -> Result<(ScopedDir, ExtractStats), ExtractError> {
    let archive_path = download_dir.join(archive_name);
    let archive_bytes = match download_to_file(stream, &archive_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            extract_dir.close();
            return Err(e);
        }
    };

    let (extract_dir, stats) = extract_zip_blocking(archive_path, extract_dir).await?;
    info!(
        archive_bytes,
        files = stats.files_extracted,
        directories = stats.directories_created,
        bytes_written = stats.bytes_written,
        "archive extracted"
    );
    Ok((extract_dir, stats))
}

fn map_zip_error(e: ZipError) -> ExtractError {
    match e {
        ZipError::Io(io_err) => ExtractError::Io(io_err),
        other => ExtractError::Corrupted(other.to_string()),
    }
}

//! Filesystem copy primitives used by the resolver.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy the directory `source` into `destination`.
///
/// `destination` and any missing ancestors are created. Subdirectories are
/// recreated and regular files copied byte-for-byte, preserving the tree
/// shape. Returns the number of files copied.
///
/// Symbolic links are followed: a link to a directory is copied as a real
/// directory with its contents, a link to a file as a regular file. A link
/// cycle is reported as an I/O error.
pub fn copy_directory(source: &Path, destination: &Path) -> io::Result<u64> {
    if !source.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a directory", source.display()),
        ));
    }

    fs::create_dir_all(destination)?;

    let mut files_copied = 0;
    for entry in WalkDir::new(source)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            files_copied += 1;
        }
    }

    Ok(files_copied)
}

/// Copy a single file, replacing `destination` if it exists.
///
/// Missing parent directories of `destination` are created. Returns the
/// number of bytes copied.
pub fn copy_file(source: &Path, destination: &Path) -> io::Result<u64> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::copy(source, destination)
}

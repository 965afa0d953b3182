//! Selective copy of mapped files and directories out of an extracted tree.
//!
//! Each mapping is a `source=destination` line. Sources are resolved under
//! `extracted_root/source_base_dir` and can never leave `extracted_root`;
//! destinations are resolved under `target_base_dir`.
//! Directory mappings run before file mappings; within each list the input
//! order is kept, and so is the order of the reported destinations.

use crate::copy::{copy_directory, copy_file};
use crate::error::ExtractError;
use crate::types::{CopyOutcome, ObjectRef};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::info;

const SEPARATOR: char = '=';

/// Whether a mapping names a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    File,
    Directory,
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingKind::File => f.write_str("file"),
            MappingKind::Directory => f.write_str("directory"),
        }
    }
}

/// One parsed `source=destination` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Mapping {
    /// Split a configuration line on its single `=`.
    ///
    /// ```
    /// use s3_extract::resolve::Mapping;
    /// use std::path::Path;
    ///
    /// let mapping = Mapping::parse("dist/app.js=public/app.js").unwrap();
    /// assert_eq!(mapping.source, Path::new("dist/app.js"));
    /// assert_eq!(mapping.destination, Path::new("public/app.js"));
    ///
    /// assert!(Mapping::parse("dist/app.js").is_err());
    /// assert!(Mapping::parse("a=b=c").is_err());
    /// ```
    pub fn parse(line: &str) -> Result<Self, ExtractError> {
        let invalid = |reason| ExtractError::InvalidMappingSyntax {
            line: line.to_string(),
            reason,
        };

        let parts: Vec<&str> = line.split(SEPARATOR).collect();
        let (source, destination) = match parts.as_slice() {
            [source, destination] => (source.trim(), destination.trim()),
            [_] => return Err(invalid("expected 'source=destination', found no '='")),
            _ => return Err(invalid("expected exactly one '=' separator")),
        };

        if source.is_empty() {
            return Err(invalid("source path is empty"));
        }
        if destination.is_empty() {
            return Err(invalid("destination path is empty"));
        }

        Ok(Self {
            source: PathBuf::from(source),
            destination: PathBuf::from(destination),
        })
    }
}

/// Parsed copy instructions, ready to run against an extracted tree.
#[derive(Debug, Clone)]
pub struct CopyPlan {
    object: ObjectRef,
    source_base_dir: PathBuf,
    target_base_dir: PathBuf,
    directories: Vec<Mapping>,
    files: Vec<Mapping>,
    fail_on_not_found: bool,
}

impl CopyPlan {
    /// Parse every mapping line up front.
    ///
    /// A single malformed line rejects the whole plan, so nothing gets copied
    /// from a half-valid configuration.
    pub fn new<S: AsRef<str>>(
        object: ObjectRef,
        source_base_dir: impl Into<PathBuf>,
        target_base_dir: impl Into<PathBuf>,
        files: &[S],
        directories: &[S],
        fail_on_not_found: bool,
    ) -> Result<Self, ExtractError> {
        let parse_all = |lines: &[S]| {
            lines
                .iter()
                .map(|line| Mapping::parse(line.as_ref()))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(Self {
            object,
            source_base_dir: source_base_dir.into(),
            target_base_dir: target_base_dir.into(),
            directories: parse_all(directories)?,
            files: parse_all(files)?,
            fail_on_not_found,
        })
    }

    /// Copy every mapped source that exists under `extracted_root`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::SourceNotFound`] for the first missing source when
    ///   the plan is fail-fast
    /// - [`ExtractError::Io`] when a copy fails
    ///
    /// No partial outcome is returned on error.
    pub fn execute(&self, extracted_root: &Path) -> Result<CopyOutcome, ExtractError> {
        let mut outcome = CopyOutcome::default();

        for mapping in &self.directories {
            if let Some(destination) =
                self.copy_one(extracted_root, mapping, MappingKind::Directory)?
            {
                outcome.copied_directories.push(destination);
            }
        }

        for mapping in &self.files {
            if let Some(destination) = self.copy_one(extracted_root, mapping, MappingKind::File)? {
                outcome.copied_files.push(destination);
            }
        }

        Ok(outcome)
    }

    fn copy_one(
        &self,
        extracted_root: &Path,
        mapping: &Mapping,
        kind: MappingKind,
    ) -> Result<Option<PathBuf>, ExtractError> {
        // Base and source are folded together so `..` can walk out of the
        // base but never out of the extracted root
        let source = join_contained(
            extracted_root,
            self.source_base_dir
                .components()
                .chain(mapping.source.components()),
        );
        let destination = self.target_base_dir.join(&mapping.destination);
        let destination = normalize(destination.components());

        if !source.exists() {
            info!(%kind, source = %source.display(), "not found");
            if self.fail_on_not_found {
                return Err(ExtractError::SourceNotFound {
                    kind,
                    path: source,
                    bucket: self.object.bucket.clone(),
                    key: self.object.key.clone(),
                });
            }
            return Ok(None);
        }

        info!(%kind, "Copy {} => {}", source.display(), destination.display());
        match kind {
            MappingKind::Directory => {
                copy_directory(&source, &destination)?;
            }
            MappingKind::File => {
                copy_file(&source, &destination)?;
            }
        }

        Ok(Some(destination))
    }
}

/// Parse `files` and `directories` and copy them out of `extracted_root`.
///
/// Convenience for `CopyPlan::new(..)?.execute(extracted_root)`.
pub fn resolve<S: AsRef<str>>(
    extracted_root: &Path,
    object: &ObjectRef,
    source_base_dir: &Path,
    target_base_dir: &Path,
    files: &[S],
    directories: &[S],
    fail_on_not_found: bool,
) -> Result<CopyOutcome, ExtractError> {
    CopyPlan::new(
        object.clone(),
        source_base_dir,
        target_base_dir,
        files,
        directories,
        fail_on_not_found,
    )?
    .execute(extracted_root)
}

/// Join `relative` under `base` and normalize the result lexically.
///
/// The result always stays under `base`: a leading root in `relative` is
/// ignored, `.` is dropped, and `..` removes the preceding component of
/// `relative` but is discarded once it would climb into `base`. An empty
/// result becomes `.`.
///
/// Sources go through this so that neither an absolute source nor `..`
/// leaves the extracted tree. Destinations use plain [`Path::join`], which
/// lets an absolute destination override the target base.
pub fn join_relative(base: &Path, relative: &Path) -> PathBuf {
    join_contained(base, relative.components())
}

fn join_contained<'a>(base: &'a Path, relative: impl Iterator<Item = Component<'a>>) -> PathBuf {
    let mut parts = normalized_parts(base.components());
    let floor = parts.len();

    for component in relative {
        match component {
            Component::Normal(_) => parts.push(component),
            Component::ParentDir => {
                if parts.len() > floor {
                    parts.pop();
                }
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    collect_parts(parts)
}

fn normalize<'a>(components: impl Iterator<Item = Component<'a>>) -> PathBuf {
    collect_parts(normalized_parts(components))
}

fn normalized_parts<'a>(components: impl Iterator<Item = Component<'a>>) -> Vec<Component<'a>> {
    let mut parts: Vec<Component<'a>> = Vec::new();

    for component in components {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    parts
}

fn collect_parts(parts: Vec<Component<'_>>) -> PathBuf {
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use svcpack_utils::error::SelectorError;
use svcpack_utils::paths::relative_slash_path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::pattern::PatternSet;

/// A selected regular file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFile {
    /// Path relative to the resolution root, `/`-separated.
    pub path: Utf8PathBuf,
    /// Permission bits as found on disk.
    pub mode: u32,
}

/// Ordered, duplicate-free list of selected files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedFileList {
    files: Vec<ResolvedFile>,
}

impl ResolvedFileList {
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedFile> {
        self.files.iter()
    }

    #[must_use]
    pub fn contains(&self, rel_path: &str) -> bool {
        self.files.iter().any(|f| f.path == rel_path)
    }

    /// Relative paths in list order.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ResolvedFile] {
        &self.files
    }
}

impl FromIterator<ResolvedFile> for ResolvedFileList {
    fn from_iter<T: IntoIterator<Item = ResolvedFile>>(iter: T) -> Self {
        let mut seen = HashSet::new();
        Self {
            files: iter
                .into_iter()
                .filter(|f| seen.insert(f.path.clone()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResolvedFileList {
    type Item = &'a ResolvedFile;
    type IntoIter = std::slice::Iter<'a, ResolvedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Expands a [`PatternSet`] against a directory tree.
///
/// The walk follows symbolic links (loops are detected and skipped), includes
/// hidden entries and visits entries sorted by file name, so the output order
/// is stable for a given tree.
#[derive(Debug, Clone, Default)]
pub struct GlobResolver {
    skip_dir_names: Vec<String>,
    skip_dirs: Vec<String>,
}

impl GlobResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not descend into directories with exactly one of these names, at
    /// any depth.
    #[must_use]
    pub fn skip_dir_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dir_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Do not descend into these directories, given as `/`-separated paths
    /// relative to the root.
    #[must_use]
    pub fn skip_dirs<I, S>(mut self, rel_dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dirs.extend(
            rel_dirs
                .into_iter()
                .map(|d| d.into().trim_matches('/').to_string()),
        );
        self
    }

    /// Resolve `patterns` against `root`.
    ///
    /// Only regular files (after following links) are listed. A missing root
    /// yields an empty list. Entries that cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::InvalidPattern`] if any rule fails to compile.
    pub fn resolve(
        &self,
        patterns: &PatternSet,
        root: &Utf8Path,
    ) -> Result<ResolvedFileList, SelectorError> {
        let compiled = patterns.compile()?;

        if !root.is_dir() {
            debug!(root = %root, "Resolution root is not a directory, nothing selected");
            return Ok(ResolvedFileList::default());
        }

        let walker = WalkDir::new(root.as_std_path())
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped_dir(root, entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(rel) = relative_slash_path(root.as_std_path(), entry.path()) else {
                debug!(path = %entry.path().display(), "Skipping non UTF-8 path");
                continue;
            };
            if rel.is_empty() || !compiled.is_selected(&rel) {
                continue;
            }

            let metadata = match fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(path = %rel, error = %e, "Skipping entry without metadata");
                    continue;
                }
            };

            files.push(ResolvedFile {
                path: Utf8PathBuf::from(rel),
                mode: mode_bits(&metadata),
            });
        }

        debug!(root = %root, files = files.len(), "Resolved file list");
        Ok(files.into_iter().collect())
    }

    fn is_skipped_dir(&self, root: &Utf8Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        if let Some(name) = entry.file_name().to_str()
            && self.skip_dir_names.iter().any(|n| n == name)
        {
            return true;
        }
        if self.skip_dirs.is_empty() {
            return false;
        }
        relative_slash_path(root.as_std_path(), entry.path())
            .is_some_and(|rel| self.skip_dirs.contains(&rel))
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

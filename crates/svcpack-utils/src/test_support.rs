//! Fixture builders shared by unit and integration tests.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// A throwaway service root on disk.
///
/// The directory is removed when the fixture is dropped.
pub struct ServiceFixture {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl ServiceFixture {
    /// Create an empty service root.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created or is not UTF-8.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp service root");
        let canonical = fs::canonicalize(dir.path()).expect("canonicalize temp dir");
        let root = Utf8PathBuf::from_path_buf(canonical).expect("temp dir is UTF-8");
        Self { _dir: dir, root }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path of a `/`-separated relative path.
    #[must_use]
    pub fn path(&self, rel: &str) -> Utf8PathBuf {
        crate::paths::join_slash(&self.root, rel)
    }

    /// Write a file, creating parent directories.
    pub fn file(&self, rel: &str, contents: &str) -> &Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture file");
        self
    }

    /// Write a file and set its permission bits.
    #[cfg(unix)]
    pub fn file_with_mode(&self, rel: &str, contents: &str, mode: u32) -> &Self {
        use std::os::unix::fs::PermissionsExt;

        self.file(rel, contents);
        fs::set_permissions(self.path(rel), fs::Permissions::from_mode(mode))
            .expect("set fixture permissions");
        self
    }

    /// Create an empty directory.
    pub fn dir(&self, rel: &str) -> &Self {
        fs::create_dir_all(self.path(rel)).expect("create fixture dir");
        self
    }

    /// Write a minimal `package.json` into `dir` ("" for the root).
    pub fn manifest(&self, dir: &str) -> &Self {
        let rel = if dir.is_empty() {
            "package.json".to_string()
        } else {
            format!("{}/package.json", dir.trim_end_matches('/'))
        };
        self.file(&rel, r#"{"name":"fixture","version":"1.0.0"}"#)
    }
}

impl Default for ServiceFixture {
    fn default() -> Self {
        Self::new()
    }
}

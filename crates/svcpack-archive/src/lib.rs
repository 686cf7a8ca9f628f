//! Zip artifact construction.
//!
//! [`ArchiveWriter`] streams a resolved file list into a zip archive. The
//! archive is built in a temporary file next to the destination and renamed
//! into place only after the central directory is written and the data is
//! synced, so the destination never holds a partial artifact.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use svcpack_selectors::{ResolvedFile, ResolvedFileList};
use svcpack_utils::error::ArchiveError;
use svcpack_utils::paths::join_slash;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub path: Utf8PathBuf,
    pub entries_written: usize,
    /// Listed files that were gone or had become directories at write time.
    pub entries_skipped: usize,
    /// Uncompressed bytes written.
    pub bytes_in: u64,
    /// BLAKE3 of the finished archive, hex encoded.
    pub blake3: String,
}

/// Writes zip artifacts with deflate compression, the permission bits the
/// resolver recorded for each file and a fixed 1980-01-01 timestamp on every
/// entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveWriter;

impl ArchiveWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Write `files` (relative to `service_root`) into a zip at `output_path`
    /// and return the path once the archive is complete on disk.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the output cannot be created, a listed
    /// file cannot be read, or the encoder fails. Nothing is left at
    /// `output_path` in that case.
    pub fn write(
        &self,
        files: &ResolvedFileList,
        service_root: &Utf8Path,
        output_path: &Utf8Path,
    ) -> Result<Utf8PathBuf, ArchiveError> {
        self.write_with_summary(files, service_root, output_path)
            .map(|summary| summary.path)
    }

    /// Like [`write`](Self::write), returning counts and the archive hash.
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub fn write_with_summary(
        &self,
        files: &ResolvedFileList,
        service_root: &Utf8Path,
        output_path: &Utf8Path,
    ) -> Result<ArchiveSummary, ArchiveError> {
        let parent = output_path
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        fs::create_dir_all(parent).map_err(|e| ArchiveError::OutputDir {
            path: parent.to_string(),
            source: e,
        })?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|e| ArchiveError::OutputDir {
            path: parent.to_string(),
            source: e,
        })?;

        let mut zip = ZipWriter::new(BufWriter::new(temp.as_file_mut()));
        let base_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut entries_written = 0;
        let mut entries_skipped = 0;
        let mut bytes_in = 0u64;

        // ResolvedFileList is duplicate-free, so each path is written once.
        for file in files {
            let Some(contents) = read_entry(service_root, file)? else {
                debug!(path = %file.path, "Skipping entry that vanished or became a directory");
                entries_skipped += 1;
                continue;
            };

            zip.start_file(file.path.as_str(), base_options.unix_permissions(file.mode))
                .map_err(|e| encoder_error(file.path.as_str(), e))?;
            zip.write_all(&contents)
                .map_err(|e| encoder_error(file.path.as_str(), e))?;

            entries_written += 1;
            bytes_in += contents.len() as u64;
        }

        let buffered = zip
            .finish()
            .map_err(|e| encoder_error("central directory", e))?;
        let archive = buffered
            .into_inner()
            .map_err(|e| encoder_error("central directory", e.into_error()))?;
        archive.sync_all().map_err(|e| ArchiveError::Persist {
            path: output_path.to_string(),
            source: e,
        })?;

        let blake3 = hash_file(temp.as_file_mut()).map_err(|e| ArchiveError::Persist {
            path: output_path.to_string(),
            source: e,
        })?;

        temp.persist(output_path)
            .map_err(|e| ArchiveError::Persist {
                path: output_path.to_string(),
                source: e.error,
            })?;

        info!(
            artifact = %output_path,
            entries = entries_written,
            skipped = entries_skipped,
            bytes_in = bytes_in,
            "Archive written"
        );

        Ok(ArchiveSummary {
            path: output_path.to_path_buf(),
            entries_written,
            entries_skipped,
            bytes_in,
            blake3,
        })
    }
}

// `None` when the entry no longer exists or is now a directory.
fn read_entry(
    service_root: &Utf8Path,
    file: &ResolvedFile,
) -> Result<Option<Vec<u8>>, ArchiveError> {
    let abs = join_slash(service_root, file.path.as_str());
    let read_error = |e: io::Error| ArchiveError::ReadEntry {
        path: file.path.to_string(),
        source: e,
    };

    let metadata = match fs::metadata(&abs) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(read_error(e)),
    };
    if metadata.is_dir() {
        return Ok(None);
    }

    let mut contents = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or(0));
    match fs::File::open(&abs) {
        Ok(mut handle) => {
            handle.read_to_end(&mut contents).map_err(read_error)?;
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(read_error(e)),
    }

    Ok(Some(contents))
}

fn encoder_error(
    entry: &str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> ArchiveError {
    ArchiveError::Encoder {
        entry: entry.to_string(),
        source: source.into(),
    }
}

fn hash_file(file: &mut fs::File) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut hasher = blake3::Hasher::new();
    io::copy(file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use svcpack_selectors::{GlobResolver, PatternSet};
    use svcpack_utils::test_support::ServiceFixture;
    use zip::ZipArchive;

    fn resolve_all(fixture: &ServiceFixture) -> ResolvedFileList {
        GlobResolver::new()
            .skip_dirs([".packaging-output"])
            .resolve(&PatternSet::for_packaging(&[], &[]), fixture.root())
            .unwrap()
    }

    fn entry_names(path: &Utf8Path) -> Vec<String> {
        let mut archive = ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_writes_entries_in_list_order() {
        let fixture = ServiceFixture::new();
        fixture.file("a.txt", "alpha").file("b/c.txt", "charlie");
        let output = fixture.path(".packaging-output/service.zip");

        let path = ArchiveWriter::new()
            .write(&resolve_all(&fixture), fixture.root(), &output)
            .unwrap();

        assert_eq!(path, output);
        assert_eq!(entry_names(&output), vec!["a.txt", "b/c.txt"]);

        let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name("b/c.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "charlie");
    }

    #[cfg(unix)]
    #[test]
    fn test_preserves_permission_bits() {
        let fixture = ServiceFixture::new();
        fixture
            .file_with_mode("bin/run.sh", "#!/bin/sh\n", 0o755)
            .file_with_mode("config.json", "{}", 0o600);
        let output = fixture.path("out/service.zip");

        ArchiveWriter::new()
            .write(&resolve_all(&fixture), fixture.root(), &output)
            .unwrap();

        let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let run = archive.by_name("bin/run.sh").unwrap().unix_mode().unwrap();
        assert_eq!(run & 0o777, 0o755);
        let config = archive.by_name("config.json").unwrap().unix_mode().unwrap();
        assert_eq!(config & 0o777, 0o600);
    }

    #[test]
    fn test_writes_listed_mode() {
        let fixture = ServiceFixture::new();
        fixture.file("run.sh", "#!/bin/sh\n");
        let files: ResolvedFileList = vec![ResolvedFile {
            path: "run.sh".into(),
            mode: 0o750,
        }]
        .into_iter()
        .collect();
        let output = fixture.path("out/service.zip");

        ArchiveWriter::new()
            .write(&files, fixture.root(), &output)
            .unwrap();

        let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let mode = archive.by_name("run.sh").unwrap().unix_mode().unwrap();
        assert_eq!(mode & 0o7777, 0o750);
    }

    #[test]
    fn test_skips_vanished_files_and_directories() {
        let fixture = ServiceFixture::new();
        fixture.file("keep.txt", "k").file("gone.txt", "g").file("morph", "m");
        let files = resolve_all(&fixture);

        fs::remove_file(fixture.path("gone.txt")).unwrap();
        fs::remove_file(fixture.path("morph")).unwrap();
        fixture.dir("morph");

        let output = fixture.path(".packaging-output/service.zip");
        let summary = ArchiveWriter::new()
            .write_with_summary(&files, fixture.root(), &output)
            .unwrap();

        assert_eq!(summary.entries_written, 1);
        assert_eq!(summary.entries_skipped, 2);
        assert_eq!(summary.bytes_in, 1);
        assert_eq!(entry_names(&output), vec!["keep.txt"]);
    }

    #[test]
    fn test_identical_inputs_produce_identical_archives() {
        let fixture = ServiceFixture::new();
        fixture.file("a.txt", "alpha").file("lib/b.js", "module.exports = 1;");
        let files = resolve_all(&fixture);

        let first = ArchiveWriter::new()
            .write_with_summary(&files, fixture.root(), &fixture.path("out/one.zip"))
            .unwrap();
        let second = ArchiveWriter::new()
            .write_with_summary(&files, fixture.root(), &fixture.path("out/two.zip"))
            .unwrap();

        assert_eq!(first.blake3, second.blake3);
        assert_eq!(
            fs::read(&first.path).unwrap(),
            fs::read(&second.path).unwrap()
        );
    }

    #[test]
    fn test_replaces_existing_artifact() {
        let fixture = ServiceFixture::new();
        fixture
            .file("a.txt", "alpha")
            .file(".packaging-output/service.zip", "stale bytes");
        let output = fixture.path(".packaging-output/service.zip");

        ArchiveWriter::new()
            .write(&resolve_all(&fixture), fixture.root(), &output)
            .unwrap();

        assert_eq!(entry_names(&output), vec!["a.txt"]);
    }

    #[test]
    fn test_failed_persist_leaves_no_partial_artifact() {
        let fixture = ServiceFixture::new();
        fixture.file("a.txt", "alpha").dir("out/service.zip/occupied");
        let output = fixture.path("out/service.zip");

        let err = ArchiveWriter::new()
            .write(&resolve_all(&fixture), fixture.root(), &output)
            .unwrap_err();

        assert!(matches!(err, ArchiveError::Persist { .. }));
        let leftovers: Vec<_> = fs::read_dir(fixture.path("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("service.zip")]);
        assert!(output.is_dir());
    }

    #[test]
    fn test_output_dir_that_is_a_file_fails() {
        let fixture = ServiceFixture::new();
        fixture.file("a.txt", "alpha").file("blocked", "not a dir");

        let err = ArchiveWriter::new()
            .write(&resolve_all(&fixture), fixture.root(), &fixture.path("blocked/service.zip"))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::OutputDir { .. }));
    }

    #[test]
    fn test_empty_list_produces_valid_archive() {
        let fixture = ServiceFixture::new();
        let output = fixture.path("out/empty.zip");

        let summary = ArchiveWriter::new()
            .write_with_summary(&ResolvedFileList::default(), fixture.root(), &output)
            .unwrap();

        assert_eq!(summary.entries_written, 0);
        assert!(entry_names(&output).is_empty());
    }
}

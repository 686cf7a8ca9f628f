//! Packaging pipeline: prune, resolve, archive.
//!
//! One run holds the service root's packaging lock, augments the caller's
//! patterns with the dependency pruner's output, resolves the file list and
//! writes `<service root>/.packaging-output/<artifact name>`.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::time::{Duration, Instant};
use svcpack_archive::{ArchiveSummary, ArchiveWriter};
use svcpack_config::{Config, DependenciesConfig};
use svcpack_lock::{OUTPUT_DIR_NAME, PackagingLock};
use svcpack_pruner::{DependencyLister, DependencyPruner, NpmLister, PruneReport, union_into};
use svcpack_selectors::{GlobResolver, PatternSet, ResolvedFileList};
use svcpack_utils::error::{ConfigError, SvcpackError};
use svcpack_utils::logging::{log_packaging_complete, log_patterns, packaging_span};
use svcpack_utils::paths::is_plain_file_name;
use tracing::{debug, info, warn};

/// Outcome of a packaging run.
#[derive(Debug, Clone, Serialize)]
pub struct PackagingReport {
    pub artifact: Utf8PathBuf,
    /// Caller patterns merged with the pruner's output.
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    /// `None` when pruning was disabled.
    pub prune: Option<PruneReport>,
    pub archive: ArchiveSummary,
    pub duration_ms: u128,
}

/// Result of a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct PackagingPlan {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub prune: Option<PruneReport>,
    pub files: ResolvedFileList,
}

/// Build the dependency lister named by `deps.manager`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for an unknown manager.
pub fn lister_for(deps: &DependenciesConfig) -> Result<Box<dyn DependencyLister>, SvcpackError> {
    match deps.manager.as_str() {
        "npm" => {
            let mut lister = NpmLister::new()
                .cache_dir(&deps.cache_dir)
                .timeout(Duration::from_secs(deps.timeout_secs));
            if let Some(program) = &deps.program {
                lister = lister.program(program);
            }
            Ok(Box::new(lister))
        }
        other => Err(ConfigError::InvalidValue {
            key: "dependencies.manager".to_string(),
            value: other.to_string(),
        }
        .into()),
    }
}

/// Packages one service root.
#[derive(Debug)]
pub struct PackagingPipeline {
    service_root: Utf8PathBuf,
    pruner: Option<DependencyPruner>,
    writer: ArchiveWriter,
    force: bool,
    lock_ttl_secs: Option<u64>,
}

impl PackagingPipeline {
    /// Pipeline with the default npm pruner.
    #[must_use]
    pub fn new(service_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            service_root: service_root.into(),
            pruner: Some(DependencyPruner::new(Box::new(NpmLister::new()))),
            writer: ArchiveWriter::new(),
            force: false,
            lock_ttl_secs: None,
        }
    }

    /// Pipeline configured from the `[dependencies]` section of `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the dependency manager is unknown.
    pub fn from_config(
        service_root: impl Into<Utf8PathBuf>,
        config: &Config,
    ) -> Result<Self, SvcpackError> {
        let deps = &config.dependencies;
        let pipeline = Self::new(service_root);
        if !deps.prune {
            return Ok(pipeline.without_pruning());
        }

        let pruner = DependencyPruner::new(lister_for(deps)?)
            .manifest_file(&deps.manifest_file)
            .cache_dir(&deps.cache_dir);
        Ok(pipeline.with_pruner(pruner))
    }

    #[must_use]
    pub fn with_pruner(mut self, pruner: DependencyPruner) -> Self {
        self.pruner = Some(pruner);
        self
    }

    #[must_use]
    pub fn without_pruning(mut self) -> Self {
        self.pruner = None;
        self
    }

    /// Override an existing packaging lock.
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub const fn lock_ttl(mut self, ttl_secs: Option<u64>) -> Self {
        self.lock_ttl_secs = ttl_secs;
        self
    }

    #[must_use]
    pub fn service_root(&self) -> &Utf8Path {
        &self.service_root
    }

    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.service_root.join(OUTPUT_DIR_NAME)
    }

    /// Package the service root and return the artifact path.
    ///
    /// # Errors
    ///
    /// Fails on an invalid artifact name, a held lock, an invalid pattern, or
    /// when the archive cannot be written. Dependency-manager failures are not
    /// errors; the affected cache directories are packaged unfiltered.
    pub fn package(
        &self,
        exclude: &[String],
        include: &[String],
        artifact_name: &str,
    ) -> Result<Utf8PathBuf, SvcpackError> {
        self.package_with_report(exclude, include, artifact_name)
            .map(|report| report.artifact)
    }

    /// Like [`package`](Self::package), returning the full report.
    ///
    /// # Errors
    ///
    /// See [`package`](Self::package).
    pub fn package_with_report(
        &self,
        exclude: &[String],
        include: &[String],
        artifact_name: &str,
    ) -> Result<PackagingReport, SvcpackError> {
        validate_artifact_name(artifact_name)?;

        let span = packaging_span(self.service_root.as_str(), artifact_name);
        let _enter = span.enter();
        let start = Instant::now();

        let lock = PackagingLock::acquire(&self.service_root, self.force, self.lock_ttl_secs)?;
        debug!(lock = %PackagingLock::lock_path(&self.service_root), "Acquired packaging lock");

        let (exclude, include, prune) = self.merge_patterns(exclude, include);
        let files = self.resolve(&exclude, &include)?;

        let output_path = self.output_dir().join(artifact_name);
        let archive = self
            .writer
            .write_with_summary(&files, &self.service_root, &output_path)?;

        if let Err(e) = lock.release() {
            warn!(error = %e, "Failed to release packaging lock");
        }

        let duration_ms = start.elapsed().as_millis();
        log_packaging_complete(archive.path.as_str(), archive.entries_written, duration_ms);

        Ok(PackagingReport {
            artifact: archive.path.clone(),
            exclude,
            include,
            prune,
            archive,
            duration_ms,
        })
    }

    /// Dry run: prune and resolve without taking the lock or writing anything.
    ///
    /// # Errors
    ///
    /// Fails on an invalid pattern.
    pub fn plan(&self, exclude: &[String], include: &[String]) -> Result<PackagingPlan, SvcpackError> {
        let (exclude, include, prune) = self.merge_patterns(exclude, include);
        let files = self.resolve(&exclude, &include)?;
        Ok(PackagingPlan {
            exclude,
            include,
            prune,
            files,
        })
    }

    fn merge_patterns(
        &self,
        exclude: &[String],
        include: &[String],
    ) -> (Vec<String>, Vec<String>, Option<PruneReport>) {
        log_patterns("requested", exclude, include);
        let mut merged_exclude = exclude.to_vec();
        let mut merged_include = include.to_vec();

        let prune = self.pruner.as_ref().map(|pruner| {
            let report = pruner.prune(include, &self.service_root);
            union_into(&mut merged_exclude, &report.exclude);
            union_into(&mut merged_include, &report.include);
            if let Some(err) = &report.discovery_error {
                warn!(error = %err, "Manifest discovery incomplete");
            }
            report
        });

        log_patterns("pruned", &merged_exclude, &merged_include);
        (merged_exclude, merged_include, prune)
    }

    fn resolve(&self, exclude: &[String], include: &[String]) -> Result<ResolvedFileList, SvcpackError> {
        let patterns = PatternSet::for_packaging(exclude, include);
        let files = GlobResolver::new()
            .skip_dirs([OUTPUT_DIR_NAME])
            .resolve(&patterns, &self.service_root)?;
        info!(files = files.len(), "Resolved file list");
        Ok(files)
    }
}

fn validate_artifact_name(name: &str) -> Result<(), SvcpackError> {
    if is_plain_file_name(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: "artifact_name".to_string(),
            value: name.to_string(),
        }
        .into())
    }
}

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use svcpack_selectors::{GlobResolver, PatternSet};
use svcpack_utils::paths::{has_component, join_slash, parent_dir};
use tracing::{debug, info, warn};

use crate::lister::DependencyLister;
use crate::{DEFAULT_CACHE_DIR, DEFAULT_MANIFEST_FILE};

/// What happened for one discovered manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ManifestOutcome {
    /// Patterns were emitted for this many production dependencies.
    Contributed { dependencies: usize },
    /// The lister succeeded but reported nothing under the cache directory.
    NoProductionDependencies,
    /// The lister failed; the cache directory is left unfiltered.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestReport {
    /// Manifest path relative to the service root.
    pub manifest: String,
    pub manifest_dir: Utf8PathBuf,
    #[serde(flatten)]
    pub outcome: ManifestOutcome,
}

/// Result of one pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub manifests: Vec<ManifestReport>,
    pub discovery_error: Option<String>,
}

impl PruneReport {
    /// True when the pass emitted any pattern.
    #[must_use]
    pub fn contributed(&self) -> bool {
        !self.exclude.is_empty() || !self.include.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ManifestReport> {
        self.manifests
            .iter()
            .filter(|m| matches!(m.outcome, ManifestOutcome::Failed { .. }))
    }
}

/// Append `items` to `target` as a set union: duplicates in either side
/// collapse, first occurrence keeps its position.
pub fn union_into<I, S>(target: &mut Vec<String>, items: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut deduped: Vec<String> = Vec::with_capacity(target.len());
    for existing in target.drain(..) {
        if !deduped.contains(&existing) {
            deduped.push(existing);
        }
    }
    for item in items {
        let item = item.as_ref();
        if !deduped.iter().any(|d| d == item) {
            deduped.push(item.to_string());
        }
    }
    *target = deduped;
}

/// Computes exclude/include patterns that keep only production dependencies
/// in each manifest's cache directory.
pub struct DependencyPruner {
    lister: Box<dyn DependencyLister>,
    manifest_file: String,
    cache_dir: String,
}

impl DependencyPruner {
    #[must_use]
    pub fn new(lister: Box<dyn DependencyLister>) -> Self {
        Self {
            lister,
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            cache_dir: DEFAULT_CACHE_DIR.to_string(),
        }
    }

    #[must_use]
    pub fn manifest_file(mut self, name: impl Into<String>) -> Self {
        self.manifest_file = name.into();
        self
    }

    #[must_use]
    pub fn cache_dir(mut self, name: impl Into<String>) -> Self {
        self.cache_dir = name.into();
        self
    }

    #[must_use]
    pub fn lister_name(&self) -> &str {
        self.lister.name()
    }

    /// Run one pruning pass over the manifests found under `include_roots`.
    ///
    /// Never fails: discovery and lister errors are recorded in the report and
    /// the affected manifests contribute no patterns. The current directory of
    /// the process is not touched.
    pub fn prune(&self, include_roots: &[String], service_root: &Utf8Path) -> PruneReport {
        let mut report = PruneReport::default();
        let manifests = self.discover(include_roots, service_root, &mut report);
        debug!(manifests = ?manifests, "Discovered dependency manifests");

        for manifest in manifests {
            let rel_dir = parent_dir(&manifest);
            let manifest_dir = join_slash(service_root, rel_dir);
            let prefix = if rel_dir.is_empty() {
                String::new()
            } else {
                format!("{rel_dir}/")
            };
            info!(manifest_dir = %manifest_dir, lister = self.lister.name(), "Listing production dependencies");

            let outcome = match self.lister.list_production(&manifest_dir) {
                Ok(deps) if deps.is_empty() => ManifestOutcome::NoProductionDependencies,
                Ok(deps) => {
                    let includes = deps.iter().map(|dep| format!("{prefix}{dep}/**"));
                    union_into(&mut report.include, includes);
                    union_into(
                        &mut report.exclude,
                        [format!("{prefix}{}/**", self.cache_dir)],
                    );
                    ManifestOutcome::Contributed {
                        dependencies: deps.len(),
                    }
                }
                Err(e) => {
                    warn!(
                        manifest_dir = %manifest_dir,
                        error = %e,
                        "Dependency listing failed, leaving cache directory unfiltered"
                    );
                    ManifestOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            report.manifests.push(ManifestReport {
                manifest,
                manifest_dir,
                outcome,
            });
        }

        debug!(
            exclude = ?report.exclude,
            include = ?report.include,
            "Pruning patterns"
        );
        report
    }

    fn discover(
        &self,
        include_roots: &[String],
        service_root: &Utf8Path,
        report: &mut PruneReport,
    ) -> Vec<String> {
        let resolver = GlobResolver::new().skip_dir_names([self.cache_dir.as_str()]);
        let mut found: Vec<String> = Vec::new();

        for root in include_roots {
            let root = root.trim_end_matches('/');
            let pattern = if root.is_empty() {
                self.manifest_file.clone()
            } else {
                format!("{root}/{}", self.manifest_file)
            };

            match resolver.resolve(&PatternSet::new().include(&pattern), service_root) {
                Ok(list) => {
                    let manifests = list
                        .paths()
                        .into_iter()
                        .filter(|rel| !has_component(rel, &self.cache_dir));
                    union_into(&mut found, manifests);
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Manifest discovery failed");
                    report.discovery_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        found
    }
}

impl std::fmt::Debug for DependencyPruner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyPruner")
            .field("lister", &self.lister.name())
            .field("manifest_file", &self.manifest_file)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lister::{NpmLister, StaticLister};
    use proptest::prelude::*;
    use serial_test::serial;
    use svcpack_utils::test_support::ServiceFixture;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_root_manifest_patterns() {
        let fixture = ServiceFixture::new();
        fixture.manifest("");
        let lister = StaticLister::new().with(fixture.root(), &["node_modules/express"]);

        let report = DependencyPruner::new(Box::new(lister)).prune(&strings(&["**"]), fixture.root());

        assert_eq!(report.exclude, vec!["node_modules/**"]);
        assert_eq!(report.include, vec!["node_modules/express/**"]);
        assert_eq!(report.manifests.len(), 1);
        assert_eq!(
            report.manifests[0].outcome,
            ManifestOutcome::Contributed { dependencies: 1 }
        );
        assert!(report.contributed());
    }

    #[test]
    fn test_nested_manifest_patterns_are_prefixed() {
        let fixture = ServiceFixture::new();
        fixture.manifest("sub");
        let lister = StaticLister::new().with(fixture.path("sub"), &["node_modules/a"]);

        let report = DependencyPruner::new(Box::new(lister)).prune(&strings(&["sub/"]), fixture.root());

        assert_eq!(report.exclude, vec!["sub/node_modules/**"]);
        assert_eq!(report.include, vec!["sub/node_modules/a/**"]);
        assert_eq!(report.manifests[0].manifest, "sub/package.json");
    }

    #[test]
    fn test_manifests_inside_cache_dir_are_ignored() {
        let fixture = ServiceFixture::new();
        fixture
            .manifest("")
            .manifest("node_modules/express")
            .manifest("tools/node_modules_helper");
        let lister = StaticLister::new();

        let report = DependencyPruner::new(Box::new(lister)).prune(&strings(&["**"]), fixture.root());
        let manifests: Vec<&str> = report.manifests.iter().map(|m| m.manifest.as_str()).collect();

        assert_eq!(manifests, vec!["package.json", "tools/node_modules_helper/package.json"]);
    }

    #[test]
    fn test_discovery_is_deduplicated_across_roots() {
        let fixture = ServiceFixture::new();
        fixture.manifest("a").manifest("b");
        let lister = StaticLister::new();

        let report =
            DependencyPruner::new(Box::new(lister)).prune(&strings(&["b", "**", "a"]), fixture.root());
        let manifests: Vec<&str> = report.manifests.iter().map(|m| m.manifest.as_str()).collect();

        assert_eq!(manifests, vec!["b/package.json", "a/package.json"]);
    }

    #[test]
    fn test_no_production_dependencies_emits_nothing() {
        let fixture = ServiceFixture::new();
        fixture.manifest("");

        let report =
            DependencyPruner::new(Box::new(StaticLister::new())).prune(&strings(&["**"]), fixture.root());

        assert!(!report.contributed());
        assert_eq!(
            report.manifests[0].outcome,
            ManifestOutcome::NoProductionDependencies
        );
    }

    #[test]
    fn test_failure_is_recorded_and_other_manifests_continue() {
        let fixture = ServiceFixture::new();
        fixture.manifest("api").manifest("worker");
        let lister = StaticLister::new()
            .failing(fixture.path("api"), "npm exploded")
            .with(fixture.path("worker"), &["node_modules/bull"]);

        let report = DependencyPruner::new(Box::new(lister)).prune(&strings(&["**"]), fixture.root());

        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            report.manifests[0].outcome,
            ManifestOutcome::Failed {
                reason: "npm exploded".to_string()
            }
        );
        assert_eq!(report.exclude, vec!["worker/node_modules/**"]);
        assert_eq!(report.include, vec!["worker/node_modules/bull/**"]);
    }

    #[test]
    fn test_invalid_root_pattern_is_recorded() {
        let fixture = ServiceFixture::new();
        fixture.manifest("");

        let report = DependencyPruner::new(Box::new(StaticLister::new()))
            .prune(&strings(&["src/{a", "**"]), fixture.root());

        assert!(report.discovery_error.is_some());
        assert_eq!(report.manifests.len(), 1);
    }

    #[test]
    fn test_custom_manifest_and_cache_dir() {
        let fixture = ServiceFixture::new();
        fixture.file("deps.json", "{}");
        let lister = StaticLister::new().with(fixture.root(), &["vendor/lib"]);

        let report = DependencyPruner::new(Box::new(lister))
            .manifest_file("deps.json")
            .cache_dir("vendor")
            .prune(&strings(&["**"]), fixture.root());

        assert_eq!(report.exclude, vec!["vendor/**"]);
        assert_eq!(report.include, vec!["vendor/lib/**"]);
    }

    #[test]
    fn test_pruning_twice_is_idempotent() {
        let fixture = ServiceFixture::new();
        fixture.manifest("").manifest("sub");
        let lister = StaticLister::new()
            .with(fixture.root(), &["node_modules/a", "node_modules/b"])
            .with(fixture.path("sub"), &["node_modules/a"]);
        let pruner = DependencyPruner::new(Box::new(lister));
        let roots = strings(&["**"]);

        let first = pruner.prune(&roots, fixture.root());
        let mut exclude = Vec::new();
        let mut include = roots.clone();
        union_into(&mut exclude, &first.exclude);
        union_into(&mut include, &first.include);
        let (once_exclude, once_include) = (exclude.clone(), include.clone());

        let second = pruner.prune(&roots, fixture.root());
        union_into(&mut exclude, &second.exclude);
        union_into(&mut include, &second.include);

        assert_eq!(first, second);
        assert_eq!(exclude, once_exclude);
        assert_eq!(include, once_include);
    }

    #[test]
    #[serial]
    fn test_current_dir_unchanged_after_failed_pass() {
        let fixture = ServiceFixture::new();
        fixture.manifest("").manifest("sub");
        let before = std::env::current_dir().unwrap();

        let lister = NpmLister::new().program("svcpack-no-such-package-manager");
        let report = DependencyPruner::new(Box::new(lister)).prune(&strings(&["**"]), fixture.root());

        assert_eq!(report.failures().count(), 2);
        assert!(!report.contributed());
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_union_into_dedups_both_sides() {
        let mut target = strings(&["a", "b", "a"]);
        union_into(&mut target, ["c", "b", "c"]);
        assert_eq!(target, strings(&["a", "b", "c"]));
    }

    proptest! {
        #[test]
        fn prop_union_is_idempotent(
            base in prop::collection::vec("[a-c]{1,2}", 0..6),
            extra in prop::collection::vec("[a-c]{1,2}", 0..6),
        ) {
            let mut once = base.clone();
            union_into(&mut once, &extra);
            let mut twice = once.clone();
            union_into(&mut twice, &extra);

            prop_assert_eq!(&once, &twice);
            let mut unique = once.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), once.len());
        }
    }
}

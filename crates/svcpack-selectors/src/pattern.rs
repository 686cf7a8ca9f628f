use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use svcpack_utils::error::SelectorError;

use crate::CATCH_ALL;

/// One ordered selection rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "lowercase")]
pub enum PatternRule {
    Include(String),
    Exclude(String),
}

impl PatternRule {
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Include(p) | Self::Exclude(p) => p,
        }
    }

    #[must_use]
    pub const fn is_include(&self) -> bool {
        matches!(self, Self::Include(_))
    }
}

/// Ordered rules evaluated against `/`-separated relative paths.
///
/// For any path the last matching rule decides; a path no rule matches is not
/// selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSet {
    rules: Vec<PatternRule>,
}

impl PatternSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for a packaging run.
    ///
    /// Order is fixed: a catch-all include, then every exclude in declaration
    /// order, then every include in declaration order. An exclude written as
    /// `!p` re-includes `p`, which is the same as listing `p` as an include at
    /// that position.
    #[must_use]
    pub fn for_packaging(exclude: &[String], include: &[String]) -> Self {
        let mut set = Self::new().include(CATCH_ALL);
        for pattern in exclude {
            set = match pattern.strip_prefix('!') {
                Some(negated) => set.include(negated),
                None => set.exclude(pattern),
            };
        }
        for pattern in include {
            set = set.include(pattern);
        }
        set
    }

    #[must_use]
    pub fn include(mut self, pattern: impl AsRef<str>) -> Self {
        self.rules
            .push(PatternRule::Include(normalize(pattern.as_ref())));
        self
    }

    #[must_use]
    pub fn exclude(mut self, pattern: impl AsRef<str>) -> Self {
        self.rules
            .push(PatternRule::Exclude(normalize(pattern.as_ref())));
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compile every rule into a single glob set.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::InvalidPattern`] for the first rule whose glob
    /// syntax is invalid.
    pub fn compile(&self) -> Result<CompiledPatterns, SelectorError> {
        let mut builder = GlobSetBuilder::new();
        for rule in &self.rules {
            builder.add(build_glob(rule.pattern())?.glob().clone());
        }
        let set = builder
            .build()
            .map_err(|e| SelectorError::InvalidPattern {
                pattern: self
                    .rules
                    .iter()
                    .map(PatternRule::pattern)
                    .collect::<Vec<_>>()
                    .join(", "),
                reason: e.to_string(),
            })?;

        Ok(CompiledPatterns {
            set,
            include: self.rules.iter().map(PatternRule::is_include).collect(),
        })
    }
}

/// A [`PatternSet`] ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledPatterns {
    set: GlobSet,
    include: Vec<bool>,
}

impl CompiledPatterns {
    /// True when the last rule matching `rel_path` is an include.
    #[must_use]
    pub fn is_selected(&self, rel_path: &str) -> bool {
        self.set
            .matches(rel_path)
            .into_iter()
            .max()
            .is_some_and(|idx| self.include[idx])
    }
}

/// Check glob syntax of every pattern, ignoring a leading `!`.
///
/// # Errors
///
/// Returns the first invalid pattern.
pub fn validate_patterns(patterns: &[String]) -> Result<(), SelectorError> {
    for pattern in patterns {
        let body = pattern.strip_prefix('!').unwrap_or(pattern);
        build_glob(&normalize(body))?;
    }
    Ok(())
}

fn build_glob(pattern: &str) -> Result<GlobMatcher, SelectorError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| SelectorError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })
}

// Paths are matched relative to the root, so a leading "./" never matches.
fn normalize(pattern: &str) -> String {
    let mut p = pattern;
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p.to_string()
}

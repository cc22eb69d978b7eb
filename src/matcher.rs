//! Glob predicates over target file paths.
//!
//! A [`FileMatcher`] is the compiled form of one `files` / `excludedFiles`
//! pair. Patterns are matched against the path of the target file relative to
//! the matcher's base path (the directory of the config file that declared
//! the patterns, or the working directory for in-memory configs). Dot-files
//! are matched, matching is case-sensitive, and a pattern without a `/`
//! matches against the base name at any depth.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde_json::{Value, json};

use crate::error::{ConfigError, ConfigResult};

pub(crate) fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

#[derive(Debug, Clone)]
struct GlobPattern {
    raw: String,
    pattern: Pattern,
    /// Patterns without a separator match the file's base name at any depth.
    match_basename: bool,
}

impl GlobPattern {
    fn compile(raw: &str, origin: &str) -> ConfigResult<Self> {
        let pattern = Pattern::new(raw).map_err(|e| ConfigError::InvalidConfig {
            origin: origin.to_string(),
            detail: format!("invalid glob pattern \"{raw}\": {e}"),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            pattern,
            match_basename: !raw.contains('/'),
        })
    }

    fn matches(&self, rel: &str) -> bool {
        if self.match_basename {
            let name = rel.rsplit('/').next().unwrap_or(rel);
            self.pattern.matches_with(name, match_options())
        } else {
            self.pattern.matches_with(rel, match_options())
        }
    }
}

#[derive(Debug, Clone)]
enum MatcherKind {
    Globs {
        base_path: PathBuf,
        includes: Vec<GlobPattern>,
        excludes: Vec<GlobPattern>,
    },
    And(Box<FileMatcher>, Box<FileMatcher>),
}

/// A compiled file-path predicate with a stable JSON descriptor of its
/// origin, usable for debug output and equality checks.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    kind: MatcherKind,
    descriptor: Value,
}

impl FileMatcher {
    /// Compile an include/exclude pair. Returns `None` when both sides are
    /// empty, meaning the element applies unconditionally.
    pub fn compile(
        files: &[String],
        excluded_files: &[String],
        base_path: &Path,
        origin: &str,
    ) -> ConfigResult<Option<FileMatcher>> {
        if files.is_empty() && excluded_files.is_empty() {
            return Ok(None);
        }

        let includes = files
            .iter()
            .map(|p| GlobPattern::compile(p, origin))
            .collect::<ConfigResult<Vec<_>>>()?;
        let excludes = excluded_files
            .iter()
            .map(|p| GlobPattern::compile(p, origin))
            .collect::<ConfigResult<Vec<_>>>()?;

        let descriptor = json!({
            "includes": files,
            "excludes": excluded_files,
            "basePath": base_path.to_string_lossy(),
        });

        Ok(Some(FileMatcher {
            kind: MatcherKind::Globs {
                base_path: base_path.to_path_buf(),
                includes,
                excludes,
            },
            descriptor,
        }))
    }

    /// The logical AND of two predicates.
    pub fn and(left: FileMatcher, right: FileMatcher) -> FileMatcher {
        let descriptor = json!({ "and": [left.descriptor, right.descriptor] });
        FileMatcher {
            kind: MatcherKind::And(Box::new(left), Box::new(right)),
            descriptor,
        }
    }

    /// Conjoin an optional parent predicate onto an optional child predicate.
    pub fn conjoin(
        parent: Option<&FileMatcher>,
        child: Option<FileMatcher>,
    ) -> Option<FileMatcher> {
        match (parent, child) {
            (None, child) => child,
            (Some(parent), None) => Some(parent.clone()),
            (Some(parent), Some(child)) => Some(FileMatcher::and(parent.clone(), child)),
        }
    }

    /// Test an absolute target path. Paths outside the matcher's base never
    /// match.
    pub fn matches(&self, path: &Path) -> bool {
        match &self.kind {
            MatcherKind::Globs {
                base_path,
                includes,
                excludes,
            } => {
                let Some(rel) = relative_to(base_path, path) else {
                    return false;
                };
                let included = includes.is_empty() || includes.iter().any(|p| p.matches(&rel));
                let excluded = excludes.iter().any(|p| p.matches(&rel));
                included && !excluded
            }
            MatcherKind::And(left, right) => left.matches(path) && right.matches(path),
        }
    }

    /// Stable JSON description of this predicate's origin.
    pub fn descriptor(&self) -> &Value {
        &self.descriptor
    }
}

/// Two matchers are equal when they were compiled from the same patterns
/// against the same base path.
impl PartialEq for FileMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
    }
}

fn relative_to(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let rel = rel.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        Some(rel.into_owned())
    } else {
        Some(rel.replace(std::path::MAIN_SEPARATOR, "/"))
    }
}

//! The ignore predicate consumed by the enumerator.
//!
//! Ignore-file parsing is a collaborator, not part of this crate; the
//! enumerator only needs a yes/no answer per path. [`PatternIgnore`] is the
//! default implementation: conventional defaults (`node_modules`, dot
//! entries) plus caller-supplied patterns, split into literal path prefixes
//! and glob patterns.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::{ConfigError, ConfigResult};
use crate::matcher::match_options;

/// Answers "is this path ignored?" for the enumerator. Ignored directories
/// are pruned from the walk; ignored files surface with a status flag.
pub trait IgnorePredicate {
    fn contains(&self, path: &Path) -> bool;
}

/// Never ignores anything.
#[derive(Debug, Default)]
pub struct NoIgnore;

impl IgnorePredicate for NoIgnore {
    fn contains(&self, _path: &Path) -> bool {
        false
    }
}

fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

#[derive(Debug)]
pub struct PatternIgnore {
    cwd: PathBuf,
    literal_prefixes: Vec<PathBuf>,
    patterns: Vec<(String, Pattern)>,
}

impl PatternIgnore {
    pub fn new(cwd: impl Into<PathBuf>, extra_patterns: &[String]) -> ConfigResult<Self> {
        let cwd = cwd.into();
        let mut literal_prefixes = Vec::new();
        let mut patterns = Vec::new();

        for raw in extra_patterns {
            if is_glob_pattern(raw) {
                let pattern = Pattern::new(raw).map_err(|e| ConfigError::InvalidConfig {
                    origin: "ignore patterns".to_string(),
                    detail: format!("invalid glob pattern \"{raw}\": {e}"),
                })?;
                patterns.push((raw.clone(), pattern));
            } else {
                literal_prefixes.push(cwd.join(raw));
            }
        }

        Ok(Self {
            cwd,
            literal_prefixes,
            patterns,
        })
    }
}

impl IgnorePredicate for PatternIgnore {
    fn contains(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.cwd) else {
            return false;
        };

        // Conventional defaults: dependency trees and dot entries.
        for component in rel.components() {
            let name = component.as_os_str().to_string_lossy();
            if name == "node_modules" || name.starts_with('.') {
                return true;
            }
        }

        if self.literal_prefixes.iter().any(|p| path.starts_with(p)) {
            return true;
        }

        let rel = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");
        self.patterns.iter().any(|(raw, pattern)| {
            if raw.contains('/') {
                pattern.matches_with(&rel, match_options())
            } else {
                let name = rel.rsplit('/').next().unwrap_or(&rel);
                pattern.matches_with(name, match_options())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignore(patterns: &[&str]) -> PatternIgnore {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        PatternIgnore::new("/w", &patterns).unwrap()
    }

    #[test]
    fn test_node_modules_is_ignored_by_default() {
        let ignore = ignore(&[]);
        assert!(ignore.contains(Path::new("/w/node_modules")));
        assert!(ignore.contains(Path::new("/w/a/node_modules/lib/x.js")));
        assert!(!ignore.contains(Path::new("/w/src/x.js")));
    }

    #[test]
    fn test_dot_entries_are_ignored_by_default() {
        let ignore = ignore(&[]);
        assert!(ignore.contains(Path::new("/w/.git")));
        assert!(ignore.contains(Path::new("/w/.cache/x.js")));
    }

    #[test]
    fn test_literal_path_prefix() {
        let ignore = ignore(&["src/generated"]);
        assert!(ignore.contains(Path::new("/w/src/generated")));
        assert!(ignore.contains(Path::new("/w/src/generated/types.js")));
        assert!(!ignore.contains(Path::new("/w/src/other/types.js")));
    }

    #[test]
    fn test_basename_glob() {
        let ignore = ignore(&["*.gen.js"]);
        assert!(ignore.contains(Path::new("/w/deep/api.gen.js")));
        assert!(!ignore.contains(Path::new("/w/deep/api.js")));
    }

    #[test]
    fn test_anchored_glob() {
        let ignore = ignore(&["dist/**"]);
        assert!(ignore.contains(Path::new("/w/dist/x.js")));
        assert!(!ignore.contains(Path::new("/w/src/dist-not/x.js")));
    }

    #[test]
    fn test_outside_cwd_is_not_ignored() {
        let ignore = ignore(&[]);
        assert!(!ignore.contains(Path::new("/elsewhere/node_modules/x.js")));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = PatternIgnore::new("/w", &["[bad".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { .. }));
    }
}

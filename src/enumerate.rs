//! Expansion of input patterns into `(file, config, flag)` results.
//!
//! Each input pattern is a literal file, a literal directory, or a glob.
//! Directories and glob parents are walked recursively; every visited
//! directory's own config is loaded (through the cascade, so it is
//! normalized once) and steers which of its files are picked up: files match
//! by extension, or because some config element's `files` opts their name
//! in. The final per-file array composes, in order, the base config, the
//! cascaded per-directory chain, the `--config` file, and CLI options;
//! composition is memoized by the identity of the per-directory array.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::Pattern;
use serde_json::Value;

use crate::array::ConfigArray;
use crate::cascade::CascadingConfigFactory;
use crate::error::{ConfigError, ConfigResult};
use crate::factory::LoadOptions;
use crate::ignore::IgnorePredicate;
use crate::matcher::match_options;

/// Status of one enumerated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFlag {
    None,
    /// Matched during a walk but flagged by the ignore predicate.
    Ignored,
    /// Named directly on the command line while being ignored.
    Warning,
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub config: Arc<ConfigArray>,
    pub flag: FileFlag,
}

/// Construction options for [`FileEnumerator`].
pub struct EnumeratorOptions {
    /// Extensions picked up during directory walks, with their leading dot.
    pub extensions: Vec<String>,
    /// Config data placed below everything else.
    pub base_config: Option<Value>,
    /// Config data placed above everything else (CLI inline options).
    pub cli_config: Option<Value>,
    /// A config file placed between the cascade and the CLI options.
    pub config_file: Option<PathBuf>,
    /// When false, per-directory config files are not consulted at all.
    pub use_rc: bool,
}

impl Default for EnumeratorOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string()],
            base_config: None,
            cli_config: None,
            config_file: None,
            use_rc: true,
        }
    }
}

pub struct FileEnumerator {
    cascade: CascadingConfigFactory,
    cwd: PathBuf,
    extensions: Vec<String>,
    ignore: Box<dyn IgnorePredicate>,
    use_rc: bool,
    base_array: Arc<ConfigArray>,
    config_file_array: Option<Arc<ConfigArray>>,
    cli_array: Option<Arc<ConfigArray>>,
    empty: Arc<ConfigArray>,
    finalize_cache: RefCell<HashMap<usize, Arc<ConfigArray>>>,
}

impl FileEnumerator {
    pub fn new(
        cascade: CascadingConfigFactory,
        ignore: Box<dyn IgnorePredicate>,
        options: EnumeratorOptions,
    ) -> ConfigResult<Self> {
        let cwd = cascade.factory().cwd().to_path_buf();

        let base_array = match &options.base_config {
            Some(data) => Arc::new(cascade.factory().create(
                data,
                LoadOptions {
                    name: Some("BaseConfig"),
                    ..Default::default()
                },
            )?),
            None => Arc::new(ConfigArray::default()),
        };
        let config_file_array = match &options.config_file {
            Some(path) => Some(Arc::new(cascade.factory().load_file(
                path,
                LoadOptions {
                    name: Some("--config"),
                    ..Default::default()
                },
            )?)),
            None => None,
        };
        let cli_array = match &options.cli_config {
            Some(data) => Some(Arc::new(cascade.factory().create(
                data,
                LoadOptions {
                    name: Some("CLIOptions"),
                    ..Default::default()
                },
            )?)),
            None => None,
        };

        let extensions = options
            .extensions
            .iter()
            .map(|ext| {
                if ext.starts_with('.') {
                    ext.clone()
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        Ok(Self {
            cascade,
            cwd,
            extensions,
            ignore,
            use_rc: options.use_rc,
            base_array,
            config_file_array,
            cli_array,
            empty: Arc::new(ConfigArray::default()),
            finalize_cache: RefCell::new(HashMap::new()),
        })
    }

    /// Expand the patterns in order into a deduplicated, deterministic list
    /// of `(path, finalized config, flag)` results.
    pub fn iterate(&self, patterns: &[String]) -> ConfigResult<Vec<FileEntry>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for pattern in patterns {
            self.iterate_pattern(pattern, &mut seen, &mut out)?;
        }
        Ok(out)
    }

    /// The finalized config array in effect for one file.
    pub fn config_for_file(&self, path: &Path) -> ConfigResult<Arc<ConfigArray>> {
        let path = self.absolutize(path);
        let config = if self.use_rc {
            let dir = path.parent().unwrap_or(&self.cwd);
            self.cascade.config_for_directory(dir)?
        } else {
            self.empty.clone()
        };
        self.finalize(&config)
    }

    fn iterate_pattern(
        &self,
        pattern: &str,
        seen: &mut HashSet<PathBuf>,
        out: &mut Vec<FileEntry>,
    ) -> ConfigResult<()> {
        let literal = self.absolutize(Path::new(pattern));

        if literal.is_file() {
            // Directly-named files bypass the match conditions; an ignored
            // one surfaces with a warning instead of silence.
            if seen.insert(literal.clone()) {
                let config = self.config_for_file(&literal)?;
                let flag = if self.ignore.contains(&literal) {
                    FileFlag::Warning
                } else {
                    FileFlag::None
                };
                out.push(FileEntry {
                    path: literal,
                    config,
                    flag,
                });
            }
            return Ok(());
        }

        if literal.is_dir() {
            return self.iterate_recursive(&literal, None, true, seen, out);
        }

        let Some(glob_walk) = self.compile_glob(pattern)? else {
            return Ok(());
        };
        self.iterate_recursive(
            &glob_walk.dir,
            Some(&glob_walk.selector),
            glob_walk.recursive,
            seen,
            out,
        )
    }

    fn iterate_recursive(
        &self,
        dir: &Path,
        selector: Option<&Pattern>,
        recursive: bool,
        seen: &mut HashSet<PathBuf>,
        out: &mut Vec<FileEntry>,
    ) -> ConfigResult<()> {
        let config = if self.use_rc {
            self.cascade.config_for_directory(dir)?
        } else {
            self.empty.clone()
        };

        let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::CannotReadConfig {
            path: dir.to_path_buf(),
            cause: format!("failed to list directory: {e}"),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::CannotReadConfig {
                path: dir.to_path_buf(),
                cause: format!("failed to list directory: {e}"),
            })?;
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            // Symlinked entries fall back to a full stat.
            let (is_dir, is_file) = if file_type.is_symlink() {
                match std::fs::metadata(&path) {
                    Ok(metadata) => (metadata.is_dir(), metadata.is_file()),
                    Err(_) => continue,
                }
            } else {
                (file_type.is_dir(), file_type.is_file())
            };
            let ignored = self.ignore.contains(&path);

            if is_dir {
                if recursive && !ignored {
                    self.iterate_recursive(&path, selector, recursive, seen, out)?;
                }
                continue;
            }
            if !is_file {
                continue;
            }

            let matched = match selector {
                Some(selector) => self
                    .relative_to_cwd(&path)
                    .is_some_and(|rel| selector.matches_with(&rel, match_options())),
                None => self.has_known_extension(&path) || config.matches_file(&path),
            };
            if matched && seen.insert(path.clone()) {
                let flag = if ignored {
                    FileFlag::Ignored
                } else {
                    FileFlag::None
                };
                out.push(FileEntry {
                    path,
                    config: self.finalize(&config)?,
                    flag,
                });
            }
        }
        Ok(())
    }

    /// Compose base, cascaded chain, `--config` and CLI options into the
    /// array handed to callers, memoized by the cascade array's identity.
    fn finalize(&self, config: &Arc<ConfigArray>) -> ConfigResult<Arc<ConfigArray>> {
        let key = Arc::as_ptr(config) as usize;
        if let Some(hit) = self.finalize_cache.borrow().get(&key) {
            return Ok(hit.clone());
        }

        let mut elements = self.base_array.elements().to_vec();
        elements.extend(config.elements().iter().cloned());
        if let Some(config_file) = &self.config_file_array {
            elements.extend(config_file.elements().iter().cloned());
        }
        if let Some(cli) = &self.cli_array {
            elements.extend(cli.elements().iter().cloned());
        }

        let finalized = Arc::new(ConfigArray::new(elements));
        self.finalize_cache.borrow_mut().insert(key, finalized.clone());
        Ok(finalized)
    }

    fn compile_glob(&self, pattern: &str) -> ConfigResult<Option<GlobWalk>> {
        let normalized = pattern.strip_prefix("./").unwrap_or(pattern);
        let normalized = if Path::new(normalized).is_absolute() {
            match Path::new(normalized).strip_prefix(&self.cwd) {
                Ok(rel) => rel.to_string_lossy().into_owned(),
                // An absolute pattern outside the working directory matches
                // nothing.
                Err(_) => return Ok(None),
            }
        } else {
            normalized.to_string()
        };

        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
        let magic_index = segments
            .iter()
            .position(|s| is_magic_segment(s))
            .unwrap_or_else(|| segments.len().saturating_sub(1));

        let mut dir = self.cwd.clone();
        for segment in &segments[..magic_index] {
            dir.push(segment);
        }
        let remainder = segments[magic_index..].join("/");
        // Recursion needs both a literal walk root (a glob parent other
        // than the working directory itself) and a remainder that can span
        // more than one segment.
        let recursive =
            magic_index > 0 && (remainder.contains('/') || remainder.contains("**"));

        if !dir.is_dir() {
            return Ok(None);
        }

        let selector = Pattern::new(&normalized).map_err(|e| ConfigError::InvalidConfig {
            origin: pattern.to_string(),
            detail: format!("invalid glob pattern: {e}"),
        })?;

        Ok(Some(GlobWalk {
            dir,
            selector,
            recursive,
        }))
    }

    fn has_known_extension(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
    }

    fn relative_to_cwd(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.cwd).ok()?;
        let rel = rel.to_string_lossy();
        if std::path::MAIN_SEPARATOR == '/' {
            Some(rel.into_owned())
        } else {
            Some(rel.replace(std::path::MAIN_SEPARATOR, "/"))
        }
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        };
        // Lexical normalization keeps directory cache keys canonical.
        std::path::absolute(&joined).unwrap_or(joined)
    }
}

struct GlobWalk {
    dir: PathBuf,
    selector: Pattern,
    recursive: bool,
}

fn is_magic_segment(segment: &str) -> bool {
    segment.contains('*') || segment.contains('?') || segment.contains('[')
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::factory::ConfigArrayFactory;
    use crate::ignore::{NoIgnore, PatternIgnore};

    fn enumerator(cwd: &Path, options: EnumeratorOptions) -> FileEnumerator {
        let cascade = CascadingConfigFactory::new(ConfigArrayFactory::new(cwd));
        FileEnumerator::new(cascade, Box::new(NoIgnore), options).unwrap()
    }

    fn names(entries: &[FileEntry], cwd: &Path) -> Vec<String> {
        let mut names: Vec<String> = entries
            .iter()
            .map(|e| {
                e.path
                    .strip_prefix(cwd)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_directory_walk_picks_known_extensions() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("b.ts"), "").unwrap();
        fs::write(dir.path().join("src/c.js"), "").unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());
        let entries = e.iterate(&[".".to_string()]).unwrap();

        assert_eq!(names(&entries, dir.path()), vec!["a.js", "src/c.js"]);
    }

    #[test]
    fn test_extra_extensions() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("b.ts"), "").unwrap();

        let e = enumerator(
            dir.path(),
            EnumeratorOptions {
                extensions: vec![".js".to_string(), "ts".to_string()],
                ..Default::default()
            },
        );
        let entries = e.iterate(&[".".to_string()]).unwrap();
        assert_eq!(names(&entries, dir.path()), vec!["a.js", "b.ts"]);
    }

    #[test]
    fn test_config_files_opt_in_extra_files() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(".eslintrc.json"),
            r#"{ "overrides": [{ "files": ["*.md"], "rules": { "r": "error" } }] }"#,
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());
        let entries = e.iterate(&[".".to_string()]).unwrap();

        assert_eq!(names(&entries, dir.path()), vec!["README.md"]);
    }

    #[test]
    fn test_bare_glob_is_not_recursive() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("sub/b.js"), "").unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());
        let entries = e.iterate(&["*.js".to_string()]).unwrap();

        assert_eq!(names(&entries, dir.path()), vec!["a.js"]);
    }

    #[test]
    fn test_recursion_requires_a_literal_glob_parent() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        fs::write(dir.path().join("x.js"), "").unwrap();
        fs::write(dir.path().join("src/a.js"), "").unwrap();
        fs::write(dir.path().join("src/deep/b.js"), "").unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());

        // Glob parent `.`: the walk stays in the working directory even
        // though the remainder contains `**`.
        let entries = e.iterate(&["**/*.js".to_string()]).unwrap();
        assert_eq!(names(&entries, dir.path()), vec!["x.js"]);

        // The same remainder below a literal parent descends.
        let entries = e.iterate(&["src/**/*.js".to_string()]).unwrap();
        assert_eq!(names(&entries, dir.path()), vec!["src/a.js", "src/deep/b.js"]);
    }

    #[test]
    fn test_glob_walk_starts_at_the_glob_parent() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "").unwrap();
        fs::write(dir.path().join("src/deep/b.ts"), "").unwrap();
        fs::write(dir.path().join("lib/c.ts"), "").unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());
        let entries = e.iterate(&["src/**/*.ts".to_string()]).unwrap();

        assert_eq!(names(&entries, dir.path()), vec!["src/a.ts", "src/deep/b.ts"]);
    }

    #[test]
    fn test_nonexistent_glob_parent_yields_nothing() {
        let dir = tempdir().unwrap();
        let e = enumerator(dir.path(), EnumeratorOptions::default());
        assert!(e.iterate(&["missing/**/*.js".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_direct_file_bypasses_extension_filter() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("script.mjs"), "").unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());
        let entries = e.iterate(&["script.mjs".to_string()]).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].flag, FileFlag::None);
    }

    #[test]
    fn test_direct_ignored_file_is_a_warning() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.gen.js"), "").unwrap();

        let cascade = CascadingConfigFactory::new(ConfigArrayFactory::new(dir.path()));
        let ignore = PatternIgnore::new(dir.path(), &["*.gen.js".to_string()]).unwrap();
        let e = FileEnumerator::new(cascade, Box::new(ignore), EnumeratorOptions::default())
            .unwrap();

        let entries = e.iterate(&["a.gen.js".to_string()]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].flag, FileFlag::Warning);
    }

    #[test]
    fn test_walked_ignored_file_is_flagged_and_ignored_dir_is_pruned() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("a.gen.js"), "").unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();
        fs::write(dir.path().join("dist/c.js"), "").unwrap();

        let cascade = CascadingConfigFactory::new(ConfigArrayFactory::new(dir.path()));
        let ignore =
            PatternIgnore::new(dir.path(), &["*.gen.js".to_string(), "dist".to_string()])
                .unwrap();
        let e = FileEnumerator::new(cascade, Box::new(ignore), EnumeratorOptions::default())
            .unwrap();

        let entries = e.iterate(&[".".to_string()]).unwrap();
        assert_eq!(names(&entries, dir.path()), vec!["a.gen.js", "b.js"]);
        let flagged = entries
            .iter()
            .find(|e| e.path.ends_with("a.gen.js"))
            .unwrap();
        assert_eq!(flagged.flag, FileFlag::Ignored);
    }

    #[test]
    fn test_dedup_across_patterns() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());
        let entries = e
            .iterate(&["a.js".to_string(), ".".to_string(), "*.js".to_string()])
            .unwrap();

        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_per_directory_config_reaches_results() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("strict")).unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("strict/b.js"), "").unwrap();
        fs::write(
            dir.path().join("strict/.eslintrc.json"),
            r#"{ "rules": { "no-var": "error" } }"#,
        )
        .unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());
        let entries = e.iterate(&[".".to_string()]).unwrap();

        let strict = entries.iter().find(|e| e.path.ends_with("b.js")).unwrap();
        let config = strict.config.extract_config(&strict.path).unwrap();
        assert!(config.rules.contains_key("no-var"));

        let loose = entries.iter().find(|e| e.path.ends_with("a.js")).unwrap();
        let config = loose.config.extract_config(&loose.path).unwrap();
        assert!(!config.rules.contains_key("no-var"));
    }

    #[test]
    fn test_finalized_arrays_are_shared_per_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();

        let e = enumerator(dir.path(), EnumeratorOptions::default());
        let entries = e.iterate(&[".".to_string()]).unwrap();

        assert_eq!(entries.len(), 2);
        assert!(Arc::ptr_eq(&entries[0].config, &entries[1].config));
    }

    #[test]
    fn test_cli_options_take_precedence_over_directory_config() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(
            dir.path().join(".eslintrc.json"),
            r#"{ "rules": { "semi": ["error", "never"] } }"#,
        )
        .unwrap();

        let e = enumerator(
            dir.path(),
            EnumeratorOptions {
                cli_config: Some(json!({ "rules": { "semi": ["error", "always"] } })),
                ..Default::default()
            },
        );
        let entries = e.iterate(&["a.js".to_string()]).unwrap();
        let config = entries[0].config.extract_config(&entries[0].path).unwrap();

        assert_eq!(config.rules["semi"], json!(["error", "always"]));
    }

    #[test]
    fn test_use_rc_false_skips_directory_configs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(
            dir.path().join(".eslintrc.json"),
            r#"{ "rules": { "semi": "error" } }"#,
        )
        .unwrap();

        let e = enumerator(
            dir.path(),
            EnumeratorOptions {
                use_rc: false,
                base_config: Some(json!({ "rules": { "base": "warn" } })),
                ..Default::default()
            },
        );
        let entries = e.iterate(&["a.js".to_string()]).unwrap();
        let config = entries[0].config.extract_config(&entries[0].path).unwrap();

        assert!(!config.rules.contains_key("semi"));
        assert!(config.rules.contains_key("base"));
    }

    #[test]
    fn test_config_file_layer_sits_between_cascade_and_cli() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::write(
            dir.path().join("shared.json"),
            r#"{ "rules": { "r": ["error", "from-config-file"] } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(".eslintrc.json"),
            r#"{ "rules": { "r": ["error", "from-rc"] } }"#,
        )
        .unwrap();

        let e = enumerator(
            dir.path(),
            EnumeratorOptions {
                config_file: Some(dir.path().join("shared.json")),
                ..Default::default()
            },
        );
        let entries = e.iterate(&["a.js".to_string()]).unwrap();
        let config = entries[0].config.extract_config(&entries[0].path).unwrap();

        assert_eq!(config.rules["r"], json!(["error", "from-config-file"]));
    }
}

//! Reading raw config data from disk.
//!
//! The loader picks a parse strategy from the file name: JSON (with comment
//! stripping), YAML, `package.json` (the `eslintConfig` member), the
//! extension-less `.eslintrc` (YAML, the legacy contract), or a
//! script-evaluated config handled by a caller-supplied evaluator. A missing
//! file is not an error here; it is the recoverable "no config at this path"
//! outcome the cascade relies on to probe candidate names.

use std::io;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

/// Evaluates a script config file (`.eslintrc.js` and friends) into raw
/// config data. Script evaluation is outside this crate; embedders register
/// an implementation when their configs need it.
pub trait ScriptConfigEvaluator {
    fn evaluate(&self, path: &Path) -> ConfigResult<Value>;
}

#[derive(Default)]
pub struct ConfigLoader {
    script_evaluator: Option<Box<dyn ScriptConfigEvaluator>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script_evaluator(evaluator: Box<dyn ScriptConfigEvaluator>) -> Self {
        Self {
            script_evaluator: Some(evaluator),
        }
    }

    /// Load raw config data from `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist, when a
    /// `package.json` has no `eslintConfig` member, or when the parsed
    /// document is null. Parse failures and unreadable files are hard errors.
    pub fn load(&self, path: &Path) -> ConfigResult<Option<Value>> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if file_name == "package.json" {
            let Some(source) = self.read(path)? else {
                return Ok(None);
            };
            let value = parse_json(&source, path)?;
            return Ok(match value.get("eslintConfig") {
                Some(Value::Null) | None => None,
                Some(config) => Some(config.clone()),
            });
        }

        if file_name == ".eslintrc" || file_name.ends_with(".yaml") || file_name.ends_with(".yml") {
            let Some(source) = self.read(path)? else {
                return Ok(None);
            };
            return parse_yaml(&source, path).map(non_null);
        }

        if file_name.ends_with(".json") {
            let Some(source) = self.read(path)? else {
                return Ok(None);
            };
            return parse_json(&source, path).map(non_null);
        }

        // Script semantics for `.js` and anything else.
        match std::fs::metadata(path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(ConfigError::PermissionDenied {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(ConfigError::CannotReadConfig {
                    path: path.to_path_buf(),
                    cause: e.to_string(),
                });
            }
        }
        match &self.script_evaluator {
            Some(evaluator) => evaluator.evaluate(path).map(non_null),
            None => Err(ConfigError::CannotReadConfig {
                path: path.to_path_buf(),
                cause: "script config files require a registered script evaluator".to_string(),
            }),
        }
    }

    fn read(&self, path: &Path) -> ConfigResult<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(source) => Ok(Some(source)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(ConfigError::PermissionDenied {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => Err(ConfigError::CannotReadConfig {
                path: path.to_path_buf(),
                cause: e.to_string(),
            }),
        }
    }
}

fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

fn parse_json(source: &str, path: &Path) -> ConfigResult<Value> {
    serde_json::from_str(&strip_json_comments(source)).map_err(|e| ConfigError::CannotReadConfig {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })
}

fn parse_yaml(source: &str, path: &Path) -> ConfigResult<Value> {
    // A null or empty document is an empty config.
    if source.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value =
        serde_yaml::from_str(source).map_err(|e| ConfigError::CannotReadConfig {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
    Ok(match value {
        Value::Null => Value::Object(Map::new()),
        other => other,
    })
}

/// Blank out `//` and `/* */` comments, preserving offsets so parse errors
/// still point at the right position.
fn strip_json_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    out.push(' ');
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                        out.push(' ');
                    }
                }
                Some('*') => {
                    out.push_str("  ");
                    chars.next();
                    let mut prev = '\0';
                    while let Some(next) = chars.next() {
                        out.push(if next == '\n' { '\n' } else { ' ' });
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

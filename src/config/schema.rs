//! Schema validation for raw config data.
//!
//! Runs before deserialization so that violations are reported with the
//! originating file path and a precise detail message. Validation is
//! two-mode: the top level additionally allows `root` and the deprecated
//! `ecmaFeatures`, while `overrides` entries require `files` and forbid
//! `root`. The top level may also be an array of config fragments (objects
//! or extend-style strings) that are normalized in order.

use std::sync::OnceLock;

use colored::Colorize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

/// Which key set applies while validating one config object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    /// A config file body or in-memory config data.
    TopLevel,
    /// An entry of an `overrides` array.
    Override,
    /// An entry of the array input form; a union of the other two.
    Fragment,
}

/// Validate a top-level config value: an object, or an array of fragments.
pub fn validate_top_level(value: &Value, origin: &str) -> ConfigResult<()> {
    match value {
        Value::Object(map) => validate_object(map, origin, ConfigKind::TopLevel),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::String(_) => {}
                    Value::Object(map) => {
                        let item_origin = format!("{origin}[{index}]");
                        validate_object(map, &item_origin, ConfigKind::Fragment)?;
                    }
                    other => {
                        return Err(invalid(
                            origin,
                            format!(
                                "array entry {index} must be an object or a string, got {}",
                                type_name(other)
                            ),
                        ));
                    }
                }
            }
            Ok(())
        }
        other => Err(invalid(
            origin,
            format!(
                "config must be an object or an array of config fragments, got {}",
                type_name(other)
            ),
        )),
    }
}

/// Validate one config object against the key set for `kind`.
pub fn validate_object(map: &Map<String, Value>, origin: &str, kind: ConfigKind) -> ConfigResult<()> {
    for (key, value) in map {
        match key.as_str() {
            "env" | "parserOptions" | "settings" => {
                require_object(origin, key, value)?;
            }
            "globals" => {
                let globals = require_object(origin, key, value)?;
                for (name, visibility) in globals {
                    if !matches!(visibility, Value::String(_) | Value::Bool(_)) {
                        return Err(invalid(
                            origin,
                            format!("global \"{name}\" must be a string or a boolean"),
                        ));
                    }
                }
            }
            "rules" => {
                require_object(origin, key, value)?;
            }
            "extends" => validate_string_or_list(origin, key, value, false)?,
            "parser" => {
                if !matches!(value, Value::String(_) | Value::Null) {
                    return Err(invalid(origin, format!("\"{key}\" must be a string or null")));
                }
            }
            "processor" => {
                if !value.is_string() {
                    return Err(invalid(origin, format!("\"{key}\" must be a string")));
                }
            }
            "plugins" => validate_plugins(origin, value)?,
            "overrides" => {
                let Value::Array(entries) = value else {
                    return Err(invalid(origin, "\"overrides\" must be an array".to_string()));
                };
                for (index, entry) in entries.iter().enumerate() {
                    let Value::Object(entry_map) = entry else {
                        return Err(invalid(
                            origin,
                            format!("\"overrides[{index}]\" must be an object"),
                        ));
                    };
                    let entry_origin = format!("{origin}#overrides[{index}]");
                    validate_object(entry_map, &entry_origin, ConfigKind::Override)?;
                }
            }
            "root" => {
                if kind == ConfigKind::Override {
                    return Err(invalid(origin, "\"root\" is not allowed in overrides".to_string()));
                }
                if !value.is_boolean() {
                    return Err(invalid(origin, "\"root\" must be a boolean".to_string()));
                }
            }
            "ecmaFeatures" => {
                if kind == ConfigKind::Override {
                    return Err(invalid(
                        origin,
                        "\"ecmaFeatures\" is not allowed in overrides".to_string(),
                    ));
                }
                require_object(origin, key, value)?;
                warn_ecma_features_deprecated(origin);
            }
            "files" => {
                if kind == ConfigKind::TopLevel {
                    return Err(invalid(
                        origin,
                        "\"files\" is only allowed in overrides".to_string(),
                    ));
                }
                validate_string_or_list(origin, key, value, true)?;
            }
            "excludedFiles" => {
                if kind == ConfigKind::TopLevel {
                    return Err(invalid(
                        origin,
                        "\"excludedFiles\" is only allowed in overrides".to_string(),
                    ));
                }
                validate_string_or_list(origin, key, value, false)?;
            }
            unknown => {
                return Err(invalid(origin, format!("unknown key \"{unknown}\"")));
            }
        }
    }

    if kind == ConfigKind::Override && !map.contains_key("files") {
        return Err(invalid(origin, "overrides entry is missing \"files\"".to_string()));
    }

    Ok(())
}

fn validate_plugins(origin: &str, value: &Value) -> ConfigResult<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                if !item.is_string() {
                    return Err(invalid(
                        origin,
                        "\"plugins\" entries must be strings".to_string(),
                    ));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for (prefix, specifier) in map {
                if !specifier.is_string() {
                    return Err(invalid(
                        origin,
                        format!("plugin \"{prefix}\" must map to a string specifier"),
                    ));
                }
            }
            Ok(())
        }
        _ => Err(invalid(
            origin,
            "\"plugins\" must be an array of strings or a map of id to specifier".to_string(),
        )),
    }
}

fn validate_string_or_list(
    origin: &str,
    key: &str,
    value: &Value,
    require_non_empty: bool,
) -> ConfigResult<()> {
    match value {
        Value::String(_) => Ok(()),
        Value::Array(items) => {
            if require_non_empty && items.is_empty() {
                return Err(invalid(origin, format!("\"{key}\" must not be empty")));
            }
            for item in items {
                if !item.is_string() {
                    return Err(invalid(origin, format!("\"{key}\" entries must be strings")));
                }
            }
            Ok(())
        }
        _ => Err(invalid(
            origin,
            format!("\"{key}\" must be a string or an array of strings"),
        )),
    }
}

fn require_object<'a>(
    origin: &str,
    key: &str,
    value: &'a Value,
) -> ConfigResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| invalid(origin, format!("\"{key}\" must be an object")))
}

fn invalid(origin: &str, detail: String) -> ConfigError {
    ConfigError::InvalidConfig {
        origin: origin.to_string(),
        detail,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

static ECMA_FEATURES_WARNED: OnceLock<()> = OnceLock::new();

fn warn_ecma_features_deprecated(origin: &str) {
    ECMA_FEATURES_WARNED.get_or_init(|| {
        eprintln!(
            "{} \"ecmaFeatures\" is deprecated; use \"parserOptions.ecmaFeatures\" instead (found in {})",
            "warning:".bold().yellow(),
            origin
        );
    });
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn top_level(value: Value) -> ConfigResult<()> {
        validate_top_level(&value, "test.json")
    }

    #[test]
    fn test_minimal_object_is_valid() {
        top_level(json!({})).unwrap();
        top_level(json!({ "rules": { "semi": "error" } })).unwrap();
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = top_level(json!({ "rule": {} })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { ref detail, .. } if detail.contains("rule")));
    }

    #[test]
    fn test_root_must_be_boolean() {
        top_level(json!({ "root": true })).unwrap();
        assert!(top_level(json!({ "root": "yes" })).is_err());
    }

    #[test]
    fn test_override_requires_files() {
        let err = top_level(json!({ "overrides": [{ "rules": {} }] })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { ref detail, .. } if detail.contains("files")));
    }

    #[test]
    fn test_override_forbids_root() {
        let err =
            top_level(json!({ "overrides": [{ "files": "*.ts", "root": true }] })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { ref detail, .. } if detail.contains("root")));
    }

    #[test]
    fn test_override_files_must_not_be_empty() {
        let err = top_level(json!({ "overrides": [{ "files": [] }] })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig { ref detail, .. } if detail.contains("empty")));
    }

    #[test]
    fn test_files_at_top_level_is_rejected() {
        assert!(top_level(json!({ "files": "*.ts" })).is_err());
    }

    #[test]
    fn test_plugins_forms() {
        top_level(json!({ "plugins": ["react"] })).unwrap();
        top_level(json!({ "plugins": { "react": "eslint-plugin-react" } })).unwrap();
        assert!(top_level(json!({ "plugins": [1] })).is_err());
        assert!(top_level(json!({ "plugins": "react" })).is_err());
    }

    #[test]
    fn test_parser_string_or_null() {
        top_level(json!({ "parser": "espree" })).unwrap();
        top_level(json!({ "parser": null })).unwrap();
        assert!(top_level(json!({ "parser": 3 })).is_err());
    }

    #[test]
    fn test_globals_values() {
        top_level(json!({ "globals": { "window": "readonly", "legacy": true } })).unwrap();
        assert!(top_level(json!({ "globals": { "window": 1 } })).is_err());
    }

    #[test]
    fn test_array_of_fragments() {
        top_level(json!([
            "eslint:recommended",
            { "rules": { "semi": "error" } },
            { "files": "*.ts", "rules": {} }
        ]))
        .unwrap();

        assert!(top_level(json!([42])).is_err());
    }

    #[test]
    fn test_scalar_top_level_is_rejected() {
        assert!(top_level(json!("eslint:recommended")).is_err());
    }

    #[test]
    fn test_nested_override_error_names_the_entry() {
        let err = top_level(json!({
            "overrides": [
                { "files": "*.ts" },
                { "files": "*.js", "bogus": 1 }
            ]
        }))
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidConfig { ref origin, .. } if origin.contains("overrides[1]"))
        );
    }
}

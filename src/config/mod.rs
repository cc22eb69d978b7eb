//! Input configuration data model.
//!
//! `ConfigData` is the tree-shaped form a config file deserializes into:
//! optional `extends` / `overrides` plus the per-file settings (`env`,
//! `globals`, `rules`, ...). The factory flattens this tree into ordered
//! [`ConfigElement`](crate::array::ConfigElement)s; nothing here touches the
//! filesystem.

pub mod schema;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Ordered list of file names probed in each directory during discovery.
/// The first one that exists and yields a non-null config wins.
pub const CONFIG_FILENAMES: &[&str] = &[
    ".eslintrc.js",
    ".eslintrc.yaml",
    ".eslintrc.yml",
    ".eslintrc.json",
    ".eslintrc",
    "package.json",
];

/// A field that accepts either one string or a list of strings
/// (`extends`, `files`, `excludedFiles`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s.clone()],
            StringOrList::Many(list) => list.clone(),
        }
    }
}

/// The `plugins` field: either a plain list of plugin names, or a mapping of
/// plugin id to package specifier for callers that want explicit ids.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PluginsField {
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

/// One config file's body, before flattening.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigData {
    pub root: Option<bool>,
    pub extends: Option<StringOrList>,
    pub overrides: Vec<OverrideData>,
    pub parser: Option<String>,
    pub parser_options: Option<Map<String, Value>>,
    pub plugins: Option<PluginsField>,
    pub env: Option<Map<String, Value>>,
    pub globals: Option<Map<String, Value>>,
    pub rules: Option<Map<String, Value>>,
    pub settings: Option<Map<String, Value>>,
    pub processor: Option<String>,
    /// Deprecated alias for `parserOptions.ecmaFeatures`; accepted with a
    /// one-time warning.
    pub ecma_features: Option<Map<String, Value>>,
}

/// A config fragment gated by file globs. Top-level `overrides` entries carry
/// a required `files`; fragments of the array input form use the same shape
/// with `files` optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverrideData {
    pub files: Option<StringOrList>,
    pub excluded_files: Option<StringOrList>,
    #[serde(flatten)]
    pub body: ConfigData,
}

impl ConfigData {
    /// The `extends` names in declaration order (a single string becomes one
    /// entry, absent becomes empty).
    pub fn extend_names(&self) -> Vec<String> {
        self.extends.as_ref().map(StringOrList::to_vec).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let data: ConfigData = serde_json::from_value(json!({
            "rules": { "no-undef": "error" }
        }))
        .unwrap();

        assert!(data.root.is_none());
        assert!(data.extends.is_none());
        assert_eq!(data.rules.unwrap().len(), 1);
    }

    #[test]
    fn test_extends_single_string() {
        let data: ConfigData = serde_json::from_value(json!({
            "extends": "eslint:recommended"
        }))
        .unwrap();

        assert_eq!(data.extend_names(), vec!["eslint:recommended"]);
    }

    #[test]
    fn test_extends_list() {
        let data: ConfigData = serde_json::from_value(json!({
            "extends": ["eslint:recommended", "plugin:react/recommended"]
        }))
        .unwrap();

        assert_eq!(
            data.extend_names(),
            vec!["eslint:recommended", "plugin:react/recommended"]
        );
    }

    #[test]
    fn test_plugins_list_and_map_forms() {
        let list: ConfigData =
            serde_json::from_value(json!({ "plugins": ["react", "import"] })).unwrap();
        assert!(matches!(list.plugins, Some(PluginsField::List(ref l)) if l.len() == 2));

        let map: ConfigData =
            serde_json::from_value(json!({ "plugins": { "react": "eslint-plugin-react" } }))
                .unwrap();
        assert!(matches!(map.plugins, Some(PluginsField::Map(ref m)) if m.len() == 1));
    }

    #[test]
    fn test_override_flattens_body() {
        let data: OverrideData = serde_json::from_value(json!({
            "files": ["*.ts"],
            "excludedFiles": "*.d.ts",
            "rules": { "no-var": "warn" }
        }))
        .unwrap();

        assert_eq!(data.files.unwrap().to_vec(), vec!["*.ts"]);
        assert_eq!(data.excluded_files.unwrap().to_vec(), vec!["*.d.ts"]);
        assert_eq!(data.body.rules.unwrap().len(), 1);
    }

    #[test]
    fn test_parser_null_is_accepted() {
        let data: ConfigData = serde_json::from_value(json!({ "parser": null })).unwrap();
        assert!(data.parser.is_none());
    }

    #[test]
    fn test_nested_overrides() {
        let data: ConfigData = serde_json::from_value(json!({
            "overrides": [{
                "files": "*.ts",
                "overrides": [{ "files": "*.spec.ts", "rules": { "no-empty": "off" } }]
            }]
        }))
        .unwrap();

        assert_eq!(data.overrides.len(), 1);
        assert_eq!(data.overrides[0].body.overrides.len(), 1);
    }
}

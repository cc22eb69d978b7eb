//! Built-in config table and in-memory plugin definitions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A processor entry exported by a plugin. The preprocess/postprocess hooks
/// live in the lint engine; this layer only carries the metadata needed to
/// resolve and report processors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessorDefinition {
    pub supports_autofix: bool,
}

/// An in-memory plugin: named shareable configs, processors keyed by id
/// (ids starting with `.` register the processor for that file extension),
/// and opaque rule metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PluginDefinition {
    pub configs: BTreeMap<String, Value>,
    pub processors: BTreeMap<String, ProcessorDefinition>,
    pub rules: BTreeMap<String, Value>,
}

/// Preloaded plugin definitions, consulted before any filesystem resolution.
/// Keys may be long package names (`eslint-plugin-react`) or shorthand ids
/// (`react`); the resolver queries both.
#[derive(Debug, Clone, Default)]
pub struct PluginPool {
    plugins: BTreeMap<String, Arc<PluginDefinition>>,
}

impl PluginPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, definition: PluginDefinition) {
        self.plugins.insert(name.into(), Arc::new(definition));
    }

    pub fn add_shared(&mut self, name: impl Into<String>, definition: Arc<PluginDefinition>) {
        self.plugins.insert(name.into(), definition);
    }

    pub fn get(&self, name: &str) -> Option<Arc<PluginDefinition>> {
        self.plugins.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Core rules, with the flag saying whether `eslint:recommended` enables
/// them. `eslint:all` enables every entry.
const CORE_RULES: &[(&str, bool)] = &[
    ("array-callback-return", false),
    ("constructor-super", true),
    ("curly", false),
    ("default-case", false),
    ("eqeqeq", false),
    ("for-direction", true),
    ("getter-return", true),
    ("no-async-promise-executor", true),
    ("no-case-declarations", true),
    ("no-class-assign", true),
    ("no-compare-neg-zero", true),
    ("no-cond-assign", true),
    ("no-console", false),
    ("no-const-assign", true),
    ("no-constant-condition", true),
    ("no-control-regex", true),
    ("no-debugger", true),
    ("no-delete-var", true),
    ("no-dupe-args", true),
    ("no-dupe-class-members", true),
    ("no-dupe-else-if", true),
    ("no-dupe-keys", true),
    ("no-duplicate-case", true),
    ("no-else-return", false),
    ("no-empty", true),
    ("no-empty-character-class", true),
    ("no-empty-pattern", true),
    ("no-eval", false),
    ("no-ex-assign", true),
    ("no-extra-boolean-cast", true),
    ("no-extra-semi", true),
    ("no-fallthrough", true),
    ("no-func-assign", true),
    ("no-global-assign", true),
    ("no-import-assign", true),
    ("no-inner-declarations", true),
    ("no-invalid-regexp", true),
    ("no-irregular-whitespace", true),
    ("no-misleading-character-class", true),
    ("no-mixed-spaces-and-tabs", true),
    ("no-new-symbol", true),
    ("no-obj-calls", true),
    ("no-octal", true),
    ("no-prototype-builtins", true),
    ("no-redeclare", true),
    ("no-regex-spaces", true),
    ("no-self-assign", true),
    ("no-setter-return", true),
    ("no-shadow", false),
    ("no-shadow-restricted-names", true),
    ("no-sparse-arrays", true),
    ("no-this-before-super", true),
    ("no-undef", true),
    ("no-unexpected-multiline", true),
    ("no-unreachable", true),
    ("no-unsafe-finally", true),
    ("no-unsafe-negation", true),
    ("no-unused-labels", true),
    ("no-unused-vars", true),
    ("no-useless-catch", true),
    ("no-useless-escape", true),
    ("no-var", false),
    ("no-with", true),
    ("prefer-const", false),
    ("require-yield", true),
    ("semi", false),
    ("use-isnan", true),
    ("valid-typeof", true),
];

/// Look up one of the built-in extendable configs.
pub fn builtin_config(name: &str) -> Option<Value> {
    match name {
        "eslint:recommended" => Some(rules_config(
            CORE_RULES.iter().filter(|(_, recommended)| *recommended),
        )),
        "eslint:all" => Some(rules_config(CORE_RULES.iter())),
        _ => None,
    }
}

fn rules_config<'a>(rules: impl Iterator<Item = &'a (&'a str, bool)>) -> Value {
    let mut map = Map::new();
    for (id, _) in rules {
        map.insert((*id).to_string(), json!("error"));
    }
    json!({ "rules": Value::Object(map) })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_recommended_is_a_strict_subset_of_all() {
        let recommended = builtin_config("eslint:recommended").unwrap();
        let all = builtin_config("eslint:all").unwrap();

        let recommended = recommended["rules"].as_object().unwrap();
        let all = all["rules"].as_object().unwrap();

        assert!(recommended.len() < all.len());
        for id in recommended.keys() {
            assert!(all.contains_key(id), "{id} missing from eslint:all");
        }
    }

    #[test]
    fn test_unknown_builtin_is_none() {
        assert_eq!(builtin_config("eslint:bogus"), None);
    }

    #[test]
    fn test_plugin_definition_parses_from_json() {
        let definition: PluginDefinition = serde_json::from_value(serde_json::json!({
            "configs": { "recommended": { "rules": { "react/jsx-uses-vars": "error" } } },
            "processors": { ".md": { "supportsAutofix": true } }
        }))
        .unwrap();

        assert!(definition.configs.contains_key("recommended"));
        assert!(definition.processors[".md"].supports_autofix);
    }

    #[test]
    fn test_pool_lookup() {
        let mut pool = PluginPool::new();
        pool.add("eslint-plugin-react", PluginDefinition::default());

        assert!(pool.get("eslint-plugin-react").is_some());
        assert!(pool.get("react").is_none());
    }
}

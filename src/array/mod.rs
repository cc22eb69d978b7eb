//! The flattened configuration representation.
//!
//! A [`ConfigElement`] is one atom produced by normalization: the body of a
//! config file, one `overrides` entry, or one extended config, tagged with
//! an optional file predicate. A [`ConfigArray`] is the ordered sequence of
//! elements in effect for some cascade level. Order is significant: later
//! elements take precedence in the extracted result.

mod extract;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ConfigResult;
use crate::matcher::FileMatcher;
use crate::registry::ProcessorDefinition;
use crate::resolver::{ParserReference, PluginReference};

/// One normalized config atom.
#[derive(Debug, Clone)]
pub struct ConfigElement {
    /// Logical name for diagnostics (`"BaseConfig"`, `".eslintrc.json » eslint:recommended"`, ...).
    pub name: String,
    /// The file this element came from; empty for in-memory configs.
    pub file_path: PathBuf,
    /// File predicate; `None` applies to every file at this cascade level.
    pub match_file: Option<FileMatcher>,
    pub env: Option<Map<String, Value>>,
    pub globals: Option<Map<String, Value>>,
    pub parser: Option<ParserReference>,
    pub parser_options: Option<Map<String, Value>>,
    pub plugins: Option<BTreeMap<String, PluginReference>>,
    pub processor: Option<String>,
    /// Only unconditional elements may declare root-ness; normalization
    /// clears this when a predicate is attached.
    pub root: Option<bool>,
    pub rules: Option<Map<String, Value>>,
    pub settings: Option<Map<String, Value>>,
}

impl ConfigElement {
    pub fn new(name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            match_file: None,
            env: None,
            globals: None,
            parser: None,
            parser_options: None,
            plugins: None,
            processor: None,
            root: None,
            rules: None,
            settings: None,
        }
    }

    /// Whether this element contributes to the given target file.
    pub fn applies_to(&self, path: &Path) -> bool {
        self.match_file.as_ref().is_none_or(|m| m.matches(path))
    }
}

/// An ordered sequence of [`ConfigElement`]s.
#[derive(Debug, Clone, Default)]
pub struct ConfigArray {
    elements: Vec<ConfigElement>,
}

impl ConfigArray {
    pub fn new(elements: Vec<ConfigElement>) -> Self {
        Self { elements }
    }

    /// Concatenate freshly normalized elements onto a parent array. A root
    /// array discards its parent.
    pub fn with_parent(elements: Vec<ConfigElement>, parent: Option<&ConfigArray>) -> ConfigArray {
        let child = ConfigArray::new(elements);
        match parent {
            Some(parent) if !child.is_root() => {
                let mut all = parent.elements.clone();
                all.extend(child.elements);
                ConfigArray::new(all)
            }
            _ => child,
        }
    }

    pub fn elements(&self) -> &[ConfigElement] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<ConfigElement> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The last explicit `root` declaration wins. Predicated elements never
    /// carry one.
    pub fn is_root(&self) -> bool {
        self.elements
            .iter()
            .rev()
            .find_map(|e| e.root)
            .unwrap_or(false)
    }

    /// Whether any predicated element matches the file. The enumerator uses
    /// this to pick up files whose extension is outside the default list but
    /// which some element's `files` opts in.
    pub fn matches_file(&self, path: &Path) -> bool {
        self.elements
            .iter()
            .any(|e| e.match_file.as_ref().is_some_and(|m| m.matches(path)))
    }

    /// Reduce this array against a target file into one resolved config.
    pub fn extract_config(&self, path: &Path) -> ConfigResult<ResolvedConfig> {
        extract::extract_config(self, path)
    }
}

/// A processor picked by the extracted config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedProcessor {
    pub id: String,
    pub definition: ProcessorDefinition,
}

/// The merged configuration for one target file.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub env: Map<String, Value>,
    pub globals: Map<String, Value>,
    pub parser: Option<ParserReference>,
    pub parser_options: Map<String, Value>,
    pub plugins: BTreeMap<String, PluginReference>,
    pub processor: Option<ResolvedProcessor>,
    pub rules: Map<String, Value>,
    pub settings: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::matcher::FileMatcher;

    fn element(name: &str) -> ConfigElement {
        ConfigElement::new(name, "")
    }

    fn predicated(name: &str, pattern: &str) -> ConfigElement {
        let mut e = element(name);
        e.match_file = FileMatcher::compile(
            &[pattern.to_string()],
            &[],
            Path::new("/base"),
            "test",
        )
        .unwrap();
        e
    }

    #[test]
    fn test_is_root_takes_last_boolean() {
        let mut a = element("a");
        a.root = Some(true);
        let mut b = element("b");
        b.root = Some(false);

        assert!(!ConfigArray::new(vec![a.clone(), b.clone()]).is_root());
        assert!(ConfigArray::new(vec![b, a]).is_root());
    }

    #[test]
    fn test_is_root_defaults_to_false() {
        assert!(!ConfigArray::new(vec![element("a")]).is_root());
        assert!(!ConfigArray::default().is_root());
    }

    #[test]
    fn test_matches_file_counts_any_predicated_element() {
        let array = ConfigArray::new(vec![element("a"), predicated("b", "*.md")]);

        assert!(array.matches_file(Path::new("/base/readme.md")));
        assert!(!array.matches_file(Path::new("/base/main.js")));
    }

    #[test]
    fn test_with_parent_prepends() {
        let parent = ConfigArray::new(vec![element("parent")]);
        let combined = ConfigArray::with_parent(vec![element("child")], Some(&parent));

        let names: Vec<_> = combined.elements().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["parent", "child"]);
    }

    #[test]
    fn test_with_parent_discards_parent_when_root() {
        let parent = ConfigArray::new(vec![element("parent")]);
        let mut child = element("child");
        child.root = Some(true);
        let combined = ConfigArray::with_parent(vec![child], Some(&parent));

        let names: Vec<_> = combined.elements().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["child"]);
    }
}

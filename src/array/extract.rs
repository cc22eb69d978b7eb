//! Reduction of a [`ConfigArray`] against one target file.
//!
//! The walk runs from the end of the array toward the start, so the most
//! specific elements (CLI, leaf directory, overrides) write first; every
//! merge policy is first-writer-wins, which gives them precedence without
//! reordering anything. The walk is O(n) over elements and never mutates
//! the array.

use std::path::Path;

use serde_json::{Map, Value, json};

use crate::array::{ConfigArray, ConfigElement, ResolvedConfig, ResolvedProcessor};
use crate::error::{ConfigError, ConfigResult};

pub(crate) fn extract_config(array: &ConfigArray, path: &Path) -> ConfigResult<ResolvedConfig> {
    let mut config = ResolvedConfig::default();
    let mut processor_name: Option<String> = None;

    for element in array.elements().iter().rev() {
        if !element.applies_to(path) {
            continue;
        }
        apply_element(&mut config, &mut processor_name, element)?;
    }

    if let Some(parser) = &config.parser {
        parser.definition()?;
    }
    config.processor = match processor_name {
        Some(name) => Some(resolve_processor(&config, &name)?),
        None => None,
    };

    Ok(config)
}

fn apply_element(
    config: &mut ResolvedConfig,
    processor_name: &mut Option<String>,
    element: &ConfigElement,
) -> ConfigResult<()> {
    if config.parser.is_none()
        && let Some(parser) = &element.parser
    {
        config.parser = Some(parser.clone());
    }
    if processor_name.is_none()
        && let Some(processor) = &element.processor
    {
        *processor_name = Some(processor.clone());
    }

    if let Some(env) = &element.env {
        merge_without_overwrite(&mut config.env, env);
    }
    if let Some(globals) = &element.globals {
        merge_without_overwrite(&mut config.globals, globals);
    }
    if let Some(parser_options) = &element.parser_options {
        merge_without_overwrite(&mut config.parser_options, parser_options);
    }
    if let Some(settings) = &element.settings {
        merge_without_overwrite(&mut config.settings, settings);
    }

    if let Some(plugins) = &element.plugins {
        for (id, reference) in plugins {
            if let Some(existing) = config.plugins.get(id) {
                if !existing.same_definition(reference) {
                    return Err(ConfigError::PluginConflict {
                        id: id.clone(),
                        first: existing.importer_path().display().to_string(),
                        second: reference.importer_path().display().to_string(),
                    });
                }
                continue;
            }
            // A stored resolution failure surfaces here, at use time.
            reference.definition()?;
            config.plugins.insert(id.clone(), reference.clone());
        }
    }

    if let Some(rules) = &element.rules {
        for (id, entry) in rules {
            if let Some(existing) = config.rules.get_mut(id) {
                // A bare severity written earlier picks up options from a
                // less specific entry.
                if let Value::Array(existing) = existing
                    && existing.len() == 1
                    && let Value::Array(source) = entry
                    && source.len() >= 2
                {
                    existing.extend(source[1..].iter().cloned());
                }
                continue;
            }
            config.rules.insert(id.clone(), normalize_rule_entry(entry));
        }
    }

    Ok(())
}

/// A `"pluginId/processorName"` string resolves through the merged plugins.
/// The split is at the last `/` so extension-style processor names
/// (`vue/.vue`) and scoped plugins both parse.
fn resolve_processor(config: &ResolvedConfig, name: &str) -> ConfigResult<ResolvedProcessor> {
    let Some((plugin_id, processor_id)) = name.rsplit_once('/') else {
        return Err(ConfigError::InvalidProcessorName {
            raw: name.to_string(),
        });
    };
    let plugin = config
        .plugins
        .get(plugin_id)
        .ok_or_else(|| ConfigError::ProcessorNotFound {
            name: name.to_string(),
        })?;
    let definition = plugin.definition()?;
    let processor =
        definition
            .processors
            .get(processor_id)
            .ok_or_else(|| ConfigError::ProcessorNotFound {
                name: name.to_string(),
            })?;
    Ok(ResolvedProcessor {
        id: name.to_string(),
        definition: processor.clone(),
    })
}

fn normalize_rule_entry(entry: &Value) -> Value {
    match entry {
        Value::Array(_) => entry.clone(),
        severity => json!([severity]),
    }
}

#[derive(Debug, Clone)]
enum Seg {
    Key(String),
    Index(usize),
}

enum SourceNode<'a> {
    Obj(&'a Map<String, Value>),
    Arr(&'a [Value]),
}

enum TargetNode<'a> {
    Obj(&'a mut Map<String, Value>),
    Arr(&'a mut Vec<Value>),
}

/// Assign-without-overwrite deep merge: each source key lands in the target
/// only if the target does not already have it; nested containers are
/// entered, arrays merge index-wise and are never concatenated. Driven by an
/// explicit work stack so adversarially nested input cannot overflow the
/// call stack. Sources are never mutated.
fn merge_without_overwrite(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    let mut stack: Vec<Vec<Seg>> = vec![Vec::new()];

    while let Some(path) = stack.pop() {
        let entries: Vec<(Seg, &Value)> = match source_node(source, &path) {
            Some(SourceNode::Obj(map)) => map
                .iter()
                .map(|(k, v)| (Seg::Key(k.clone()), v))
                .collect(),
            Some(SourceNode::Arr(items)) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Seg::Index(i), v))
                .collect(),
            None => continue,
        };

        for (seg, source_value) in entries {
            merge_entry(target, &path, seg, source_value, &mut stack);
        }
    }
}

fn merge_entry(
    target_root: &mut Map<String, Value>,
    path: &[Seg],
    seg: Seg,
    source_value: &Value,
    stack: &mut Vec<Vec<Seg>>,
) {
    let source_is_container = source_value.is_object() || source_value.is_array();
    let child_path = || {
        let mut p = path.to_vec();
        p.push(seg.clone());
        p
    };

    let Some(container) = target_node(target_root, path) else {
        return;
    };
    match (container, &seg) {
        (TargetNode::Obj(map), Seg::Key(key)) => {
            let existing = map
                .get(key.as_str())
                .map(|v| v.is_object() || v.is_array());
            match existing {
                Some(true) if source_is_container => stack.push(child_path()),
                Some(_) => {}
                None => {
                    if source_value.is_object() {
                        map.insert(key.clone(), Value::Object(Map::new()));
                        stack.push(child_path());
                    } else if source_value.is_array() {
                        map.insert(key.clone(), Value::Array(Vec::new()));
                        stack.push(child_path());
                    } else {
                        map.insert(key.clone(), source_value.clone());
                    }
                }
            }
        }
        (TargetNode::Arr(items), Seg::Index(index)) => {
            let existing = items.get(*index).map(|v| v.is_object() || v.is_array());
            match existing {
                Some(true) if source_is_container => stack.push(child_path()),
                Some(_) => {}
                None if *index == items.len() => {
                    if source_value.is_object() {
                        items.push(Value::Object(Map::new()));
                        stack.push(child_path());
                    } else if source_value.is_array() {
                        items.push(Value::Array(Vec::new()));
                        stack.push(child_path());
                    } else {
                        items.push(source_value.clone());
                    }
                }
                None => {}
            }
        }
        _ => {}
    }
}

fn source_node<'a>(root: &'a Map<String, Value>, path: &[Seg]) -> Option<SourceNode<'a>> {
    let mut current: Option<&Value> = None;
    for seg in path {
        let next = match (current, seg) {
            (None, Seg::Key(key)) => root.get(key.as_str()),
            (Some(Value::Object(map)), Seg::Key(key)) => map.get(key.as_str()),
            (Some(Value::Array(items)), Seg::Index(index)) => items.get(*index),
            _ => None,
        }?;
        current = Some(next);
    }
    match current {
        None => Some(SourceNode::Obj(root)),
        Some(Value::Object(map)) => Some(SourceNode::Obj(map)),
        Some(Value::Array(items)) => Some(SourceNode::Arr(items)),
        _ => None,
    }
}

fn target_node<'a>(root: &'a mut Map<String, Value>, path: &[Seg]) -> Option<TargetNode<'a>> {
    let Some((first, rest)) = path.split_first() else {
        return Some(TargetNode::Obj(root));
    };
    let Seg::Key(first_key) = first else {
        return None;
    };
    let mut current = root.get_mut(first_key.as_str())?;
    for seg in rest {
        current = match (current, seg) {
            (Value::Object(map), Seg::Key(key)) => map.get_mut(key.as_str())?,
            (Value::Array(items), Seg::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    match current {
        Value::Object(map) => Some(TargetNode::Obj(map)),
        Value::Array(items) => Some(TargetNode::Arr(items)),
        _ => None,
    }
}

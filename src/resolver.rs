//! Resolution of `extends`, `plugins` and `parser` specifiers.
//!
//! Specifiers are classified by shape: built-in (`eslint:recommended`),
//! plugin-provided (`plugin:pkg/name`), shareable package (normalized to
//! `eslint-config-*` / `eslint-plugin-*`), absolute path, or importer-relative
//! path. Package lookup goes through a [`ModuleResolver`]; the default walks
//! `node_modules` directories upward from the importer. Failures that concern
//! a specific plugin or parser are not raised here: they are stored on the
//! returned reference and surface when extraction uses it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::registry::{self, PluginDefinition, PluginPool};

/// Resolves a module specifier to a file path, relative to the importing
/// file. The algorithm itself is a collaborator; callers may substitute a
/// bundler-aware or virtual resolver.
pub trait ModuleResolver {
    fn resolve(&self, specifier: &str, importer: &Path) -> Result<PathBuf, String>;
}

/// Node-style resolution: relative and absolute paths as files or package
/// directories, bare names through `node_modules` directories walking upward
/// from the importer.
#[derive(Debug, Default)]
pub struct NodeModulesResolver;

impl ModuleResolver for NodeModulesResolver {
    fn resolve(&self, specifier: &str, importer: &Path) -> Result<PathBuf, String> {
        let base = importer.parent().unwrap_or_else(|| Path::new("."));

        if Path::new(specifier).is_absolute() {
            return resolve_as_file_or_dir(Path::new(specifier))
                .ok_or_else(|| format!("cannot find module \"{specifier}\""));
        }
        if specifier.starts_with("./") || specifier.starts_with("../") {
            return resolve_as_file_or_dir(&base.join(specifier))
                .ok_or_else(|| format!("cannot find module \"{specifier}\" from {}", base.display()));
        }

        let mut dir = Some(base);
        while let Some(current) = dir {
            let candidate = current.join("node_modules").join(specifier);
            if let Some(found) = resolve_as_file_or_dir(&candidate) {
                return Ok(found);
            }
            dir = current.parent();
        }
        Err(format!(
            "cannot find module \"{specifier}\" from {}",
            base.display()
        ))
    }
}

fn resolve_as_file_or_dir(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    for ext in ["js", "json"] {
        let with_ext = path.with_extension(ext);
        if with_ext.is_file() {
            return Some(with_ext);
        }
    }
    if path.is_dir() {
        if let Some(main) = package_main(path) {
            let target = path.join(main);
            if let Some(found) = resolve_as_file_or_dir(&target) {
                return Some(found);
            }
        }
        for index in ["index.js", "index.json"] {
            let candidate = path.join(index);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn package_main(dir: &Path) -> Option<String> {
    let manifest = std::fs::read_to_string(dir.join("package.json")).ok()?;
    let manifest: Value = serde_json::from_str(&manifest).ok()?;
    manifest.get("main")?.as_str().map(str::to_string)
}

/// Normalize a shareable-package name by applying the conventional prefix.
/// Scoped packages keep their scope; names that already carry the prefix are
/// unchanged. Whitespace fails fast.
pub fn normalize_package_name(name: &str, prefix: &str) -> ConfigResult<String> {
    if name.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidPackageName {
            name: name.to_string(),
            detail: "whitespace is not allowed".to_string(),
        });
    }

    if let Some(rest) = name.strip_prefix('@') {
        return Ok(match rest.split_once('/') {
            // "@scope" extends to the scoped default package.
            None => format!("{name}/{prefix}"),
            Some((scope, unscoped)) => {
                if unscoped == prefix || unscoped.starts_with(&format!("{prefix}-")) {
                    name.to_string()
                } else {
                    format!("@{scope}/{prefix}-{unscoped}")
                }
            }
        });
    }

    if name == prefix || name.starts_with(&format!("{prefix}-")) {
        Ok(name.to_string())
    } else {
        Ok(format!("{prefix}-{name}"))
    }
}

/// The inverse of [`normalize_package_name`]: the short id used as a key in
/// plugin maps and rule prefixes.
pub fn get_shorthand_name(long_name: &str, prefix: &str) -> String {
    if let Some(rest) = long_name.strip_prefix('@') {
        return match rest.split_once('/') {
            None => long_name.to_string(),
            Some((scope, unscoped)) => {
                if unscoped == prefix {
                    format!("@{scope}")
                } else if let Some(short) = unscoped.strip_prefix(&format!("{prefix}-")) {
                    format!("@{scope}/{short}")
                } else {
                    long_name.to_string()
                }
            }
        };
    }
    long_name
        .strip_prefix(&format!("{prefix}-"))
        .unwrap_or(long_name)
        .to_string()
}

/// True when a specifier names a package rather than a path or a tagged
/// reference. Mirrors the conventional `^(\w|@)` shape with a `:` guard on
/// the second character.
fn is_package_specifier(name: &str) -> bool {
    static PACKAGE_SHAPE: OnceLock<Regex> = OnceLock::new();
    PACKAGE_SHAPE
        .get_or_init(|| Regex::new(r"^[\w@]([^:]|$)").unwrap())
        .is_match(name)
}

/// A resolved parser or plugin handle. A failed resolution is stored, not
/// raised; it propagates when the definition is requested.
#[derive(Debug, Clone)]
pub enum Reference<T> {
    Loaded {
        definition: Arc<T>,
        file_path: PathBuf,
        id: String,
        importer_path: PathBuf,
    },
    Failed {
        error: Box<ConfigError>,
        id: String,
        importer_path: PathBuf,
    },
}

pub type PluginReference = Reference<PluginDefinition>;
pub type ParserReference = Reference<ParserDefinition>;

/// The resolved location of a parser module. Loading the parser itself is
/// the engine's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserDefinition {
    pub file_path: PathBuf,
}

impl<T> Reference<T> {
    pub fn id(&self) -> &str {
        match self {
            Reference::Loaded { id, .. } | Reference::Failed { id, .. } => id,
        }
    }

    pub fn importer_path(&self) -> &Path {
        match self {
            Reference::Loaded { importer_path, .. } | Reference::Failed { importer_path, .. } => {
                importer_path
            }
        }
    }

    /// The loaded definition, or the stored resolution error.
    pub fn definition(&self) -> ConfigResult<&Arc<T>> {
        match self {
            Reference::Loaded { definition, .. } => Ok(definition),
            Reference::Failed { error, .. } => Err((**error).clone()),
        }
    }

    pub fn loaded_definition(&self) -> Option<&Arc<T>> {
        match self {
            Reference::Loaded { definition, .. } => Some(definition),
            Reference::Failed { .. } => None,
        }
    }

    /// Identity comparison of the underlying definitions.
    pub fn same_definition(&self, other: &Reference<T>) -> bool {
        match (self, other) {
            (
                Reference::Loaded { definition: a, .. },
                Reference::Loaded { definition: b, .. },
            ) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T> Serialize for Reference<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Reference::Loaded { file_path, id, .. } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("filePath", &file_path.to_string_lossy())?;
            }
            Reference::Failed { error, id, .. } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("error", &error.to_string())?;
            }
        }
        map.end()
    }
}

/// Where an `extends` specifier leads.
#[derive(Debug)]
pub enum ExtendsTarget {
    /// Raw config data from the built-in table.
    Builtin { data: Value },
    /// A named config exported by a plugin; `file_path` is the plugin file
    /// when it came from disk.
    PluginConfig {
        data: Value,
        file_path: Option<PathBuf>,
    },
    /// A config file to load from disk.
    File { path: PathBuf },
}

pub struct ReferenceResolver {
    module_resolver: Box<dyn ModuleResolver>,
    pool: PluginPool,
    plugin_cache: RefCell<HashMap<PathBuf, Arc<PluginDefinition>>>,
}

impl ReferenceResolver {
    pub fn new(module_resolver: Box<dyn ModuleResolver>, pool: PluginPool) -> Self {
        Self {
            module_resolver,
            pool,
            plugin_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Classify and resolve one `extends` specifier. Failures here are
    /// structural and propagate eagerly.
    pub fn resolve_extends(&self, name: &str, importer: &Path) -> ConfigResult<ExtendsTarget> {
        if name.starts_with("eslint:") {
            return match registry::builtin_config(name) {
                Some(data) => Ok(ExtendsTarget::Builtin { data }),
                None => Err(ConfigError::ExtendConfigMissing {
                    name: name.to_string(),
                    importer: importer.display().to_string(),
                }),
            };
        }

        if let Some(rest) = name.strip_prefix("plugin:") {
            let Some((package, config_name)) = rest.rsplit_once('/') else {
                return Err(ConfigError::InvalidPackageName {
                    name: name.to_string(),
                    detail: "expected \"plugin:package/configName\"".to_string(),
                });
            };
            let (definition, file_path) = self
                .load_plugin_definition(package, importer)
                .map_err(|e| ConfigError::ExtendConfigMissing {
                    name: name.to_string(),
                    importer: format!("{} ({e})", importer.display()),
                })?;
            return match definition.configs.get(config_name) {
                Some(data) => Ok(ExtendsTarget::PluginConfig {
                    data: data.clone(),
                    file_path,
                }),
                None => Err(ConfigError::ExtendConfigMissing {
                    name: name.to_string(),
                    importer: importer.display().to_string(),
                }),
            };
        }

        if Path::new(name).is_absolute() {
            return Ok(ExtendsTarget::File {
                path: PathBuf::from(name),
            });
        }

        if is_package_specifier(name) {
            let long_name = normalize_package_name(name, "eslint-config")?;
            let path = self
                .module_resolver
                .resolve(&long_name, importer)
                .map_err(|cause| ConfigError::ExtendConfigMissing {
                    name: name.to_string(),
                    importer: format!("{} ({cause})", importer.display()),
                })?;
            return Ok(ExtendsTarget::File { path });
        }

        let base = importer.parent().unwrap_or_else(|| Path::new("."));
        Ok(ExtendsTarget::File {
            path: base.join(name),
        })
    }

    /// Resolve a plugin specifier into a reference. Whitespace in the name is
    /// a fast failure; a missing module becomes a stored error on the
    /// reference.
    pub fn resolve_plugin(
        &self,
        specifier: &str,
        id: Option<&str>,
        importer: &Path,
    ) -> ConfigResult<PluginReference> {
        let long_name = normalize_package_name(specifier, "eslint-plugin")?;
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| get_shorthand_name(&long_name, "eslint-plugin"));

        match self.load_plugin_definition(specifier, importer) {
            Ok((definition, file_path)) => Ok(Reference::Loaded {
                definition,
                file_path: file_path.unwrap_or_default(),
                id,
                importer_path: importer.to_path_buf(),
            }),
            Err(error) => Ok(Reference::Failed {
                error: Box::new(error),
                id,
                importer_path: importer.to_path_buf(),
            }),
        }
    }

    /// Resolve a parser specifier. A missing module becomes a stored error.
    pub fn resolve_parser(&self, specifier: &str, importer: &Path) -> ParserReference {
        match self.module_resolver.resolve(specifier, importer) {
            Ok(path) => Reference::Loaded {
                definition: Arc::new(ParserDefinition {
                    file_path: path.clone(),
                }),
                file_path: path,
                id: specifier.to_string(),
                importer_path: importer.to_path_buf(),
            },
            Err(cause) => Reference::Failed {
                error: Box::new(ConfigError::ParserMissing {
                    name: specifier.to_string(),
                    importer_path: importer.to_path_buf(),
                    cause,
                }),
                id: specifier.to_string(),
                importer_path: importer.to_path_buf(),
            },
        }
    }

    /// Load a plugin definition: the pool first (long name, then shorthand),
    /// then the filesystem through the module resolver. Disk definitions are
    /// cached by resolved path so a plugin reached from two importers keeps
    /// one identity.
    fn load_plugin_definition(
        &self,
        specifier: &str,
        importer: &Path,
    ) -> ConfigResult<(Arc<PluginDefinition>, Option<PathBuf>)> {
        let long_name = normalize_package_name(specifier, "eslint-plugin")?;
        let shorthand = get_shorthand_name(&long_name, "eslint-plugin");

        if let Some(definition) = self
            .pool
            .get(&long_name)
            .or_else(|| self.pool.get(&shorthand))
        {
            return Ok((definition, None));
        }

        let path = self
            .module_resolver
            .resolve(&long_name, importer)
            .map_err(|cause| ConfigError::PluginMissing {
                long_name: long_name.clone(),
                importer_path: importer.to_path_buf(),
                cause,
            })?;
        let path = std::fs::canonicalize(&path).unwrap_or(path);

        if let Some(cached) = self.plugin_cache.borrow().get(&path) {
            return Ok((cached.clone(), Some(path)));
        }

        let source =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::PluginMissing {
                long_name: long_name.clone(),
                importer_path: importer.to_path_buf(),
                cause: e.to_string(),
            })?;
        let definition: PluginDefinition =
            serde_json::from_str(&source).map_err(|e| ConfigError::PluginMissing {
                long_name: long_name.clone(),
                importer_path: importer.to_path_buf(),
                cause: format!("invalid plugin definition: {e}"),
            })?;

        let definition = Arc::new(definition);
        self.plugin_cache
            .borrow_mut()
            .insert(path.clone(), definition.clone());
        Ok((definition, Some(path)))
    }
}

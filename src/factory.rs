//! Creating [`ConfigArray`]s from config data.
//!
//! The factory owns flattening: one tree-shaped config (with `extends` and
//! `overrides`) becomes an ordered sequence of elements. For each config
//! object the order is: elements of each `extends` target, auto-processor
//! elements contributed by plugins, the body itself, then each `overrides`
//! entry. A parent's file predicate is conjoined onto everything produced
//! below it, and predicated elements never declare root-ness.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::array::{ConfigArray, ConfigElement};
use crate::config::schema;
use crate::config::{ConfigData, OverrideData, PluginsField, StringOrList, CONFIG_FILENAMES};
use crate::error::{ConfigError, ConfigResult};
use crate::loader::ConfigLoader;
use crate::matcher::FileMatcher;
use crate::registry::PluginPool;
use crate::resolver::{
    ExtendsTarget, ModuleResolver, NodeModulesResolver, PluginReference, ReferenceResolver,
};

/// Options shared by the factory entry points.
#[derive(Default)]
pub struct LoadOptions<'a> {
    /// Logical name for produced elements; defaults to the config file's
    /// path relative to the working directory.
    pub name: Option<&'a str>,
    /// Origin file for in-memory data (`create` only).
    pub file_path: Option<&'a Path>,
    /// Array to concatenate under the produced elements. Discarded when the
    /// produced array declares root.
    pub parent: Option<&'a ConfigArray>,
}

pub struct ConfigArrayFactory {
    cwd: PathBuf,
    loader: ConfigLoader,
    resolver: ReferenceResolver,
}

impl ConfigArrayFactory {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self::with_pool(cwd, PluginPool::new())
    }

    pub fn with_pool(cwd: impl Into<PathBuf>, pool: PluginPool) -> Self {
        Self::with_components(
            cwd,
            ConfigLoader::new(),
            Box::new(NodeModulesResolver),
            pool,
        )
    }

    pub fn with_components(
        cwd: impl Into<PathBuf>,
        loader: ConfigLoader,
        module_resolver: Box<dyn ModuleResolver>,
        pool: PluginPool,
    ) -> Self {
        Self {
            cwd: cwd.into(),
            loader,
            resolver: ReferenceResolver::new(module_resolver, pool),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Build an array from in-memory config data.
    pub fn create(&self, data: &Value, options: LoadOptions) -> ConfigResult<ConfigArray> {
        let name = options
            .name
            .map(str::to_string)
            .unwrap_or_else(|| "in-memory config".to_string());
        let ctx = self.root_context(name, options.file_path.map(Path::to_path_buf));

        schema::validate_top_level(data, &ctx.origin())?;
        let elements = self.normalize_top_level(data, &ctx)?;
        Ok(ConfigArray::with_parent(elements, options.parent))
    }

    /// Load one config file. A missing file is an error here; probing for
    /// optional files is [`Self::load_on_directory`]'s job.
    pub fn load_file(&self, path: &Path, options: LoadOptions) -> ConfigResult<ConfigArray> {
        let path = self.absolutize(path);
        match self.loader.load(&path)? {
            Some(data) => {
                let elements = self.normalize_file_data(&data, &path, options.name)?;
                Ok(ConfigArray::with_parent(elements, options.parent))
            }
            None => Err(ConfigError::CannotReadConfig {
                cause: "config file not found or has no config".to_string(),
                path,
            }),
        }
    }

    /// Probe the ordered config file names in `dir`; the first that exists
    /// and yields non-null config wins. `Ok(None)` when the directory has no
    /// config.
    pub fn load_on_directory(
        &self,
        dir: &Path,
        options: LoadOptions,
    ) -> ConfigResult<Option<ConfigArray>> {
        let dir = self.absolutize(dir);
        for file_name in CONFIG_FILENAMES {
            let path = dir.join(file_name);
            if let Some(data) = self.loader.load(&path)? {
                let elements = self.normalize_file_data(&data, &path, options.name)?;
                return Ok(Some(ConfigArray::with_parent(elements, options.parent)));
            }
        }
        Ok(None)
    }

    fn normalize_file_data(
        &self,
        data: &Value,
        path: &Path,
        name: Option<&str>,
    ) -> ConfigResult<Vec<ConfigElement>> {
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| self.default_name(path));
        let ctx = self.root_context(name, Some(path.to_path_buf()));

        schema::validate_top_level(data, &ctx.origin())?;
        self.normalize_top_level(data, &ctx)
    }

    fn normalize_top_level(
        &self,
        data: &Value,
        ctx: &NormContext,
    ) -> ConfigResult<Vec<ConfigElement>> {
        match data {
            Value::Object(_) => {
                let fragment = deserialize_fragment(data, &ctx.origin())?;
                self.normalize_fragment(&fragment, ctx)
            }
            Value::Array(items) => {
                let mut elements = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    let item_ctx = ctx.named(format!("{}[{index}]", ctx.name));
                    match item {
                        Value::String(reference) => {
                            elements.extend(self.expand_extends(reference, &item_ctx)?);
                        }
                        _ => {
                            let fragment = deserialize_fragment(item, &item_ctx.origin())?;
                            elements.extend(self.normalize_fragment(&fragment, &item_ctx)?);
                        }
                    }
                }
                Ok(elements)
            }
            _ => Err(ConfigError::InvalidConfig {
                origin: ctx.origin(),
                detail: "config must be an object or an array".to_string(),
            }),
        }
    }

    /// Normalize one config object, conjoining its `files`/`excludedFiles`
    /// predicate onto everything it produces.
    fn normalize_fragment(
        &self,
        fragment: &OverrideData,
        ctx: &NormContext,
    ) -> ConfigResult<Vec<ConfigElement>> {
        let files = fragment
            .files
            .as_ref()
            .map(StringOrList::to_vec)
            .unwrap_or_default();
        let excluded = fragment
            .excluded_files
            .as_ref()
            .map(StringOrList::to_vec)
            .unwrap_or_default();
        let matcher = FileMatcher::compile(&files, &excluded, &ctx.match_base, &ctx.origin())?;

        let mut elements = self.normalize_body(&fragment.body, ctx)?;
        for element in &mut elements {
            element.match_file = FileMatcher::conjoin(matcher.as_ref(), element.match_file.take());
            if element.match_file.is_some() {
                element.root = None;
            }
        }
        Ok(elements)
    }

    fn normalize_body(
        &self,
        body: &ConfigData,
        ctx: &NormContext,
    ) -> ConfigResult<Vec<ConfigElement>> {
        let mut elements = Vec::new();

        for extend_name in body.extend_names() {
            elements.extend(self.expand_extends(&extend_name, ctx)?);
        }

        let plugins = self.resolve_plugins(body.plugins.as_ref(), ctx)?;
        let parser = body
            .parser
            .as_ref()
            .map(|specifier| self.resolver.resolve_parser(specifier, &ctx.importer));

        // Plugins register processors for their file extensions through
        // synthesized child configs gated on `*<ext>`.
        if let Some(plugins) = &plugins {
            for (id, reference) in plugins {
                let Some(definition) = reference.loaded_definition() else {
                    continue;
                };
                for ext in definition.processors.keys().filter(|k| k.starts_with('.')) {
                    let child = OverrideData {
                        files: Some(StringOrList::One(format!("*{ext}"))),
                        excluded_files: None,
                        body: ConfigData {
                            processor: Some(format!("{id}/{ext}")),
                            ..ConfigData::default()
                        },
                    };
                    let child_ctx =
                        ctx.named(format!("{}#processors[\"{id}/{ext}\"]", ctx.name));
                    elements.extend(self.normalize_fragment(&child, &child_ctx)?);
                }
            }
        }

        let mut parser_options = body.parser_options.clone();
        if let Some(features) = &body.ecma_features {
            parser_options
                .get_or_insert_with(Map::new)
                .entry("ecmaFeatures".to_string())
                .or_insert_with(|| Value::Object(features.clone()));
        }

        let mut element = ConfigElement::new(
            ctx.name.clone(),
            ctx.file_path.clone().unwrap_or_default(),
        );
        element.env = body.env.clone();
        element.globals = body.globals.clone();
        element.parser = parser;
        element.parser_options = parser_options;
        element.plugins = plugins;
        element.processor = body.processor.clone();
        element.root = if ctx.from_extends { None } else { body.root };
        element.rules = body.rules.clone();
        element.settings = body.settings.clone();
        elements.push(element);

        for (index, override_data) in body.overrides.iter().enumerate() {
            let child_ctx = ctx.named(format!("{}#overrides[{index}]", ctx.name));
            elements.extend(self.normalize_fragment(override_data, &child_ctx)?);
        }

        Ok(elements)
    }

    fn resolve_plugins(
        &self,
        plugins: Option<&PluginsField>,
        ctx: &NormContext,
    ) -> ConfigResult<Option<BTreeMap<String, PluginReference>>> {
        let Some(plugins) = plugins else {
            return Ok(None);
        };
        let mut map = BTreeMap::new();
        match plugins {
            PluginsField::List(names) => {
                for name in names {
                    let reference = self.resolver.resolve_plugin(name, None, &ctx.importer)?;
                    map.insert(reference.id().to_string(), reference);
                }
            }
            PluginsField::Map(entries) => {
                for (id, specifier) in entries {
                    let reference =
                        self.resolver
                            .resolve_plugin(specifier, Some(id), &ctx.importer)?;
                    map.insert(id.clone(), reference);
                }
            }
        }
        Ok(Some(map))
    }

    fn expand_extends(
        &self,
        name: &str,
        ctx: &NormContext,
    ) -> ConfigResult<Vec<ConfigElement>> {
        let child_name = format!("{} » {}", ctx.name, name);
        match self.resolver.resolve_extends(name, &ctx.importer)? {
            ExtendsTarget::Builtin { data } => {
                let child_ctx = ctx.extends_child(child_name, None);
                self.normalize_top_level(&data, &child_ctx)
            }
            ExtendsTarget::PluginConfig { data, file_path } => {
                let child_ctx = ctx.extends_child(child_name, file_path);
                schema::validate_top_level(&data, &child_ctx.origin())?;
                self.normalize_top_level(&data, &child_ctx)
            }
            ExtendsTarget::File { path } => match self.loader.load(&path)? {
                Some(data) => {
                    let child_ctx = ctx.extends_child(child_name, Some(path));
                    schema::validate_top_level(&data, &child_ctx.origin())?;
                    self.normalize_top_level(&data, &child_ctx)
                }
                None => Err(ConfigError::ExtendConfigMissing {
                    name: name.to_string(),
                    importer: ctx.importer.display().to_string(),
                }),
            },
        }
    }

    fn root_context(&self, name: String, file_path: Option<PathBuf>) -> NormContext {
        let importer = file_path
            .clone()
            .unwrap_or_else(|| self.cwd.join("__config__.js"));
        let match_base = file_path
            .as_ref()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.cwd.clone());
        NormContext {
            name,
            file_path,
            importer,
            match_base,
            from_extends: false,
        }
    }

    fn default_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.cwd)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

#[derive(Debug, Clone)]
struct NormContext {
    name: String,
    file_path: Option<PathBuf>,
    /// The file references are resolved relative to.
    importer: PathBuf,
    /// The directory `files` patterns are relative to.
    match_base: PathBuf,
    /// Elements flattened from `extends` never carry root.
    from_extends: bool,
}

impl NormContext {
    fn origin(&self) -> String {
        self.file_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| self.name.clone())
    }

    fn named(&self, name: String) -> NormContext {
        NormContext {
            name,
            ..self.clone()
        }
    }

    fn extends_child(&self, name: String, file_path: Option<PathBuf>) -> NormContext {
        match file_path {
            Some(path) => NormContext {
                name,
                importer: path.clone(),
                match_base: path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.match_base.clone()),
                file_path: Some(path),
                from_extends: true,
            },
            None => NormContext {
                name,
                file_path: self.file_path.clone(),
                importer: self.importer.clone(),
                match_base: self.match_base.clone(),
                from_extends: true,
            },
        }
    }
}

fn deserialize_fragment(data: &Value, origin: &str) -> ConfigResult<OverrideData> {
    serde_json::from_value(data.clone()).map_err(|e| ConfigError::InvalidConfig {
        origin: origin.to_string(),
        detail: e.to_string(),
    })
}

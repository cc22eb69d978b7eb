//! Per-directory config discovery and the ancestor walk.
//!
//! For a leaf directory the cascade walks upward from its parent, probing
//! each directory for a config file and prepending what it finds, until a
//! config declares `root`, the path stops changing, or a permission error
//! ends the walk as if the root had been reached. Results are memoized per
//! directory so sibling subtrees share one normalization.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::array::ConfigArray;
use crate::error::{ConfigError, ConfigResult};
use crate::factory::{ConfigArrayFactory, LoadOptions};

pub struct CascadingConfigFactory {
    factory: ConfigArrayFactory,
    /// When set, a directory whose ancestor walk finds nothing falls back to
    /// this directory's config (conventionally the user's home).
    personal_config_dir: Option<PathBuf>,
    directory_cache: RefCell<HashMap<PathBuf, Arc<ConfigArray>>>,
}

impl CascadingConfigFactory {
    pub fn new(factory: ConfigArrayFactory) -> Self {
        Self {
            factory,
            personal_config_dir: None,
            directory_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Enable the personal-config fallback in the user's home directory.
    pub fn use_personal_config(mut self) -> Self {
        self.personal_config_dir = dirs::home_dir();
        self
    }

    pub fn with_personal_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.personal_config_dir = Some(dir.into());
        self
    }

    pub fn factory(&self) -> &ConfigArrayFactory {
        &self.factory
    }

    /// The effective configuration above `leaf_dir`, without the leaf's own
    /// per-directory config (that one is loaded separately during
    /// enumeration). Elements are ordered rootward to leafward.
    pub fn load_in_ancestors(&self, leaf_dir: &Path) -> ConfigResult<Arc<ConfigArray>> {
        let array = match leaf_dir.parent() {
            Some(parent) => self.config_for_directory(parent)?,
            None => Arc::new(ConfigArray::default()),
        };

        if array.is_empty()
            && let Some(personal_dir) = &self.personal_config_dir
            && let Some(personal) = self.factory.load_on_directory(
                personal_dir,
                LoadOptions {
                    name: Some("PersonalConfig"),
                    ..Default::default()
                },
            )?
        {
            return Ok(Arc::new(personal));
        }

        Ok(array)
    }

    /// The effective configuration at `dir`: its own config (if any)
    /// concatenated under its ancestors'. Memoized per directory, so a
    /// directory shared by many walks is normalized once and its array keeps
    /// one identity.
    pub fn config_for_directory(&self, dir: &Path) -> ConfigResult<Arc<ConfigArray>> {
        if let Some(hit) = self.directory_cache.borrow().get(dir) {
            return Ok(hit.clone());
        }

        let own = match self.factory.load_on_directory(dir, LoadOptions::default()) {
            Ok(own) => own,
            // The walk ends here as if it had reached the root.
            Err(ConfigError::PermissionDenied { .. }) => {
                let empty = Arc::new(ConfigArray::default());
                self.directory_cache
                    .borrow_mut()
                    .insert(dir.to_path_buf(), empty.clone());
                return Ok(empty);
            }
            Err(e) => return Err(e),
        };

        let result = match own {
            Some(own) if own.is_root() => Arc::new(own),
            own => {
                let ancestors = match dir.parent() {
                    Some(parent) => self.config_for_directory(parent)?,
                    None => Arc::new(ConfigArray::default()),
                };
                match own {
                    Some(own) => Arc::new(ConfigArray::with_parent(
                        own.into_elements(),
                        Some(&ancestors),
                    )),
                    None => ancestors,
                }
            }
        };

        self.directory_cache
            .borrow_mut()
            .insert(dir.to_path_buf(), result.clone());
        Ok(result)
    }
}

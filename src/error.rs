//! Error types for configuration loading, resolution and extraction.
//!
//! Structural problems (unreadable files, schema violations, unresolvable
//! `extends` names) fail eagerly. Problems that concern a specific plugin or
//! parser are stored on the reference that produced them and only surface
//! once that reference is actually used during extraction.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {cause}")]
    CannotReadConfig { path: PathBuf, cause: String },

    #[error("permission denied while reading {path}")]
    PermissionDenied { path: PathBuf },

    #[error("invalid config in {origin}: {detail}")]
    InvalidConfig { origin: String, detail: String },

    #[error("failed to extend config \"{name}\" referenced from {importer}")]
    ExtendConfigMissing { name: String, importer: String },

    #[error("failed to load plugin \"{long_name}\" declared in {importer_path}: {cause}")]
    PluginMissing {
        long_name: String,
        importer_path: PathBuf,
        cause: String,
    },

    #[error("failed to load parser \"{name}\" declared in {importer_path}: {cause}")]
    ParserMissing {
        name: String,
        importer_path: PathBuf,
        cause: String,
    },

    #[error("plugin \"{id}\" conflicts: loaded by both {first} and {second}")]
    PluginConflict {
        id: String,
        first: String,
        second: String,
    },

    #[error("processor \"{name}\" was not found")]
    ProcessorNotFound { name: String },

    #[error("invalid processor name \"{raw}\" (expected \"pluginId/processorName\")")]
    InvalidProcessorName { raw: String },

    #[error("invalid package name \"{name}\": {detail}")]
    InvalidPackageName { name: String, detail: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

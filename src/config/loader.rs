//! Reading [`EngineConfig`] from TOML.

use crate::config::schema::{EngineConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the workspace root when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = ".agent-patcher.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read engine config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine config{} is not valid TOML: {source}", origin(.path))]
    Syntax {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("Engine config{} rejected: {source}", origin(.path))]
    Invalid {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

/// Parse and validate, tagging errors with the file they came from.
fn parse(input: &str, file: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let path = || file.map(Path::to_path_buf);
    let config: EngineConfig = toml_edit::de::from_str(input).map_err(|source| {
        ConfigError::Syntax {
            path: path(),
            source,
        }
    })?;
    config.validate().map_err(|source| ConfigError::Invalid {
        path: path(),
        source,
    })?;
    Ok(config)
}

pub fn load_from_str(input: &str) -> Result<EngineConfig, ConfigError> {
    parse(input, None)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&input, Some(path))
}

/// Load `<workspace>/.agent-patcher.toml` if it exists, defaults otherwise.
pub fn load_for_workspace(workspace: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let candidate = workspace.as_ref().join(DEFAULT_CONFIG_FILE);
    if candidate.is_file() {
        load_from_path(candidate)
    } else {
        Ok(EngineConfig::default())
    }
}

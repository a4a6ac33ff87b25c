//! Configuration file resolution and TOML loading
//!
//! Resolution follows the same priority order for every jvmatch service:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`~/.config/jvmatch/<service>.toml`)
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a resolved configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserConfig(PathBuf),
    Defaults,
}

impl ConfigSource {
    /// Path of the TOML file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::CommandLine(p) | Self::Environment(p) | Self::UserConfig(p) => Some(p),
            Self::Defaults => None,
        }
    }
}

/// Resolve which config file (if any) a service should load
///
/// A CLI path or env var path that does not exist is an error: the operator asked
/// for that file explicitly. A missing per-user file silently falls back to defaults.
pub fn resolve_config_file(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    service_name: &str,
) -> Result<ConfigSource> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file given on command line not found: {}",
                path.display()
            )));
        }
        return Ok(ConfigSource::CommandLine(path.to_path_buf()));
    }

    // Priority 2: Environment variable
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            let path = PathBuf::from(value.trim());
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file from {} not found: {}",
                    env_var_name,
                    path.display()
                )));
            }
            return Ok(ConfigSource::Environment(path));
        }
    }

    // Priority 3: Per-user config file
    if let Some(path) = user_config_path(service_name) {
        if path.exists() {
            return Ok(ConfigSource::UserConfig(path));
        }
        debug!("No user config at {}", path.display());
    }

    // Priority 4: Compiled defaults
    Ok(ConfigSource::Defaults)
}

/// Per-user config file path for a service (`<config_dir>/jvmatch/<service>.toml`)
pub fn user_config_path(service_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("jvmatch").join(format!("{}.toml", service_name)))
}

/// Load a TOML config, falling back to `T::default()` when no file is resolved
pub fn load_toml_config<T>(source: &ConfigSource) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = source.path() else {
        info!("No config file found, using built-in defaults");
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Resolve a secret from environment first, then the TOML value
///
/// Returns `None` when neither source holds a usable (non-blank) value.
pub fn resolve_secret(env_var_name: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var_name).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} set in both environment and TOML config. Using environment (highest priority).",
            env_var_name
        );
    }

    env_value.or_else(|| toml_value.map(str::to_string))
}

/// Validate a key or secret (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

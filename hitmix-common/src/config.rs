//! Configuration file resolution and loading
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `<platform config dir>/hitmix/config.toml`
//! 4. None: caller falls back to compiled defaults
//!
//! An explicitly named file must load. The implicit platform file never
//! aborts startup: a broken one is logged and defaults are used.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "HITMIX_CONFIG";

/// Resolve which config file (if any) should be loaded
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Platform default config file location
///
/// Linux: `~/.config/hitmix/config.toml`, macOS:
/// `~/Library/Application Support/hitmix/config.toml`, Windows:
/// `%APPDATA%\hitmix\config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hitmix").join("config.toml"))
}

/// Parse a TOML config file into `T`
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    debug!("Loaded configuration from {}", path.display());
    Ok(parsed)
}

/// Resolve and load configuration, degrading to `T::default()`
///
/// An explicitly requested file (CLI or env) that fails to load is reported
/// as an error; the implicit platform file only warns.
pub fn load_config<T>(cli_arg: Option<&Path>, env_var_name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let explicit = cli_arg.is_some()
        || std::env::var(env_var_name)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);

    match resolve_config_path(cli_arg, env_var_name) {
        Some(path) => match load_toml_file::<T>(&path) {
            Ok(config) => Ok(config),
            Err(e) if explicit => Err(e),
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Ok(T::default())
            }
        },
        None => {
            debug!("No config file found, using compiled defaults");
            Ok(T::default())
        }
    }
}

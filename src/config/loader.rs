//! Configuration loading.
//!
//! Reads a YAML file, enforces a size limit, parses it into
//! [`BotConfig`], and runs semantic validation before handing the
//! result back behind an `Arc`.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ConfigError;

use super::schema::BotConfig;
use super::validation::validate;

/// Default maximum configuration file size in bytes (1 MiB).
pub const DEFAULT_MAX_CONFIG_SIZE: u64 = 1024 * 1024;

/// Environment variable overriding [`DEFAULT_MAX_CONFIG_SIZE`].
pub const MAX_CONFIG_SIZE_ENV: &str = "GUILDHALL_MAX_CONFIG_SIZE";

/// Loads, parses, and validates a configuration file.
///
/// # Errors
///
/// Returns a [`ConfigError`] for a missing or oversized file, an
/// unreadable file, malformed YAML, or a semantically invalid document.
pub fn load_config(path: &Path) -> Result<Arc<BotConfig>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let limit = env_or(MAX_CONFIG_SIZE_ENV, DEFAULT_MAX_CONFIG_SIZE);
    let size = std::fs::metadata(path)
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if size > limit {
        return Err(ConfigError::TooLarge { size, limit });
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: BotConfig =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    validate(&config)?;

    debug!(path = %path.display(), guild = %config.guild, "configuration loaded");
    Ok(Arc::new(config))
}

/// Reads an environment variable, parsing it to type `T`, or returns the default.
///
/// Logs a warning if the variable is set but cannot be parsed.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            warn!(name, value = %v, "invalid env var value, using default");
            default
        }),
        Err(_) => default,
    }
}

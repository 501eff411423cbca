//! Harvest configuration loading
//!
//! A harvest file has `[crawler]`, `[user-agent]` and `[output]` tables, an
//! optional `[filter]` table and any number of `[[seed]]` entries. Keys are
//! kebab-case.

use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads a harvest file, deserializes it and validates every section
///
/// Missing optional keys take their defaults (`[filter]` falls back to the
/// subdomain policy and the built-in ignored extensions).
///
/// # Arguments
///
/// * `path` - Path to the harvest TOML file
///
/// # Returns
///
/// * `Ok(Config)` - The validated configuration
/// * `Err(ConfigError::Io)` - The file could not be read
/// * `Err(ConfigError::Parse)` - The TOML is malformed or a key has the wrong type
/// * `Err(ConfigError::Validation | ConfigError::InvalidUrl)` - A value is out of range or a seed is unusable
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use site_harvester::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;

    Ok(config)
}

/// Hex SHA-256 of the raw harvest file
///
/// Stored with every run in the run log, so `--stats` can tell which
/// settings produced a run.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a harvest file together with the hash recorded for its runs
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

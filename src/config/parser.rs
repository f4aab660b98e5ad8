use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Reads a harvest configuration from TOML and validates it
///
/// Fails with [`ConfigError::Io`] when the file cannot be read, with
/// [`ConfigError::Parse`] on malformed TOML and with a validation error when
/// a value is out of range.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash over the configuration file and, when configured,
/// the external rules file
///
/// Stored on every run so a run can be traced back to the selectors that
/// produced it.
pub fn compute_config_hash(path: &Path, rules_path: Option<&Path>) -> Result<String, ConfigError> {
    let mut hasher = Sha256::new();
    hasher.update(std::fs::read(path)?);

    if let Some(rules_path) = rules_path {
        hasher.update(std::fs::read(rules_path)?);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// [`load_config`] plus the hash recorded on the run row
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path, config.rules.path.as_deref().map(Path::new))?;
    Ok((config, hash))
}

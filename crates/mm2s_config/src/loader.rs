//! Configuration file loading and validation.

use std::path::Path;

use crate::error::ConfigError;
use crate::types::{HarnessConfig, SuiteConfig};

/// File name looked up in the working directory when no path is given.
pub const CONFIG_FILE_NAME: &str = "mm2s.toml";

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates an `mm2s.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<HarnessConfig, ConfigError> {
    let config: HarnessConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Resolves the configuration the harness should run with.
///
/// An explicit path must exist. Without one, `mm2s.toml` in `dir` is used if
/// present, otherwise the built-in defaults.
pub fn load_or_default(explicit: Option<&Path>, dir: &Path) -> Result<HarnessConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let candidate = dir.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        load_config(&candidate)
    } else {
        Ok(HarnessConfig::default())
    }
}

/// Checks values that deserialization alone cannot constrain.
pub fn validate_config(config: &HarnessConfig) -> Result<(), ConfigError> {
    validate_suite("protocol", &config.suites.protocol)?;
    validate_suite("traffic", &config.suites.traffic)?;
    if config.trace.enabled && config.trace.dir.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("trace.dir".to_string()));
    }
    Ok(())
}

fn validate_suite(name: &str, suite: &SuiteConfig) -> Result<(), ConfigError> {
    if suite.trace_name.trim().is_empty() {
        return Err(ConfigError::MissingField(format!(
            "suites.{name}.trace_name"
        )));
    }
    if suite.time_budget == 0 {
        return Err(ConfigError::ValidationError(format!(
            "suites.{name}.time_budget must be positive"
        )));
    }
    Ok(())
}

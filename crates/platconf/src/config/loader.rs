use std::path::Path;

use crate::config::schema::RunConfig;
use crate::error::ConfigError;

/// Loads a run configuration. `.json` files are read as JSON, everything else as YAML.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        let config: RunConfig = serde_json::from_str(&content)?;
        validate_config(&config)?;
        Ok(config)
    } else {
        load_config_from_str(&content)
    }
}

/// Parses a YAML run configuration and validates it.
pub fn load_config_from_str(content: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig = serde_yaml::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Checks what can be checked without knowing the backend.
pub fn validate_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.application.trim().is_empty() {
        return Err(ConfigError::MissingField("application"));
    }

    if config.endpoint.trim().is_empty() {
        return Err(ConfigError::MissingField("endpoint"));
    }
    config.endpoint_url()?;

    if config.method.trim().is_empty() {
        return Err(ConfigError::MissingField("method"));
    }

    for set in config.all_file_sets() {
        for pattern in &set.includes {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::InvalidPattern {
                    kind: "include",
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
        for pattern in &set.excludes {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::InvalidPattern {
                    kind: "exclude",
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(())
}

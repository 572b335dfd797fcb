//! Secret indirection for configured credentials.
//!
//! A secret such as the `password` entry of the authorization map can be given
//! in three ways, resolved in this order:
//!
//! 1. **Direct value** - `password: "s3cret"`
//! 2. **File reference** - `passwordFile: /run/secrets/keycloak` (contents are trimmed)
//! 3. **Env var reference** - `passwordEnvVar: KEYCLOAK_ADMIN_PASSWORD`

use std::collections::BTreeMap;
use std::fs;

use secrecy::SecretString;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a direct value, a file or an environment variable,
/// in that priority order. Empty sources are ignored.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|source| SecretError::FileReadError {
                path: expanded,
                source,
            });
    }

    if let Some(name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Resolves `key` from a configuration map, honouring the `<key>File` and
/// `<key>EnvVar` indirections. Returns `None` when none of them is present.
pub fn resolve_keyed_secret(
    values: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<SecretString>> {
    let file_key = format!("{key}File");
    let env_key = format!("{key}EnvVar");
    match resolve_secret(
        values.get(key).map(String::as_str),
        values.get(&file_key).map(String::as_str),
        values.get(&env_key).map(String::as_str),
    ) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Expands a leading `~` to the user's home directory (HOME, then USERPROFILE).
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

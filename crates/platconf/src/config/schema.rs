use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use reqwest::Url;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::secrets::{resolve_secret, SecretError};

/// Description of one provisioning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Backend selector, matched case-insensitively (e.g. `keycloak`, `postgres`).
    pub application: String,
    #[serde(default)]
    pub resource: String,
    pub endpoint: String,
    #[serde(default)]
    pub authorization: BTreeMap<String, String>,
    #[serde(default)]
    pub file_set: Option<FileSetConfig>,
    #[serde(default)]
    pub file_sets: Vec<FileSetConfig>,
    /// Comma separated realm names.
    #[serde(default)]
    pub realms: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub bucket: String,
    /// Keep the file set layout in object keys instead of flattening to the file name.
    #[serde(default)]
    pub relative: bool,
    #[serde(default)]
    pub resource_name: String,
    #[serde(default)]
    pub resource_password: Option<String>,
    #[serde(default)]
    pub resource_password_file: Option<String>,
    #[serde(default)]
    pub resource_password_env_var: Option<String>,
    /// Build properties available to `${...}` placeholders.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub form_params: BTreeMap<String, String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub auth_scheme: AuthScheme,
    #[serde(default)]
    pub bucket_policy: BucketPolicy,
}

fn default_method() -> String {
    "POST".to_string()
}

impl RunConfig {
    /// All configured file sets: `fileSets` first, then the single `fileSet`.
    pub fn all_file_sets(&self) -> Vec<&FileSetConfig> {
        self.file_sets.iter().chain(self.file_set.iter()).collect()
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })
    }

    /// Password used when creating a database user. Empty when none is configured.
    pub fn resource_password(&self) -> Result<SecretString, SecretError> {
        match resolve_secret(
            self.resource_password.as_deref(),
            self.resource_password_file.as_deref(),
            self.resource_password_env_var.as_deref(),
        ) {
            Ok(secret) => Ok(secret),
            Err(SecretError::NoSourceProvided) => Ok(SecretString::from(String::new())),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSetConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

/// Run-wide switch: every resource of a run is either created or deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    #[serde(rename = "create", alias = "CREATE", alias = "Create")]
    Create,
    #[serde(rename = "delete", alias = "DELETE", alias = "Delete")]
    Delete,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Create => write!(f, "CREATE"),
            Mode::Delete => write!(f, "DELETE"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Mode::Create),
            "delete" => Ok(Mode::Delete),
            other => Err(ConfigError::Validation {
                message: format!("Unknown mode '{}', must be one of: [create, delete]", other),
            }),
        }
    }
}

/// What to do when the target bucket already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketPolicy {
    /// Log and keep uploading into the existing bucket.
    #[default]
    Tolerant,
    /// Abort the run before any upload.
    Strict,
}

/// Authorization header used by the generic REST backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// Password-grant token from the identity service.
    Bearer,
    #[default]
    Basic,
    None,
}

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatconfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Items(#[from] FailedItems),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Tag '{0}' has to be defined in configuration")]
    MissingField(&'static str),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Unsupported application '{value}', must be one of: [{allowed}]")]
    UnsupportedBackend { value: String, allowed: String },

    #[error("Tag 'resource' for application '{backend}' must be one of the values: [{allowed}], got '{value}'")]
    UnsupportedResource {
        backend: String,
        value: String,
        allowed: String,
    },

    #[error("No placeholder symbol '{placeholder}' for realms found in '{template}'")]
    NoPlaceholder {
        placeholder: &'static str,
        template: String,
    },

    #[error("No realms are defined but '{template}' contains the placeholder '{placeholder}'")]
    NoRealms {
        placeholder: &'static str,
        template: String,
    },

    #[error("It is not possible to declare simultaneously form parameters and file sets")]
    FormParamsWithFileSets,

    #[error("Unable to list files of file set '{directory}': {source}")]
    FileSet {
        directory: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid {kind} pattern '{pattern}': {reason}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("Bucket '{0}' already exists")]
    BucketExists(String),

    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AuthorizationError {
    #[error("Tag '{0}' has to be defined in authorization")]
    MissingKey(&'static str),

    #[error("Failed to resolve secret for '{key}': {source}")]
    Secret {
        key: String,
        #[source]
        source: crate::secrets::SecretError,
    },

    #[error("Token request to '{endpoint}' failed with status {status} (parameters: {params})")]
    TokenRejected {
        endpoint: String,
        status: u16,
        params: String,
    },

    #[error("Failed to parse token response from '{endpoint}': {message}")]
    InvalidTokenResponse { endpoint: String, message: String },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),

    #[error("Unable to reach '{endpoint}': {message}")]
    Unreachable { endpoint: String, message: String },

    #[error("Failed to connect to database with url: [{url}]: {message}")]
    DatabaseConnect { url: String, message: String },

    #[error("Lost database connection: {0}")]
    DatabaseConnection(String),

    #[error("Object store client error: {0}")]
    ObjectStore(String),
}

/// Failure of a single resource. Recorded and reported at the end of the run
/// unless [`ItemError::is_fatal`] says otherwise.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to parse '{file}': {message}")]
    Parse { file: String, message: String },

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to execute statement: {0}")]
    Statement(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ItemError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ItemError::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Transport failures cannot be recovered by moving on to the next item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ItemError::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ItemError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One recorded per-item failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationError {
    pub resource: String,
    pub status: Option<u16>,
    pub message: String,
}

impl ReconciliationError {
    pub fn new(resource: impl Into<String>, error: &ItemError) -> Self {
        let message = match error {
            ItemError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            resource: resource.into(),
            status: error.status(),
            message,
        }
    }
}

impl fmt::Display for ReconciliationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{}: [{}:{}]", self.resource, status, self.message),
            None => write!(f, "{}: [{}]", self.resource, self.message),
        }
    }
}

/// Every per-item failure of a run, in the order encountered.
#[derive(Error, Debug)]
pub struct FailedItems(pub Vec<ReconciliationError>);

impl fmt::Display for FailedItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to process {} resource(s):", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, PlatconfError>;

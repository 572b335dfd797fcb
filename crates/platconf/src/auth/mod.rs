//! Credentials for the backends.
//!
//! A credential is acquired once per run and attached to every request of that
//! run as an `Authorization` header value.

pub mod basic;
pub mod password_grant;

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::error::AuthorizationError;
use crate::secrets::resolve_keyed_secret;

pub use basic::basic_credential;
pub use password_grant::{request_token, TokenResponse, TOKEN_PATH};

pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";

/// Authorization parameters of a run.
///
/// `username` and `password` are mandatory; every other key is passed along
/// unchanged (e.g. `client_id`, `grant_type`, `region`).
#[derive(Clone)]
pub struct AuthParams {
    username: String,
    password: SecretString,
    extra: BTreeMap<String, String>,
}

impl AuthParams {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            extra: BTreeMap::new(),
        }
    }

    /// Builds the parameters from the configured `authorization` map.
    ///
    /// The password may be given through `passwordFile` or `passwordEnvVar`.
    pub fn from_map(values: &BTreeMap<String, String>) -> Result<Self, AuthorizationError> {
        let username = values
            .get(USERNAME)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or(AuthorizationError::MissingKey(USERNAME))?;

        let password = resolve_keyed_secret(values, PASSWORD)
            .map_err(|source| AuthorizationError::Secret {
                key: PASSWORD.to_string(),
                source,
            })?
            .ok_or(AuthorizationError::MissingKey(PASSWORD))?;

        let extra = values
            .iter()
            .filter(|(key, _)| !is_credential_key(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Self {
            username,
            password,
            extra,
        })
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }
}

fn is_credential_key(key: &str) -> bool {
    matches!(
        key,
        USERNAME | PASSWORD | "passwordFile" | "passwordEnvVar"
    )
}

impl fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthParams")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("extra", &self.extra)
            .finish()
    }
}

/// Scheme and token sent as `Authorization: <scheme> <token>`.
#[derive(Clone)]
pub struct AccessCredential {
    scheme: String,
    token: SecretString,
}

impl AccessCredential {
    pub fn new(scheme: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            token: SecretString::from(token.into()),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme, self.token.expose_secret())
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCredential")
            .field("scheme", &self.scheme)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_map_requires_username() {
        let result = AuthParams::from_map(&map(&[("password", "secret")]));
        assert!(matches!(
            result,
            Err(AuthorizationError::MissingKey(USERNAME))
        ));
    }

    #[test]
    fn test_from_map_requires_password() {
        let result = AuthParams::from_map(&map(&[("username", "admin")]));
        assert!(matches!(
            result,
            Err(AuthorizationError::MissingKey(PASSWORD))
        ));
    }

    #[test]
    fn test_from_map_keeps_extra_keys() {
        let params = AuthParams::from_map(&map(&[
            ("username", "admin"),
            ("password", "secret"),
            ("client_id", "ops-cli"),
        ]))
        .unwrap();
        assert_eq!(params.username(), "admin");
        assert_eq!(params.password().expose_secret(), "secret");
        assert_eq!(params.get("client_id"), Some("ops-cli"));
        assert_eq!(params.get("password"), None);
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let params = AuthParams::new("admin", "hunter2");
        let credential = AccessCredential::new("Bearer", "tok-123");
        assert!(!format!("{:?}", params).contains("hunter2"));
        assert!(!format!("{:?}", credential).contains("tok-123"));
    }

    #[test]
    fn test_header_value() {
        let credential = AccessCredential::new("Bearer", "abc");
        assert_eq!(credential.header_value(), "Bearer abc");
    }
}

//! Shared HTTP plumbing for the REST based backends.

use std::time::Duration;

use reqwest::{Client, Response, Url};

use crate::error::{ConfigError, ItemError, TransportError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum length of a response body quoted in an error.
const MAX_ERROR_BODY_LENGTH: usize = 200;

pub fn build_client() -> Result<Client, TransportError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("platconf/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TransportError::HttpClient(e.to_string()))
}

/// Appends a relative resource path to the endpoint, keeping the endpoint's own path.
pub fn join(endpoint: &Url, path: &str) -> Result<Url, ConfigError> {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: format!("{}{}", base, path),
            reason: e.to_string(),
        })
}

/// Appends percent-encoded path segments to `url`.
pub fn with_segments(url: &Url, segments: &[&str]) -> Result<Url, ItemError> {
    let mut joined = url.clone();
    joined
        .path_segments_mut()
        .map_err(|_| ItemError::Invalid(format!("'{}' cannot carry a path", url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(joined)
}

/// The endpoint could not be reached at all.
pub fn unreachable(url: &Url, error: reqwest::Error) -> TransportError {
    TransportError::Unreachable {
        endpoint: url.to_string(),
        message: error.to_string(),
    }
}

/// Passes 2xx responses through, turns everything else into [`ItemError::Rejected`].
pub async fn check_status(response: Response) -> Result<Response, ItemError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("Unknown").to_string()
    } else {
        truncate(body.trim())
    };
    Err(ItemError::rejected(status.as_u16(), message))
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_keeps_endpoint_path() {
        let endpoint = Url::parse("http://rabbit:15672/mgmt").unwrap();
        let url = join(&endpoint, "api/queues/orders").unwrap();
        assert_eq!(url.as_str(), "http://rabbit:15672/mgmt/api/queues/orders");
    }

    #[test]
    fn test_join_root_endpoint() {
        let endpoint = Url::parse("http://localhost:8080").unwrap();
        let url = join(&endpoint, "/auth/admin/realms").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/auth/admin/realms");
    }

    #[test]
    fn test_with_segments_encodes() {
        let base = Url::parse("http://localhost/auth/admin/realms/r1/roles").unwrap();
        let url = with_segments(&base, &["app admin"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost/auth/admin/realms/r1/roles/app%20admin"
        );
    }

    #[test]
    fn test_truncate_long_body() {
        let long = "x".repeat(500);
        let result = truncate(&long);
        assert!(result.ends_with("(truncated)"));
        assert!(result.len() < 250);
    }
}

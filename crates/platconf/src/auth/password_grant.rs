//! OAuth2 resource owner password grant against the identity service.

use std::collections::BTreeMap;

use log::{debug, info};
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::error::{AuthorizationError, Result};
use crate::http;

use super::{AccessCredential, AuthParams, PASSWORD, USERNAME};

/// Token endpoint of the administrative realm, relative to the service root.
pub const TOKEN_PATH: &str = "auth/realms/master/protocol/openid-connect/token";

pub const DEFAULT_GRANT_TYPE: &str = "password";
pub const DEFAULT_CLIENT_ID: &str = "admin-cli";

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub expires_in: Option<u64>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,
}

impl From<TokenResponse> for AccessCredential {
    fn from(response: TokenResponse) -> Self {
        let scheme = response
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
        AccessCredential::new(scheme, response.access_token)
    }
}

/// Requests an access token with the password grant.
///
/// `grant_type` and `client_id` default to `password` and `admin-cli` unless
/// the parameters set them.
pub async fn request_token(
    client: &Client,
    endpoint: &Url,
    params: &AuthParams,
) -> Result<AccessCredential> {
    let url = http::join(endpoint, TOKEN_PATH)?;
    let form = form_params(params);

    info!("Requesting access token from {}", url);

    let response = client
        .post(url.clone())
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| http::unreachable(&url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AuthorizationError::TokenRejected {
            endpoint: url.to_string(),
            status: status.as_u16(),
            params: redacted(&form),
        }
        .into());
    }

    let token: TokenResponse =
        response
            .json()
            .await
            .map_err(|e| AuthorizationError::InvalidTokenResponse {
                endpoint: url.to_string(),
                message: e.to_string(),
            })?;

    debug!(
        "Access token received (type: {}, expires in: {:?}s)",
        token.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE),
        token.expires_in
    );

    Ok(token.into())
}

/// Optional password grant fields taken over from the authorization parameters.
const GRANT_FIELDS: [&str; 4] = ["grant_type", "client_id", "client_secret", "scope"];

fn form_params(params: &AuthParams) -> BTreeMap<String, String> {
    let mut form: BTreeMap<String, String> = GRANT_FIELDS
        .iter()
        .filter_map(|field| params.get(field).map(|value| (field.to_string(), value.to_string())))
        .collect();
    form.insert(USERNAME.to_string(), params.username().to_string());
    form.insert(
        PASSWORD.to_string(),
        params.password().expose_secret().to_string(),
    );
    form.entry("grant_type".to_string())
        .or_insert_with(|| DEFAULT_GRANT_TYPE.to_string());
    form.entry("client_id".to_string())
        .or_insert_with(|| DEFAULT_CLIENT_ID.to_string());
    form
}

fn redacted(form: &BTreeMap<String, String>) -> String {
    form.iter()
        .map(|(key, value)| {
            if key == PASSWORD {
                format!("{}=*****", key)
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

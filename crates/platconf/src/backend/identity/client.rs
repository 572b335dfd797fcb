//! Thin authenticated client for the identity service's admin REST API.

use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::AccessCredential;
use crate::backend::kind::IDENTITY_ADMIN_PATH;
use crate::error::ItemError;
use crate::http;

use super::model::{ClientRepresentation, RoleRepresentation};

pub struct AdminClient {
    http: Client,
    endpoint: Url,
    credential: AccessCredential,
}

impl AdminClient {
    pub fn new(http: Client, endpoint: Url, credential: AccessCredential) -> Self {
        Self {
            http,
            endpoint,
            credential,
        }
    }

    /// Endpoint joined with a relative admin path.
    pub fn url(&self, path: &str) -> Result<Url, ItemError> {
        http::join(&self.endpoint, path).map_err(|e| ItemError::Invalid(e.to_string()))
    }

    /// `auth/admin/realms/<realm>`
    pub fn realm_url(&self, realm: &str) -> Result<Url, ItemError> {
        http::with_segments(&self.url(IDENTITY_ADMIN_PATH)?, &[realm])
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, ItemError> {
        request
            .header(reqwest::header::AUTHORIZATION, self.credential.header_value())
            .send()
            .await
            .map_err(|e| http::unreachable(url, e).into())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ItemError> {
        debug!("GET {}", url);
        let response = self.send(self.http.get(url.clone()), &url).await?;
        let response = http::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ItemError::Invalid(format!("unexpected response from '{}': {}", url, e)))
    }

    /// Like [`get_json`](Self::get_json), with `404 Not Found` as `None`.
    pub async fn get_optional<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, ItemError> {
        debug!("GET {}", url);
        let response = self.send(self.http.get(url.clone()), &url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = http::check_status(response).await?;
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| ItemError::Invalid(format!("unexpected response from '{}': {}", url, e)))
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<(), ItemError> {
        debug!("POST {}", url);
        let response = self.send(self.http.post(url.clone()).json(body), &url).await?;
        http::check_status(response).await.map(|_| ())
    }

    pub async fn delete(&self, url: Url) -> Result<(), ItemError> {
        debug!("DELETE {}", url);
        let response = self.send(self.http.delete(url.clone()), &url).await?;
        http::check_status(response).await.map(|_| ())
    }

    pub async fn realm_exists(&self, realm: &str) -> Result<bool, ItemError> {
        let url = self.realm_url(realm)?;
        Ok(self
            .get_optional::<serde_json::Value>(url)
            .await?
            .is_some())
    }

    /// Clients of `realm` with the given `clientId`.
    pub async fn find_clients(&self, realm: &str, client_id: &str) -> Result<Vec<ClientRepresentation>, ItemError> {
        let mut url = http::with_segments(&self.realm_url(realm)?, &["clients"])?;
        url.query_pairs_mut().append_pair("clientId", client_id);
        self.get_json(url).await
    }

    /// Internal id of the client with `client_id`.
    pub async fn client_uuid(&self, realm: &str, client_id: &str) -> Result<String, ItemError> {
        self.find_clients(realm, client_id)
            .await?
            .into_iter()
            .find_map(|client| client.id)
            .ok_or_else(|| ItemError::Invalid(format!("client '{}' not found in realm '{}'", client_id, realm)))
    }

    pub async fn realm_role(&self, realm: &str, name: &str) -> Result<RoleRepresentation, ItemError> {
        let url = http::with_segments(&self.realm_url(realm)?, &["roles", name])?;
        self.get_optional(url)
            .await?
            .ok_or_else(|| ItemError::Invalid(format!("role '{}' not found in realm '{}'", name, realm)))
    }

    pub async fn client_role(
        &self,
        realm: &str,
        client_uuid: &str,
        client_id: &str,
        name: &str,
    ) -> Result<RoleRepresentation, ItemError> {
        let url = http::with_segments(&self.realm_url(realm)?, &["clients", client_uuid, "roles", name])?;
        self.get_optional(url).await?.ok_or_else(|| {
            ItemError::Invalid(format!("role '{}' not found for client '{}'", name, client_id))
        })
    }
}

//! Plain REST requests against realm-expanded resource paths.
//!
//! Every resolved file is sent as a JSON body, or, with form parameters
//! configured, one form-encoded body per path. The request method is
//! configured; the run mode does not change it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::info;
use reqwest::{Client, Method, Url};

use crate::auth::AccessCredential;
use crate::config::{Mode, Resolver};
use crate::error::{ConfigError, ItemError};
use crate::http;

use super::{Outcome, ResourceStrategy, WorkItem};

pub struct RestStrategy {
    client: Client,
    endpoint: Url,
    credential: Option<AccessCredential>,
    method: Method,
    form_params: BTreeMap<String, String>,
    properties: BTreeMap<String, String>,
    environment: BTreeMap<String, String>,
}

impl RestStrategy {
    pub fn new(
        client: Client,
        endpoint: Url,
        credential: Option<AccessCredential>,
        method: &str,
        form_params: BTreeMap<String, String>,
        properties: BTreeMap<String, String>,
        environment: BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
            ConfigError::Validation {
                message: format!("Unsupported HTTP method '{}'", method),
            }
        })?;

        Ok(Self {
            client,
            endpoint,
            credential,
            method,
            form_params,
            properties,
            environment,
        })
    }

    async fn send(&self, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        let url = http::join(&self.endpoint, &item.path.path).map_err(|e| ItemError::Invalid(e.to_string()))?;
        info!("Endpoint: [{} {}]", self.method, url);

        let mut request = self.client.request(self.method.clone(), url.clone());
        if let Some(credential) = &self.credential {
            request = request.header(reqwest::header::AUTHORIZATION, credential.header_value());
        }

        request = match item.descriptor {
            Some(_) => {
                let text = item.read_text().await?;
                let resolver = Resolver::Environment {
                    properties: &self.properties,
                    environment: &self.environment,
                };
                request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(resolver.apply(&text))
            }
            None => request.form(&self.form_params),
        };

        let response = request.send().await.map_err(|e| http::unreachable(&url, e))?;
        http::check_status(response).await?;
        Ok(Outcome::Executed)
    }
}

#[async_trait]
impl ResourceStrategy for RestStrategy {
    async fn exists(&mut self, _item: &WorkItem<'_>) -> Result<bool, ItemError> {
        Ok(false)
    }

    async fn create(&mut self, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        self.send(item).await
    }

    async fn delete(&mut self, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        self.send(item).await
    }

    async fn apply(&mut self, _mode: Mode, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        self.send(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_is_case_insensitive() {
        let strategy = RestStrategy::new(
            Client::new(),
            Url::parse("http://api").unwrap(),
            None,
            "put",
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(strategy.method, Method::PUT);
    }

    #[test]
    fn test_invalid_method_rejected() {
        let result = RestStrategy::new(
            Client::new(),
            Url::parse("http://api").unwrap(),
            None,
            "GET POST",
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}

//! Message broker queues through the management HTTP API.

use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Client, StatusCode, Url};

use crate::auth::AccessCredential;
use crate::config::Mode;
use crate::error::ItemError;
use crate::http;

use super::{Outcome, ResourceStrategy, WorkItem};

pub const QUEUES_PATH: &str = "api/queues";

pub struct QueueStrategy {
    client: Client,
    endpoint: Url,
    credential: AccessCredential,
}

impl QueueStrategy {
    pub fn new(client: Client, endpoint: Url, credential: AccessCredential) -> Self {
        Self {
            client,
            endpoint,
            credential,
        }
    }

    /// `name` may carry a percent-encoded virtual host prefix, e.g. `%2F/orders`.
    /// Both parts are sent as single path segments.
    fn queue_url(&self, name: &str) -> Result<Url, ItemError> {
        let base = http::join(&self.endpoint, QUEUES_PATH)
            .map_err(|e| ItemError::Invalid(e.to_string()))?;
        match name.split_once('/') {
            Some((vhost, queue)) => {
                let vhost = urlencoding::decode(vhost).map_err(|e| {
                    ItemError::Invalid(format!("virtual host '{}' is not valid UTF-8: {}", vhost, e))
                })?;
                http::with_segments(&base, &[vhost.as_ref(), queue])
            }
            None => http::with_segments(&base, &[name]),
        }
    }

    async fn send(&self, mode: Mode, name: &str) -> Result<Outcome, ItemError> {
        let url = self.queue_url(name)?;
        let request = match mode {
            Mode::Create => self
                .client
                .put(url.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body("{}"),
            Mode::Delete => self.client.delete(url.clone()),
        };

        let response = request
            .header(reqwest::header::AUTHORIZATION, self.credential.header_value())
            .send()
            .await
            .map_err(|e| http::unreachable(&url, e))?;

        let status = response.status();
        if mode == Mode::Delete && status == StatusCode::NOT_FOUND {
            info!("{} [QUEUE] with name [{}]: queue does not exist", mode, name);
            return Ok(Outcome::Absent);
        }

        match http::check_status(response).await {
            Ok(_) => {
                info!(
                    "{} [QUEUE] with name [{}] was successful, status code: [{}]",
                    mode,
                    name,
                    status.as_u16()
                );
                Ok(match mode {
                    Mode::Create => Outcome::Created,
                    Mode::Delete => Outcome::Deleted,
                })
            }
            Err(e) => {
                warn!(
                    "{} [QUEUE] with name [{}] was not successful, error code: [{}]",
                    mode,
                    name,
                    status.as_u16()
                );
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ResourceStrategy for QueueStrategy {
    /// Queue creation is an idempotent PUT and deleting a missing queue is
    /// answered with 404, so there is nothing to check first.
    async fn exists(&mut self, _item: &WorkItem<'_>) -> Result<bool, ItemError> {
        Ok(false)
    }

    async fn create(&mut self, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        self.send(Mode::Create, &item.path.path).await
    }

    async fn delete(&mut self, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        self.send(Mode::Delete, &item.path.path).await
    }
}

//! Construction of the non-HTTP transport sessions a run needs.

use async_trait::async_trait;
use reqwest::Url;

use crate::auth::AuthParams;
use crate::backend::{ObjectStore, S3ObjectStore, SeaOrmSession, SqlSession};
use crate::error::TransportError;

/// Opens database sessions and object store handles.
///
/// HTTP backends talk to the configured endpoint directly; this seam covers
/// the clients that are not plain HTTP.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn sql_session(&self, url: &str, params: &AuthParams) -> Result<Box<dyn SqlSession>, TransportError>;

    async fn object_store(
        &self,
        endpoint: &Url,
        bucket: &str,
        params: &AuthParams,
    ) -> Result<Box<dyn ObjectStore>, TransportError>;
}

/// PostgreSQL through SeaORM and S3 through `rust-s3`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConnector;

#[async_trait]
impl Connector for DefaultConnector {
    async fn sql_session(&self, url: &str, params: &AuthParams) -> Result<Box<dyn SqlSession>, TransportError> {
        let session = SeaOrmSession::connect(url, params).await?;
        Ok(Box::new(session))
    }

    async fn object_store(
        &self,
        endpoint: &Url,
        bucket: &str,
        params: &AuthParams,
    ) -> Result<Box<dyn ObjectStore>, TransportError> {
        let store = S3ObjectStore::new(endpoint, bucket, params)?;
        Ok(Box::new(store))
    }
}

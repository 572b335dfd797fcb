//! File uploads into an S3 compatible bucket.
//!
//! Existence is checked once per run on the bucket, never per object.

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Url;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use secrecy::ExposeSecret;

use crate::auth::AuthParams;
use crate::config::{BucketPolicy, Mode};
use crate::error::{ConfigError, ItemError, Result, TransportError};
use crate::resource::ResourceDescriptor;

use super::{Outcome, ResourceStrategy, WorkItem};

const DEFAULT_REGION: &str = "us-east-1";

#[async_trait]
pub trait ObjectStore: Send {
    async fn bucket_exists(&mut self) -> std::result::Result<bool, TransportError>;

    async fn make_bucket(&mut self) -> std::result::Result<(), TransportError>;

    async fn put_object(&mut self, key: &str, content: Vec<u8>) -> std::result::Result<(), ItemError>;

    /// Removes `key`. Removing a missing key succeeds.
    async fn remove_object(&mut self, key: &str) -> std::result::Result<(), ItemError>;
}

/// [`ObjectStore`] over `rust-s3` with path style addressing.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    name: String,
    region: Region,
    credentials: Credentials,
}

impl S3ObjectStore {
    /// The region defaults to `us-east-1` unless the authorization map has a `region` key.
    pub fn new(endpoint: &Url, bucket: &str, params: &AuthParams) -> std::result::Result<Self, TransportError> {
        let region = Region::Custom {
            region: params.get("region").unwrap_or(DEFAULT_REGION).to_string(),
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
        };
        let credentials = Credentials::new(
            Some(params.username()),
            Some(params.password().expose_secret()),
            None,
            None,
            None,
        )
        .map_err(|e| TransportError::ObjectStore(e.to_string()))?;

        let handle = Bucket::new(bucket, region.clone(), credentials.clone())
            .map_err(object_store_error)?
            .with_path_style();

        Ok(Self {
            bucket: handle,
            name: bucket.to_string(),
            region,
            credentials,
        })
    }
}

fn object_store_error(error: S3Error) -> TransportError {
    TransportError::ObjectStore(error.to_string())
}

/// Only a lost or refused connection is fatal; anything else concerns the one object.
fn item_error(error: S3Error) -> ItemError {
    match error {
        S3Error::HttpFailWithBody(status, body) => ItemError::rejected(status, body),
        S3Error::Hyper(e) if e.is_connect() || e.is_closed() || e.is_timeout() => {
            TransportError::ObjectStore(e.to_string()).into()
        }
        S3Error::Io(e) if is_connection_loss(e.kind()) => {
            TransportError::ObjectStore(e.to_string()).into()
        }
        other => ItemError::Invalid(other.to_string()),
    }
}

fn is_connection_loss(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind::*;
    matches!(
        kind,
        ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected | BrokenPipe | TimedOut
    )
}

fn check_status(status: u16, key: &str) -> std::result::Result<(), ItemError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(ItemError::rejected(status, format!("request for '{}' was rejected", key)))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&mut self) -> std::result::Result<bool, TransportError> {
        self.bucket.exists().await.map_err(object_store_error)
    }

    async fn make_bucket(&mut self) -> std::result::Result<(), TransportError> {
        let response = Bucket::create_with_path_style(
            &self.name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(object_store_error)?;

        if response.success() {
            Ok(())
        } else {
            Err(TransportError::ObjectStore(format!(
                "creating bucket '{}' failed with status {}: {}",
                self.name, response.response_code, response.response_text
            )))
        }
    }

    async fn put_object(&mut self, key: &str, content: Vec<u8>) -> std::result::Result<(), ItemError> {
        let response = self.bucket.put_object(key, &content).await.map_err(item_error)?;
        check_status(response.status_code(), key)
    }

    async fn remove_object(&mut self, key: &str) -> std::result::Result<(), ItemError> {
        let response = self.bucket.delete_object(key).await.map_err(item_error)?;
        match response.status_code() {
            404 => Ok(()),
            status => check_status(status, key),
        }
    }
}

/// Object key of a file: `<prefix>/<relative path>` when the layout is kept,
/// `<prefix>/<file name>` otherwise. An empty prefix is left out.
pub fn object_key(prefix: &str, descriptor: &ResourceDescriptor, keep_layout: bool) -> String {
    let component = if keep_layout {
        descriptor.relative_path().to_string()
    } else {
        descriptor.file_name()
    };
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        component
    } else {
        format!("{}/{}", prefix, component)
    }
}

pub struct ObjectStoreStrategy {
    store: Box<dyn ObjectStore>,
    bucket: String,
    policy: BucketPolicy,
    keep_layout: bool,
    bucket_present: bool,
}

impl ObjectStoreStrategy {
    pub fn new(
        store: Box<dyn ObjectStore>,
        bucket: impl Into<String>,
        policy: BucketPolicy,
        keep_layout: bool,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            policy,
            keep_layout,
            bucket_present: false,
        }
    }

    fn key(&self, item: &WorkItem<'_>) -> std::result::Result<String, ItemError> {
        Ok(object_key(&item.path.path, item.file()?, self.keep_layout))
    }
}

#[async_trait]
impl ResourceStrategy for ObjectStoreStrategy {
    async fn prepare(&mut self, mode: Mode) -> Result<()> {
        let exists = self.store.bucket_exists().await?;

        match (mode, exists) {
            (Mode::Create, true) => match self.policy {
                BucketPolicy::Strict => {
                    return Err(ConfigError::BucketExists(self.bucket.clone()).into());
                }
                BucketPolicy::Tolerant => {
                    info!("Bucket [{}] already exists, uploading into it", self.bucket);
                }
            },
            (Mode::Create, false) => {
                self.store.make_bucket().await?;
                info!("Bucket created: [{}]", self.bucket);
            }
            (Mode::Delete, true) => {}
            (Mode::Delete, false) => {
                warn!("Bucket [{}] does not exist, nothing to delete", self.bucket);
            }
        }

        self.bucket_present = exists || mode == Mode::Create;
        Ok(())
    }

    fn identify(&self, item: &WorkItem<'_>) -> String {
        self.key(item)
            .unwrap_or_else(|_| item.path.to_string())
    }

    /// Objects are overwritten on upload.
    async fn exists(&mut self, _item: &WorkItem<'_>) -> std::result::Result<bool, ItemError> {
        Ok(false)
    }

    async fn create(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError> {
        let key = self.key(item)?;
        let descriptor = item.file()?;
        let content = tokio::fs::read(descriptor.source())
            .await
            .map_err(|source| ItemError::ReadFile {
                path: descriptor.source().to_path_buf(),
                source,
            })?;

        self.store.put_object(&key, content).await?;
        info!("File successfully uploaded: [{}]", key);
        Ok(Outcome::Uploaded)
    }

    async fn delete(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError> {
        if !self.bucket_present {
            return Ok(Outcome::Absent);
        }
        let key = self.key(item)?;
        self.store.remove_object(&key).await?;
        info!("Object removed: [{}]", key);
        Ok(Outcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourcePath;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemoryStore {
        bucket: Arc<Mutex<Option<BTreeMap<String, Vec<u8>>>>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn bucket_exists(&mut self) -> std::result::Result<bool, TransportError> {
            Ok(self.bucket.lock().unwrap().is_some())
        }

        async fn make_bucket(&mut self) -> std::result::Result<(), TransportError> {
            *self.bucket.lock().unwrap() = Some(BTreeMap::new());
            Ok(())
        }

        async fn put_object(&mut self, key: &str, content: Vec<u8>) -> std::result::Result<(), ItemError> {
            let mut bucket = self.bucket.lock().unwrap();
            let objects = bucket
                .as_mut()
                .ok_or_else(|| ItemError::rejected(404, "NoSuchBucket"))?;
            objects.insert(key.to_string(), content);
            Ok(())
        }

        async fn remove_object(&mut self, key: &str) -> std::result::Result<(), ItemError> {
            if let Some(objects) = self.bucket.lock().unwrap().as_mut() {
                objects.remove(key);
            }
            Ok(())
        }
    }

    #[test]
    fn test_item_error_connection_loss_is_fatal() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = item_error(S3Error::Io(refused));
        assert!(error.is_fatal());
        assert!(matches!(error, ItemError::Transport(TransportError::ObjectStore(_))));
    }

    #[test]
    fn test_item_error_object_failures_are_collected() {
        let rejected = item_error(S3Error::HttpFailWithBody(403, "AccessDenied".to_string()));
        assert!(!rejected.is_fatal());
        assert_eq!(rejected.status(), Some(403));

        let bad_body = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let invalid = item_error(S3Error::FromUtf8(bad_body));
        assert!(!invalid.is_fatal());
        assert!(matches!(invalid, ItemError::Invalid(_)));

        let unreadable = std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated");
        assert!(!item_error(S3Error::Io(unreadable)).is_fatal());
    }

    #[test]
    fn test_object_key_layouts() {
        let nested = ResourceDescriptor::new("/set/a/b.txt", "a/b.txt");
        assert_eq!(object_key("incoming", &nested, true), "incoming/a/b.txt");
        assert_eq!(object_key("incoming", &nested, false), "incoming/b.txt");
        assert_eq!(object_key("", &nested, true), "a/b.txt");
        assert_eq!(object_key("/incoming/", &nested, false), "incoming/b.txt");
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_existing_bucket() {
        let store = MemoryStore::default();
        *store.bucket.lock().unwrap() = Some(BTreeMap::new());
        let mut strategy =
            ObjectStoreStrategy::new(Box::new(store), "assets", BucketPolicy::Strict, true);

        let result = strategy.prepare(Mode::Create).await;
        assert!(matches!(
            result,
            Err(crate::error::PlatconfError::Config(ConfigError::BucketExists(_)))
        ));
    }

    #[tokio::test]
    async fn test_upload_creates_bucket_and_objects() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("c.txt"), "hello").unwrap();
        let descriptor = ResourceDescriptor::new(dir.path().join("c.txt"), "c.txt");

        let store = MemoryStore::default();
        let mut strategy = ObjectStoreStrategy::new(
            Box::new(store.clone()),
            "assets",
            BucketPolicy::Tolerant,
            false,
        );
        strategy.prepare(Mode::Create).await.unwrap();

        let path = ResourcePath::unscoped("incoming");
        let item = WorkItem::new(&path, Some(&descriptor));
        assert_eq!(strategy.apply(Mode::Create, &item).await.unwrap(), Outcome::Uploaded);

        let bucket = store.bucket.lock().unwrap();
        let objects = bucket.as_ref().unwrap();
        assert_eq!(objects.get("incoming/c.txt").map(Vec::as_slice), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn test_delete_keeps_bucket() {
        let store = MemoryStore::default();
        let mut objects = BTreeMap::new();
        objects.insert("b.txt".to_string(), b"x".to_vec());
        *store.bucket.lock().unwrap() = Some(objects);

        let mut strategy = ObjectStoreStrategy::new(
            Box::new(store.clone()),
            "assets",
            BucketPolicy::Strict,
            false,
        );
        strategy.prepare(Mode::Delete).await.unwrap();

        let descriptor = ResourceDescriptor::new("/set/b.txt", "b.txt");
        let path = ResourcePath::unscoped("");
        let item = WorkItem::new(&path, Some(&descriptor));
        assert_eq!(strategy.apply(Mode::Delete, &item).await.unwrap(), Outcome::Deleted);

        let bucket = store.bucket.lock().unwrap();
        assert!(bucket.as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_without_bucket_is_absent() {
        let mut strategy = ObjectStoreStrategy::new(
            Box::new(MemoryStore::default()),
            "assets",
            BucketPolicy::Tolerant,
            false,
        );
        strategy.prepare(Mode::Delete).await.unwrap();

        let descriptor = ResourceDescriptor::new("/set/b.txt", "b.txt");
        let path = ResourcePath::unscoped("");
        let item = WorkItem::new(&path, Some(&descriptor));
        assert_eq!(strategy.apply(Mode::Delete, &item).await.unwrap(), Outcome::Absent);
    }
}

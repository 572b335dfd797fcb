//! Object store backend against the in-memory store.

mod common;

use common::{config, resource_dir, yaml_path, FakeConnector, FakeStore};
use platconf::{ConfigError, PlatconfError};

fn upload_run(directory: &std::path::Path, extra: &str) -> String {
    format!(
        r#"
application: minio
resource: incoming
bucket: documents
endpoint: http://minio.local:9000
authorization:
  username: access
  password: secret
fileSet:
  directory: {}
{}"#,
        yaml_path(directory),
        extra
    )
}

fn tree() -> tempfile::TempDir {
    resource_dir(&[("a/b.txt", "nested"), ("c.txt", "top")])
}

#[tokio::test]
async fn test_relative_keys_keep_layout() {
    let dir = tree();
    let connector = FakeConnector::default();

    let report = connector
        .reconciler()
        .run(&config(&upload_run(dir.path(), "relative: true\n")))
        .await
        .unwrap();

    assert_eq!(report.uploaded, 2);
    assert_eq!(connector.store.keys(), vec!["incoming/a/b.txt", "incoming/c.txt"]);
    let state = connector.store.state.lock().unwrap();
    assert_eq!(state.buckets_made, 1);
    assert_eq!(state.objects["incoming/a/b.txt"], b"nested".to_vec());
}

#[tokio::test]
async fn test_flat_keys_use_file_names() {
    let dir = tree();
    let connector = FakeConnector::default();

    connector
        .reconciler()
        .run(&config(&upload_run(dir.path(), "")))
        .await
        .unwrap();

    assert_eq!(connector.store.keys(), vec!["incoming/b.txt", "incoming/c.txt"]);
}

#[tokio::test]
async fn test_existing_bucket_is_reused_by_default() {
    let dir = tree();
    let connector = FakeConnector {
        store: FakeStore::with_bucket(),
        ..Default::default()
    };

    let report = connector
        .reconciler()
        .run(&config(&upload_run(dir.path(), "")))
        .await
        .unwrap();

    assert_eq!(report.uploaded, 2);
    assert_eq!(connector.store.state.lock().unwrap().buckets_made, 0);
}

#[tokio::test]
async fn test_strict_policy_rejects_existing_bucket() {
    let dir = tree();
    let connector = FakeConnector {
        store: FakeStore::with_bucket(),
        ..Default::default()
    };

    let err = connector
        .reconciler()
        .run(&config(&upload_run(dir.path(), "bucketPolicy: strict\n")))
        .await
        .unwrap_err();

    assert!(
        matches!(err, PlatconfError::Config(ConfigError::BucketExists(ref bucket)) if bucket == "documents"),
        "got {err:?}"
    );
    assert!(connector.store.keys().is_empty());
}

#[tokio::test]
async fn test_delete_removes_objects_but_not_bucket() {
    let dir = tree();
    let connector = FakeConnector {
        store: FakeStore::with_bucket(),
        ..Default::default()
    };
    connector
        .reconciler()
        .run(&config(&upload_run(dir.path(), "relative: true\n")))
        .await
        .unwrap();

    let report = connector
        .reconciler()
        .run(&config(&upload_run(dir.path(), "relative: true\nmode: delete\n")))
        .await
        .unwrap();

    assert_eq!(report.deleted, 2);
    let state = connector.store.state.lock().unwrap();
    assert!(state.objects.is_empty());
    assert!(state.bucket_exists);
    assert_eq!(state.removed, vec!["incoming/a/b.txt", "incoming/c.txt"]);
}

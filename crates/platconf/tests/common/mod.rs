//! Shared test utilities for platconf integration tests.
//!
//! This module provides:
//! - In-memory fakes for the database and object store seams
//! - `FakeConnector` handing those fakes to the reconciler
//! - Helpers for run configurations and resource file trees

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;
use tempfile::TempDir;

use platconf::auth::AuthParams;
use platconf::backend::{ObjectStore, SqlSession};
use platconf::{load_config_from_str, Connector, ItemError, Reconciler, RunConfig, TransportError};

/// State shared by every session a [`FakeDatabase`] opens.
#[derive(Debug, Default)]
pub struct DatabaseState {
    /// Statements in execution order.
    pub executed: Vec<String>,
    /// Names that `SELECT ... = '<name>'` finds.
    pub existing: HashSet<String>,
    pub connects: usize,
    pub closes: usize,
    /// Statements containing this marker are rejected.
    pub reject_marker: Option<String>,
    /// Statements containing this marker lose the connection.
    pub disconnect_marker: Option<String>,
    pub connect_usernames: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeDatabase {
    pub state: Arc<Mutex<DatabaseState>>,
}

impl FakeDatabase {
    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn reject_statements_containing(&self, marker: &str) {
        self.state.lock().unwrap().reject_marker = Some(marker.to_string());
    }

    pub fn disconnect_on_statements_containing(&self, marker: &str) {
        self.state.lock().unwrap().disconnect_marker = Some(marker.to_string());
    }
}

#[async_trait]
impl SqlSession for FakeDatabase {
    async fn query_first(&mut self, sql: &str, _column: &str) -> Result<Option<String>, ItemError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .existing
            .iter()
            .find(|name| sql.contains(&format!("= '{}'", name)))
            .cloned())
    }

    async fn execute(&mut self, sql: &str) -> Result<(), ItemError> {
        let mut state = self.state.lock().unwrap();
        if state.disconnect_marker.as_deref().is_some_and(|m| sql.contains(m)) {
            return Err(TransportError::DatabaseConnection("connection reset by peer".to_string()).into());
        }
        if state.reject_marker.as_deref().is_some_and(|m| sql.contains(m)) {
            return Err(ItemError::Statement(format!("syntax error near '{}'", sql.trim())));
        }
        if sql.starts_with("CREATE") {
            if let Some(name) = sql.split('"').nth(1) {
                state.existing.insert(name.to_string());
            }
        }
        state.executed.push(sql.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StoreState {
    pub bucket_exists: bool,
    pub buckets_made: usize,
    pub objects: BTreeMap<String, Vec<u8>>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeStore {
    pub state: Arc<Mutex<StoreState>>,
}

impl FakeStore {
    pub fn with_bucket() -> Self {
        let store = Self::default();
        store.state.lock().unwrap().bucket_exists = true;
        store
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().objects.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn bucket_exists(&mut self) -> Result<bool, TransportError> {
        Ok(self.state.lock().unwrap().bucket_exists)
    }

    async fn make_bucket(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.bucket_exists = true;
        state.buckets_made += 1;
        Ok(())
    }

    async fn put_object(&mut self, key: &str, content: Vec<u8>) -> Result<(), ItemError> {
        self.state.lock().unwrap().objects.insert(key.to_string(), content);
        Ok(())
    }

    async fn remove_object(&mut self, key: &str) -> Result<(), ItemError> {
        let mut state = self.state.lock().unwrap();
        state.objects.remove(key);
        state.removed.push(key.to_string());
        Ok(())
    }
}

/// Hands out the fakes in place of real database and object store clients.
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    pub database: FakeDatabase,
    pub store: FakeStore,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn sql_session(&self, _url: &str, params: &AuthParams) -> Result<Box<dyn SqlSession>, TransportError> {
        let mut state = self.database.state.lock().unwrap();
        state.connects += 1;
        state.connect_usernames.push(params.username().to_string());
        Ok(Box::new(self.database.clone()))
    }

    async fn object_store(
        &self,
        _endpoint: &Url,
        _bucket: &str,
        _params: &AuthParams,
    ) -> Result<Box<dyn ObjectStore>, TransportError> {
        Ok(Box::new(self.store.clone()))
    }
}

impl FakeConnector {
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::with_connector(self.clone())
    }
}

/// Parses a YAML run configuration.
pub fn config(yaml: &str) -> RunConfig {
    load_config_from_str(yaml).expect("valid run configuration")
}

/// A temporary directory holding `files` (relative path, content).
pub fn resource_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp directory");
    for (relative, content) in files {
        write_file(dir.path(), relative, content);
    }
    dir
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create directory");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

/// YAML path value for `path`.
pub fn yaml_path(path: &Path) -> String {
    format!("'{}'", path.display())
}

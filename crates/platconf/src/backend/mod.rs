//! Backend selection and the per-backend reconciliation strategies.

pub mod database;
pub mod identity;
pub mod kind;
pub mod localization;
pub mod object_store;
pub mod queue;
pub mod rest;
pub mod sql;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::config::Mode;
use crate::error::{ItemError, Result};
use crate::resource::{ResourceDescriptor, ResourcePath};

pub use kind::{BackendKind, DatabaseKind, IdentityKind, LocalizationKind, ResourceKind};
pub use object_store::{ObjectStore, S3ObjectStore};
pub use sql::{SeaOrmSession, SqlSession};

/// What happened to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Created,
    /// An existing entry was deleted and inserted again.
    Replaced,
    /// Missing composite members were added to an existing role.
    Merged,
    /// Already present, nothing to do.
    Unchanged,
    Deleted,
    /// Nothing to delete.
    Absent,
    Executed,
    Uploaded,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Created => "created",
            Outcome::Replaced => "replaced",
            Outcome::Merged => "merged",
            Outcome::Unchanged => "unchanged",
            Outcome::Deleted => "deleted",
            Outcome::Absent => "absent",
            Outcome::Executed => "executed",
            Outcome::Uploaded => "uploaded",
        };
        write!(f, "{}", name)
    }
}

/// One unit of work: a resource path, paired with a file for file based backends.
#[derive(Debug, Clone, Copy)]
pub struct WorkItem<'a> {
    pub path: &'a ResourcePath,
    pub descriptor: Option<&'a ResourceDescriptor>,
}

impl<'a> WorkItem<'a> {
    pub fn new(path: &'a ResourcePath, descriptor: Option<&'a ResourceDescriptor>) -> Self {
        Self { path, descriptor }
    }

    pub fn realm(&self) -> Option<&'a str> {
        self.path.realm.as_deref()
    }

    /// The item's file. Fails for strategies that need one when none was given.
    pub fn file(&self) -> std::result::Result<&'a ResourceDescriptor, ItemError> {
        self.descriptor
            .ok_or_else(|| ItemError::Invalid(format!("no file given for '{}'", self.path)))
    }

    /// Reads the item's file as UTF-8 text.
    pub async fn read_text(&self) -> std::result::Result<String, ItemError> {
        read_text(self.file()?.source()).await
    }
}

pub(crate) async fn read_text(path: &Path) -> std::result::Result<String, ItemError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ItemError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Reconciliation behavior of one backend and resource kind.
///
/// The driver calls [`prepare`](Self::prepare) once, [`apply`](Self::apply) for
/// every item in order, and [`finish`](Self::finish) on every exit path.
#[async_trait]
pub trait ResourceStrategy: Send {
    /// Run-level checks and setup before the first item.
    async fn prepare(&mut self, _mode: Mode) -> Result<()> {
        Ok(())
    }

    /// Name of the item in logs and error reports.
    fn identify(&self, item: &WorkItem<'_>) -> String {
        match item.descriptor {
            Some(descriptor) => descriptor.file_name(),
            None => item.path.to_string(),
        }
    }

    async fn exists(&mut self, item: &WorkItem<'_>) -> std::result::Result<bool, ItemError>;

    async fn create(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError>;

    async fn delete(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError>;

    /// Idempotent create (skip what exists) or delete.
    async fn apply(
        &mut self,
        mode: Mode,
        item: &WorkItem<'_>,
    ) -> std::result::Result<Outcome, ItemError> {
        match mode {
            Mode::Create => {
                if self.exists(item).await? {
                    Ok(Outcome::Unchanged)
                } else {
                    self.create(item).await
                }
            }
            Mode::Delete => self.delete(item).await,
        }
    }

    /// Releases held connections.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

//! Databases, login roles and raw scripts on PostgreSQL.

use async_trait::async_trait;
use log::info;
use secrecy::{ExposeSecret, SecretString};

use crate::config::Mode;
use crate::error::{ItemError, Result};

use super::kind::DatabaseKind;
use super::sql::{quote_identifier, quote_literal, SqlSession};
use super::{Outcome, ResourceStrategy, WorkItem};

pub struct DatabaseStrategy {
    kind: DatabaseKind,
    session: Box<dyn SqlSession>,
    resource_password: SecretString,
}

impl DatabaseStrategy {
    pub fn new(
        kind: DatabaseKind,
        session: Box<dyn SqlSession>,
        resource_password: SecretString,
    ) -> Self {
        Self {
            kind,
            session,
            resource_password,
        }
    }

    fn exists_statement(&self, name: &str) -> Option<(String, &'static str)> {
        match self.kind {
            DatabaseKind::Database => Some((
                format!(
                    "SELECT datname FROM pg_database WHERE datname = {}",
                    quote_literal(name)
                ),
                "datname",
            )),
            DatabaseKind::Role => Some((
                format!(
                    "SELECT rolname FROM pg_roles WHERE rolname = {}",
                    quote_literal(name)
                ),
                "rolname",
            )),
            DatabaseKind::Script => None,
        }
    }

    fn create_statement(&self, name: &str) -> Option<String> {
        match self.kind {
            DatabaseKind::Database => Some(format!("CREATE DATABASE {}", quote_identifier(name))),
            DatabaseKind::Role => Some(format!(
                "CREATE USER {} WITH PASSWORD {}",
                quote_identifier(name),
                quote_literal(self.resource_password.expose_secret())
            )),
            DatabaseKind::Script => None,
        }
    }

    fn drop_statement(&self, name: &str) -> Option<String> {
        match self.kind {
            DatabaseKind::Database => Some(format!(
                "DROP DATABASE IF EXISTS {}",
                quote_identifier(name)
            )),
            DatabaseKind::Role => Some(format!("DROP USER IF EXISTS {}", quote_identifier(name))),
            DatabaseKind::Script => None,
        }
    }

    async fn run_script(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError> {
        let script = item.read_text().await?;
        info!("Applying SQL script {}", item.file()?);
        self.session.execute(&script).await?;
        Ok(Outcome::Executed)
    }
}

#[async_trait]
impl ResourceStrategy for DatabaseStrategy {
    fn identify(&self, item: &WorkItem<'_>) -> String {
        match (self.kind, item.descriptor) {
            (DatabaseKind::Script, Some(descriptor)) => descriptor.file_name(),
            _ => item.path.path.clone(),
        }
    }

    async fn exists(&mut self, item: &WorkItem<'_>) -> std::result::Result<bool, ItemError> {
        match self.exists_statement(&item.path.path) {
            Some((sql, column)) => Ok(self.session.query_first(&sql, column).await?.is_some()),
            None => Ok(false),
        }
    }

    async fn create(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError> {
        match self.create_statement(&item.path.path) {
            Some(sql) => {
                self.session.execute(&sql).await?;
                Ok(Outcome::Created)
            }
            None => self.run_script(item).await,
        }
    }

    async fn delete(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError> {
        match self.drop_statement(&item.path.path) {
            Some(sql) => {
                self.session.execute(&sql).await?;
                Ok(Outcome::Deleted)
            }
            None => self.run_script(item).await,
        }
    }

    async fn apply(
        &mut self,
        mode: Mode,
        item: &WorkItem<'_>,
    ) -> std::result::Result<Outcome, ItemError> {
        if self.kind == DatabaseKind::Script {
            // Scripts carry their own conditional logic; the mode does not change them.
            return self.run_script(item).await;
        }
        info!("{} [{}] with name: [{}]", mode, self.kind.name(), item.path);
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

    async fn finish(&mut self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }
}

//! Localization rows (labels, templates, selection lists) keyed by their file's natural key.
//!
//! A create replaces: an existing row with the same natural key is deleted
//! before the new one is inserted.

use async_trait::async_trait;
use log::info;
use uuid::Uuid;

use crate::config::Mode;
use crate::error::{ItemError, Result};
use crate::resource::NaturalKey;

use super::kind::LocalizationKind;
use super::sql::{quote_escape_literal, quote_literal, SqlSession};
use super::{Outcome, ResourceStrategy, WorkItem};

/// Value of the `created_by` and `modified_by` audit columns.
pub const AUDIT_USER: &str = "platconf";

pub struct LocalizationStrategy {
    kind: LocalizationKind,
    session: Box<dyn SqlSession>,
}

impl LocalizationStrategy {
    pub fn new(kind: LocalizationKind, session: Box<dyn SqlSession>) -> Self {
        Self { kind, session }
    }

    fn table(&self) -> &'static str {
        match self.kind {
            LocalizationKind::Label => "i18n",
            LocalizationKind::Template => "template",
            LocalizationKind::SelectionList => "selection_list",
        }
    }

    /// Column holding the type part of the natural key. Labels have none.
    fn type_column(&self) -> Option<&'static str> {
        match self.kind {
            LocalizationKind::Label => None,
            LocalizationKind::Template => Some("key"),
            LocalizationKind::SelectionList => Some("type"),
        }
    }

    fn select_statement(&self, key: &NaturalKey) -> String {
        let mut sql = format!(
            "SELECT id::text AS id FROM {} WHERE discriminator = {} AND {}",
            self.table(),
            quote_literal(&key.discriminator),
            language_condition(key.language.as_deref())
        );
        if let Some(column) = self.type_column() {
            sql.push_str(&format!(" AND {} = {}", column, quote_literal(&key.type_name)));
        }
        sql
    }

    fn delete_statement(&self, id: &str) -> String {
        format!("DELETE FROM {} WHERE id = {}", self.table(), quote_literal(id))
    }

    fn insert_statement(&self, key: &NaturalKey, content: &str) -> String {
        let id = quote_literal(&Uuid::new_v4().to_string());
        let audit = quote_literal(AUDIT_USER);
        let discriminator = quote_literal(&key.discriminator);
        let language = language_value(key.language.as_deref());
        let type_name = quote_literal(&key.type_name);

        match self.kind {
            LocalizationKind::Label => format!(
                "INSERT INTO i18n(id, created, created_by, discriminator, last_modified, modified_by, language, translation) \
                 VALUES({id}, current_timestamp, {audit}, {discriminator}, current_timestamp, {audit}, {language}, decode({}, 'escape'))",
                quote_escape_literal(content)
            ),
            LocalizationKind::Template => format!(
                "INSERT INTO template(id, created, created_by, discriminator, last_modified, modified_by, key, language, template) \
                 VALUES({id}, current_timestamp, {audit}, {discriminator}, current_timestamp, {audit}, {type_name}, {language}, decode({}, 'escape'))",
                quote_escape_literal(content)
            ),
            LocalizationKind::SelectionList => format!(
                "INSERT INTO selection_list(id, created, created_by, discriminator, last_modified, modified_by, config, language, type) \
                 VALUES({id}, current_timestamp, {audit}, {discriminator}, current_timestamp, {audit}, {}, {language}, {type_name})",
                quote_literal(content)
            ),
        }
    }

    async fn find_id(&mut self, key: &NaturalKey) -> std::result::Result<Option<String>, ItemError> {
        let sql = self.select_statement(key);
        self.session.query_first(&sql, "id").await
    }

    /// Deletes the row with `key`, returning whether there was one.
    async fn remove(&mut self, key: &NaturalKey) -> std::result::Result<bool, ItemError> {
        match self.find_id(key).await? {
            Some(id) => {
                info!("{} with id [{}] found, removing it", self.kind.name(), id);
                let sql = self.delete_statement(&id);
                self.session.execute(&sql).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert(&mut self, item: &WorkItem<'_>) -> std::result::Result<(), ItemError> {
        let descriptor = item.file()?;
        let content = item.read_text().await?;
        let sql = self.insert_statement(descriptor.natural_key(), &content);
        self.session.execute(&sql).await
    }

    /// Inserts the row of `item`, replacing an existing one in the same batch.
    /// A batch runs as one implicit transaction, so a failed insert keeps the old row.
    async fn upsert(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError> {
        let key = item.file()?.natural_key();
        let Some(id) = self.find_id(key).await? else {
            self.insert(item).await?;
            return Ok(Outcome::Created);
        };

        info!("{} with id [{}] found, replacing it", self.kind.name(), id);
        let content = item.read_text().await?;
        let sql = format!(
            "{};\n{}",
            self.delete_statement(&id),
            self.insert_statement(key, &content)
        );
        self.session.execute(&sql).await?;
        Ok(Outcome::Replaced)
    }
}

fn language_condition(language: Option<&str>) -> String {
    match language {
        Some(language) => format!("language = {}", quote_literal(language)),
        None => "language IS NULL".to_string(),
    }
}

fn language_value(language: Option<&str>) -> String {
    match language {
        Some(language) => quote_literal(language),
        None => "NULL".to_string(),
    }
}

#[async_trait]
impl ResourceStrategy for LocalizationStrategy {
    async fn exists(&mut self, item: &WorkItem<'_>) -> std::result::Result<bool, ItemError> {
        let key = item.file()?.natural_key();
        Ok(self.find_id(key).await?.is_some())
    }

    async fn create(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError> {
        self.insert(item).await?;
        Ok(Outcome::Created)
    }

    async fn delete(&mut self, item: &WorkItem<'_>) -> std::result::Result<Outcome, ItemError> {
        let key = item.file()?.natural_key();
        if self.remove(key).await? {
            Ok(Outcome::Deleted)
        } else {
            Ok(Outcome::Absent)
        }
    }

    async fn apply(
        &mut self,
        mode: Mode,
        item: &WorkItem<'_>,
    ) -> std::result::Result<Outcome, ItemError> {
        let descriptor = item.file()?;
        let key = descriptor.natural_key();
        info!(
            "Generate SQL for [{}] with [{}] (discriminator: [{}], language: [{}])",
            self.kind.name(),
            descriptor,
            key.discriminator,
            key.language.as_deref().unwrap_or("none")
        );

        match mode {
            Mode::Create => self.upsert(item).await,
            Mode::Delete => self.delete(item).await,
        }
    }

    async fn finish(&mut self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }
}

//! Realms, clients, users and roles of the identity service.

pub mod client;
pub mod model;

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::info;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{Mode, Resolver};
use crate::error::ItemError;
use crate::http;

use super::kind::IdentityKind;
use super::{Outcome, ResourceStrategy, WorkItem};

pub use client::AdminClient;
use model::{
    parse_definition, required, ClientRepresentation, RealmRepresentation, RoleRepresentation,
    UserRepresentation,
};

pub struct IdentityStrategy {
    kind: IdentityKind,
    client: AdminClient,
    properties: BTreeMap<String, String>,
}

/// A resource file after substitution and parsing.
struct Definition<T> {
    file: String,
    body: Value,
    typed: T,
}

impl IdentityStrategy {
    pub fn new(kind: IdentityKind, client: AdminClient, properties: BTreeMap<String, String>) -> Self {
        Self {
            kind,
            client,
            properties,
        }
    }

    async fn load<T: DeserializeOwned>(&self, item: &WorkItem<'_>) -> Result<Definition<T>, ItemError> {
        let file = item.file()?.file_name();
        let text = item.read_text().await?;
        let resolver = Resolver::Tenant {
            properties: &self.properties,
            realm: item.realm(),
        };
        let (body, typed) = parse_definition(&file, &resolver.apply(&text))?;
        Ok(Definition { file, body, typed })
    }

    fn collection(&self, item: &WorkItem<'_>) -> Result<Url, ItemError> {
        self.client.url(&item.path.path)
    }

    fn realm<'a>(&self, item: &WorkItem<'a>) -> Result<&'a str, ItemError> {
        item.realm()
            .ok_or_else(|| ItemError::Invalid(format!("{} requires a realm", self.kind.name())))
    }

    async fn realm_exists(&self, item: &WorkItem<'_>) -> Result<bool, ItemError> {
        let realm = self.realm(item)?;
        let exists = self.client.realm_exists(realm).await?;
        if !exists {
            info!("Realm [{}] does not exist, nothing to delete", realm);
        }
        Ok(exists)
    }

    async fn find_users(&self, item: &WorkItem<'_>, username: &str) -> Result<Vec<UserRepresentation>, ItemError> {
        let mut url = self.collection(item)?;
        url.query_pairs_mut()
            .append_pair("username", username)
            .append_pair("exact", "true");
        let users: Vec<UserRepresentation> = self.client.get_json(url).await?;
        Ok(users
            .into_iter()
            .filter(|user| {
                user.username
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(username))
            })
            .collect())
    }

    async fn role_exists(&self, item: &WorkItem<'_>, name: &str) -> Result<Option<RoleRepresentation>, ItemError> {
        let url = http::with_segments(&self.collection(item)?, &[name])?;
        self.client.get_optional(url).await
    }

    /// Assigns the realm and client roles named in the definition to a freshly created user.
    async fn assign_roles(
        &self,
        item: &WorkItem<'_>,
        user_id: &str,
        user: &UserRepresentation,
    ) -> Result<(), ItemError> {
        let realm = self.realm(item)?;
        let user_url = http::with_segments(&self.collection(item)?, &[user_id])?;

        let mut realm_roles = Vec::with_capacity(user.realm_roles.len());
        for name in &user.realm_roles {
            realm_roles.push(self.client.realm_role(realm, name).await?);
        }
        if !realm_roles.is_empty() {
            let url = http::with_segments(&user_url, &["role-mappings", "realm"])?;
            self.client.post_json(url, &realm_roles).await?;
        }

        for (client_id, names) in &user.client_roles {
            let client_uuid = self.client.client_uuid(realm, client_id).await?;
            let mut client_roles = Vec::with_capacity(names.len());
            for name in names {
                client_roles.push(
                    self.client
                        .client_role(realm, &client_uuid, client_id, name)
                        .await?,
                );
            }
            if !client_roles.is_empty() {
                let url = http::with_segments(&user_url, &["role-mappings", "clients", &client_uuid])?;
                self.client.post_json(url, &client_roles).await?;
            }
        }
        Ok(())
    }

    /// Adds the composite members named in `incoming` that `name` lacks.
    /// Nothing else about the existing role changes.
    async fn merge_composites(
        &self,
        item: &WorkItem<'_>,
        name: &str,
        incoming: &RoleRepresentation,
    ) -> Result<Outcome, ItemError> {
        let Some(composites) = incoming.composites.as_ref().filter(|c| !c.is_empty()) else {
            return Ok(Outcome::Unchanged);
        };
        let realm = self.realm(item)?;
        let composites_url = http::with_segments(&self.collection(item)?, &[name, "composites"])?;
        let current: Vec<RoleRepresentation> = self.client.get_json(composites_url.clone()).await?;

        let mut missing = Vec::new();
        for member in &composites.realm {
            let present = current
                .iter()
                .any(|role| !role.is_client_role() && role.name.as_deref() == Some(member.as_str()));
            if !present {
                missing.push(self.client.realm_role(realm, member).await?);
            }
        }

        for (client_id, members) in &composites.client {
            let client_uuid = self.client.client_uuid(realm, client_id).await?;
            for member in members {
                let present = current.iter().any(|role| {
                    role.is_client_role()
                        && role.container_id.as_deref() == Some(client_uuid.as_str())
                        && role.name.as_deref() == Some(member.as_str())
                });
                if !present {
                    missing.push(
                        self.client
                            .client_role(realm, &client_uuid, client_id, member)
                            .await?,
                    );
                }
            }
        }

        if missing.is_empty() {
            return Ok(Outcome::Unchanged);
        }

        let added: Vec<&str> = missing.iter().filter_map(|r| r.name.as_deref()).collect();
        info!("Enhance composite role [{}] with: {}", name, added.join(","));
        self.client.post_json(composites_url, &missing).await?;
        Ok(Outcome::Merged)
    }
}

#[async_trait]
impl ResourceStrategy for IdentityStrategy {
    async fn exists(&mut self, item: &WorkItem<'_>) -> Result<bool, ItemError> {
        match self.kind {
            IdentityKind::Realm => {
                let realm: Definition<RealmRepresentation> = self.load(item).await?;
                let name = required(realm.typed.name(), "realm", &realm.file)?;
                self.client.realm_exists(name).await
            }
            IdentityKind::Client => {
                let client: Definition<ClientRepresentation> = self.load(item).await?;
                let client_id = required(client.typed.client_id.as_deref(), "clientId", &client.file)?;
                let realm = self.realm(item)?;
                Ok(!self.client.find_clients(realm, client_id).await?.is_empty())
            }
            IdentityKind::User => {
                let user: Definition<UserRepresentation> = self.load(item).await?;
                let username = required(user.typed.username.as_deref(), "username", &user.file)?;
                Ok(!self.find_users(item, username).await?.is_empty())
            }
            IdentityKind::Role => {
                let role: Definition<RoleRepresentation> = self.load(item).await?;
                let name = required(role.typed.name.as_deref(), "name", &role.file)?;
                Ok(self.role_exists(item, name).await?.is_some())
            }
        }
    }

    async fn create(&mut self, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        let collection = self.collection(item)?;
        match self.kind {
            IdentityKind::User => {
                let user: Definition<UserRepresentation> = self.load(item).await?;
                let username = required(user.typed.username.as_deref(), "username", &user.file)?;
                self.client.post_json(collection, &user.body).await?;

                let user_id = self
                    .find_users(item, username)
                    .await?
                    .into_iter()
                    .find_map(|u| u.id)
                    .ok_or_else(|| {
                        ItemError::Invalid(format!("user '{}' not found after creation", username))
                    })?;
                self.assign_roles(item, &user_id, &user.typed).await?;
            }
            _ => {
                let definition: Definition<Value> = self.load(item).await?;
                self.client.post_json(collection, &definition.body).await?;
            }
        }
        Ok(Outcome::Created)
    }

    async fn delete(&mut self, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        let collection = self.collection(item)?;
        match self.kind {
            IdentityKind::Realm => {
                let realm: Definition<RealmRepresentation> = self.load(item).await?;
                let name = required(realm.typed.name(), "realm", &realm.file)?;
                if !self.client.realm_exists(name).await? {
                    return Ok(Outcome::Absent);
                }
                self.client.delete(http::with_segments(&collection, &[name])?).await?;
            }
            IdentityKind::Client => {
                let client: Definition<ClientRepresentation> = self.load(item).await?;
                let client_id = required(client.typed.client_id.as_deref(), "clientId", &client.file)?;
                if !self.realm_exists(item).await? {
                    return Ok(Outcome::Absent);
                }
                let found = self.client.find_clients(self.realm(item)?, client_id).await?;
                let ids: Vec<String> = found.into_iter().filter_map(|c| c.id).collect();
                if ids.is_empty() {
                    return Ok(Outcome::Absent);
                }
                for id in ids {
                    self.client.delete(http::with_segments(&collection, &[id.as_str()])?).await?;
                }
            }
            IdentityKind::User => {
                let user: Definition<UserRepresentation> = self.load(item).await?;
                let username = required(user.typed.username.as_deref(), "username", &user.file)?;
                if !self.realm_exists(item).await? {
                    return Ok(Outcome::Absent);
                }
                let ids: Vec<String> = self
                    .find_users(item, username)
                    .await?
                    .into_iter()
                    .filter_map(|u| u.id)
                    .collect();
                if ids.is_empty() {
                    return Ok(Outcome::Absent);
                }
                for id in ids {
                    self.client.delete(http::with_segments(&collection, &[id.as_str()])?).await?;
                }
            }
            IdentityKind::Role => {
                let role: Definition<RoleRepresentation> = self.load(item).await?;
                let name = required(role.typed.name.as_deref(), "name", &role.file)?;
                if !self.realm_exists(item).await? || self.role_exists(item, name).await?.is_none() {
                    return Ok(Outcome::Absent);
                }
                self.client.delete(http::with_segments(&collection, &[name])?).await?;
            }
        }
        Ok(Outcome::Deleted)
    }

    async fn apply(&mut self, mode: Mode, item: &WorkItem<'_>) -> Result<Outcome, ItemError> {
        info!(
            "{} [{}] {}with JSON: [{}]",
            mode,
            self.kind.name(),
            item.realm()
                .map(|realm| format!("for realm [{}] ", realm))
                .unwrap_or_default(),
            self.identify(item)
        );

        match (mode, self.kind) {
            (Mode::Create, IdentityKind::Role) => {
                let role: Definition<RoleRepresentation> = self.load(item).await?;
                let name = required(role.typed.name.as_deref(), "name", &role.file)?;
                if self.role_exists(item, name).await?.is_none() {
                    return self.create(item).await;
                }
                if role.typed.composite {
                    self.merge_composites(item, name, &role.typed).await
                } else {
                    Ok(Outcome::Unchanged)
                }
            }
            (Mode::Create, _) => {
                if self.exists(item).await? {
                    Ok(Outcome::Unchanged)
                } else {
                    self.create(item).await
                }
            }
            (Mode::Delete, _) => self.delete(item).await,
        }
    }
}

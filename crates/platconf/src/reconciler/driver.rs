use log::{debug, info, warn};
use tracing::{info_span, Instrument};

use crate::auth::{basic_credential, request_token, AccessCredential, AuthParams};
use crate::backend::database::DatabaseStrategy;
use crate::backend::identity::{AdminClient, IdentityStrategy};
use crate::backend::localization::LocalizationStrategy;
use crate::backend::object_store::ObjectStoreStrategy;
use crate::backend::queue::QueueStrategy;
use crate::backend::rest::RestStrategy;
use crate::backend::{BackendKind, ResourceKind, ResourceStrategy, WorkItem};
use crate::config::{environment_snapshot, AuthScheme, Mode, RunConfig};
use crate::error::{
    AuthorizationError, ConfigError, FailedItems, ItemError, ReconciliationError, Result,
};
use crate::http;
use crate::resource::{expand_resource_paths, resolve_file_sets, ResourceDescriptor, ResourcePath};

use super::connector::{Connector, DefaultConnector};
use super::report::RunReport;

/// Runs one configuration against its backend.
pub struct Reconciler {
    connector: Box<dyn Connector>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self::with_connector(DefaultConnector)
    }

    /// Uses `connector` for database sessions and object stores.
    pub fn with_connector(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
        }
    }

    /// Applies or removes every resource of `config`.
    ///
    /// Item failures are collected and returned together as
    /// [`PlatconfError::Items`](crate::PlatconfError::Items) once all items ran.
    /// Configuration, authorization and transport failures end the run at once.
    pub async fn run(&self, config: &RunConfig) -> Result<RunReport> {
        let span = info_span!(
            "run",
            application = %config.application,
            resource = %config.resource,
            mode = %config.mode,
        );
        self.run_inner(config).instrument(span).await
    }

    async fn run_inner(&self, config: &RunConfig) -> Result<RunReport> {
        let files = resolve_file_sets(&config.all_file_sets())?;
        if !files.is_empty() && !config.form_params.is_empty() {
            return Err(ConfigError::FormParamsWithFileSets.into());
        }

        let backend: BackendKind = config.application.parse()?;
        let kind = ResourceKind::select(backend, config)?;
        let target = kind.target(config);
        let paths = expand_resource_paths(&target.template, &target.realms)?;
        let endpoint = config.endpoint_url()?;

        if !target.per_file && !files.is_empty() {
            debug!("{} [{}] does not use files, ignoring {} file(s)", backend, kind, files.len());
        }
        if target.per_file && files.is_empty() {
            warn!("No files to process for {} [{}]", backend, kind);
        }

        let params = if requires_credentials(backend, config) {
            Some(AuthParams::from_map(&config.authorization)?)
        } else {
            None
        };

        info!(
            "{} [{}] on {} ({} path(s), {} file(s))",
            config.mode,
            kind,
            backend,
            paths.len(),
            files.len()
        );

        let mut strategy = self.strategy(kind, config, &endpoint, params.as_ref()).await?;

        let result = process(strategy.as_mut(), config.mode, &paths, &files, target.per_file).await;
        let finished = strategy.finish().await;

        match (result, finished) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(close_error)) => {
                warn!("Failed to release connections: {}", close_error);
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    /// Builds the strategy for `kind`, acquiring its credential or connection once.
    async fn strategy(
        &self,
        kind: ResourceKind,
        config: &RunConfig,
        endpoint: &reqwest::Url,
        params: Option<&AuthParams>,
    ) -> Result<Box<dyn ResourceStrategy>> {
        let required = || params.ok_or(AuthorizationError::MissingKey(crate::auth::USERNAME));

        let strategy: Box<dyn ResourceStrategy> = match kind {
            ResourceKind::Identity(identity_kind) => {
                let client = http::build_client()?;
                let credential = request_token(&client, endpoint, required()?).await?;
                let admin = AdminClient::new(client, endpoint.clone(), credential);
                Box::new(IdentityStrategy::new(identity_kind, admin, config.properties.clone()))
            }
            ResourceKind::Queue => {
                let credential = basic_credential(required()?);
                Box::new(QueueStrategy::new(http::build_client()?, endpoint.clone(), credential))
            }
            ResourceKind::ObjectStore => {
                let store = self
                    .connector
                    .object_store(endpoint, config.bucket.trim(), required()?)
                    .await?;
                Box::new(ObjectStoreStrategy::new(
                    store,
                    config.bucket.trim(),
                    config.bucket_policy,
                    config.relative,
                ))
            }
            ResourceKind::Database(database_kind) => {
                let password = config
                    .resource_password()
                    .map_err(|source| AuthorizationError::Secret {
                        key: "resourcePassword".to_string(),
                        source,
                    })?;
                let session = self.connector.sql_session(&config.endpoint, required()?).await?;
                Box::new(DatabaseStrategy::new(database_kind, session, password))
            }
            ResourceKind::Localization(localization_kind) => {
                let session = self.connector.sql_session(&config.endpoint, required()?).await?;
                Box::new(LocalizationStrategy::new(localization_kind, session))
            }
            ResourceKind::Rest => {
                let client = http::build_client()?;
                let credential: Option<AccessCredential> = match config.auth_scheme {
                    AuthScheme::Bearer => Some(request_token(&client, endpoint, required()?).await?),
                    AuthScheme::Basic => Some(basic_credential(required()?)),
                    AuthScheme::None => None,
                };
                Box::new(RestStrategy::new(
                    client,
                    endpoint.clone(),
                    credential,
                    &config.method,
                    config.form_params.clone(),
                    config.properties.clone(),
                    environment_snapshot(),
                )?)
            }
        };
        Ok(strategy)
    }
}

fn requires_credentials(backend: BackendKind, config: &RunConfig) -> bool {
    !(backend == BackendKind::Rest && config.auth_scheme == AuthScheme::None)
}

/// Runs every item in order: resource paths outside, files inside.
async fn process(
    strategy: &mut dyn ResourceStrategy,
    mode: Mode,
    paths: &[ResourcePath],
    files: &[ResourceDescriptor],
    per_file: bool,
) -> Result<RunReport> {
    strategy.prepare(mode).await?;

    let mut report = RunReport::default();
    let mut errors = Vec::new();

    for path in paths {
        let items: Vec<WorkItem<'_>> = if per_file {
            files.iter().map(|file| WorkItem::new(path, Some(file))).collect()
        } else {
            vec![WorkItem::new(path, None)]
        };

        for item in items {
            let name = strategy.identify(&item);
            let span = info_span!("item", resource = %name, realm = item.realm().unwrap_or(""));

            match strategy.apply(mode, &item).instrument(span).await {
                Ok(outcome) => {
                    debug!("{}: {}", name, outcome);
                    report.record(outcome);
                }
                Err(ItemError::Transport(error)) => {
                    warn!("{}: aborting run: {}", name, error);
                    return Err(error.into());
                }
                Err(error) => {
                    warn!("{}: {}", name, error);
                    errors.push(ReconciliationError::new(name, &error));
                }
            }
        }
    }

    if errors.is_empty() {
        info!("Run finished: {}", report);
        Ok(report)
    } else {
        Err(FailedItems(errors).into())
    }
}

//! Declarative, idempotent provisioning of platform service resources.
//!
//! A [`RunConfig`] names a backend (identity service, message queue, object
//! store, relational database, localization tables or a plain REST API), a
//! resource kind, the files describing the resources and an optional realm
//! list. [`Reconciler::run`] creates or deletes every resource and returns a
//! [`RunReport`], or the collected per-item failures.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod reconciler;
pub mod resource;
pub mod secrets;

pub use backend::{BackendKind, Outcome, ResourceKind};
pub use config::{load_config, load_config_from_str, Mode, RunConfig};
pub use error::{
    AuthorizationError, ConfigError, FailedItems, ItemError, PlatconfError, ReconciliationError,
    Result, TransportError,
};
pub use reconciler::{reconcile, Connector, DefaultConnector, Reconciler, RunReport};
pub use secrets::{resolve_secret, SecretError};

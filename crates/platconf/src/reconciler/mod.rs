//! The run driver: selection, expansion, credentials, per-item dispatch and
//! failure aggregation.

pub mod connector;
pub mod driver;
pub mod report;

pub use connector::{Connector, DefaultConnector};
pub use driver::Reconciler;
pub use report::RunReport;

use crate::config::RunConfig;
use crate::error::Result;

/// Runs `config` with the default database and object store clients.
pub async fn reconcile(config: &RunConfig) -> Result<RunReport> {
    Reconciler::new().run(config).await
}

pub mod loader;
pub mod schema;
pub mod substitution;

pub use loader::{load_config, load_config_from_str, validate_config};
pub use schema::{AuthScheme, BucketPolicy, FileSetConfig, Mode, RunConfig};
pub use substitution::{environment_snapshot, substitute, Resolver, TENANT_KEY};

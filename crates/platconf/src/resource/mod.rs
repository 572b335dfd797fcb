//! Resource files, their naming metadata and realm-expanded locations.

pub mod descriptor;
pub mod fileset;
pub mod paths;

pub use descriptor::{NaturalKey, ResourceDescriptor};
pub use fileset::{resolve_file_set, resolve_file_sets};
pub use paths::{expand_resource_paths, parse_realms, ResourcePath, REALM_PLACEHOLDER};

//! Realm expansion of resource templates.

use std::fmt;

use crate::error::ConfigError;

/// Substring of a resource template that stands for the realm name.
pub const REALM_PLACEHOLDER: &str = "%4T";

/// A resource location for one realm, or the only location when no realms are used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub path: String,
    pub realm: Option<String>,
}

impl ResourcePath {
    pub fn unscoped(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            realm: None,
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

/// Splits a comma separated realm list, trimming names and dropping empty entries.
pub fn parse_realms(realms: &str) -> Vec<String> {
    realms
        .split(',')
        .map(str::trim)
        .filter(|realm| !realm.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expands `template` once per realm.
///
/// With realms the template must contain [`REALM_PLACEHOLDER`]; without realms
/// it must not.
pub fn expand_resource_paths(template: &str, realms: &str) -> Result<Vec<ResourcePath>, ConfigError> {
    let realms = parse_realms(realms);
    let has_placeholder = template.contains(REALM_PLACEHOLDER);

    if realms.is_empty() {
        if has_placeholder {
            return Err(ConfigError::NoRealms {
                placeholder: REALM_PLACEHOLDER,
                template: template.to_string(),
            });
        }
        return Ok(vec![ResourcePath::unscoped(template)]);
    }

    if !has_placeholder {
        return Err(ConfigError::NoPlaceholder {
            placeholder: REALM_PLACEHOLDER,
            template: template.to_string(),
        });
    }

    Ok(realms
        .into_iter()
        .map(|realm| ResourcePath {
            path: template.replace(REALM_PLACEHOLDER, &realm),
            realm: Some(realm),
        })
        .collect())
}

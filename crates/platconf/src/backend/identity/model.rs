//! Subsets of the identity service's admin representations.
//!
//! Only the fields the reconciliation logic reads are typed. Request bodies are
//! the resource files themselves, sent unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ItemError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmRepresentation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub realm: Option<String>,
}

impl RealmRepresentation {
    /// Realm name, falling back to the id.
    pub fn name(&self) -> Option<&str> {
        self.realm
            .as_deref()
            .or(self.id.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRepresentation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realm_roles: Vec<String>,
    /// Client id to role names.
    #[serde(default)]
    pub client_roles: BTreeMap<String, Vec<String>>,
}

/// Role as returned by the service. Unknown fields are kept so the role can be
/// posted back unchanged in role mappings and composite lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRepresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub composite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composites: Option<Composites>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_role: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl RoleRepresentation {
    pub fn is_client_role(&self) -> bool {
        self.client_role.unwrap_or(false)
    }
}

/// Members of a composite role: realm role names and client id to role names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Composites {
    #[serde(default)]
    pub realm: Vec<String>,
    #[serde(default)]
    pub client: BTreeMap<String, Vec<String>>,
}

impl Composites {
    pub fn is_empty(&self) -> bool {
        self.realm.is_empty() && self.client.values().all(Vec::is_empty)
    }
}

/// Parses a resource file into its raw JSON body and a typed view of it.
pub fn parse_definition<T>(file: &str, text: &str) -> Result<(Value, T), ItemError>
where
    T: for<'de> Deserialize<'de>,
{
    let parse_error = |e: serde_json::Error| ItemError::Parse {
        file: file.to_string(),
        message: e.to_string(),
    };
    let body: Value = serde_json::from_str(text).map_err(parse_error)?;
    let typed = T::deserialize(&body).map_err(parse_error)?;
    Ok((body, typed))
}

/// Reads a required string field of a definition.
pub fn required<'a>(value: Option<&'a str>, field: &str, file: &str) -> Result<&'a str, ItemError> {
    value.filter(|v| !v.is_empty()).ok_or_else(|| ItemError::Parse {
        file: file.to_string(),
        message: format!("missing required field '{}'", field),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realm_name_falls_back_to_id() {
        let (_, realm): (Value, RealmRepresentation) =
            parse_definition("realm.json", r#"{"id":"shop","enabled":true}"#).unwrap();
        assert_eq!(realm.name(), Some("shop"));
    }

    #[test]
    fn test_user_roles() {
        let (_, user): (Value, UserRepresentation) = parse_definition(
            "user.json",
            r#"{"username":"jane","realmRoles":["admin"],"clientRoles":{"web":["viewer"]}}"#,
        )
        .unwrap();
        assert_eq!(user.realm_roles, vec!["admin"]);
        assert_eq!(user.client_roles["web"], vec!["viewer"]);
    }

    #[test]
    fn test_role_keeps_unknown_fields() {
        let role: RoleRepresentation = serde_json::from_str(
            r#"{"id":"1","name":"admin","composite":false,"clientRole":false,"containerId":"r1","attributes":{}}"#,
        )
        .unwrap();
        let back = serde_json::to_value(&role).unwrap();
        assert_eq!(back["attributes"], serde_json::json!({}));
        assert_eq!(back["containerId"], "r1");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let result: Result<(Value, ClientRepresentation), _> = parse_definition("client.json", "{");
        assert!(matches!(result, Err(ItemError::Parse { .. })));
    }
}

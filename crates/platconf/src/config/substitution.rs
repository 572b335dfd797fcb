//! `${key}` placeholder substitution for resource file contents.
//!
//! Substitution is a single pass: text produced by a resolver is copied to the
//! output verbatim and never scanned for further placeholders.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// `$${key}` (escaped) or `${key}` / `${key:-default}`.
static RE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\$)?\{([^{}]*)\}").unwrap());

const DEFAULT_DELIMITER: &str = ":-";

/// Reserved key that always resolves to the active realm.
pub const TENANT_KEY: &str = "tenant";

/// Replaces every placeholder in `text` with the resolver's value.
///
/// Unresolvable placeholders without a default are left untouched.
pub fn substitute<F>(text: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    RE_PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            let body = &caps[2];

            if caps.get(1).is_some() {
                return format!("${{{}}}", body);
            }

            let (key, default) = match body.split_once(DEFAULT_DELIMITER) {
                Some((key, default)) => (key, Some(default)),
                None => (body, None),
            };

            resolve(key)
                .or_else(|| default.map(str::to_string))
                .unwrap_or_else(|| whole.to_string())
        })
        .into_owned()
}

/// Where placeholder values come from.
#[derive(Debug, Clone, Copy)]
pub enum Resolver<'a> {
    /// Build properties first, then the captured process environment.
    Environment {
        properties: &'a BTreeMap<String, String>,
        environment: &'a BTreeMap<String, String>,
    },
    /// Build properties, except that `tenant` is the active realm.
    Tenant {
        properties: &'a BTreeMap<String, String>,
        realm: Option<&'a str>,
    },
}

impl Resolver<'_> {
    pub fn resolve(&self, key: &str) -> Option<String> {
        match self {
            Resolver::Environment {
                properties,
                environment,
            } => properties
                .get(key)
                .or_else(|| environment.get(key))
                .cloned(),
            Resolver::Tenant { properties, realm } => match (key, realm) {
                (TENANT_KEY, Some(realm)) => Some((*realm).to_string()),
                _ => properties.get(key).cloned(),
            },
        }
    }

    pub fn apply(&self, text: &str) -> String {
        substitute(text, |key| self.resolve(key))
    }
}

/// Snapshot of the process environment, taken once per run so resolution stays pure.
pub fn environment_snapshot() -> BTreeMap<String, String> {
    std::env::vars().collect()
}

//! Backend and resource kind selection from configuration values.

use std::fmt;
use std::str::FromStr;

use crate::config::RunConfig;
use crate::error::ConfigError;
use crate::resource::REALM_PLACEHOLDER;

/// Administrative REST root of the identity service.
pub const IDENTITY_ADMIN_PATH: &str = "auth/admin/realms";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Identity,
    Queue,
    ObjectStore,
    Database,
    Localization,
    Rest,
}

impl BackendKind {
    pub const ALL: [BackendKind; 6] = [
        BackendKind::Identity,
        BackendKind::Queue,
        BackendKind::ObjectStore,
        BackendKind::Database,
        BackendKind::Localization,
        BackendKind::Rest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Identity => "identity",
            BackendKind::Queue => "queue",
            BackendKind::ObjectStore => "object_store",
            BackendKind::Database => "database",
            BackendKind::Localization => "localization",
            BackendKind::Rest => "rest",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            BackendKind::Identity => &["keycloak"],
            BackendKind::Queue => &["rabbitmq"],
            BackendKind::ObjectStore => &["objectstore", "minio"],
            BackendKind::Database => &["postgres"],
            BackendKind::Localization => &["i18n"],
            BackendKind::Rest => &[],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        BackendKind::ALL
            .into_iter()
            .find(|kind| {
                kind.name().eq_ignore_ascii_case(value)
                    || kind.aliases().iter().any(|a| a.eq_ignore_ascii_case(value))
            })
            .ok_or_else(|| ConfigError::UnsupportedBackend {
                value: s.to_string(),
                allowed: join_names(BackendKind::ALL.iter().map(BackendKind::name)),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Realm,
    Client,
    User,
    Role,
}

impl IdentityKind {
    pub const ALL: [IdentityKind; 4] = [
        IdentityKind::Realm,
        IdentityKind::Client,
        IdentityKind::User,
        IdentityKind::Role,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IdentityKind::Realm => "REALM",
            IdentityKind::Client => "CLIENT",
            IdentityKind::User => "USER",
            IdentityKind::Role => "ROLE",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            IdentityKind::Realm => &["realms"],
            IdentityKind::Client => &["clients"],
            IdentityKind::User => &["users"],
            IdentityKind::Role => &["roles"],
        }
    }

    /// Collection path of the kind. Everything but realms lives inside a realm.
    pub fn template(&self) -> String {
        match self {
            IdentityKind::Realm => IDENTITY_ADMIN_PATH.to_string(),
            IdentityKind::Client => format!("{}/{}/clients", IDENTITY_ADMIN_PATH, REALM_PLACEHOLDER),
            IdentityKind::User => format!("{}/{}/users", IDENTITY_ADMIN_PATH, REALM_PLACEHOLDER),
            IdentityKind::Role => format!("{}/{}/roles", IDENTITY_ADMIN_PATH, REALM_PLACEHOLDER),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    Database,
    Role,
    Script,
}

impl DatabaseKind {
    pub const ALL: [DatabaseKind; 3] = [DatabaseKind::Database, DatabaseKind::Role, DatabaseKind::Script];

    pub fn name(&self) -> &'static str {
        match self {
            DatabaseKind::Database => "DATABASE",
            DatabaseKind::Role => "ROLE",
            DatabaseKind::Script => "SCRIPT",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            DatabaseKind::Database => &["databases"],
            DatabaseKind::Role => &["user", "users", "roles"],
            DatabaseKind::Script => &["scripts"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalizationKind {
    Label,
    Template,
    SelectionList,
}

impl LocalizationKind {
    pub const ALL: [LocalizationKind; 3] = [
        LocalizationKind::Label,
        LocalizationKind::Template,
        LocalizationKind::SelectionList,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LocalizationKind::Label => "LABEL",
            LocalizationKind::Template => "TEMPLATE",
            LocalizationKind::SelectionList => "SELECTION_LIST",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            LocalizationKind::Label => &["labels"],
            LocalizationKind::Template => &["templates"],
            LocalizationKind::SelectionList => &["selection_lists"],
        }
    }
}

/// Resource kind scoped to its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Identity(IdentityKind),
    Queue,
    ObjectStore,
    Database(DatabaseKind),
    Localization(LocalizationKind),
    Rest,
}

/// Where a run's items point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Resource template, possibly containing the realm placeholder.
    pub template: String,
    /// Realm list the template is expanded with.
    pub realms: String,
    /// Whether every resolved file is an item of its own.
    pub per_file: bool,
}

impl ResourceKind {
    /// Validates the configuration's resource selection for `backend`.
    pub fn select(backend: BackendKind, config: &RunConfig) -> Result<Self, ConfigError> {
        let resource = config.resource.trim();
        let kind = match backend {
            BackendKind::Identity => ResourceKind::Identity(parse_kind(
                backend,
                resource,
                &IdentityKind::ALL,
                IdentityKind::name,
                IdentityKind::aliases,
            )?),
            BackendKind::Queue => {
                if queue_name(config).is_empty() {
                    return Err(ConfigError::MissingField("resourceName"));
                }
                ResourceKind::Queue
            }
            BackendKind::ObjectStore => {
                if config.bucket.trim().is_empty() {
                    return Err(ConfigError::MissingField("bucket"));
                }
                ResourceKind::ObjectStore
            }
            BackendKind::Database => {
                let kind = parse_kind(
                    backend,
                    resource,
                    &DatabaseKind::ALL,
                    DatabaseKind::name,
                    DatabaseKind::aliases,
                )?;
                if kind != DatabaseKind::Script && config.resource_name.trim().is_empty() {
                    return Err(ConfigError::MissingField("resourceName"));
                }
                ResourceKind::Database(kind)
            }
            BackendKind::Localization => ResourceKind::Localization(parse_kind(
                backend,
                resource,
                &LocalizationKind::ALL,
                LocalizationKind::name,
                LocalizationKind::aliases,
            )?),
            BackendKind::Rest => {
                if resource.is_empty() {
                    return Err(ConfigError::MissingField("resource"));
                }
                ResourceKind::Rest
            }
        };
        Ok(kind)
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            ResourceKind::Identity(_) => BackendKind::Identity,
            ResourceKind::Queue => BackendKind::Queue,
            ResourceKind::ObjectStore => BackendKind::ObjectStore,
            ResourceKind::Database(_) => BackendKind::Database,
            ResourceKind::Localization(_) => BackendKind::Localization,
            ResourceKind::Rest => BackendKind::Rest,
        }
    }

    pub fn target(&self, config: &RunConfig) -> Target {
        let realms = config.realms.clone();
        match self {
            // Realms are created at the administrative root; configured realms do not apply.
            ResourceKind::Identity(IdentityKind::Realm) => Target {
                template: IdentityKind::Realm.template(),
                realms: String::new(),
                per_file: true,
            },
            ResourceKind::Identity(kind) => Target {
                template: kind.template(),
                realms,
                per_file: true,
            },
            ResourceKind::Queue => Target {
                template: queue_name(config).to_string(),
                realms,
                per_file: false,
            },
            ResourceKind::ObjectStore => Target {
                template: config.resource.trim().to_string(),
                realms,
                per_file: true,
            },
            ResourceKind::Database(DatabaseKind::Script) => Target {
                template: String::new(),
                realms,
                per_file: true,
            },
            ResourceKind::Database(_) => Target {
                template: config.resource_name.trim().to_string(),
                realms,
                per_file: false,
            },
            ResourceKind::Localization(_) => Target {
                template: String::new(),
                realms,
                per_file: true,
            },
            ResourceKind::Rest => Target {
                template: config.resource.trim().to_string(),
                realms,
                per_file: config.form_params.is_empty(),
            },
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Identity(kind) => write!(f, "{}", kind.name()),
            ResourceKind::Queue => write!(f, "QUEUE"),
            ResourceKind::ObjectStore => write!(f, "OBJECT"),
            ResourceKind::Database(kind) => write!(f, "{}", kind.name()),
            ResourceKind::Localization(kind) => write!(f, "{}", kind.name()),
            ResourceKind::Rest => write!(f, "REST"),
        }
    }
}

/// Queue name: `resourceName`, or `resource` unless that is just the kind name.
pub fn queue_name(config: &RunConfig) -> &str {
    let name = config.resource_name.trim();
    if !name.is_empty() {
        return name;
    }
    let resource = config.resource.trim();
    if resource.eq_ignore_ascii_case("queue") {
        ""
    } else {
        resource
    }
}

fn parse_kind<K: Copy>(
    backend: BackendKind,
    value: &str,
    all: &[K],
    name: fn(&K) -> &'static str,
    aliases: fn(&K) -> &'static [&'static str],
) -> Result<K, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::MissingField("resource"));
    }
    all.iter()
        .copied()
        .find(|kind| {
            name(kind).eq_ignore_ascii_case(value)
                || aliases(kind).iter().any(|a| a.eq_ignore_ascii_case(value))
        })
        .ok_or_else(|| ConfigError::UnsupportedResource {
            backend: backend.name().to_string(),
            value: value.to_string(),
            allowed: join_names(all.iter().map(name)),
        })
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

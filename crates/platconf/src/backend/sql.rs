//! SQL session seam over SeaORM.
//!
//! Statements are plain text. Identifiers and literals are quoted with the
//! helpers below, never bound as parameters.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Url;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement};
use secrecy::ExposeSecret;

use crate::auth::AuthParams;
use crate::error::{ItemError, TransportError};

#[async_trait]
pub trait SqlSession: Send {
    /// Runs `sql` and returns `column` of the first row, if any.
    async fn query_first(&mut self, sql: &str, column: &str) -> Result<Option<String>, ItemError>;

    /// Executes one or more statements.
    async fn execute(&mut self, sql: &str) -> Result<(), ItemError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// PostgreSQL session backed by a SeaORM connection.
pub struct SeaOrmSession {
    connection: Option<DatabaseConnection>,
}

impl SeaOrmSession {
    /// Connects with the run's credentials. A `jdbc:` prefix on the URL is accepted.
    pub async fn connect(url: &str, params: &AuthParams) -> Result<Self, TransportError> {
        let url = connection_url(url, params)?;
        let mut options = ConnectOptions::new(url.to_string());
        options.max_connections(1).sqlx_logging(false);

        info!("Connecting to database {}", redact_url(&url));
        let connection = Database::connect(options)
            .await
            .map_err(|e| TransportError::DatabaseConnect {
                url: redact_url(&url),
                message: e.to_string(),
            })?;

        Ok(Self {
            connection: Some(connection),
        })
    }

    fn connection(&self) -> Result<&DatabaseConnection, ItemError> {
        self.connection
            .as_ref()
            .ok_or_else(|| TransportError::DatabaseConnection("connection already closed".to_string()).into())
    }
}

#[async_trait]
impl SqlSession for SeaOrmSession {
    async fn query_first(&mut self, sql: &str, column: &str) -> Result<Option<String>, ItemError> {
        debug!("Query: {}", sql);
        let row = self
            .connection()?
            .query_one(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(statement_error)?;

        match row {
            Some(row) => row
                .try_get::<String>("", column)
                .map(Some)
                .map_err(statement_error),
            None => Ok(None),
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<(), ItemError> {
        debug!("Execute: {}", truncate_statement(sql));
        self.connection()?
            .execute_unprepared(sql)
            .await
            .map(|_| ())
            .map_err(statement_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.connection.take() {
            Some(connection) => connection
                .close()
                .await
                .map_err(|e| TransportError::DatabaseConnection(e.to_string())),
            None => Ok(()),
        }
    }
}

fn statement_error(error: DbErr) -> ItemError {
    match error {
        DbErr::ConnectionAcquire(e) => TransportError::DatabaseConnection(e.to_string()).into(),
        DbErr::Conn(e) => TransportError::DatabaseConnection(e.to_string()).into(),
        other => ItemError::Statement(other.to_string()),
    }
}

fn connection_url(url: &str, params: &AuthParams) -> Result<Url, TransportError> {
    let raw = url.trim().trim_start_matches("jdbc:");
    let invalid = |message: String| TransportError::DatabaseConnect {
        url: raw.to_string(),
        message,
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    url.set_username(params.username())
        .map_err(|_| invalid("URL cannot carry credentials".to_string()))?;
    url.set_password(Some(params.password().expose_secret()))
        .map_err(|_| invalid("URL cannot carry credentials".to_string()))?;
    Ok(url)
}

fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    if redacted.password().is_some() {
        let _ = redacted.set_password(Some("*****"));
    }
    redacted.to_string()
}

fn truncate_statement(sql: &str) -> String {
    const MAX: usize = 120;
    let single_line = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match single_line.char_indices().nth(MAX) {
        Some((end, _)) => format!("{}...", &single_line[..end]),
        None => single_line,
    }
}

/// `name` as a double quoted identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `value` as a single quoted string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `value` as an argument of `decode(..., 'escape')`, which reads backslashes as escapes.
pub fn quote_escape_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

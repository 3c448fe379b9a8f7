//! # Store Configuration
//!
//! Backend selection is explicit. The in-memory backend is the default for
//! local development; a durable deployment sets `CENSUS_BACKEND=postgres`
//! together with `DATABASE_URL`. There is no silent fallback from Postgres
//! to memory.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Environment variable selecting the backend.
pub const ENV_BACKEND: &str = "CENSUS_BACKEND";
/// Environment variable holding the Postgres connection URL.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Environment variable for the pool size.
pub const ENV_MAX_CONNECTIONS: &str = "CENSUS_DB_MAX_CONNECTIONS";
/// Environment variable for the pool acquire timeout, in milliseconds.
pub const ENV_ACQUIRE_TIMEOUT_MS: &str = "CENSUS_DB_ACQUIRE_TIMEOUT_MS";
/// Environment variable for the per-transaction statement timeout, in milliseconds.
pub const ENV_STATEMENT_TIMEOUT_MS: &str = "CENSUS_DB_STATEMENT_TIMEOUT_MS";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Backend name is not one of `memory` / `postgres`.
    #[error("unknown census backend '{0}' (expected 'memory' or 'postgres')")]
    UnknownBackend(String),

    /// Postgres backend selected without a connection URL.
    #[error("postgres backend selected but DATABASE_URL is not set")]
    MissingDatabaseUrl,

    /// A variable held a value that could not be parsed.
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },
}

/// Which [`crate::TallyBackend`] implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Process-local ledger. Data does not survive a restart.
    #[default]
    Memory,
    /// PostgreSQL tables, durable across restarts.
    Postgres,
}

impl BackendKind {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tally store configuration.
#[derive(Clone)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// Postgres connection URL. Required when `backend` is `Postgres`.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection.
    pub acquire_timeout: Duration,
    /// Upper bound on any single statement inside a store transaction.
    pub statement_timeout: Duration,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            database_url: None,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Postgres configuration with default pool settings.
    pub fn postgres(database_url: impl Into<String>) -> Self {
        Self {
            backend: BackendKind::Postgres,
            database_url: Some(database_url.into()),
            ..Self::default()
        }
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let backend = match lookup(ENV_BACKEND) {
            Some(raw) => raw.parse()?,
            None => defaults.backend,
        };
        let database_url = lookup(ENV_DATABASE_URL).filter(|url| !url.trim().is_empty());
        let max_connections =
            parse_var(&lookup, ENV_MAX_CONNECTIONS)?.unwrap_or(defaults.max_connections);
        let acquire_timeout = parse_var(&lookup, ENV_ACQUIRE_TIMEOUT_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.acquire_timeout);
        let statement_timeout = parse_var(&lookup, ENV_STATEMENT_TIMEOUT_MS)?
            .map(Duration::from_millis)
            .unwrap_or(defaults.statement_timeout);

        let config = Self {
            backend,
            database_url,
            max_connections,
            acquire_timeout,
            statement_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == BackendKind::Postgres && self.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                var: ENV_MAX_CONNECTIONS.to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw,
            }),
    }
}

//! Database configuration from environment variables.
//!
//! `DATABASE_URL` takes precedence. Otherwise the URL is assembled from
//! `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER`, and `DB_PASSWORD`, all of
//! which (except the port) must be set. User, password, and database name
//! are percent-encoded. Load a `.env` file with
//! `dotenvy::dotenv()` before calling [`DatabaseConfig::from_env`] if needed.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use radar_core::{Error, Result};

use crate::pool::PoolConfig;
use crate::schema_validation::validate_schema_name;

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

/// Default schema for the toilet table.
pub const DEFAULT_SCHEMA: &str = "public";

/// Default per-transaction statement timeout in milliseconds.
pub const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 30_000;

/// Connection settings for [`crate::Database`].
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Full connection URL.
    pub url: String,
    /// Schema placed first on the search_path of every transaction.
    pub schema: String,
    /// Pool sizing and timeouts.
    pub pool: PoolConfig,
    /// `statement_timeout` applied to every transaction.
    pub statement_timeout: Duration,
}

// Keep the password out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact_url(&self.url))
            .field("schema", &self.schema)
            .field("pool", &self.pool)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

impl DatabaseConfig {
    /// Configuration for `url` with default schema, pool, and timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            schema: DEFAULT_SCHEMA.to_string(),
            pool: PoolConfig::default(),
            statement_timeout: Duration::from_millis(DEFAULT_STATEMENT_TIMEOUT_MS),
        }
    }

    /// Set the schema. Validated when the configuration is used.
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the pool configuration.
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Set the per-transaction statement timeout.
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let url = match var("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = var("DB_HOST");
                let name = var("DB_NAME");
                let user = var("DB_USER");
                let password = var("DB_PASSWORD");
                match (host, name, user, password) {
                    (Some(host), Some(name), Some(user), Some(password)) => {
                        let port: u16 = parse_var(&var, "DB_PORT")?.unwrap_or(DEFAULT_PORT);
                        format!(
                            "postgres://{}:{}@{}:{}/{}",
                            urlencoding::encode(&user),
                            urlencoding::encode(&password),
                            host,
                            port,
                            urlencoding::encode(&name)
                        )
                    }
                    _ => {
                        return Err(Error::Config(
                            "No database configuration found: set DATABASE_URL, or DB_HOST, \
                             DB_NAME, DB_USER and DB_PASSWORD"
                                .to_string(),
                        ))
                    }
                }
            }
        };

        let schema = var("DB_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        validate_schema_name(&schema).map_err(|e| Error::Config(format!("DB_SCHEMA: {}", e)))?;

        let mut pool = PoolConfig::default();
        if let Some(size) = parse_var::<u32, _>(&var, "DB_POOL_SIZE")? {
            pool = pool.max_connections(size);
        }
        if let Some(secs) = parse_var::<u64, _>(&var, "DB_POOL_TIMEOUT")? {
            pool = pool.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_var::<u64, _>(&var, "DB_POOL_RECYCLE")? {
            pool = pool.max_lifetime(Some(Duration::from_secs(secs)));
        }
        let statement_timeout_ms = parse_var::<u64, _>(&var, "DB_STATEMENT_TIMEOUT_MS")?
            .unwrap_or(DEFAULT_STATEMENT_TIMEOUT_MS);

        let config = Self {
            url,
            schema,
            pool,
            statement_timeout: Duration::from_millis(statement_timeout_ms),
        };
        debug!(
            subsystem = "database",
            component = "config",
            op = "load",
            db_schema = %config.schema,
            max_connections = config.pool.max_connections,
            statement_timeout_ms,
            "Loaded database configuration"
        );
        Ok(config)
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: invalid value '{}': {}", key, raw, e))),
    }
}

/// Replace the password in a connection URL with `***`.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}

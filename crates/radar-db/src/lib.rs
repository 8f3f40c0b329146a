//! # radar-db
//!
//! PostgreSQL + PostGIS storage layer for the toilet radar.
//!
//! This crate provides:
//! - Environment configuration and connection pool management
//! - Schema-scoped transactions with a per-transaction statement timeout
//! - [`PgToiletRepository`], the PostGIS implementation of
//!   [`radar_core::ToiletStore`]
//! - SQL migrations for the `toilet_location` table and its indexes
//!
//! ## Example
//!
//! ```rust,ignore
//! use radar_db::{Database, DatabaseConfig, NearestToiletsParams, ToiletStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     dotenvy::dotenv().ok();
//!     let db = Database::from_config(&DatabaseConfig::from_env()?).await?;
//!
//!     let params = NearestToiletsParams::new(46.52, 6.63).with_radius(5_000.0);
//!     let center = params.validate()?;
//!     let nearby = db.toilets.nearest_within(center, params.radius_meters, params.result_limit).await?;
//!     println!("{} toilets nearby", nearby.len());
//!
//!     db.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod pool;
pub mod schema_validation;
pub mod toilets;

// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use radar_core::*;

pub use config::{redact_url, DatabaseConfig};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use schema_validation::validate_schema_name;
pub use toilets::PgToiletRepository;

use sqlx::{Pool, Postgres};
use tracing::info;

/// Database handle: the pool plus the repositories built on it.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: Pool<Postgres>,
    /// Toilet repository and spatial queries.
    pub toilets: PgToiletRepository,
}

impl Database {
    /// Create from an existing pool, using the `public` schema.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            toilets: PgToiletRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Connect using a full [`DatabaseConfig`], scoping every transaction to
    /// its schema and statement timeout.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        info!(
            subsystem = "database",
            component = "database",
            op = "connect",
            url = %redact_url(&config.url),
            db_schema = %config.schema,
            "Connecting to database"
        );
        validate_schema_name(&config.schema)?;
        let pool = create_pool_with_config(&config.url, config.pool.clone()).await?;
        let toilets =
            PgToiletRepository::scoped(pool.clone(), &config.schema, config.statement_timeout)?;
        Ok(Self { pool, toilets })
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        info!(
            subsystem = "database",
            component = "database",
            op = "migrate",
            "Migrations applied"
        );
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(
            subsystem = "database",
            component = "database",
            op = "close",
            "Database connection pool closed"
        );
    }
}

//! # diachi-db
//!
//! SQLite reference-store layer for the diachi address engine.
//!
//! This crate provides:
//! - Connection pool management over `sqlx`
//! - Schema bootstrap and the numeric leading-zero migration
//! - Repositories for the administrative hierarchy, the abbreviation
//!   dictionary, and the optional administrative migration map
//! - In-memory test fixtures seeded with a slice of the real hierarchy
//!
//! The reference data is read-only at runtime: the engine loads it once at
//! startup into an in-memory store and never queries the pool again on the
//! hot path.
//!
//! ## Example
//!
//! ```rust,ignore
//! use diachi_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:data/address.db").await?;
//!     let rows = db.divisions.load_all().await?;
//!     println!("{} hierarchy rows", rows.len());
//!     Ok(())
//! }
//! ```

pub mod abbreviations;
pub mod divisions;
pub mod migration;
pub mod pool;
pub mod schema;

// Test fixtures are always compiled so integration tests in dependent
// crates can use them.
pub mod test_fixtures;

// Re-export core types
pub use diachi_core::*;

pub use abbreviations::SqliteAbbreviationRepository;
pub use divisions::SqliteDivisionRepository;
pub use migration::SqliteMigrationRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use schema::{init_schema, migrate_leading_zeros, strip_leading_zeros};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    pool: sqlx::SqlitePool,
    /// Administrative hierarchy repository.
    pub divisions: SqliteDivisionRepository,
    /// Abbreviation dictionary repository.
    pub abbreviations: SqliteAbbreviationRepository,
    /// Optional administrative migration map repository.
    pub migrations: SqliteMigrationRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            divisions: SqliteDivisionRepository::new(pool.clone()),
            abbreviations: SqliteAbbreviationRepository::new(pool.clone()),
            migrations: SqliteMigrationRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::new(pool))
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }
}

//! Optional administrative migration map repository.
//!
//! The `admin_division_migration` table records renames and re-parentings
//! of administrative units. When present, Phase 3 rewrites legacy triples
//! to their current names before scoring.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use diachi_core::{MigrationEntry, Result};

/// SQLite repository for the `admin_division_migration` table.
#[derive(Clone)]
pub struct SqliteMigrationRepository {
    pool: SqlitePool,
}

impl SqliteMigrationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether the migration table exists in this database.
    pub async fn table_exists(&self) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (
                 SELECT 1 FROM sqlite_master
                 WHERE type = 'table' AND name = 'admin_division_migration'
             ) AS present",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("present") != 0)
    }

    /// Load every migration entry; empty when the table is absent.
    pub async fn load_all(&self) -> Result<Vec<MigrationEntry>> {
        if !self.table_exists().await? {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, MigrationEntry>(
            "SELECT old_province, old_district, old_ward,
                    new_province, new_district, new_ward
             FROM admin_division_migration",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(
            subsystem = "db",
            component = "migration",
            op = "load_all",
            result_count = rows.len(),
            "Loaded admin division migrations"
        );
        Ok(rows)
    }
}

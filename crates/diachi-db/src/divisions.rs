//! Administrative hierarchy repository.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use diachi_core::{AdminDivision, Result};

/// SQLite repository for the `admin_divisions` table.
///
/// At runtime the engine answers hierarchy queries from its in-memory
/// [`ReferenceStore`](https://docs.rs/diachi-engine); this repository is the
/// startup load path and the authoritative implementation of the same
/// contract for cold-path callers and tests.
#[derive(Clone)]
pub struct SqliteDivisionRepository {
    pool: SqlitePool,
}

impl SqliteDivisionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load every hierarchy row. Startup only.
    pub async fn load_all(&self) -> Result<Vec<AdminDivision>> {
        let rows = sqlx::query_as::<_, AdminDivision>("SELECT * FROM admin_divisions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        debug!(
            subsystem = "db",
            component = "divisions",
            op = "load_all",
            row_count = rows.len(),
            "Loaded admin divisions"
        );
        Ok(rows)
    }

    /// Rows whose normalized province/district match the given scope.
    /// Empty scope returns all rows. Backed by the normalized-name indexes.
    pub async fn candidates_in_scope(
        &self,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Result<Vec<AdminDivision>> {
        let rows = match (province, district) {
            (Some(p), Some(d)) => {
                sqlx::query_as::<_, AdminDivision>(
                    "SELECT * FROM admin_divisions
                     WHERE province_name_normalized = ? AND district_name_normalized = ?",
                )
                .bind(p)
                .bind(d)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(p), None) => {
                sqlx::query_as::<_, AdminDivision>(
                    "SELECT * FROM admin_divisions WHERE province_name_normalized = ?",
                )
                .bind(p)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(d)) => {
                sqlx::query_as::<_, AdminDivision>(
                    "SELECT * FROM admin_divisions WHERE district_name_normalized = ?",
                )
                .bind(d)
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => self.load_all().await?,
        };
        Ok(rows)
    }

    /// True iff at least one row matches every supplied normalized name.
    /// Absent arguments act as wildcards.
    pub async fn validate_triple(
        &self,
        province: Option<&str>,
        district: Option<&str>,
        ward: Option<&str>,
    ) -> Result<bool> {
        let mut conditions = Vec::new();
        if province.is_some() {
            conditions.push("province_name_normalized = ?");
        }
        if district.is_some() {
            conditions.push("district_name_normalized = ?");
        }
        if ward.is_some() {
            conditions.push("ward_name_normalized = ?");
        }

        let query = if conditions.is_empty() {
            "SELECT EXISTS (SELECT 1 FROM admin_divisions) AS present".to_string()
        } else {
            format!(
                "SELECT EXISTS (SELECT 1 FROM admin_divisions WHERE {}) AS present",
                conditions.join(" AND ")
            )
        };

        let mut q = sqlx::query(&query);
        for value in [province, district, ward].into_iter().flatten() {
            q = q.bind(value);
        }

        let row = q.fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("present") != 0)
    }

    /// Find one row matching the supplied normalized names.
    ///
    /// Requires at least two supplied levels: a province-only lookup would
    /// return an arbitrary district/ward row.
    pub async fn find_exact(
        &self,
        province: Option<&str>,
        district: Option<&str>,
        ward: Option<&str>,
    ) -> Result<Option<AdminDivision>> {
        let supplied = [province, district, ward]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if supplied < 2 {
            return Ok(None);
        }

        let mut conditions = Vec::new();
        if province.is_some() {
            conditions.push("province_name_normalized = ?");
        }
        if district.is_some() {
            conditions.push("district_name_normalized = ?");
        }
        if ward.is_some() {
            conditions.push("ward_name_normalized = ?");
        }

        let query = format!(
            "SELECT * FROM admin_divisions WHERE {} ORDER BY id LIMIT 1",
            conditions.join(" AND ")
        );

        let mut q = sqlx::query_as::<_, AdminDivision>(&query);
        for value in [province, district, ward].into_iter().flatten() {
            q = q.bind(value);
        }

        Ok(q.fetch_optional(&self.pool).await?)
    }

    /// Total row count, for startup sanity checks.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM admin_divisions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

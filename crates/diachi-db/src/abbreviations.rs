//! Abbreviation dictionary repository.
//!
//! Abbreviations map a short key to a normalized word, optionally scoped
//! to a `(province_context, district_context)` pair. Lookup precedence for
//! a key is district-scoped, then province-scoped, then global; the first
//! hit wins. Keys that collide with whole tokens of any administrative
//! name are forbidden — that invariant is enforced by the data pipeline,
//! not here.

use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::debug;

use diachi_core::{Abbreviation, Result};

/// SQLite repository for the `abbreviations` table.
#[derive(Clone)]
pub struct SqliteAbbreviationRepository {
    pool: SqlitePool,
}

impl SqliteAbbreviationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load every abbreviation row. Startup only.
    pub async fn load_all(&self) -> Result<Vec<Abbreviation>> {
        let rows = sqlx::query_as::<_, Abbreviation>(
            "SELECT key, word, province_context, district_context FROM abbreviations",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(
            subsystem = "db",
            component = "abbreviations",
            op = "load_all",
            result_count = rows.len(),
            "Loaded abbreviations"
        );
        Ok(rows)
    }

    /// Resolve one key in scope. Precedence: (province, district) exact,
    /// then (province, —), then (—, —).
    pub async fn lookup(
        &self,
        key: &str,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT word FROM abbreviations
             WHERE key = ?
               AND (province_context IS NULL OR province_context = ?)
               AND (district_context IS NULL OR district_context = ?)
             ORDER BY
               CASE
                 WHEN district_context IS NOT NULL THEN 0
                 WHEN province_context IS NOT NULL THEN 1
                 ELSE 2
               END
             LIMIT 1",
        )
        .bind(key)
        .bind(province)
        .bind(district)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(word,)| word))
    }

    /// All keys visible in scope, honoring the same precedence: a
    /// district-scoped entry shadows a province-scoped one, which shadows
    /// a global one. Deterministic and cacheable on (province, district).
    pub async fn load_in_scope(
        &self,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT key, word, province_context, district_context FROM abbreviations
             WHERE (province_context IS NULL OR province_context = ?)
               AND (district_context IS NULL OR district_context = ?)",
        )
        .bind(province)
        .bind(district)
        .fetch_all(&self.pool)
        .await?;

        let mut merged: HashMap<String, (u8, String)> = HashMap::new();
        for (key, word, province_context, district_context) in rows {
            let specificity = if district_context.is_some() {
                2
            } else if province_context.is_some() {
                1
            } else {
                0
            };
            match merged.get(&key) {
                Some((existing, _)) if *existing >= specificity => {}
                _ => {
                    merged.insert(key, (specificity, word));
                }
            }
        }

        Ok(merged
            .into_iter()
            .map(|(key, (_, word))| (key, word))
            .collect())
    }
}

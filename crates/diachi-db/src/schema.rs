//! Schema bootstrap and build-time data migrations.
//!
//! The reference database ships as a single SQLite file produced by the
//! data pipeline. This module creates the tables and indexes when they are
//! absent (fresh test databases) and applies the numeric-name migration
//! that the matching rules depend on.

use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use diachi_core::Result;

/// DDL for the three reference tables and their required indexes.
///
/// Column removals are breaking; additions are allowed, so consumers must
/// select by name. The composite index backs `validate_triple`; the
/// per-column indexes back scoped candidate listings.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS admin_divisions (
        id INTEGER PRIMARY KEY,
        province_full TEXT NOT NULL,
        province_prefix TEXT NOT NULL DEFAULT '',
        province_name TEXT NOT NULL,
        province_name_normalized TEXT NOT NULL,
        province_full_normalized TEXT NOT NULL DEFAULT '',
        district_full TEXT NOT NULL,
        district_prefix TEXT NOT NULL DEFAULT '',
        district_name TEXT NOT NULL,
        district_name_normalized TEXT NOT NULL,
        ward_full TEXT NOT NULL DEFAULT '',
        ward_prefix TEXT NOT NULL DEFAULT '',
        ward_name TEXT NOT NULL DEFAULT '',
        ward_name_normalized TEXT NOT NULL DEFAULT ''
    )",
    "CREATE INDEX IF NOT EXISTS idx_admin_province_norm
        ON admin_divisions (province_name_normalized)",
    "CREATE INDEX IF NOT EXISTS idx_admin_district_norm
        ON admin_divisions (district_name_normalized)",
    "CREATE INDEX IF NOT EXISTS idx_admin_ward_norm
        ON admin_divisions (ward_name_normalized)",
    "CREATE INDEX IF NOT EXISTS idx_admin_triple
        ON admin_divisions (province_name_normalized, district_name_normalized, ward_name_normalized)",
    "CREATE TABLE IF NOT EXISTS abbreviations (
        id INTEGER PRIMARY KEY,
        key TEXT NOT NULL,
        word TEXT NOT NULL,
        province_context TEXT NULL,
        district_context TEXT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_abbrev_scope
        ON abbreviations (key, COALESCE(province_context, ''), COALESCE(district_context, ''))",
    "CREATE TABLE IF NOT EXISTS admin_division_migration (
        id INTEGER PRIMARY KEY,
        old_province TEXT NOT NULL,
        old_district TEXT NOT NULL,
        old_ward TEXT NOT NULL,
        new_province TEXT NOT NULL,
        new_district TEXT NOT NULL,
        new_ward TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_migration_old_province
        ON admin_division_migration (old_province)",
    "CREATE INDEX IF NOT EXISTS idx_migration_old_pd
        ON admin_division_migration (old_province, old_district)",
    "CREATE INDEX IF NOT EXISTS idx_migration_old_triple
        ON admin_division_migration (old_province, old_district, old_ward)",
];

/// Create tables and indexes if they do not exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!(subsystem = "db", component = "schema", op = "init", "Schema ensured");
    Ok(())
}

/// Strip leading zeros from the numeric tail tokens of a normalized name.
///
/// "phuong 01" → "phuong 1", "04" → "4". Non-numeric tokens pass through.
pub fn strip_leading_zeros(name: &str) -> String {
    name.split_whitespace()
        .map(|token| {
            if token.len() > 1
                && token.starts_with('0')
                && token.chars().all(|c| c.is_ascii_digit())
            {
                let stripped = token.trim_start_matches('0');
                if stripped.is_empty() {
                    "0"
                } else {
                    stripped
                }
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite legacy zero-padded numeric ward/district names in place.
///
/// Numeric names must be stored without leading zeros so that "phuong 1"
/// in the input matches "phuong 1" in the store. Returns the number of
/// rows rewritten.
pub async fn migrate_leading_zeros(pool: &SqlitePool) -> Result<u64> {
    let rows = sqlx::query(
        "SELECT id, district_name_normalized, ward_name_normalized
         FROM admin_divisions
         WHERE district_name_normalized LIKE '%0%'
            OR ward_name_normalized LIKE '%0%'",
    )
    .fetch_all(pool)
    .await?;

    let mut rewritten = 0u64;
    for row in rows {
        let id: i64 = row.get("id");
        let district: String = row.get("district_name_normalized");
        let ward: String = row.get("ward_name_normalized");

        let district_fixed = strip_leading_zeros(&district);
        let ward_fixed = strip_leading_zeros(&ward);

        if district_fixed != district || ward_fixed != ward {
            sqlx::query(
                "UPDATE admin_divisions
                 SET district_name_normalized = ?, ward_name_normalized = ?
                 WHERE id = ?",
            )
            .bind(&district_fixed)
            .bind(&ward_fixed)
            .bind(id)
            .execute(pool)
            .await?;
            rewritten += 1;
        }
    }

    if rewritten > 0 {
        info!(
            subsystem = "db",
            component = "schema",
            op = "migrate_leading_zeros",
            result_count = rewritten,
            "Rewrote zero-padded numeric names"
        );
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_zero_padded_numerics() {
        assert_eq!(strip_leading_zeros("phuong 01"), "phuong 1");
        assert_eq!(strip_leading_zeros("04"), "4");
        assert_eq!(strip_leading_zeros("010"), "10");
        assert_eq!(strip_leading_zeros("ba dinh"), "ba dinh");
        assert_eq!(strip_leading_zeros("0"), "0");
        assert_eq!(strip_leading_zeros("00"), "0");
    }

    #[test]
    fn leaves_mixed_tokens_alone() {
        // "0a" is not numeric; do not touch it.
        assert_eq!(strip_leading_zeros("khu 0a"), "khu 0a");
    }
}

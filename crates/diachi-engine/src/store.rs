//! In-memory reference store.
//!
//! The administrative hierarchy, abbreviation dictionary, and optional
//! migration map, loaded once at startup and never mutated. All hot-path
//! queries (scoped candidate listings, triple validation, abbreviation
//! resolution) are answered from the in-memory indexes; the database pool
//! is only touched during [`ReferenceStore::load`].

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::info;

use diachi_core::{Abbreviation, AdminDivision, AdminLevel, Error, MigrationEntry, Result};
use diachi_db::{strip_leading_zeros, Database};

use crate::token_index::TokenIndex;

type ScopeKey = (Option<String>, Option<String>);

/// Process-wide, read-only reference data with lookup indexes.
pub struct ReferenceStore {
    rows: Vec<AdminDivision>,
    index_of: HashMap<i64, usize>,
    by_province: HashMap<String, Vec<usize>>,
    by_province_district: HashMap<(String, String), Vec<usize>>,
    province_rows: HashMap<String, HashSet<i64>>,
    district_rows: HashMap<String, HashSet<i64>>,
    ward_rows: HashMap<String, HashSet<i64>>,
    abbrev_by_key: HashMap<String, Vec<Abbreviation>>,
    migrations: HashMap<(String, String, String), (String, String, String)>,
    token_index: TokenIndex,
    scope_cache: Mutex<LruCache<ScopeKey, Arc<HashMap<String, String>>>>,
}

impl ReferenceStore {
    /// Build a store from already-loaded reference data.
    ///
    /// Normalized numeric names are defensively stripped of leading zeros
    /// so the matching invariant holds even against an unmigrated file.
    pub fn from_parts(
        mut rows: Vec<AdminDivision>,
        abbreviations: Vec<Abbreviation>,
        migrations: Vec<MigrationEntry>,
        abbreviation_cache_size: usize,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Reference("admin_divisions is empty".to_string()));
        }

        for row in &mut rows {
            row.district_name_normalized = strip_leading_zeros(&row.district_name_normalized);
            row.ward_name_normalized = strip_leading_zeros(&row.ward_name_normalized);
        }

        let token_index = TokenIndex::build(&rows);

        let mut index_of = HashMap::with_capacity(rows.len());
        let mut by_province: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_province_district: HashMap<(String, String), Vec<usize>> = HashMap::new();
        let mut province_rows: HashMap<String, HashSet<i64>> = HashMap::new();
        let mut district_rows: HashMap<String, HashSet<i64>> = HashMap::new();
        let mut ward_rows: HashMap<String, HashSet<i64>> = HashMap::new();

        for (position, row) in rows.iter().enumerate() {
            index_of.insert(row.id, position);
            by_province
                .entry(row.province_name_normalized.clone())
                .or_default()
                .push(position);
            by_province_district
                .entry((
                    row.province_name_normalized.clone(),
                    row.district_name_normalized.clone(),
                ))
                .or_default()
                .push(position);
            province_rows
                .entry(row.province_name_normalized.clone())
                .or_default()
                .insert(row.id);
            if !row.district_name_normalized.is_empty() {
                district_rows
                    .entry(row.district_name_normalized.clone())
                    .or_default()
                    .insert(row.id);
            }
            if !row.ward_name_normalized.is_empty() {
                ward_rows
                    .entry(row.ward_name_normalized.clone())
                    .or_default()
                    .insert(row.id);
            }
        }

        let mut abbrev_by_key: HashMap<String, Vec<Abbreviation>> = HashMap::new();
        for entry in abbreviations {
            abbrev_by_key.entry(entry.key.clone()).or_default().push(entry);
        }

        let migrations = migrations
            .into_iter()
            .map(|m| {
                (
                    (m.old_province, m.old_district, m.old_ward),
                    (m.new_province, m.new_district, m.new_ward),
                )
            })
            .collect();

        let capacity =
            NonZeroUsize::new(abbreviation_cache_size.max(1)).expect("non-zero capacity");

        Ok(Self {
            rows,
            index_of,
            by_province,
            by_province_district,
            province_rows,
            district_rows,
            ward_rows,
            abbrev_by_key,
            migrations,
            token_index,
            scope_cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Load the store from the reference database. Startup only.
    pub async fn load(db: &Database, abbreviation_cache_size: usize) -> Result<Self> {
        let start = Instant::now();
        let rows = db.divisions.load_all().await?;
        let abbreviations = db.abbreviations.load_all().await?;
        let migrations = db.migrations.load_all().await?;

        let store = Self::from_parts(rows, abbreviations, migrations, abbreviation_cache_size)?;
        info!(
            subsystem = "store",
            op = "load",
            row_count = store.rows.len(),
            token_count = store.token_index.token_count(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Reference store loaded"
        );
        Ok(store)
    }

    /// All hierarchy rows.
    pub fn rows(&self) -> &[AdminDivision] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_by_id(&self, id: i64) -> Option<&AdminDivision> {
        self.index_of.get(&id).map(|pos| &self.rows[*pos])
    }

    /// The token index built over this store's rows.
    pub fn token_index(&self) -> &TokenIndex {
        &self.token_index
    }

    /// Normalized name of a row at a level.
    pub fn level_name(row: &AdminDivision, level: AdminLevel) -> &str {
        match level {
            AdminLevel::Province => &row.province_name_normalized,
            AdminLevel::District => &row.district_name_normalized,
            AdminLevel::Ward => &row.ward_name_normalized,
            AdminLevel::Street => "",
        }
    }

    /// Rows consistent with the given normalized scope. Empty scope
    /// returns all rows.
    pub fn candidates_in_scope(
        &self,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Vec<&AdminDivision> {
        match (province, district) {
            (Some(p), Some(d)) => self
                .by_province_district
                .get(&(p.to_string(), d.to_string()))
                .map(|positions| positions.iter().map(|pos| &self.rows[*pos]).collect())
                .unwrap_or_default(),
            (Some(p), None) => self
                .by_province
                .get(p)
                .map(|positions| positions.iter().map(|pos| &self.rows[*pos]).collect())
                .unwrap_or_default(),
            (None, Some(d)) => self
                .rows
                .iter()
                .filter(|row| row.district_name_normalized == d)
                .collect(),
            (None, None) => self.rows.iter().collect(),
        }
    }

    /// Whether a row falls inside the given normalized scope.
    pub fn row_in_scope(
        row: &AdminDivision,
        province: Option<&str>,
        district: Option<&str>,
    ) -> bool {
        province.map_or(true, |p| row.province_name_normalized == p)
            && district.map_or(true, |d| row.district_name_normalized == d)
    }

    /// True iff at least one row matches every supplied normalized name.
    /// Absent arguments act as wildcards.
    pub fn validate_triple(
        &self,
        province: Option<&str>,
        district: Option<&str>,
        ward: Option<&str>,
    ) -> bool {
        let mut sets: Vec<&HashSet<i64>> = Vec::with_capacity(3);
        for (value, index) in [
            (province, &self.province_rows),
            (district, &self.district_rows),
            (ward, &self.ward_rows),
        ] {
            if let Some(name) = value {
                match index.get(name) {
                    Some(ids) => sets.push(ids),
                    None => return false,
                }
            }
        }

        if sets.is_empty() {
            return !self.rows.is_empty();
        }

        // Intersect starting from the smallest set.
        sets.sort_by_key(|s| s.len());
        let (first, rest) = sets.split_first().expect("non-empty");
        first.iter().any(|id| rest.iter().all(|s| s.contains(id)))
    }

    /// Resolve one abbreviation key in scope. Precedence:
    /// (province, district) exact, then (province, —), then (—, —).
    pub fn lookup_abbreviation(
        &self,
        key: &str,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Option<&str> {
        let entries = self.abbrev_by_key.get(key)?;

        let visible = |entry: &&Abbreviation| {
            entry
                .province_context
                .as_deref()
                .map_or(true, |p| Some(p) == province)
                && entry
                    .district_context
                    .as_deref()
                    .map_or(true, |d| Some(d) == district)
        };

        entries
            .iter()
            .filter(visible)
            .max_by_key(|entry| {
                (entry.district_context.is_some() as u8) * 2
                    + entry.province_context.is_some() as u8
            })
            .map(|entry| entry.word.as_str())
    }

    /// The merged abbreviation mapping visible in scope, honoring the
    /// lookup precedence. Cached per scope pair.
    pub fn abbreviations_in_scope(
        &self,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Arc<HashMap<String, String>> {
        let key = (province.map(str::to_string), district.map(str::to_string));
        if let Some(hit) = self.scope_cache.lock().get(&key) {
            return Arc::clone(hit);
        }

        let mut merged = HashMap::new();
        for k in self.abbrev_by_key.keys() {
            if let Some(word) = self.lookup_abbreviation(k, province, district) {
                merged.insert(k.clone(), word.to_string());
            }
        }
        let merged = Arc::new(merged);
        self.scope_cache.lock().put(key, Arc::clone(&merged));
        merged
    }

    /// Rewrite a legacy triple through the migration map, when present.
    pub fn migrate_triple(
        &self,
        province: &str,
        district: &str,
        ward: &str,
    ) -> Option<&(String, String, String)> {
        self.migrations.get(&(
            province.to_string(),
            district.to_string(),
            ward.to_string(),
        ))
    }

    pub fn has_migrations(&self) -> bool {
        !self.migrations.is_empty()
    }

    /// Current name of a legacy province, when the migration map knows it.
    pub fn migrate_province_name(&self, old_province: &str) -> Option<&str> {
        self.migrations
            .iter()
            .find(|((old_p, _, _), _)| old_p == old_province)
            .map(|(_, (new_p, _, _))| new_p.as_str())
    }

    /// The province containing a district, when unique across the
    /// hierarchy.
    pub fn province_for_district(&self, district: &str) -> Option<String> {
        let ids = self.district_rows.get(district)?;
        let mut found: Option<&str> = None;
        for id in ids {
            let row = self.row_by_id(*id)?;
            match found {
                None => found = Some(&row.province_name_normalized),
                Some(existing) if existing == row.province_name_normalized => {}
                Some(_) => return None,
            }
        }
        found.map(str::to_string)
    }

    /// The district containing a ward within a province, when unique.
    pub fn district_for_ward(&self, province: &str, ward: &str) -> Option<String> {
        let positions = self.by_province.get(province)?;
        let mut found: Option<&str> = None;
        for pos in positions {
            let row = &self.rows[*pos];
            if row.ward_name_normalized == ward {
                match found {
                    None => found = Some(&row.district_name_normalized),
                    Some(existing) if existing == row.district_name_normalized => {}
                    Some(_) => return None,
                }
            }
        }
        found.map(str::to_string)
    }

    /// Display name for one level of a row: numeric names keep their
    /// prefix ("Quận 8"), others are the bare name ("Ba Đình").
    fn display_part(prefix: &str, name: &str, name_normalized: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        if name_normalized.chars().all(|c| c.is_ascii_digit()) && !prefix.is_empty() {
            Some(format!("{prefix} {name}"))
        } else {
            Some(name.to_string())
        }
    }

    /// Full display names for a normalized combination, from the first row
    /// matching all supplied levels. Only supplied levels get a display.
    pub fn display_names(
        &self,
        province: Option<&str>,
        district: Option<&str>,
        ward: Option<&str>,
    ) -> (Option<String>, Option<String>, Option<String>) {
        if province.is_none() && district.is_none() && ward.is_none() {
            return (None, None, None);
        }

        let matches = |row: &AdminDivision| {
            district.map_or(true, |d| row.district_name_normalized == d)
                && ward.map_or(true, |w| row.ward_name_normalized == w)
        };

        let row = match province {
            Some(p) => self
                .by_province
                .get(p)
                .and_then(|positions| positions.iter().map(|pos| &self.rows[*pos]).find(|r| matches(r))),
            None => self.rows.iter().find(|r| matches(r)),
        };

        let Some(row) = row else {
            return (None, None, None);
        };

        let province_display = province.and_then(|_| {
            Self::display_part(
                &row.province_prefix,
                &row.province_name,
                &row.province_name_normalized,
            )
        });
        let district_display = district.and_then(|_| {
            Self::display_part(
                &row.district_prefix,
                &row.district_name,
                &row.district_name_normalized,
            )
        });
        let ward_display = ward.and_then(|_| {
            Self::display_part(&row.ward_prefix, &row.ward_name, &row.ward_name_normalized)
        });

        (province_display, district_display, ward_display)
    }

    /// The unique (province, district) parents of a ward across the whole
    /// hierarchy, `None` when the ward name is ambiguous or unknown.
    pub fn parents_for_ward(&self, ward: &str) -> Option<(String, String)> {
        let ids = self.ward_rows.get(ward)?;
        let mut found: Option<(&str, &str)> = None;
        for id in ids {
            let row = self.row_by_id(*id)?;
            let pair = (
                row.province_name_normalized.as_str(),
                row.district_name_normalized.as_str(),
            );
            match found {
                None => found = Some(pair),
                Some(existing) if existing == pair => {}
                Some(_) => return None,
            }
        }
        found.map(|(p, d)| (p.to_string(), d.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn division(
        id: i64,
        province: (&str, &str, &str),
        district: (&str, &str, &str),
        ward: (&str, &str, &str),
    ) -> AdminDivision {
        AdminDivision {
            id,
            province_full: format!("{} {}", province.1, province.0),
            province_prefix: province.1.to_string(),
            province_name: province.0.to_string(),
            province_name_normalized: province.2.to_string(),
            province_full_normalized: String::new(),
            district_full: format!("{} {}", district.1, district.0),
            district_prefix: district.1.to_string(),
            district_name: district.0.to_string(),
            district_name_normalized: district.2.to_string(),
            ward_full: format!("{} {}", ward.1, ward.0),
            ward_prefix: ward.1.to_string(),
            ward_name: ward.0.to_string(),
            ward_name_normalized: ward.2.to_string(),
        }
    }

    fn store() -> ReferenceStore {
        let rows = vec![
            division(
                1,
                ("Hà Nội", "Thành phố", "ha noi"),
                ("Ba Đình", "Quận", "ba dinh"),
                ("Điện Biên", "Phường", "dien bien"),
            ),
            division(
                2,
                ("Hà Nội", "Thành phố", "ha noi"),
                ("Cầu Giấy", "Quận", "cau giay"),
                ("Trung Hòa", "Phường", "trung hoa"),
            ),
            division(
                3,
                ("Hồ Chí Minh", "Thành phố", "ho chi minh"),
                ("8", "Quận", "8"),
                ("4", "Phường", "04"),
            ),
        ];
        let abbreviations = vec![
            Abbreviation {
                key: "hn".to_string(),
                word: "ha noi".to_string(),
                province_context: None,
                district_context: None,
            },
            Abbreviation {
                key: "db".to_string(),
                word: "doan bo".to_string(),
                province_context: None,
                district_context: None,
            },
            Abbreviation {
                key: "db".to_string(),
                word: "dien bien".to_string(),
                province_context: Some("ha noi".to_string()),
                district_context: Some("ba dinh".to_string()),
            },
        ];
        let migrations = vec![MigrationEntry {
            old_province: "ha tay".to_string(),
            old_district: "ha dong".to_string(),
            old_ward: "van quan".to_string(),
            new_province: "ha noi".to_string(),
            new_district: "ha dong".to_string(),
            new_ward: "van quan".to_string(),
        }];
        ReferenceStore::from_parts(rows, abbreviations, migrations, 16).unwrap()
    }

    #[test]
    fn empty_rows_rejected() {
        let err = ReferenceStore::from_parts(Vec::new(), Vec::new(), Vec::new(), 16);
        assert!(err.is_err());
    }

    #[test]
    fn leading_zeros_stripped_on_load() {
        let store = store();
        assert!(store.validate_triple(Some("ho chi minh"), Some("8"), Some("4")));
        assert!(!store.validate_triple(Some("ho chi minh"), Some("8"), Some("04")));
    }

    #[test]
    fn candidates_in_scope_uses_indexes() {
        let store = store();
        assert_eq!(store.candidates_in_scope(None, None).len(), 3);
        assert_eq!(store.candidates_in_scope(Some("ha noi"), None).len(), 2);
        assert_eq!(
            store
                .candidates_in_scope(Some("ha noi"), Some("ba dinh"))
                .len(),
            1
        );
        assert!(store.candidates_in_scope(Some("da nang"), None).is_empty());
    }

    #[test]
    fn validate_triple_wildcards() {
        let store = store();
        assert!(store.validate_triple(None, None, None));
        assert!(store.validate_triple(Some("ha noi"), None, Some("trung hoa")));
        assert!(!store.validate_triple(Some("ha noi"), Some("ba dinh"), Some("trung hoa")));
        assert!(!store.validate_triple(Some("atlantis"), None, None));
    }

    #[test]
    fn abbreviation_precedence() {
        let store = store();
        // Global meaning everywhere.
        assert_eq!(store.lookup_abbreviation("db", None, None), Some("doan bo"));
        // District-scoped meaning wins inside its scope.
        assert_eq!(
            store.lookup_abbreviation("db", Some("ha noi"), Some("ba dinh")),
            Some("dien bien")
        );
        // Outside the district the global meaning still applies.
        assert_eq!(
            store.lookup_abbreviation("db", Some("ha noi"), Some("cau giay")),
            Some("doan bo")
        );
        assert_eq!(store.lookup_abbreviation("zz", None, None), None);
    }

    #[test]
    fn scope_mapping_is_cached() {
        let store = store();
        let first = store.abbreviations_in_scope(Some("ha noi"), Some("ba dinh"));
        let second = store.abbreviations_in_scope(Some("ha noi"), Some("ba dinh"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get("db").map(String::as_str), Some("dien bien"));
    }

    #[test]
    fn migration_lookup() {
        let store = store();
        let rewritten = store.migrate_triple("ha tay", "ha dong", "van quan").unwrap();
        assert_eq!(rewritten.0, "ha noi");
        assert!(store.migrate_triple("ha noi", "ba dinh", "dien bien").is_none());
    }

    #[test]
    fn district_inference_unique_only() {
        let store = store();
        assert_eq!(
            store.district_for_ward("ha noi", "dien bien").as_deref(),
            Some("ba dinh")
        );
        assert_eq!(store.district_for_ward("ha noi", "nowhere"), None);
    }

    #[test]
    fn display_names_numeric_keeps_prefix() {
        let store = store();
        let (p, d, w) = store.display_names(Some("ho chi minh"), Some("8"), Some("4"));
        assert_eq!(p.as_deref(), Some("Hồ Chí Minh"));
        assert_eq!(d.as_deref(), Some("Quận 8"));
        assert_eq!(w.as_deref(), Some("Phường 4"));

        let (p, d, w) = store.display_names(Some("ha noi"), Some("ba dinh"), Some("dien bien"));
        assert_eq!(p.as_deref(), Some("Hà Nội"));
        assert_eq!(d.as_deref(), Some("Ba Đình"));
        assert_eq!(w.as_deref(), Some("Điện Biên"));
    }

    #[test]
    fn display_names_without_province() {
        let store = store();
        let (p, d, w) = store.display_names(None, Some("cau giay"), None);
        assert_eq!(p, None);
        assert_eq!(d.as_deref(), Some("Cầu Giấy"));
        assert_eq!(w, None);
    }

    #[test]
    fn ward_parent_inference() {
        let store = store();
        assert_eq!(
            store.parents_for_ward("dien bien"),
            Some(("ha noi".to_string(), "ba dinh".to_string()))
        );
        assert_eq!(store.parents_for_ward("nowhere"), None);
    }
}

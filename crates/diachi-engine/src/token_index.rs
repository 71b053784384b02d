//! Inverted token index over the administrative hierarchy.
//!
//! Maps each distinct token of a normalized name to the set of hierarchy
//! row ids containing it, per level. Phase 2 fuzzy matching over the full
//! table is quadratic without pre-filtering; the index bounds each n-gram's
//! candidate rows to the union over its tokens (typically a few hundred
//! rows instead of all 13,814).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use diachi_core::{AdminDivision, AdminLevel};

/// Per-level inverted index from token to row-id set.
pub struct TokenIndex {
    province: HashMap<String, HashSet<i64>>,
    district: HashMap<String, HashSet<i64>>,
    ward: HashMap<String, HashSet<i64>>,
}

impl TokenIndex {
    /// Build the index from the full row set. Called once at store
    /// construction.
    pub fn build(rows: &[AdminDivision]) -> Self {
        let mut province: HashMap<String, HashSet<i64>> = HashMap::new();
        let mut district: HashMap<String, HashSet<i64>> = HashMap::new();
        let mut ward: HashMap<String, HashSet<i64>> = HashMap::new();

        for row in rows {
            for token in row.province_name_normalized.split_whitespace() {
                province.entry(token.to_string()).or_default().insert(row.id);
            }
            for token in row.district_name_normalized.split_whitespace() {
                district.entry(token.to_string()).or_default().insert(row.id);
            }
            for token in row.ward_name_normalized.split_whitespace() {
                ward.entry(token.to_string()).or_default().insert(row.id);
            }
        }

        let index = Self {
            province,
            district,
            ward,
        };
        debug!(
            subsystem = "store",
            component = "token_index",
            op = "build",
            row_count = rows.len(),
            token_count = index.token_count(),
            "Token index built"
        );
        index
    }

    fn level_index(&self, level: AdminLevel) -> Option<&HashMap<String, HashSet<i64>>> {
        match level {
            AdminLevel::Province => Some(&self.province),
            AdminLevel::District => Some(&self.district),
            AdminLevel::Ward => Some(&self.ward),
            AdminLevel::Street => None,
        }
    }

    /// Row ids whose name at `level` contains at least one of `tokens`.
    pub fn rows_containing_any(&self, level: AdminLevel, tokens: &[&str]) -> HashSet<i64> {
        let Some(index) = self.level_index(level) else {
            return HashSet::new();
        };
        let mut out = HashSet::new();
        for token in tokens {
            if let Some(ids) = index.get(*token) {
                out.extend(ids);
            }
        }
        out
    }

    /// Row ids whose name at `level` contains every one of `tokens`.
    pub fn rows_containing_all(&self, level: AdminLevel, tokens: &[&str]) -> HashSet<i64> {
        let Some(index) = self.level_index(level) else {
            return HashSet::new();
        };
        let mut iter = tokens.iter();
        let Some(first) = iter.next() else {
            return HashSet::new();
        };
        let Some(first_ids) = index.get(*first) else {
            return HashSet::new();
        };
        let mut out = first_ids.clone();
        for token in iter {
            match index.get(*token) {
                Some(ids) => out.retain(|id| ids.contains(id)),
                None => return HashSet::new(),
            }
            if out.is_empty() {
                break;
            }
        }
        out
    }

    /// Total number of distinct (level, token) entries.
    pub fn token_count(&self) -> usize {
        self.province.len() + self.district.len() + self.ward.len()
    }
}

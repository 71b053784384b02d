//! Phase 2 — potential extraction.
//!
//! Enumerates n-grams over the normalized token stream and scores them
//! against the hierarchy per level, producing ranked lists of province /
//! district / ward / street potentials with positional spans. Search is
//! scoped by the best prior match (or the caller's hints) and pre-filtered
//! through the token index.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use diachi_core::defaults::{NGRAM_MAX, STREET_NUMBER_MIN_DIGITS, STREET_SPAN_MAX};
use diachi_core::{AdminLevel, EngineConfig, Potential, PotentialSource, Span};

use crate::normalize::{is_admin_keyword, NormalizedAddress};
use crate::scoring::ensemble_score;
use crate::store::ReferenceStore;

/// Ranked potential lists per level.
#[derive(Debug, Default)]
pub struct Potentials {
    pub provinces: Vec<Potential>,
    pub districts: Vec<Potential>,
    pub wards: Vec<Potential>,
    pub streets: Vec<Potential>,
}

impl Potentials {
    /// Best (top-ranked) canonical name at a level, if any.
    pub fn best_name(&self, level: AdminLevel) -> Option<&str> {
        let list = match level {
            AdminLevel::Province => &self.provinces,
            AdminLevel::District => &self.districts,
            AdminLevel::Ward => &self.wards,
            AdminLevel::Street => &self.streets,
        };
        list.first().map(|p| p.canonical_name.as_str())
    }
}

struct Ngram {
    text: String,
    span: Span,
    keyword_context: bool,
}

/// The digit count of a purely numeric n-gram, `None` otherwise.
fn numeric_digits(text: &str) -> Option<usize> {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        Some(text.len())
    } else {
        None
    }
}

fn build_ngrams(tokens: &[String]) -> Vec<Ngram> {
    let mut ngrams = Vec::new();
    for n in 1..=NGRAM_MAX.min(tokens.len()) {
        for start in 0..=(tokens.len() - n) {
            let end = start + n;
            ngrams.push(Ngram {
                text: tokens[start..end].join(" "),
                span: Span::new(start, end),
                keyword_context: start > 0 && is_admin_keyword(&tokens[start - 1]),
            });
        }
    }
    ngrams
}

/// Sort potentials by adjusted score descending, then longer span, then
/// earlier span start.
fn rank_potentials(list: &mut [Potential]) {
    list.sort_by(|a, b| {
        b.adjusted_score
            .partial_cmp(&a.adjusted_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.span.len().cmp(&a.span.len()))
            .then_with(|| a.span.start.cmp(&b.span.start))
    });
}

/// Distinct normalized names at `level` among token-index prefiltered rows
/// that fall inside the scope.
fn names_in_scope<'s>(
    store: &'s ReferenceStore,
    level: AdminLevel,
    ngram_tokens: &[&str],
    scope_province: Option<&str>,
    scope_district: Option<&str>,
) -> HashSet<&'s str> {
    let prefiltered = store
        .token_index()
        .rows_containing_any(level, ngram_tokens);

    let mut names = HashSet::new();
    for id in prefiltered {
        if let Some(row) = store.row_by_id(id) {
            if ReferenceStore::row_in_scope(row, scope_province, scope_district) {
                let name = ReferenceStore::level_name(row, level);
                if !name.is_empty() {
                    names.insert(name);
                }
            }
        }
    }
    names
}

fn extract_level(
    store: &ReferenceStore,
    config: &EngineConfig,
    ngrams: &[Ngram],
    level: AdminLevel,
    scope_province: Option<&str>,
    scope_district: Option<&str>,
) -> Vec<Potential> {
    let threshold = config.threshold_for(level);
    // Keyed by (name, span) so the same name matched through different
    // spans stays distinct while duplicate scorings collapse to the best.
    let mut retained: HashMap<(String, (usize, usize)), Potential> = HashMap::new();

    let mut retain = |potential: Potential| {
        let key = (
            potential.canonical_name.clone(),
            (potential.span.start, potential.span.end),
        );
        match retained.get(&key) {
            Some(existing) if existing.adjusted_score >= potential.adjusted_score => {}
            _ => {
                retained.insert(key, potential);
            }
        }
    };

    for ngram in ngrams {
        let multiplier = match numeric_digits(&ngram.text) {
            Some(digits) if digits >= STREET_NUMBER_MIN_DIGITS => continue,
            Some(_) => {
                if ngram.keyword_context {
                    config.numeric_keyword_bonus
                } else {
                    config.numeric_no_keyword_penalty
                }
            }
            None => 1.0,
        };

        let ngram_tokens: Vec<&str> = ngram.text.split_whitespace().collect();
        let names = names_in_scope(store, level, &ngram_tokens, scope_province, scope_district);

        // Exact name match.
        if names.contains(ngram.text.as_str()) {
            let adjusted = multiplier;
            if adjusted >= threshold {
                retain(Potential {
                    level,
                    canonical_name: ngram.text.clone(),
                    span: ngram.span,
                    raw_score: 1.0,
                    adjusted_score: adjusted,
                    source: PotentialSource::Exact,
                    keyword_context: ngram.keyword_context,
                });
            }
        }

        // Abbreviation key as an alternative n-gram at fixed score 1.0.
        // Keys are single tokens, so only 1-grams can match.
        if ngram.span.len() == 1 {
            if let Some(word) =
                store.lookup_abbreviation(&ngram.text, scope_province, scope_district)
            {
                let in_level_scope =
                    names_in_scope(
                        store,
                        level,
                        &word.split_whitespace().collect::<Vec<_>>(),
                        scope_province,
                        scope_district,
                    )
                    .contains(word);
                if in_level_scope {
                    retain(Potential {
                        level,
                        canonical_name: word.to_string(),
                        span: ngram.span,
                        raw_score: 1.0,
                        adjusted_score: 1.0,
                        source: PotentialSource::Abbrev,
                        keyword_context: ngram.keyword_context,
                    });
                }
            }
        }

        // Fuzzy ensemble over the prefiltered names.
        for name in names {
            if name == ngram.text {
                continue;
            }
            let raw = ensemble_score(&ngram.text, name, &config.ensemble_weights);
            let adjusted = raw * multiplier;
            if adjusted >= threshold {
                retain(Potential {
                    level,
                    canonical_name: name.to_string(),
                    span: ngram.span,
                    raw_score: raw,
                    adjusted_score: adjusted,
                    source: PotentialSource::Fuzzy,
                    keyword_context: ngram.keyword_context,
                });
            }
        }
    }

    let mut list: Vec<Potential> = retained.into_values().collect();
    rank_potentials(&mut list);
    list
}

/// A hint the caller supplied is trusted as an exact potential with an
/// empty span, so it scopes the search and survives into assembly without
/// claiming any input text.
fn hint_potential(level: AdminLevel, name: &str) -> Potential {
    Potential {
        level,
        canonical_name: name.to_string(),
        span: Span::new(0, 0),
        raw_score: 1.0,
        adjusted_score: 1.0,
        source: PotentialSource::Exact,
        keyword_context: false,
    }
}

fn extract_streets(tokens: &[String], admin_spans: &[Span]) -> Vec<Potential> {
    let mut streets = Vec::new();
    for n in 1..=STREET_SPAN_MAX.min(tokens.len()) {
        for start in 0..=(tokens.len() - n) {
            let span = Span::new(start, start + n);
            if admin_spans.iter().any(|s| s.overlaps(&span)) {
                continue;
            }
            if numeric_digits(&tokens[start]).is_some() {
                continue;
            }
            streets.push(Potential {
                level: AdminLevel::Street,
                canonical_name: tokens[start..start + n].join(" "),
                span,
                raw_score: 1.0,
                adjusted_score: 1.0,
                source: PotentialSource::Exact,
                keyword_context: start > 0 && is_admin_keyword(&tokens[start - 1]),
            });
        }
    }
    rank_potentials(&mut streets);
    streets
}

/// Run Phase 2 over a normalized address.
///
/// Hints must already be normalized (see `normalize_hint`); unknown hints
/// are ignored by the caller before this point.
pub fn extract_potentials(
    store: &ReferenceStore,
    config: &EngineConfig,
    normalized: &NormalizedAddress,
    province_hint: Option<&str>,
    district_hint: Option<&str>,
) -> Potentials {
    let tokens = &normalized.tokens;
    if tokens.is_empty() {
        return Potentials::default();
    }

    let ngrams = build_ngrams(tokens);

    // Provinces: scoped by the hint when present.
    let mut provinces = extract_level(store, config, &ngrams, AdminLevel::Province, province_hint, None);
    if let Some(hint) = province_hint {
        if !provinces.iter().any(|p| p.canonical_name == hint) {
            provinces.insert(0, hint_potential(AdminLevel::Province, hint));
        }
    }

    // Districts: scoped to the best province match, falling back to the
    // hint when nothing matched.
    let province_scope: Option<&str> = provinces
        .first()
        .map(|p| p.canonical_name.as_str())
        .or(province_hint);
    let mut districts = extract_level(
        store,
        config,
        &ngrams,
        AdminLevel::District,
        province_scope,
        district_hint,
    );
    if let Some(hint) = district_hint {
        if !districts.iter().any(|d| d.canonical_name == hint) {
            districts.insert(0, hint_potential(AdminLevel::District, hint));
        }
    }

    // Wards: chained through the selected district potentials so that a
    // same-named ward in another province can never leak in. Every
    // retained district defines a scope; a "phuong 1 quan 3" input must
    // find ward 1 under district 3 even when district 1 also matched.
    let district_scopes: Vec<Option<&str>> = if districts.is_empty() {
        vec![district_hint]
    } else {
        districts
            .iter()
            .take(config.top_k_per_level.district)
            .map(|d| Some(d.canonical_name.as_str()))
            .collect()
    };
    let mut ward_map: HashMap<(String, (usize, usize)), Potential> = HashMap::new();
    for district_scope in district_scopes {
        for potential in extract_level(
            store,
            config,
            &ngrams,
            AdminLevel::Ward,
            province_scope,
            district_scope,
        ) {
            let key = (
                potential.canonical_name.clone(),
                (potential.span.start, potential.span.end),
            );
            match ward_map.get(&key) {
                Some(existing) if existing.adjusted_score >= potential.adjusted_score => {}
                _ => {
                    ward_map.insert(key, potential);
                }
            }
        }
    }
    let mut wards: Vec<Potential> = ward_map.into_values().collect();
    rank_potentials(&mut wards);

    let admin_spans: Vec<Span> = provinces
        .iter()
        .chain(districts.iter())
        .chain(wards.iter())
        .map(|p| p.span)
        .filter(|s| !s.is_empty())
        .collect();
    let streets = extract_streets(tokens, &admin_spans);

    trace!(
        subsystem = "engine",
        component = "extract",
        provinces = provinces.len(),
        districts = districts.len(),
        wards = wards.len(),
        streets = streets.len(),
        "Potential extraction complete"
    );

    Potentials {
        provinces,
        districts,
        wards,
        streets,
    }
}

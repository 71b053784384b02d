//! Phase 3 — candidate assembly.
//!
//! Combines the per-level potentials into full (province, district, ward)
//! candidates: cartesian product of the top-K per level, hierarchy
//! pruning, legacy-triple migration, ward parent inference, display name
//! attachment, numeric-ward disambiguation, and the optional external
//! geocoder consultation when local confidence is low.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use diachi_core::{
    Candidate, CandidateSource, EngineConfig, Geocoder, MatchType, Potential, PotentialSource,
    Span,
};

use crate::extract::Potentials;
use crate::normalize::normalize_hint;
use crate::store::ReferenceStore;

/// Result of candidate assembly.
#[derive(Debug, Default)]
pub struct AssembleOutcome {
    pub candidates: Vec<Candidate>,
    /// Whether the external geocoder was consulted (regardless of outcome).
    pub external_consulted: bool,
}

/// Mean of the present per-level raw scores; the pre-ranking "combined
/// confidence" that gates the external geocoder.
pub fn combined_confidence(candidate: &Candidate) -> f64 {
    let mut sum = 0.0;
    let mut n = 0u32;
    if candidate.province.is_some() {
        sum += candidate.province_score;
        n += 1;
    }
    if candidate.district.is_some() {
        sum += candidate.district_score;
        n += 1;
    }
    if candidate.ward.is_some() {
        sum += candidate.ward_score;
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

struct LevelPick {
    name: String,
    score: f64,
    span: Option<Span>,
    source: PotentialSource,
}

impl LevelPick {
    fn from_potential(p: &Potential) -> Self {
        Self {
            name: p.canonical_name.clone(),
            score: p.raw_score,
            span: if p.span.is_empty() { None } else { Some(p.span) },
            source: p.source,
        }
    }

    fn inferred(name: String) -> Self {
        Self {
            name,
            score: 1.0,
            span: None,
            source: PotentialSource::Exact,
        }
    }
}

fn is_exactish(source: PotentialSource) -> bool {
    matches!(source, PotentialSource::Exact | PotentialSource::Abbrev)
}

fn hint_agreement(
    province: Option<&str>,
    district: Option<&str>,
    province_hint: Option<&str>,
    district_hint: Option<&str>,
) -> bool {
    if province_hint.is_none() && district_hint.is_none() {
        return false;
    }
    let province_ok = match province_hint {
        Some(hint) => province == Some(hint),
        None => true,
    };
    let district_ok = match district_hint {
        Some(hint) => district == Some(hint),
        None => true,
    };
    province_ok && district_ok
}

fn build_local_candidate(
    store: &ReferenceStore,
    province: Option<LevelPick>,
    district: Option<LevelPick>,
    ward: Option<LevelPick>,
    province_hint: Option<&str>,
    district_hint: Option<&str>,
) -> Option<Candidate> {
    let mut province = province;
    let mut district = district;
    let mut ward = ward;

    // Legacy triple rewrite through the migration map.
    let migrated = match (&province, &district, &ward) {
        (Some(p), Some(d), Some(w)) => {
            store.migrate_triple(&p.name, &d.name, &w.name).cloned()
        }
        _ => None,
    };
    if let Some((new_p, new_d, new_w)) = migrated {
        if let Some(p) = province.as_mut() {
            p.name = new_p;
        }
        if let Some(d) = district.as_mut() {
            d.name = new_d;
        }
        if let Some(w) = ward.as_mut() {
            w.name = new_w;
        }
    }

    // Parent inference: a ward with no district pulls its district (and,
    // lacking a province, both parents) from the hierarchy when the name
    // is unambiguous in scope; likewise a district with no province.
    if let Some(w) = &ward {
        if district.is_none() {
            match &province {
                Some(p) => {
                    if let Some(d) = store.district_for_ward(&p.name, &w.name) {
                        district = Some(LevelPick::inferred(d));
                    }
                }
                None => {
                    if let Some((p, d)) = store.parents_for_ward(&w.name) {
                        province = Some(LevelPick::inferred(p));
                        district = Some(LevelPick::inferred(d));
                    }
                }
            }
        }
    }
    if province.is_none() {
        if let Some(d) = &district {
            if let Some(p) = store.province_for_district(&d.name) {
                province = Some(LevelPick::inferred(p));
            }
        }
    }

    let p_name = province.as_ref().map(|x| x.name.clone());
    let d_name = district.as_ref().map(|x| x.name.clone());
    let w_name = ward.as_ref().map(|x| x.name.clone());

    // Local candidates with an impossible hierarchy are pruned outright.
    if !store.validate_triple(p_name.as_deref(), d_name.as_deref(), w_name.as_deref()) {
        return None;
    }

    let all_exact = province.iter().all(|x| is_exactish(x.source))
        && district.iter().all(|x| is_exactish(x.source))
        && ward.iter().all(|x| is_exactish(x.source));

    let (province_display, district_display, ward_display) =
        store.display_names(p_name.as_deref(), d_name.as_deref(), w_name.as_deref());

    Some(Candidate {
        hint_agreement: hint_agreement(
            p_name.as_deref(),
            d_name.as_deref(),
            province_hint,
            district_hint,
        ),
        province: p_name,
        district: d_name,
        ward: w_name,
        province_display,
        district_display,
        ward_display,
        province_score: province.as_ref().map_or(0.0, |x| x.score),
        district_score: district.as_ref().map_or(0.0, |x| x.score),
        ward_score: ward.as_ref().map_or(0.0, |x| x.score),
        province_span: province.as_ref().and_then(|x| x.span),
        district_span: district.as_ref().and_then(|x| x.span),
        ward_span: ward.as_ref().and_then(|x| x.span),
        source: CandidateSource::Local,
        match_type: if all_exact {
            MatchType::Exact
        } else {
            MatchType::Fuzzy
        },
        hierarchy_valid: true,
        final_confidence: 0.0,
    })
}

/// Deduplicate by (province, district, ward), keeping the candidate with
/// the higher combined confidence.
fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashMap<(Option<String>, Option<String>, Option<String>), Candidate> =
        HashMap::new();
    for candidate in candidates {
        let key = (
            candidate.province.clone(),
            candidate.district.clone(),
            candidate.ward.clone(),
        );
        match seen.get(&key) {
            Some(existing) if combined_confidence(existing) >= combined_confidence(&candidate) => {}
            _ => {
                seen.insert(key, candidate);
            }
        }
    }
    seen.into_values().collect()
}

/// Numeric wards scored within the disambiguation band of the best ward
/// against the same district stay in contention; mark them so the Phase 4
/// ranker sees where they came from.
fn mark_disambiguation(candidates: &mut [Candidate], band: f64) {
    let mut best_per_district: HashMap<(Option<String>, Option<String>), f64> = HashMap::new();
    for candidate in candidates.iter() {
        if candidate.ward.is_none() {
            continue;
        }
        let key = (candidate.province.clone(), candidate.district.clone());
        let entry = best_per_district.entry(key).or_insert(0.0);
        if candidate.ward_score > *entry {
            *entry = candidate.ward_score;
        }
    }

    for candidate in candidates.iter_mut() {
        let Some(ward) = &candidate.ward else { continue };
        if !ward.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let key = (candidate.province.clone(), candidate.district.clone());
        if let Some(best) = best_per_district.get(&key) {
            if candidate.ward_score < *best && *best - candidate.ward_score <= band {
                candidate.source = CandidateSource::Disambiguation;
            }
        }
    }
}

async fn external_candidate(
    store: &ReferenceStore,
    config: &EngineConfig,
    geocoder: &dyn Geocoder,
    raw_address: &str,
    province_hint: Option<&str>,
    district_hint: Option<&str>,
) -> Option<Candidate> {
    let timeout = Duration::from_millis(config.external_timeout_ms);
    let resolved = match tokio::time::timeout(timeout, geocoder.geocode(raw_address)).await {
        Ok(Ok(Some(triple))) => triple,
        Ok(Ok(None)) => {
            debug!(
                subsystem = "geocode",
                provider = geocoder.name(),
                "Geocoder had no answer"
            );
            return None;
        }
        Ok(Err(e)) => {
            warn!(
                subsystem = "geocode",
                provider = geocoder.name(),
                error = %e,
                "Geocoder failed; continuing without it"
            );
            return None;
        }
        Err(_) => {
            warn!(
                subsystem = "geocode",
                provider = geocoder.name(),
                timeout_ms = config.external_timeout_ms,
                "Geocoder timed out; continuing without it"
            );
            return None;
        }
    };

    let p_norm = normalize_hint(&resolved.province);
    let d_norm = resolved.district.as_deref().map(normalize_hint);
    let w_norm = resolved.ward.as_deref().map(normalize_hint);

    if p_norm.is_empty() {
        return None;
    }

    let hierarchy_valid =
        store.validate_triple(Some(&p_norm), d_norm.as_deref(), w_norm.as_deref());

    // Prefer the store's display names; fall back to what the provider
    // sent when the triple is not in the hierarchy.
    let (p_display, d_display, w_display) = if hierarchy_valid {
        store.display_names(Some(&p_norm), d_norm.as_deref(), w_norm.as_deref())
    } else {
        (None, None, None)
    };

    Some(Candidate {
        hint_agreement: hint_agreement(
            Some(&p_norm),
            d_norm.as_deref(),
            province_hint,
            district_hint,
        ),
        province_display: p_display.or(Some(resolved.province.clone())),
        district_display: d_display.or(resolved.district.clone()),
        ward_display: w_display.or(resolved.ward.clone()),
        province: Some(p_norm),
        district: d_norm,
        ward: w_norm,
        province_score: 1.0,
        district_score: if resolved.district.is_some() { 1.0 } else { 0.0 },
        ward_score: if resolved.ward.is_some() { 1.0 } else { 0.0 },
        province_span: None,
        district_span: None,
        ward_span: None,
        source: CandidateSource::External,
        match_type: MatchType::External,
        hierarchy_valid,
        final_confidence: 0.0,
    })
}

/// Run Phase 3.
pub async fn assemble_candidates(
    store: &ReferenceStore,
    config: &EngineConfig,
    potentials: &Potentials,
    province_hint: Option<&str>,
    district_hint: Option<&str>,
    raw_address: &str,
    geocoder: Option<&dyn Geocoder>,
) -> AssembleOutcome {
    let top_k = &config.top_k_per_level;

    let mut province_options: Vec<Option<&Potential>> = potentials
        .provinces
        .iter()
        .take(top_k.province)
        .map(Some)
        .collect();
    province_options.push(None);
    let mut district_options: Vec<Option<&Potential>> = potentials
        .districts
        .iter()
        .take(top_k.district)
        .map(Some)
        .collect();
    district_options.push(None);
    let mut ward_options: Vec<Option<&Potential>> = potentials
        .wards
        .iter()
        .take(top_k.ward)
        .map(Some)
        .collect();
    ward_options.push(None);

    let mut candidates = Vec::new();
    for &p_opt in &province_options {
        for &d_opt in &district_options {
            for &w_opt in &ward_options {
                if p_opt.is_none() && d_opt.is_none() && w_opt.is_none() {
                    continue;
                }
                let candidate = build_local_candidate(
                    store,
                    p_opt.map(LevelPick::from_potential),
                    d_opt.map(LevelPick::from_potential),
                    w_opt.map(LevelPick::from_potential),
                    province_hint,
                    district_hint,
                );
                if let Some(candidate) = candidate {
                    candidates.push(candidate);
                }
            }
        }
    }

    let mut candidates = dedupe(candidates);
    mark_disambiguation(&mut candidates, config.disambiguation_band);
    candidates.sort_by(|a, b| {
        combined_confidence(b)
            .partial_cmp(&combined_confidence(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.at_rule().cmp(&a.at_rule()))
    });

    let best_local = candidates.first().map(combined_confidence).unwrap_or(0.0);
    let needs_external = best_local < config.external_threshold;

    let mut external_consulted = false;
    if needs_external {
        if let Some(geocoder) = geocoder {
            external_consulted = true;
            if let Some(candidate) = external_candidate(
                store,
                config,
                geocoder,
                raw_address,
                province_hint,
                district_hint,
            )
            .await
            {
                candidates.push(candidate);
            }
        }
    }

    debug!(
        subsystem = "engine",
        component = "assemble",
        result_count = candidates.len(),
        external_consulted,
        "Candidate assembly complete"
    );

    AssembleOutcome {
        candidates,
        external_consulted,
    }
}

//! Phase 4 — validation and ranking.
//!
//! Computes the ensemble confidence for every candidate, orders them by
//! the lexicographic ranking key, and applies the low-confidence floor to
//! the winner.

use tracing::debug;

use diachi_core::defaults::{
    AT_RULE_SCORE_DISTRICT, AT_RULE_SCORE_PROVINCE, AT_RULE_SCORE_WARD, GEO_CONTEXT_BONUS,
    HIERARCHY_PENALTY, LEVEL_CLEAR_FLOOR, LOW_CONFIDENCE_FLOOR, MATCH_TYPE_SCORE_EXACT,
    MATCH_TYPE_SCORE_EXTERNAL, MATCH_TYPE_SCORE_FALLBACK, MATCH_TYPE_SCORE_FUZZY,
    SIMILARITY_SCORE_SCALE, SIMILARITY_WEIGHT_DISTRICT, SIMILARITY_WEIGHT_PROVINCE,
    SIMILARITY_WEIGHT_WARD,
};
use diachi_core::{Candidate, MatchType};

fn match_type_score(match_type: MatchType) -> f64 {
    match match_type {
        MatchType::Exact => MATCH_TYPE_SCORE_EXACT,
        MatchType::Fuzzy => MATCH_TYPE_SCORE_FUZZY,
        MatchType::External => MATCH_TYPE_SCORE_EXTERNAL,
        MatchType::Fallback => MATCH_TYPE_SCORE_FALLBACK,
        MatchType::None => 0.0,
    }
}

fn match_type_priority(match_type: MatchType) -> u8 {
    match match_type {
        MatchType::Exact => 1,
        MatchType::Fuzzy => 2,
        MatchType::External => 3,
        MatchType::Fallback => 4,
        MatchType::None => 5,
    }
}

fn at_rule_score(candidate: &Candidate) -> f64 {
    match candidate.at_rule() {
        3 => AT_RULE_SCORE_WARD,
        2 => AT_RULE_SCORE_DISTRICT,
        1 => AT_RULE_SCORE_PROVINCE,
        _ => 0.0,
    }
}

/// Weighted average of the present per-level raw scores, scaled to the
/// similarity component.
fn similarity_score(candidate: &Candidate) -> f64 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    if candidate.province.is_some() {
        weighted += candidate.province_score * SIMILARITY_WEIGHT_PROVINCE;
        weight_sum += SIMILARITY_WEIGHT_PROVINCE;
    }
    if candidate.district.is_some() {
        weighted += candidate.district_score * SIMILARITY_WEIGHT_DISTRICT;
        weight_sum += SIMILARITY_WEIGHT_DISTRICT;
    }
    if candidate.ward.is_some() {
        weighted += candidate.ward_score * SIMILARITY_WEIGHT_WARD;
        weight_sum += SIMILARITY_WEIGHT_WARD;
    }
    if weight_sum == 0.0 {
        return 0.0;
    }
    (weighted / weight_sum) * SIMILARITY_SCORE_SCALE
}

/// The full confidence formula for one candidate.
pub fn confidence(candidate: &Candidate) -> f64 {
    let mut base =
        match_type_score(candidate.match_type) + at_rule_score(candidate) + similarity_score(candidate);

    if candidate.hint_agreement {
        base *= GEO_CONTEXT_BONUS;
    }
    if !candidate.hierarchy_valid {
        base *= HIERARCHY_PENALTY;
    }

    (base / 100.0).min(1.0)
}

/// Score and order candidates in place, best first.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    for candidate in candidates.iter_mut() {
        candidate.final_confidence = confidence(candidate);
    }

    // A candidate whose triple is not in the hierarchy is kept for
    // diagnostics but must never outrank a valid one.
    candidates.sort_by(|a, b| {
        (b.hierarchy_valid as u8)
            .cmp(&(a.hierarchy_valid as u8))
            .then_with(|| {
                b.final_confidence
                    .partial_cmp(&a.final_confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| {
                at_rule_score(b)
                    .partial_cmp(&at_rule_score(a))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| match_type_priority(a.match_type).cmp(&match_type_priority(b.match_type)))
            .then_with(|| (b.hint_agreement as u8).cmp(&(a.hint_agreement as u8)))
    });

    if let Some(best) = candidates.first() {
        debug!(
            subsystem = "engine",
            component = "rank",
            confidence = best.final_confidence,
            match_type = %best.match_type,
            result_count = candidates.len(),
            "Ranking complete"
        );
    }
}

/// Apply the low-confidence floor to the chosen candidate: below the
/// floor the result reports no match, and ward/district whose per-level
/// score is weak are cleared rather than reported as guesses.
pub fn apply_low_confidence_floor(candidate: &mut Candidate) {
    if candidate.final_confidence >= LOW_CONFIDENCE_FLOOR {
        return;
    }
    candidate.match_type = MatchType::None;
    if candidate.ward_score < LEVEL_CLEAR_FLOOR {
        candidate.ward = None;
        candidate.ward_display = None;
        candidate.ward_span = None;
        candidate.ward_score = 0.0;
    }
    if candidate.district_score < LEVEL_CLEAR_FLOOR {
        candidate.district = None;
        candidate.district_display = None;
        candidate.district_span = None;
        candidate.district_score = 0.0;
    }
}

//! Centralized default constants for the diachi engine.
//!
//! **This module is the single source of truth** for all shared default
//! values. The engine and config layer reference these constants instead of
//! defining their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// FUZZY MATCH THRESHOLDS
// =============================================================================

/// Minimum adjusted ensemble score for a province potential.
///
/// Provinces are a small, well-known set (63 names), so the bar is highest:
/// accepting a marginal province match poisons every downstream scope.
pub const FUZZY_THRESHOLD_PROVINCE: f64 = 0.88;

/// Minimum adjusted ensemble score for a district potential.
pub const FUZZY_THRESHOLD_DISTRICT: f64 = 0.85;

/// Minimum adjusted ensemble score for a ward potential.
///
/// Lowest of the three: ward names carry the most spelling noise in
/// real-world input (missing spaces, dropped digits).
pub const FUZZY_THRESHOLD_WARD: f64 = 0.80;

// =============================================================================
// ENSEMBLE WEIGHTS
// =============================================================================

/// Weight of the token-sort ratio in the ensemble score.
pub const ENSEMBLE_WEIGHT_TOKEN_SORT: f64 = 0.65;

/// Weight of normalized Levenshtein similarity in the ensemble score.
pub const ENSEMBLE_WEIGHT_LEVENSHTEIN: f64 = 0.35;

// =============================================================================
// NUMERIC KEYWORD CONTEXT
// =============================================================================

/// Score multiplier for a 1-2 digit numeric n-gram preceded by a full
/// administrative keyword ("phuong 4", "quan 8").
pub const NUMERIC_KEYWORD_BONUS: f64 = 1.2;

/// Score multiplier for a 1-2 digit numeric n-gram with no preceding
/// administrative keyword. A bare "8" is far more likely a house number
/// than a ward.
pub const NUMERIC_NO_KEYWORD_PENALTY: f64 = 0.7;

/// Numeric n-grams of this many digits or more are street/house numbers
/// and never administrative names.
pub const STREET_NUMBER_MIN_DIGITS: usize = 3;

// =============================================================================
// CANDIDATE ASSEMBLY
// =============================================================================

/// Candidate breadth: top-K province potentials entering Phase 3.
pub const TOP_K_PROVINCE: usize = 3;

/// Candidate breadth: top-K district potentials entering Phase 3.
pub const TOP_K_DISTRICT: usize = 3;

/// Candidate breadth: top-K ward potentials entering Phase 3.
pub const TOP_K_WARD: usize = 5;

/// Score band within which a numeric ward tie against the same district is
/// retained for the Phase 4 ranker instead of being resolved early.
pub const DISAMBIGUATION_BAND: f64 = 0.05;

// =============================================================================
// EXTERNAL GEOCODER
// =============================================================================

/// Local combined confidence below which the optional external geocoder is
/// consulted.
pub const EXTERNAL_THRESHOLD: f64 = 0.7;

/// Hard timeout for a geocoder call in milliseconds. The pipeline proceeds
/// without the geocoder when this elapses.
pub const EXTERNAL_TIMEOUT_MS: u64 = 2000;

/// Default Goong Maps geocoding endpoint.
pub const GOONG_GEOCODE_URL: &str = "https://rsapi.goong.io/geocode";

// =============================================================================
// RANKING
// =============================================================================

/// Match-type component of the confidence formula (out of 100).
pub const MATCH_TYPE_SCORE_EXACT: f64 = 50.0;
pub const MATCH_TYPE_SCORE_FUZZY: f64 = 30.0;
pub const MATCH_TYPE_SCORE_EXTERNAL: f64 = 25.0;
pub const MATCH_TYPE_SCORE_FALLBACK: f64 = 20.0;

/// At-rule component: ward present / district present / province only.
pub const AT_RULE_SCORE_WARD: f64 = 30.0;
pub const AT_RULE_SCORE_DISTRICT: f64 = 20.0;
pub const AT_RULE_SCORE_PROVINCE: f64 = 10.0;

/// Similarity component scale (weighted per-level average × this).
pub const SIMILARITY_SCORE_SCALE: f64 = 20.0;

/// Per-level weights inside the similarity component.
pub const SIMILARITY_WEIGHT_PROVINCE: f64 = 0.3;
pub const SIMILARITY_WEIGHT_DISTRICT: f64 = 0.35;
pub const SIMILARITY_WEIGHT_WARD: f64 = 0.35;

/// Multiplier applied when the candidate agrees with caller-supplied hints.
pub const GEO_CONTEXT_BONUS: f64 = 1.1;

/// Multiplier applied when the candidate's triple is not in the hierarchy.
pub const HIERARCHY_PENALTY: f64 = 0.8;

/// Final confidence below which the result reports no match.
pub const LOW_CONFIDENCE_FLOOR: f64 = 0.4;

/// Per-level score below which ward/district fields are cleared on a
/// low-confidence result.
pub const LEVEL_CLEAR_FLOOR: f64 = 0.5;

// =============================================================================
// QUALITY FLAGS
// =============================================================================

/// Confidence floor for `full_address`.
pub const QUALITY_FULL_CONFIDENCE: f64 = 0.8;

/// Confidence floor for `partial_address` and `province_only`.
pub const QUALITY_PARTIAL_CONFIDENCE: f64 = 0.6;

// =============================================================================
// CACHES
// =============================================================================

/// Phase 1 normalization LRU capacity, keyed on (raw, province, district).
pub const NORMALIZE_CACHE_SIZE: usize = 10_000;

/// Abbreviation dictionary LRU capacity, keyed on (province, district).
pub const ABBREVIATION_CACHE_SIZE: usize = 256;

// =============================================================================
// N-GRAMS
// =============================================================================

/// Maximum n-gram length over the normalized token stream. Vietnamese
/// administrative names are at most four tokens ("ba ria vung tau").
pub const NGRAM_MAX: usize = 4;

/// Maximum street span length in tokens.
pub const STREET_SPAN_MAX: usize = 3;

// =============================================================================
// DATABASE
// =============================================================================

/// Default maximum number of connections in the SQLite pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Default connection acquire timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensemble_weights_sum_to_one() {
        let sum = ENSEMBLE_WEIGHT_TOKEN_SORT + ENSEMBLE_WEIGHT_LEVENSHTEIN;
        assert!((sum - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn similarity_weights_sum_to_one() {
        let sum =
            SIMILARITY_WEIGHT_PROVINCE + SIMILARITY_WEIGHT_DISTRICT + SIMILARITY_WEIGHT_WARD;
        assert!((sum - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn thresholds_ordered_by_level() {
        assert!(FUZZY_THRESHOLD_PROVINCE > FUZZY_THRESHOLD_DISTRICT);
        assert!(FUZZY_THRESHOLD_DISTRICT > FUZZY_THRESHOLD_WARD);
    }

    #[test]
    fn match_type_scores_ordered() {
        assert!(MATCH_TYPE_SCORE_EXACT > MATCH_TYPE_SCORE_FUZZY);
        assert!(MATCH_TYPE_SCORE_FUZZY > MATCH_TYPE_SCORE_EXTERNAL);
        assert!(MATCH_TYPE_SCORE_EXTERNAL > MATCH_TYPE_SCORE_FALLBACK);
    }

    #[test]
    fn quality_floors_ordered() {
        assert!(QUALITY_FULL_CONFIDENCE > QUALITY_PARTIAL_CONFIDENCE);
        assert!(QUALITY_PARTIAL_CONFIDENCE > LOW_CONFIDENCE_FLOOR);
    }
}

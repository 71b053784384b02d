//! String similarity scoring for potential extraction.
//!
//! Phase 2 scores every (n-gram, row) pair with a two-signal ensemble:
//! an order-invariant token-sort ratio and a plain normalized Levenshtein
//! similarity. Token-sort catches reordered names ("ha noi ba dinh" vs
//! "ba dinh ha noi"); Levenshtein catches typos and dropped characters.

use diachi_core::EnsembleWeights;

/// Normalized Levenshtein similarity in [0, 1]. 1.0 means identical.
pub fn levenshtein_normalized(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Order-invariant similarity: sort the whitespace tokens of both sides,
/// rejoin, then compare with normalized Levenshtein.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let sort_join = |s: &str| -> String {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    };

    levenshtein_normalized(&sort_join(a), &sort_join(b))
}

/// Weighted ensemble of token-sort ratio and normalized Levenshtein.
pub fn ensemble_score(a: &str, b: &str, weights: &EnsembleWeights) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let token_score = token_sort_ratio(a, b);
    let lev_score = levenshtein_normalized(a, b);

    token_score * weights.token_sort + lev_score * weights.levenshtein
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> EnsembleWeights {
        EnsembleWeights::default()
    }

    #[test]
    fn identical_strings_score_one() {
        assert!((ensemble_score("ba dinh", "ba dinh", &weights()) - 1.0).abs() < 1e-9);
        assert!((levenshtein_normalized("co nhue 1", "co nhue 1") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_strings_score_zero() {
        assert_eq!(ensemble_score("", "ba dinh", &weights()), 0.0);
        assert_eq!(ensemble_score("ba dinh", "", &weights()), 0.0);
        assert_eq!(token_sort_ratio("", ""), 0.0);
    }

    #[test]
    fn token_sort_is_order_invariant() {
        let forward = token_sort_ratio("ba dinh ha noi", "ha noi ba dinh");
        assert!((forward - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_edit_scores_high() {
        // "ba din" vs "ba dinh": one dropped character out of seven.
        let score = ensemble_score("ba din", "ba dinh", &weights());
        assert!(score > 0.85, "got {score}");
        assert!(score < 1.0);
    }

    #[test]
    fn unrelated_names_score_low() {
        let score = ensemble_score("dien bien", "hong hai", &weights());
        assert!(score < 0.5, "got {score}");
    }

    #[test]
    fn ensemble_between_component_scores() {
        let a = "dien bien ba dinh";
        let b = "ba dinh dien bien";
        let token = token_sort_ratio(a, b);
        let lev = levenshtein_normalized(a, b);
        let ensemble = ensemble_score(a, b, &weights());
        assert!(ensemble <= token.max(lev) + 1e-9);
        assert!(ensemble >= token.min(lev) - 1e-9);
    }

    #[test]
    fn missing_space_still_matches() {
        // "hanoi" vs "ha noi": the letter-digit and separator rules cannot
        // help here; the ensemble alone has to carry it.
        let score = ensemble_score("hanoi", "ha noi", &weights());
        assert!(score > 0.8, "got {score}");
    }
}

//! Phase 5 — postprocessing.
//!
//! Maps the chosen potentials' normalized-token spans back to the raw
//! whitespace tokens through the Phase 1 alignment, removes them, and
//! classifies the result quality.

use std::collections::HashSet;

use diachi_core::defaults::{QUALITY_FULL_CONFIDENCE, QUALITY_PARTIAL_CONFIDENCE};
use diachi_core::{Candidate, QualityFlag, Span};

use crate::normalize::NormalizedAddress;

/// The raw-token residual after removing the given normalized spans.
///
/// Every normalized token inside a span pulls its raw origin token out of
/// the output; what remains is joined with single spaces. The residual is
/// never longer than the input.
pub fn extract_residual(normalized: &NormalizedAddress, spans: &[Span]) -> String {
    let mut removed: HashSet<usize> = HashSet::new();
    for span in spans {
        for token_index in span.start..span.end {
            if let Some(origin) = normalized.origins.get(token_index) {
                removed.insert(*origin);
            }
        }
    }

    normalized
        .raw_tokens
        .iter()
        .enumerate()
        .filter(|(index, _)| !removed.contains(index))
        .map(|(_, token)| token.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The spans claimed by a chosen candidate, in province → district → ward
/// order.
pub fn candidate_spans(candidate: &Candidate) -> Vec<Span> {
    [
        candidate.province_span,
        candidate.district_span,
        candidate.ward_span,
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Classify the result completeness and confidence.
pub fn quality_flag(candidate: &Candidate) -> QualityFlag {
    let confidence = candidate.final_confidence;
    let full = candidate.province.is_some() && candidate.district.is_some() && candidate.ward.is_some();
    let partial = candidate.province.is_some() && candidate.district.is_some();
    let province_only = candidate.province.is_some();

    if full && confidence >= QUALITY_FULL_CONFIDENCE {
        QualityFlag::FullAddress
    } else if partial && confidence >= QUALITY_PARTIAL_CONFIDENCE {
        QualityFlag::PartialAddress
    } else if province_only && confidence >= QUALITY_PARTIAL_CONFIDENCE {
        QualityFlag::ProvinceOnly
    } else {
        QualityFlag::Failed
    }
}

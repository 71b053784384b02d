//! Pipeline orchestration.
//!
//! Chains the five phases: preprocessing → potential extraction →
//! candidate assembly → validation & ranking → postprocessing. One
//! address in, one result out; the only suspension point is the optional
//! external geocoder inside Phase 3.
//!
//! `parse` never fails: invalid input, empty candidate sets, and
//! collaborator failures all surface as a well-formed [`ParseResult`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use diachi_core::{
    EngineConfig, Geocoder, MatchType, ParseRequest, ParseResult, PhaseTimings, QualityFlag,
};

use crate::assemble::assemble_candidates;
use crate::extract::extract_potentials;
use crate::normalize::{normalize_hint, NormalizeCache};
use crate::rank::{apply_low_confidence_floor, rank_candidates};
use crate::residual::{candidate_spans, extract_residual, quality_flag};
use crate::store::ReferenceStore;

fn ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// The address matching pipeline.
///
/// Holds the immutable reference store, the configuration captured at
/// construction, the optional geocoder collaborator, and the Phase 1
/// cache. Cheap to share behind an `Arc`; `parse` takes `&self` and is
/// safe to call from many threads at once.
pub struct AddressPipeline {
    store: Arc<ReferenceStore>,
    config: EngineConfig,
    geocoder: Option<Arc<dyn Geocoder>>,
    normalize_cache: NormalizeCache,
}

impl AddressPipeline {
    /// Create a pipeline over a loaded reference store.
    pub fn new(store: Arc<ReferenceStore>, config: EngineConfig) -> Self {
        let cache_size = config.normalize_cache_size;
        Self {
            store,
            config,
            geocoder: None,
            normalize_cache: NormalizeCache::new(cache_size),
        }
    }

    /// Attach an external geocoder consulted when local confidence is low.
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Normalize and vet a caller-supplied hint. Hints only scope the
    /// search: an unknown hint is dropped (with a warning) rather than
    /// corrected or allowed to empty out the scope.
    fn vet_province_hint(&self, hint: Option<&str>) -> Option<String> {
        let normalized = normalize_hint(hint?);
        if normalized.is_empty() {
            return None;
        }
        if self.store.validate_triple(Some(&normalized), None, None) {
            return Some(normalized);
        }
        // Legacy province names rewrite through the migration map.
        if let Some(current) = self.store.migrate_province_name(&normalized) {
            return Some(current.to_string());
        }
        warn!(
            subsystem = "engine",
            component = "pipeline",
            province_hint = %normalized,
            "Unknown province hint ignored"
        );
        None
    }

    fn vet_district_hint(&self, hint: Option<&str>, province: Option<&str>) -> Option<String> {
        let normalized = normalize_hint(hint?);
        if normalized.is_empty() {
            return None;
        }
        if self
            .store
            .validate_triple(province, Some(&normalized), None)
        {
            Some(normalized)
        } else {
            warn!(
                subsystem = "engine",
                component = "pipeline",
                district_hint = %normalized,
                "Unknown district hint ignored"
            );
            None
        }
    }

    /// Parse one address through all five phases.
    pub async fn parse(&self, request: &ParseRequest) -> ParseResult {
        let request_id = Uuid::new_v4();
        let total_start = Instant::now();
        let mut timings = PhaseTimings::default();

        if request.raw.trim().is_empty() {
            debug!(
                subsystem = "engine",
                component = "pipeline",
                request_id = %request_id,
                "Empty input"
            );
            timings.total_ms = ms(total_start);
            return ParseResult::failed(request_id, String::new(), timings);
        }

        // Phase 1: preprocessing.
        let phase_start = Instant::now();
        let province_hint = self.vet_province_hint(request.province_hint.as_deref());
        let district_hint =
            self.vet_district_hint(request.district_hint.as_deref(), province_hint.as_deref());
        let abbreviations = self
            .store
            .abbreviations_in_scope(province_hint.as_deref(), district_hint.as_deref());
        let normalized = self.normalize_cache.get_or_compute(
            &request.raw,
            province_hint.as_deref(),
            district_hint.as_deref(),
            &abbreviations,
        );
        timings.preprocess_ms = ms(phase_start);

        if normalized.is_empty() {
            timings.total_ms = ms(total_start);
            return ParseResult::failed(request_id, String::new(), timings);
        }

        // Phase 2: potential extraction.
        let phase_start = Instant::now();
        let potentials = extract_potentials(
            &self.store,
            &self.config,
            &normalized,
            province_hint.as_deref(),
            district_hint.as_deref(),
        );
        timings.extract_ms = ms(phase_start);

        // Phase 3: candidate assembly (the only suspension point).
        let phase_start = Instant::now();
        let outcome = assemble_candidates(
            &self.store,
            &self.config,
            &potentials,
            province_hint.as_deref(),
            district_hint.as_deref(),
            &request.raw,
            self.geocoder.as_deref(),
        )
        .await;
        timings.assemble_ms = ms(phase_start);

        // Phase 4: validation & ranking.
        let phase_start = Instant::now();
        let mut candidates = outcome.candidates;
        rank_candidates(&mut candidates);
        timings.rank_ms = ms(phase_start);

        let Some(mut best) = candidates.into_iter().next() else {
            timings.total_ms = ms(total_start);
            let residual = extract_residual(&normalized, &[]);
            debug!(
                subsystem = "engine",
                component = "pipeline",
                request_id = %request_id,
                "No candidates"
            );
            return ParseResult::failed(request_id, residual, timings);
        };

        // Phase 5: postprocessing.
        let phase_start = Instant::now();
        apply_low_confidence_floor(&mut best);
        let spans = candidate_spans(&best);
        let remaining_text = extract_residual(&normalized, &spans);
        let flag = if best.match_type == MatchType::None {
            QualityFlag::Failed
        } else {
            quality_flag(&best)
        };
        timings.postprocess_ms = ms(phase_start);
        timings.total_ms = ms(total_start);

        info!(
            subsystem = "engine",
            component = "pipeline",
            op = "parse",
            request_id = %request_id,
            confidence = best.final_confidence,
            match_type = %best.match_type,
            quality_flag = %flag,
            duration_ms = timings.total_ms,
            "Parse complete"
        );

        ParseResult {
            request_id,
            province: best.province_display.clone().or_else(|| best.province.clone()),
            district: best.district_display.clone().or_else(|| best.district.clone()),
            ward: best.ward_display.clone().or_else(|| best.ward.clone()),
            confidence: best.final_confidence,
            match_type: best.match_type,
            quality_flag: flag,
            remaining_text,
            timings,
            processed_at_utc: Utc::now(),
        }
    }
}

//! Core data models for the diachi address engine.
//!
//! These types are shared across all diachi crates and represent the
//! domain entities: administrative hierarchy rows, per-request pipeline
//! records (potentials, candidates), and the final parse result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// One row of the administrative hierarchy: a canonical
/// (province, district, ward) triple with its display and normalized forms.
///
/// Normalized names are lowercase ASCII with diacritics removed and
/// whitespace collapsed. Loaded once at startup; read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminDivision {
    pub id: i64,
    pub province_full: String,
    pub province_prefix: String,
    pub province_name: String,
    pub province_name_normalized: String,
    pub province_full_normalized: String,
    pub district_full: String,
    pub district_prefix: String,
    pub district_name: String,
    pub district_name_normalized: String,
    pub ward_full: String,
    pub ward_prefix: String,
    pub ward_name: String,
    pub ward_name_normalized: String,
}

/// A context-scoped abbreviation mapping `key → word`.
///
/// Scope is `(province_context, district_context)` where either may be
/// absent. Resolution order for a key is district-scoped, then
/// province-scoped, then global; the first hit wins.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Abbreviation {
    pub key: String,
    pub word: String,
    pub province_context: Option<String>,
    pub district_context: Option<String>,
}

/// A legacy-to-current rewrite of an administrative triple, from the
/// optional `admin_division_migration` table. All names normalized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MigrationEntry {
    pub old_province: String,
    pub old_district: String,
    pub old_ward: String,
    pub new_province: String,
    pub new_district: String,
    pub new_ward: String,
}

/// Administrative level of a matched name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    Province,
    District,
    Ward,
    Street,
}

impl std::fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Province => write!(f, "province"),
            Self::District => write!(f, "district"),
            Self::Ward => write!(f, "ward"),
            Self::Street => write!(f, "street"),
        }
    }
}

// =============================================================================
// PER-REQUEST RECORDS
// =============================================================================

/// A half-open token range `[start, end)` into the normalized token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of tokens covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True if the two spans share at least one token position.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// How a Phase 2 potential was matched against the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialSource {
    Exact,
    Abbrev,
    Fuzzy,
}

/// A scored candidate for a single administrative level, extracted from a
/// specific token span of the input (Phase 2 output).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Potential {
    pub level: AdminLevel,
    /// Normalized canonical name from the reference store (or the literal
    /// span text for streets).
    pub canonical_name: String,
    pub span: Span,
    /// Ensemble score before the numeric keyword multiplier, in [0, 1].
    pub raw_score: f64,
    /// Score after the numeric keyword multiplier; ranking and thresholds
    /// operate on this value.
    pub adjusted_score: f64,
    pub source: PotentialSource,
    /// True iff the token immediately before the span is a full
    /// administrative keyword.
    pub keyword_context: bool,
}

/// Provenance of an assembled candidate (Phase 3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Local,
    Disambiguation,
    Street,
    External,
}

/// A full (province, district, ward) combination assembled from potentials
/// and validated against the hierarchy. Any level may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Normalized names, absent where no potential covered the level.
    pub province: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    /// Full display names from the reference store.
    pub province_display: Option<String>,
    pub district_display: Option<String>,
    pub ward_display: Option<String>,
    /// Per-level raw scores in [0, 1]; 0.0 where the level is absent.
    pub province_score: f64,
    pub district_score: f64,
    pub ward_score: f64,
    /// Token spans of the contributing potentials, for residual extraction.
    pub province_span: Option<Span>,
    pub district_span: Option<Span>,
    pub ward_span: Option<Span>,
    pub source: CandidateSource,
    pub match_type: MatchType,
    /// True iff the non-absent levels form a real triple in the store.
    pub hierarchy_valid: bool,
    /// True iff the candidate's province/district agree with the
    /// caller-supplied hints.
    pub hint_agreement: bool,
    /// Filled by Phase 4.
    pub final_confidence: f64,
}

impl Candidate {
    /// At-rule level: 3 = ward, 2 = district, 1 = province, 0 = nothing.
    pub fn at_rule(&self) -> u8 {
        if self.ward.is_some() {
            3
        } else if self.district.is_some() {
            2
        } else if self.province.is_some() {
            1
        } else {
            0
        }
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// How the chosen candidate was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Fallback,
    External,
    None,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Fallback => write!(f, "fallback"),
            Self::External => write!(f, "external"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Completeness/confidence classification of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    FullAddress,
    PartialAddress,
    ProvinceOnly,
    Failed,
}

impl std::fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullAddress => write!(f, "full_address"),
            Self::PartialAddress => write!(f, "partial_address"),
            Self::ProvinceOnly => write!(f, "province_only"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Wall-clock milliseconds spent in each phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub preprocess_ms: f64,
    pub extract_ms: f64,
    pub assemble_ms: f64,
    pub rank_ms: f64,
    pub postprocess_ms: f64,
    pub total_ms: f64,
}

/// A single parse request: one free-form address plus optional hints.
///
/// Hints scope the search; they are never corrected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseRequest {
    pub raw: String,
    pub province_hint: Option<String>,
    pub district_hint: Option<String>,
}

impl ParseRequest {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            province_hint: None,
            district_hint: None,
        }
    }

    pub fn with_province_hint(mut self, province: impl Into<String>) -> Self {
        self.province_hint = Some(province.into());
        self
    }

    pub fn with_district_hint(mut self, district: impl Into<String>) -> Self {
        self.district_hint = Some(district.into());
        self
    }
}

/// Final output of the pipeline. Always well-formed: every failure mode is
/// expressed through `match_type`/`quality_flag`, never as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    /// Correlation id for logs.
    pub request_id: Uuid,
    /// Chosen full display names; absent where no confident match.
    pub province: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub confidence: f64,
    pub match_type: MatchType,
    pub quality_flag: QualityFlag,
    /// Residual of the original input after removing matched spans.
    pub remaining_text: String,
    pub timings: PhaseTimings,
    pub processed_at_utc: DateTime<Utc>,
}

impl ParseResult {
    /// An empty result for invalid or unmatchable input.
    pub fn failed(request_id: Uuid, remaining_text: String, timings: PhaseTimings) -> Self {
        Self {
            request_id,
            province: None,
            district: None,
            ward: None,
            confidence: 0.0,
            match_type: MatchType::None,
            quality_flag: QualityFlag::Failed,
            remaining_text,
            timings,
            processed_at_utc: Utc::now(),
        }
    }
}

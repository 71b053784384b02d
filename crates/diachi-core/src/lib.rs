//! # diachi-core
//!
//! Core types, configuration, and trait abstractions for the diachi
//! Vietnamese address normalization engine.
//!
//! This crate provides the foundational data structures that the other
//! diachi crates depend on: the administrative hierarchy row types, the
//! per-request pipeline records (potentials, candidates, results), the
//! engine configuration, and the geocoder collaborator trait.

pub mod config;
pub mod defaults;
pub mod error;
pub mod geocode;
pub mod logging;
pub mod models;

// Re-export commonly used types at crate root
pub use config::{EngineConfig, EnsembleWeights, TopKPerLevel};
pub use error::{Error, Result};
pub use geocode::{GeocodedTriple, Geocoder};
pub use models::{
    Abbreviation, AdminDivision, AdminLevel, Candidate, CandidateSource, MatchType,
    MigrationEntry, ParseRequest, ParseResult, PhaseTimings, Potential, PotentialSource,
    QualityFlag, Span,
};

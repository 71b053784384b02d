//! # diachi-engine
//!
//! The five-phase Vietnamese address matching pipeline.
//!
//! This crate provides:
//! - The in-memory [`ReferenceStore`] over the administrative hierarchy,
//!   abbreviation dictionary, and optional migration map
//! - The [`TokenIndex`] that bounds fuzzy-search cost
//! - The phase implementations: normalization, potential extraction,
//!   candidate assembly, ranking, and residual postprocessing
//! - [`AddressPipeline`], the orchestrator tying them together
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use diachi_core::{EngineConfig, ParseRequest};
//! use diachi_db::Database;
//! use diachi_engine::{AddressPipeline, ReferenceStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:data/address.db").await?;
//!     let config = EngineConfig::from_env();
//!     let store = Arc::new(ReferenceStore::load(&db, config.abbreviation_cache_size).await?);
//!     let pipeline = AddressPipeline::new(store, config);
//!
//!     let result = pipeline
//!         .parse(&ParseRequest::new("P. Điện Biên, Q. Ba Đình, HN"))
//!         .await;
//!     println!("{:?} ({:.2})", result.province, result.confidence);
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod extract;
pub mod normalize;
pub mod pipeline;
pub mod rank;
pub mod residual;
pub mod scoring;
pub mod store;
pub mod token_index;

// Re-export core types
pub use diachi_core::*;

pub use assemble::{assemble_candidates, combined_confidence, AssembleOutcome};
pub use extract::{extract_potentials, Potentials};
pub use normalize::{
    fold_diacritics, is_admin_keyword, normalize_hint, normalize_with_alignment, NormalizeCache,
    NormalizedAddress, RawToken, ADMIN_KEYWORDS,
};
pub use pipeline::AddressPipeline;
pub use rank::{apply_low_confidence_floor, confidence, rank_candidates};
pub use residual::{candidate_spans, extract_residual, quality_flag};
pub use scoring::{ensemble_score, levenshtein_normalized, token_sort_ratio};
pub use store::ReferenceStore;
pub use token_index::TokenIndex;

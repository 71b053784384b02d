//! Geocoder collaborator trait.
//!
//! The pipeline optionally consults an external geocoding provider when
//! local confidence is low. Providers live in `diachi-geocode`; the trait
//! is defined here so the engine depends only on the abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An administrative triple resolved by an external geocoder.
///
/// Names are the provider's display strings; the engine normalizes and
/// validates them against the reference store before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedTriple {
    pub province: String,
    pub district: Option<String>,
    pub ward: Option<String>,
    /// Provider's full formatted address, when available.
    pub formatted: Option<String>,
}

/// External geocoding provider.
///
/// Implementations must be thread-safe. A `None` return means the provider
/// had no answer for the address; errors are reserved for transport or
/// provider failures. Callers enforce their own timeout — implementations
/// should still bound their requests.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a raw address to an administrative triple.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedTriple>>;

    /// Provider name, for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geocoded_triple_serde_roundtrip() {
        let triple = GeocodedTriple {
            province: "Hà Nội".to_string(),
            district: Some("Ba Đình".to_string()),
            ward: None,
            formatted: Some("19 Hoàng Diệu, Ba Đình, Hà Nội".to_string()),
        };
        let json = serde_json::to_string(&triple).unwrap();
        let back: GeocodedTriple = serde_json::from_str(&json).unwrap();
        assert_eq!(back, triple);
    }
}

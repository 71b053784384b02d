//! Mock geocoder backend for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diachi_core::{GeocodedTriple, Geocoder};
//! use diachi_geocode::MockGeocoder;
//!
//! #[tokio::test]
//! async fn test_with_mock() {
//!     let geocoder = MockGeocoder::new().with_response(
//!         "660/8 PHAM THE HIEN P4 Q8",
//!         GeocodedTriple {
//!             province: "Hồ Chí Minh".into(),
//!             district: Some("Quận 8".into()),
//!             ward: Some("Phường 4".into()),
//!             formatted: None,
//!         },
//!     );
//!     let triple = geocoder.geocode("660/8 PHAM THE HIEN P4 Q8").await.unwrap();
//!     assert!(triple.is_some());
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use diachi_core::{Error, GeocodedTriple, Geocoder, Result};

#[derive(Debug, Clone, Default)]
struct MockConfig {
    responses: HashMap<String, GeocodedTriple>,
    default_response: Option<GeocodedTriple>,
    latency_ms: u64,
    always_fail: bool,
}

/// Mock geocoder for tests: canned responses, optional latency, and
/// forced failure, plus a call log.
#[derive(Clone, Default)]
pub struct MockGeocoder {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<String>>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a specific input address to a canned triple.
    pub fn with_response(mut self, address: impl Into<String>, triple: GeocodedTriple) -> Self {
        Arc::make_mut(&mut self.config)
            .responses
            .insert(address.into(), triple);
        self
    }

    /// Triple returned for any address without a specific mapping.
    pub fn with_default_response(mut self, triple: GeocodedTriple) -> Self {
        Arc::make_mut(&mut self.config).default_response = Some(triple);
        self
    }

    /// Simulated latency before every answer, for timeout tests.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Make every call fail, for fail-soft tests.
    pub fn with_failure(mut self) -> Self {
        Arc::make_mut(&mut self.config).always_fail = true;
        self
    }

    /// Addresses this mock was asked to resolve, in order.
    pub fn calls(&self) -> Vec<String> {
        self.call_log.lock().expect("call log poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().expect("call log poisoned").len()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedTriple>> {
        self.call_log
            .lock()
            .expect("call log poisoned")
            .push(address.to_string());

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
        if self.config.always_fail {
            return Err(Error::Geocoder("mock failure".to_string()));
        }

        Ok(self
            .config
            .responses
            .get(address)
            .cloned()
            .or_else(|| self.config.default_response.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple() -> GeocodedTriple {
        GeocodedTriple {
            province: "Hà Nội".to_string(),
            district: Some("Ba Đình".to_string()),
            ward: None,
            formatted: None,
        }
    }

    #[tokio::test]
    async fn returns_mapped_response() {
        let geocoder = MockGeocoder::new().with_response("abc", triple());
        let hit = geocoder.geocode("abc").await.unwrap();
        assert_eq!(hit.unwrap().province, "Hà Nội");
        let miss = geocoder.geocode("xyz").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn default_response_covers_unmapped() {
        let geocoder = MockGeocoder::new().with_default_response(triple());
        assert!(geocoder.geocode("anything").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failure_mode_errors() {
        let geocoder = MockGeocoder::new().with_failure();
        assert!(geocoder.geocode("abc").await.is_err());
    }

    #[tokio::test]
    async fn call_log_records_inputs() {
        let geocoder = MockGeocoder::new();
        let _ = geocoder.geocode("first").await;
        let _ = geocoder.geocode("second").await;
        assert_eq!(geocoder.calls(), vec!["first", "second"]);
        assert_eq!(geocoder.call_count(), 2);
    }
}

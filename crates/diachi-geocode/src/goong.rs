//! Goong Maps geocoding backend.
//!
//! Goong is a Vietnam-focused mapping service with markedly better ward
//! and district coverage for Vietnamese addresses than worldwide
//! providers. The response's `compound` block carries the administrative
//! triple directly, which is all the pipeline needs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use diachi_core::defaults::{EXTERNAL_TIMEOUT_MS, GOONG_GEOCODE_URL};
use diachi_core::{Error, GeocodedTriple, Geocoder, Result};

/// Environment variable holding the Goong API key.
pub const ENV_GOONG_API_KEY: &str = "GOONG_API_KEY";

/// Maximum predictions requested per call.
const RESULT_LIMIT: u8 = 3;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    description: Option<String>,
    compound: Option<Compound>,
}

#[derive(Debug, Deserialize)]
struct Compound {
    #[serde(default)]
    province: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    commune: Option<String>,
}

/// Goong Maps geocoder backend.
pub struct GoongGeocoder {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GoongGeocoder {
    /// Create a backend with an explicit API key and default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(GOONG_GEOCODE_URL.to_string(), api_key.into(), EXTERNAL_TIMEOUT_MS)
    }

    /// Create a backend with custom endpoint and request timeout.
    pub fn with_config(base_url: String, api_key: String, timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Create from the `GOONG_API_KEY` environment variable. The key may
    /// be empty; `geocode` then reports unconfigured instead of calling
    /// out.
    pub fn from_env() -> Self {
        let api_key = std::env::var(ENV_GOONG_API_KEY).unwrap_or_default();
        Self::new(api_key)
    }

    fn first_triple(response: GeocodeResponse) -> Option<GeocodedTriple> {
        response.predictions.into_iter().find_map(|prediction| {
            let compound = prediction.compound?;
            let province = compound.province.filter(|p| !p.trim().is_empty())?;
            Some(GeocodedTriple {
                province,
                district: compound.district.filter(|d| !d.trim().is_empty()),
                ward: compound.commune.filter(|w| !w.trim().is_empty()),
                formatted: prediction.description,
            })
        })
    }
}

#[async_trait]
impl Geocoder for GoongGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedTriple>> {
        if self.api_key.is_empty() {
            debug!(
                subsystem = "geocode",
                component = "goong",
                "No API key configured; skipping"
            );
            return Ok(None);
        }

        let limit = RESULT_LIMIT.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("address", address),
                ("api_key", self.api_key.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: GeocodeResponse = response.json().await?;
        if body.status != "OK" {
            warn!(
                subsystem = "geocode",
                component = "goong",
                status = %body.status,
                "Non-OK geocode status"
            );
            return Err(Error::Geocoder(format!(
                "goong returned status {}",
                body.status
            )));
        }

        let triple = Self::first_triple(body);
        debug!(
            subsystem = "geocode",
            component = "goong",
            success = triple.is_some(),
            "Geocode call complete"
        );
        Ok(triple)
    }

    fn name(&self) -> &str {
        "goong"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compound_into_triple() {
        let body = r#"{
            "status": "OK",
            "predictions": [{
                "description": "19 Hoàng Diệu, Phường Điện Biên, Quận Ba Đình, Hà Nội",
                "compound": {
                    "district": "Quận Ba Đình",
                    "commune": "Phường Điện Biên",
                    "province": "Hà Nội"
                }
            }]
        }"#;
        let response: GeocodeResponse = serde_json::from_str(body).unwrap();
        let triple = GoongGeocoder::first_triple(response).unwrap();
        assert_eq!(triple.province, "Hà Nội");
        assert_eq!(triple.district.as_deref(), Some("Quận Ba Đình"));
        assert_eq!(triple.ward.as_deref(), Some("Phường Điện Biên"));
        assert!(triple.formatted.is_some());
    }

    #[test]
    fn skips_predictions_without_province() {
        let body = r#"{
            "status": "OK",
            "predictions": [
                {"description": "somewhere", "compound": {"province": ""}},
                {"description": "elsewhere", "compound": {"province": "Hà Nội"}}
            ]
        }"#;
        let response: GeocodeResponse = serde_json::from_str(body).unwrap();
        let triple = GoongGeocoder::first_triple(response).unwrap();
        assert_eq!(triple.province, "Hà Nội");
        assert_eq!(triple.district, None);
    }

    #[test]
    fn empty_predictions_yield_none() {
        let body = r#"{"status": "OK", "predictions": []}"#;
        let response: GeocodeResponse = serde_json::from_str(body).unwrap();
        assert!(GoongGeocoder::first_triple(response).is_none());
    }

    #[tokio::test]
    async fn missing_key_short_circuits() {
        let backend = GoongGeocoder::new("");
        let result = backend.geocode("19 Hoàng Diệu, Hà Nội").await.unwrap();
        assert!(result.is_none());
    }
}

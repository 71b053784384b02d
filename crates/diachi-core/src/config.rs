//! Engine configuration.
//!
//! All tunables recognized by the matching pipeline, with defaults from
//! [`crate::defaults`]. Read from environment variables on construction via
//! [`EngineConfig::from_env`] (no restart semantics — the config is captured
//! when the pipeline is built).

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::AdminLevel;

/// Weights of the two similarity signals in the Phase 2 ensemble score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub token_sort: f64,
    pub levenshtein: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            token_sort: defaults::ENSEMBLE_WEIGHT_TOKEN_SORT,
            levenshtein: defaults::ENSEMBLE_WEIGHT_LEVENSHTEIN,
        }
    }
}

/// Candidate breadth per level entering Phase 3 assembly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TopKPerLevel {
    pub province: usize,
    pub district: usize,
    pub ward: usize,
}

impl Default for TopKPerLevel {
    fn default() -> Self {
        Self {
            province: defaults::TOP_K_PROVINCE,
            district: defaults::TOP_K_DISTRICT,
            ward: defaults::TOP_K_WARD,
        }
    }
}

/// Configuration for the address matching pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum adjusted Phase 2 score for a province potential.
    pub fuzzy_threshold_province: f64,
    /// Minimum adjusted Phase 2 score for a district potential.
    pub fuzzy_threshold_district: f64,
    /// Minimum adjusted Phase 2 score for a ward potential.
    pub fuzzy_threshold_ward: f64,
    /// Ensemble weights (token-sort, levenshtein).
    pub ensemble_weights: EnsembleWeights,
    /// Multiplier for 1-2 digit numerics preceded by an admin keyword.
    pub numeric_keyword_bonus: f64,
    /// Multiplier for 1-2 digit numerics without a preceding keyword.
    pub numeric_no_keyword_penalty: f64,
    /// Local confidence below which the external geocoder is consulted.
    pub external_threshold: f64,
    /// Geocoder hard timeout in milliseconds.
    pub external_timeout_ms: u64,
    /// Candidate breadth per level.
    pub top_k_per_level: TopKPerLevel,
    /// Score band within which numeric-ward ties are retained.
    pub disambiguation_band: f64,
    /// Phase 1 normalization LRU capacity.
    pub normalize_cache_size: usize,
    /// Abbreviation dictionary LRU capacity.
    pub abbreviation_cache_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold_province: defaults::FUZZY_THRESHOLD_PROVINCE,
            fuzzy_threshold_district: defaults::FUZZY_THRESHOLD_DISTRICT,
            fuzzy_threshold_ward: defaults::FUZZY_THRESHOLD_WARD,
            ensemble_weights: EnsembleWeights::default(),
            numeric_keyword_bonus: defaults::NUMERIC_KEYWORD_BONUS,
            numeric_no_keyword_penalty: defaults::NUMERIC_NO_KEYWORD_PENALTY,
            external_threshold: defaults::EXTERNAL_THRESHOLD,
            external_timeout_ms: defaults::EXTERNAL_TIMEOUT_MS,
            top_k_per_level: TopKPerLevel::default(),
            disambiguation_band: defaults::DISAMBIGUATION_BAND,
            normalize_cache_size: defaults::NORMALIZE_CACHE_SIZE,
            abbreviation_cache_size: defaults::ABBREVIATION_CACHE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `DIACHI_*` environment variables with
    /// fallback to defaults. Invalid values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        fn env_f64(name: &str) -> Option<f64> {
            match std::env::var(name) {
                Ok(val) => match val.parse::<f64>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(var = name, value = %val, "Invalid float env var, using default");
                        None
                    }
                },
                Err(_) => None,
            }
        }

        if let Some(v) = env_f64("DIACHI_FUZZY_THRESHOLD_PROVINCE") {
            config.fuzzy_threshold_province = v.clamp(0.0, 1.0);
        }
        if let Some(v) = env_f64("DIACHI_FUZZY_THRESHOLD_DISTRICT") {
            config.fuzzy_threshold_district = v.clamp(0.0, 1.0);
        }
        if let Some(v) = env_f64("DIACHI_FUZZY_THRESHOLD_WARD") {
            config.fuzzy_threshold_ward = v.clamp(0.0, 1.0);
        }
        if let Some(v) = env_f64("DIACHI_EXTERNAL_THRESHOLD") {
            config.external_threshold = v.clamp(0.0, 1.0);
        }
        if let Ok(val) = std::env::var("DIACHI_EXTERNAL_TIMEOUT_MS") {
            if let Ok(v) = val.parse::<u64>() {
                config.external_timeout_ms = v;
            }
        }
        if let Some(v) = env_f64("DIACHI_DISAMBIGUATION_BAND") {
            config.disambiguation_band = v.clamp(0.0, 1.0);
        }

        config
    }

    /// Set the ensemble weights.
    pub fn with_ensemble_weights(mut self, token_sort: f64, levenshtein: f64) -> Self {
        self.ensemble_weights = EnsembleWeights {
            token_sort,
            levenshtein,
        };
        self
    }

    /// Set the fuzzy threshold for one level.
    pub fn with_threshold(mut self, level: AdminLevel, threshold: f64) -> Self {
        match level {
            AdminLevel::Province => self.fuzzy_threshold_province = threshold,
            AdminLevel::District => self.fuzzy_threshold_district = threshold,
            AdminLevel::Ward => self.fuzzy_threshold_ward = threshold,
            AdminLevel::Street => {}
        }
        self
    }

    /// Set the external geocoder threshold.
    pub fn with_external_threshold(mut self, threshold: f64) -> Self {
        self.external_threshold = threshold;
        self
    }

    /// Set the geocoder timeout.
    pub fn with_external_timeout_ms(mut self, ms: u64) -> Self {
        self.external_timeout_ms = ms;
        self
    }

    /// Set the per-level candidate breadth.
    pub fn with_top_k(mut self, province: usize, district: usize, ward: usize) -> Self {
        self.top_k_per_level = TopKPerLevel {
            province,
            district,
            ward,
        };
        self
    }

    /// Fuzzy threshold for a level. Streets have no threshold (emitted at
    /// fixed score); callers must not ask for one.
    pub fn threshold_for(&self, level: AdminLevel) -> f64 {
        match level {
            AdminLevel::Province => self.fuzzy_threshold_province,
            AdminLevel::District => self.fuzzy_threshold_district,
            AdminLevel::Ward => self.fuzzy_threshold_ward,
            AdminLevel::Street => 0.0,
        }
    }

    /// Validate internal consistency.
    pub fn validate(&self) -> Result<()> {
        let weight_sum = self.ensemble_weights.token_sort + self.ensemble_weights.levenshtein;
        if (weight_sum - 1.0).abs() > 1e-9 {
            return Err(Error::Config(format!(
                "ensemble weights must sum to 1.0, got {weight_sum}"
            )));
        }
        for (name, v) in [
            ("fuzzy_threshold_province", self.fuzzy_threshold_province),
            ("fuzzy_threshold_district", self.fuzzy_threshold_district),
            ("fuzzy_threshold_ward", self.fuzzy_threshold_ward),
            ("external_threshold", self.external_threshold),
            ("disambiguation_band", self.disambiguation_band),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::Config(format!("{name} must be in [0, 1], got {v}")));
            }
        }
        if self.top_k_per_level.province == 0
            || self.top_k_per_level.district == 0
            || self.top_k_per_level.ward == 0
        {
            return Err(Error::Config("top_k_per_level must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.fuzzy_threshold_province - 0.88).abs() < f64::EPSILON);
        assert!((config.fuzzy_threshold_district - 0.85).abs() < f64::EPSILON);
        assert!((config.fuzzy_threshold_ward - 0.80).abs() < f64::EPSILON);
        assert_eq!(config.external_timeout_ms, 2000);
        assert_eq!(config.top_k_per_level.province, 3);
        assert_eq!(config.top_k_per_level.district, 3);
        assert_eq!(config.top_k_per_level.ward, 5);
    }

    #[test]
    fn threshold_for_level() {
        let config = EngineConfig::default();
        assert!(
            config.threshold_for(AdminLevel::Province)
                > config.threshold_for(AdminLevel::District)
        );
        assert!(
            config.threshold_for(AdminLevel::District) > config.threshold_for(AdminLevel::Ward)
        );
    }

    #[test]
    fn invalid_weights_rejected() {
        let config = EngineConfig::default().with_ensemble_weights(0.9, 0.9);
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let config = EngineConfig::default().with_threshold(AdminLevel::Ward, 1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_chain() {
        let config = EngineConfig::new()
            .with_top_k(2, 2, 4)
            .with_external_threshold(0.5)
            .with_external_timeout_ms(500);
        assert_eq!(config.top_k_per_level.ward, 4);
        assert!((config.external_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.external_timeout_ms, 500);
    }
}

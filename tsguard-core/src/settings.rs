//! System-wide time-series settings.
//!
//! These are the constants the validators and the top-entity resolver fall
//! back on: shingle size defaults and bounds, the recency emphasis default,
//! custom result index naming limits and search request sizing.

use crate::{Result, error::TsGuardError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix every custom result index name or alias must start with.
pub const CUSTOM_RESULT_INDEX_PREFIX: &str = "opensearch-ad-plugin-result-";

/// Settings shared by validation and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSeriesSettings {
    /// Shingle size used when neither an explicit size nor a seasonality is given
    pub default_shingle_size: u32,
    /// Largest explicit shingle size accepted
    pub max_shingle_size: u32,
    /// Divisor turning a suggested seasonality into a shingle size
    pub seasonality_to_shingle_ratio: u32,
    /// Lower bound, in minutes, of the lookback window used to find the top entity
    pub max_interval_rec_length_minutes: i64,
    /// Recency emphasis applied when a detector does not set one
    pub default_recency_emphasis: u32,
    /// Required prefix of custom result index names
    pub custom_result_index_prefix: String,
    /// Maximum length of a custom result index name
    pub max_result_index_name_size: usize,
    /// Number of composite keys requested per multi-field aggregation page
    pub composite_page_size: u32,
    /// Timeout handed to the search backend with every request (seconds)
    pub request_timeout_secs: u64,
}

impl Default for TimeSeriesSettings {
    fn default() -> Self {
        Self {
            default_shingle_size: 8,
            max_shingle_size: 64,
            seasonality_to_shingle_ratio: 2,
            max_interval_rec_length_minutes: 60,
            default_recency_emphasis: 2560,
            custom_result_index_prefix: CUSTOM_RESULT_INDEX_PREFIX.to_string(),
            max_result_index_name_size: 255,
            composite_page_size: 1000,
            request_timeout_secs: 10,
        }
    }
}

impl TimeSeriesSettings {
    /// Creates settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the default shingle size.
    pub fn with_default_shingle_size(mut self, size: u32) -> Self {
        self.default_shingle_size = size;
        self
    }

    /// Builder method to set the maximum shingle size.
    pub fn with_max_shingle_size(mut self, size: u32) -> Self {
        self.max_shingle_size = size;
        self
    }

    /// Builder method to set the seasonality to shingle ratio.
    pub fn with_seasonality_to_shingle_ratio(mut self, ratio: u32) -> Self {
        self.seasonality_to_shingle_ratio = ratio;
        self
    }

    /// Builder method to set the recommended maximum interval length.
    pub fn with_max_interval_rec_length_minutes(mut self, minutes: i64) -> Self {
        self.max_interval_rec_length_minutes = minutes;
        self
    }

    /// Builder method to set the default recency emphasis.
    pub fn with_default_recency_emphasis(mut self, emphasis: u32) -> Self {
        self.default_recency_emphasis = emphasis;
        self
    }

    /// Builder method to set the composite aggregation page size.
    pub fn with_composite_page_size(mut self, size: u32) -> Self {
        self.composite_page_size = size;
        self
    }

    /// Builder method to set the search request timeout.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Search request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validates the settings.
    ///
    /// # Errors
    /// Returns `TsGuardError::Configuration` when a bound is inconsistent.
    pub fn validate(&self) -> Result<()> {
        if self.max_shingle_size == 0 {
            return Err(TsGuardError::configuration(
                "max_shingle_size must be at least 1",
            ));
        }
        if !(1..=self.max_shingle_size).contains(&self.default_shingle_size) {
            return Err(TsGuardError::configuration(format!(
                "default_shingle_size must be between 1 and {}, got {}",
                self.max_shingle_size, self.default_shingle_size
            )));
        }
        if self.seasonality_to_shingle_ratio == 0 {
            return Err(TsGuardError::configuration(
                "seasonality_to_shingle_ratio must be at least 1",
            ));
        }
        if self.max_interval_rec_length_minutes <= 0 {
            return Err(TsGuardError::configuration(format!(
                "max_interval_rec_length_minutes must be positive, got {}",
                self.max_interval_rec_length_minutes
            )));
        }
        if self.default_recency_emphasis <= 1 {
            return Err(TsGuardError::configuration(format!(
                "default_recency_emphasis must be greater than 1, got {}",
                self.default_recency_emphasis
            )));
        }
        if self.custom_result_index_prefix.chars().count() > self.max_result_index_name_size {
            return Err(TsGuardError::configuration(
                "custom_result_index_prefix is longer than max_result_index_name_size",
            ));
        }
        if self.composite_page_size == 0 {
            return Err(TsGuardError::configuration(
                "composite_page_size must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parses and validates settings from a JSON string.
    ///
    /// Missing keys take their default value.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| TsGuardError::serialization("Failed to parse settings", e))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates settings from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| TsGuardError::Io {
            context: format!("Failed to read settings file '{}'", path.display()),
            source: e,
        })?;
        Self::from_json_str(&contents)
    }
}

//! The detector configuration entity, its builder and its document form.
//!
//! A [`Config`] only exists in validated form. It is produced either by
//! [`ConfigBuilder::build`] or by [`Config::parse`], both of which run the
//! same validator and stop at the first violated invariant.
//!
//! # Example
//! ```rust
//! use tsguard_core::models::{Config, ConfigBuilder, IntervalTimeConfiguration};
//!
//! # fn example() -> tsguard_core::Result<()> {
//! let config = ConfigBuilder::new()
//!     .with_name("cpu-detector")
//!     .with_time_field("timestamp")
//!     .with_indices(vec!["metrics-*".to_string()])
//!     .with_detection_interval(IntervalTimeConfiguration::minutes(10))
//!     .with_window_delay(IntervalTimeConfiguration::minutes(1))
//!     .build()?;
//!
//! let document = config.to_json()?;
//! assert_eq!(Config::parse(&document)?, config);
//! # Ok(())
//! # }
//! ```

use super::{
    Feature, ImputationOption, IntervalTimeConfiguration, Query, Rule, RuleDraft,
};
use crate::{Result, error::TsGuardError, settings::TimeSeriesSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated, immutable detector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub(crate) id: Option<String>,
    pub(crate) version: Option<i64>,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) time_field: String,
    pub(crate) indices: Vec<String>,
    pub(crate) features: Vec<Feature>,
    pub(crate) filter_query: Query,
    pub(crate) detection_interval: IntervalTimeConfiguration,
    pub(crate) window_delay: IntervalTimeConfiguration,
    pub(crate) shingle_size: u32,
    pub(crate) explicit_shingle_size: Option<u32>,
    pub(crate) schema_version: i64,
    pub(crate) category_fields: Vec<String>,
    pub(crate) result_index: Option<String>,
    pub(crate) result_index_min_size: Option<i64>,
    pub(crate) result_index_min_age: Option<i64>,
    pub(crate) result_index_ttl: Option<i64>,
    pub(crate) flatten_custom_result_index: Option<bool>,
    pub(crate) imputation_option: Option<ImputationOption>,
    pub(crate) recency_emphasis: u32,
    pub(crate) suggested_seasonality: Option<u32>,
    pub(crate) rules: Option<Vec<Rule>>,
    pub(crate) last_update_time: Option<DateTime<Utc>>,
}

impl Config {
    /// Parses and validates a detector document with default options.
    ///
    /// # Errors
    /// * `TsGuardError::Serialization` when the JSON does not have the
    ///   document shape
    /// * `TsGuardError::InvalidTimeUnit` when an interval uses a unit outside
    ///   the allow-list
    /// * `TsGuardError::Validation` for the first violated invariant
    pub fn parse(json: &str) -> Result<Self> {
        Self::parse_with(json, &ParseOptions::default())
    }

    /// Parses and validates a detector document.
    ///
    /// # Arguments
    /// * `json` - Detector document; unknown top-level keys are ignored
    /// * `options` - Identity, interval defaults and settings to apply
    pub fn parse_with(json: &str, options: &ParseOptions) -> Result<Self> {
        let document: DetectorDocument = serde_json::from_str(json)
            .map_err(|e| TsGuardError::serialization("Failed to parse detector document", e))?;
        ConfigBuilder::from_document(document, options)?.build_with(&options.settings)
    }

    /// Serializes the configuration into its document form.
    ///
    /// Defaults are written out resolved, except the shingle size which is
    /// re-derived from the same inputs, so parsing the document again
    /// yields an equal configuration.
    pub fn to_document(&self) -> Result<Value> {
        serde_json::to_value(DetectorDocument::from(self))
            .map_err(|e| TsGuardError::serialization("Failed to serialize detector", e))
    }

    /// Serializes the configuration into a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&DetectorDocument::from(self))
            .map_err(|e| TsGuardError::serialization("Failed to serialize detector", e))
    }

    /// Persisted id, when known.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Persisted version, when known.
    pub fn version(&self) -> Option<i64> {
        self.version
    }

    /// Detector name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description; empty when absent.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Timestamp field of the source documents.
    pub fn time_field(&self) -> &str {
        &self.time_field
    }

    /// Source indices or patterns.
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    /// Features in configuration order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Names of enabled features, in configuration order.
    pub fn enabled_feature_names(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.is_enabled())
            .map(Feature::name)
            .collect()
    }

    /// Data filter; match-all when none was given.
    pub fn filter_query(&self) -> &Query {
        &self.filter_query
    }

    /// Detection interval.
    pub fn detection_interval(&self) -> IntervalTimeConfiguration {
        self.detection_interval
    }

    /// Window delay.
    pub fn window_delay(&self) -> IntervalTimeConfiguration {
        self.window_delay
    }

    /// Detection interval length in minutes.
    pub fn interval_in_minutes(&self) -> i64 {
        self.detection_interval.to_minutes()
    }

    /// Effective shingle size (explicit, derived from seasonality, or default).
    pub fn shingle_size(&self) -> u32 {
        self.shingle_size
    }

    /// Shingle size as set on the detector, before derivation.
    pub fn explicit_shingle_size(&self) -> Option<u32> {
        self.explicit_shingle_size
    }

    /// Document schema version.
    pub fn schema_version(&self) -> i64 {
        self.schema_version
    }

    /// Category fields splitting data into entities.
    pub fn category_fields(&self) -> &[String] {
        &self.category_fields
    }

    /// Whether data is partitioned into entities by category fields.
    pub fn is_high_cardinality(&self) -> bool {
        !self.category_fields.is_empty()
    }

    /// Custom result index or alias.
    pub fn result_index(&self) -> Option<&str> {
        self.result_index.as_deref()
    }

    /// Rollover size of the custom result index, in MB.
    pub fn result_index_min_size(&self) -> Option<i64> {
        self.result_index_min_size
    }

    /// Rollover age of the custom result index, in days.
    pub fn result_index_min_age(&self) -> Option<i64> {
        self.result_index_min_age
    }

    /// Retention of the custom result index, in days.
    pub fn result_index_ttl(&self) -> Option<i64> {
        self.result_index_ttl
    }

    /// Whether results are flattened in the custom result index.
    pub fn flatten_custom_result_index(&self) -> Option<bool> {
        self.flatten_custom_result_index
    }

    /// Imputation of missing feature values.
    pub fn imputation_option(&self) -> Option<&ImputationOption> {
        self.imputation_option.as_ref()
    }

    /// Effective recency emphasis (explicit or system default).
    pub fn recency_emphasis(&self) -> u32 {
        self.recency_emphasis
    }

    /// Seasonality hint used to derive the shingle size.
    pub fn suggested_seasonality(&self) -> Option<u32> {
        self.suggested_seasonality
    }

    /// Suppression rules.
    pub fn rules(&self) -> Option<&[Rule]> {
        self.rules.as_deref()
    }

    /// Time of the last update.
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_update_time
    }
}

/// Caller-supplied context for parsing a detector document.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Persisted id of the detector
    pub id: Option<String>,
    /// Persisted version of the detector
    pub version: Option<i64>,
    /// Detection interval used when the document has none
    pub default_detection_interval: Option<IntervalTimeConfiguration>,
    /// Window delay used when the document has none (0 minutes otherwise)
    pub default_window_delay: Option<IntervalTimeConfiguration>,
    /// Settings applied during validation
    pub settings: TimeSeriesSettings,
}

impl ParseOptions {
    /// Creates options with no caller context and default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method to set the version.
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    /// Builder method to set the fallback detection interval.
    pub fn with_default_detection_interval(mut self, interval: IntervalTimeConfiguration) -> Self {
        self.default_detection_interval = Some(interval);
        self
    }

    /// Builder method to set the fallback window delay.
    pub fn with_default_window_delay(mut self, delay: IntervalTimeConfiguration) -> Self {
        self.default_window_delay = Some(delay);
        self
    }

    /// Builder method to set the validation settings.
    pub fn with_settings(mut self, settings: TimeSeriesSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Unvalidated detector configuration.
///
/// Every field is optional so that incomplete input can be represented and
/// reported precisely. Intervals are already unit-checked; their sign is
/// checked on build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigBuilder {
    pub(crate) id: Option<String>,
    pub(crate) version: Option<i64>,
    pub(crate) name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) time_field: Option<String>,
    pub(crate) indices: Option<Vec<String>>,
    pub(crate) features: Option<Vec<Feature>>,
    pub(crate) filter_query: Option<Value>,
    pub(crate) detection_interval: Option<IntervalTimeConfiguration>,
    pub(crate) window_delay: Option<IntervalTimeConfiguration>,
    pub(crate) shingle_size: Option<i64>,
    pub(crate) schema_version: Option<i64>,
    pub(crate) category_fields: Option<Vec<String>>,
    pub(crate) result_index: Option<String>,
    pub(crate) result_index_min_size: Option<i64>,
    pub(crate) result_index_min_age: Option<i64>,
    pub(crate) result_index_ttl: Option<i64>,
    pub(crate) flatten_custom_result_index: Option<bool>,
    pub(crate) imputation_option: Option<ImputationOption>,
    pub(crate) recency_emphasis: Option<i64>,
    pub(crate) suggested_seasonality: Option<u32>,
    pub(crate) rules: Option<Vec<Option<RuleDraft>>>,
    pub(crate) last_update_time: Option<DateTime<Utc>>,
}

impl ConfigBuilder {
    /// Creates a builder with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates with default settings.
    ///
    /// # Errors
    /// Returns `TsGuardError::Validation` for the first violated invariant.
    pub fn build(&self) -> Result<Config> {
        self.build_with(&TimeSeriesSettings::default())
    }

    /// Validates with explicit settings.
    pub fn build_with(&self, settings: &TimeSeriesSettings) -> Result<Config> {
        crate::validation::validate_draft(self, settings)
    }

    /// Builder method to set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder method to set the version.
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    /// Builder method to set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the timestamp field.
    pub fn with_time_field(mut self, time_field: impl Into<String>) -> Self {
        self.time_field = Some(time_field.into());
        self
    }

    /// Builder method to set the source indices.
    pub fn with_indices(mut self, indices: Vec<String>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Builder method to set the all features.
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features = Some(features);
        self
    }

    /// Appends one feature.
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.get_or_insert_with(Vec::new).push(feature);
        self
    }

    /// Builder method to set the data filter.
    pub fn with_filter_query(mut self, filter: Value) -> Self {
        self.filter_query = Some(filter);
        self
    }

    /// Builder method to set the detection interval.
    pub fn with_detection_interval(mut self, interval: IntervalTimeConfiguration) -> Self {
        self.detection_interval = Some(interval);
        self
    }

    /// Builder method to set the window delay.
    pub fn with_window_delay(mut self, delay: IntervalTimeConfiguration) -> Self {
        self.window_delay = Some(delay);
        self
    }

    /// Builder method to set the explicit shingle size.
    pub fn with_shingle_size(mut self, shingle_size: i64) -> Self {
        self.shingle_size = Some(shingle_size);
        self
    }

    /// Builder method to set the schema version.
    pub fn with_schema_version(mut self, schema_version: i64) -> Self {
        self.schema_version = Some(schema_version);
        self
    }

    /// Builder method to set the category fields.
    pub fn with_category_fields(mut self, fields: Vec<String>) -> Self {
        self.category_fields = Some(fields);
        self
    }

    /// Builder method to set the custom result index.
    pub fn with_result_index(mut self, result_index: impl Into<String>) -> Self {
        self.result_index = Some(result_index.into());
        self
    }

    /// Builder method to set the result index rollover size.
    pub fn with_result_index_min_size(mut self, min_size: i64) -> Self {
        self.result_index_min_size = Some(min_size);
        self
    }

    /// Builder method to set the result index rollover age.
    pub fn with_result_index_min_age(mut self, min_age: i64) -> Self {
        self.result_index_min_age = Some(min_age);
        self
    }

    /// Builder method to set the result index retention.
    pub fn with_result_index_ttl(mut self, ttl: i64) -> Self {
        self.result_index_ttl = Some(ttl);
        self
    }

    /// Builder method to set the result flattening.
    pub fn with_flatten_custom_result_index(mut self, flatten: bool) -> Self {
        self.flatten_custom_result_index = Some(flatten);
        self
    }

    /// Builder method to set the imputation option.
    pub fn with_imputation_option(mut self, option: ImputationOption) -> Self {
        self.imputation_option = Some(option);
        self
    }

    /// Builder method to set the recency emphasis.
    pub fn with_recency_emphasis(mut self, recency_emphasis: i64) -> Self {
        self.recency_emphasis = Some(recency_emphasis);
        self
    }

    /// Builder method to set the suggested seasonality.
    pub fn with_suggested_seasonality(mut self, seasonality: u32) -> Self {
        self.suggested_seasonality = Some(seasonality);
        self
    }

    /// Builder method to set the suppression rules.
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = Some(rules.iter().map(|r| Some(RuleDraft::from(r))).collect());
        self
    }

    /// Sets rules in draft form, including null entries.
    pub fn with_rule_drafts(mut self, rules: Vec<Option<RuleDraft>>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Builder method to set the last update time.
    pub fn with_last_update_time(mut self, time: DateTime<Utc>) -> Self {
        self.last_update_time = Some(time);
        self
    }

    /// Turns a parsed document into a builder, converting intervals first.
    fn from_document(document: DetectorDocument, options: &ParseOptions) -> Result<Self> {
        let detection_interval = match document.detection_interval {
            Some(period) => Some(period.to_interval()?),
            None => options.default_detection_interval,
        };
        let window_delay = match document.window_delay {
            Some(period) => period.to_interval()?,
            None => options
                .default_window_delay
                .unwrap_or_else(|| IntervalTimeConfiguration::minutes(0)),
        };
        Ok(Self {
            id: options.id.clone(),
            version: options.version,
            name: document.name,
            description: document.description,
            time_field: document.time_field,
            indices: document.indices,
            features: document.feature_attributes,
            filter_query: document.filter_query,
            detection_interval,
            window_delay: Some(window_delay),
            shingle_size: document.shingle_size,
            schema_version: document.schema_version,
            category_fields: document.category_field,
            result_index: document.result_index,
            result_index_min_size: document.result_index_min_size,
            result_index_min_age: document.result_index_min_age,
            result_index_ttl: document.result_index_ttl,
            flatten_custom_result_index: document.flatten_custom_result_index,
            imputation_option: document.imputation_option,
            recency_emphasis: document.recency_emphasis,
            suggested_seasonality: document.suggested_seasonality,
            rules: document.rules,
            last_update_time: document.last_update_time,
        })
    }
}

/// Interval as written in documents: `{"period": {"interval": 10, "unit": "Minutes"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDocument {
    /// Interval body
    pub period: Period,
}

/// Body of a [`PeriodDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Number of units
    pub interval: i64,
    /// Unit name, e.g. `Minutes`
    pub unit: String,
}

impl PeriodDocument {
    /// Converts to an interval, rejecting units outside the allow-list.
    pub fn to_interval(&self) -> Result<IntervalTimeConfiguration> {
        IntervalTimeConfiguration::parse(self.period.interval, &self.period.unit)
    }
}

impl From<IntervalTimeConfiguration> for PeriodDocument {
    fn from(interval: IntervalTimeConfiguration) -> Self {
        Self {
            period: Period {
                interval: interval.interval(),
                unit: interval.unit().to_string(),
            },
        }
    }
}

/// Serialized form of a detector.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DetectorDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    indices: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feature_attributes: Option<Vec<Feature>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter_query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detection_interval: Option<PeriodDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    window_delay: Option<PeriodDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shingle_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_field: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_index_min_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_index_min_age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result_index_ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flatten_custom_result_index: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    imputation_option: Option<ImputationOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recency_emphasis: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_seasonality: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rules: Option<Vec<Option<RuleDraft>>>,
    #[serde(
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    last_update_time: Option<DateTime<Utc>>,
}

impl From<&Config> for DetectorDocument {
    fn from(config: &Config) -> Self {
        Self {
            name: Some(config.name.clone()),
            description: Some(config.description.clone()),
            time_field: Some(config.time_field.clone()),
            indices: Some(config.indices.clone()),
            feature_attributes: Some(config.features.clone()),
            filter_query: Some(config.filter_query.as_value().clone()),
            detection_interval: Some(config.detection_interval.into()),
            window_delay: Some(config.window_delay.into()),
            shingle_size: config.explicit_shingle_size.map(i64::from),
            schema_version: Some(config.schema_version),
            category_field: (!config.category_fields.is_empty())
                .then(|| config.category_fields.clone()),
            result_index: config.result_index.clone(),
            result_index_min_size: config.result_index_min_size,
            result_index_min_age: config.result_index_min_age,
            result_index_ttl: config.result_index_ttl,
            flatten_custom_result_index: config.flatten_custom_result_index,
            imputation_option: config.imputation_option.clone(),
            recency_emphasis: Some(i64::from(config.recency_emphasis)),
            suggested_seasonality: config.suggested_seasonality,
            rules: config
                .rules
                .as_ref()
                .map(|rules| rules.iter().map(|r| Some(RuleDraft::from(r))).collect()),
            last_update_time: config.last_update_time,
        }
    }
}

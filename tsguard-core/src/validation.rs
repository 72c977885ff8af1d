//! Detector configuration validation.
//!
//! [`validate_draft`] is the single entry point used by both
//! [`ConfigBuilder::build`](crate::models::ConfigBuilder::build) and
//! [`Config::parse`](crate::models::Config::parse). Checks run in a fixed
//! order and the first failure is returned; there is no multi-error report.
//!
//! Order: name, time field, indices, detection interval, window delay,
//! filter query, feature aggregations, shingle size, result index, recency
//! emphasis, imputation, suppression rules.

pub mod imputation;
pub mod result_index;
pub mod rules;
pub mod shingle;

#[cfg(test)]
mod tests;

pub use imputation::validate_imputation_option;
pub use result_index::validate_custom_result_index;
pub use rules::validate_rules;
pub use shingle::resolve_shingle_size;

use crate::error::{TsGuardError, ValidationIssueType};
use crate::models::{Config, ConfigBuilder, Feature, IntervalTimeConfiguration, Query};
use crate::settings::TimeSeriesSettings;
use crate::Result;
use std::collections::HashSet;

fn invalid(issue_type: ValidationIssueType, message: impl Into<String>) -> TsGuardError {
    TsGuardError::validation(issue_type, message)
}

/// Validates a draft and produces the immutable configuration.
///
/// Derived values are resolved on the way: blank description becomes `""`,
/// a missing filter becomes match-all, and the shingle size and recency
/// emphasis fall back to `settings` when absent.
///
/// # Errors
/// Returns `TsGuardError::Validation` for the first violated invariant.
pub fn validate_draft(draft: &ConfigBuilder, settings: &TimeSeriesSettings) -> Result<Config> {
    let name = draft
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| invalid(ValidationIssueType::Name, "Detector name should be set"))?;

    let time_field = draft
        .time_field
        .as_deref()
        .ok_or_else(|| invalid(ValidationIssueType::TimeField, "Time field should be set"))?;

    let indices = draft
        .indices
        .as_ref()
        .filter(|i| !i.is_empty())
        .ok_or_else(|| invalid(ValidationIssueType::Indices, "Indices should be set"))?;

    let detection_interval = check_detection_interval(draft.detection_interval)?;
    let window_delay = check_window_delay(draft.window_delay)?;

    let filter_query = Query::from_filter(draft.filter_query.clone());
    filter_query.check().map_err(|reason| {
        invalid(
            ValidationIssueType::FilterQuery,
            format!("Custom query error in data filter: {}", reason),
        )
    })?;

    let features = draft.features.clone().unwrap_or_default();
    check_features(&features)?;

    let explicit_shingle = check_shingle_size(draft.shingle_size, settings)?;
    let shingle_size = resolve_shingle_size(
        explicit_shingle,
        draft.suggested_seasonality,
        settings.default_shingle_size,
        settings.seasonality_to_shingle_ratio,
    );

    if let Some(result_index) = draft.result_index.as_deref() {
        if let Some(message) = validate_custom_result_index(result_index, settings) {
            return Err(invalid(ValidationIssueType::ResultIndex, message));
        }
    }
    check_result_index_options(draft)?;

    let recency_emphasis = match draft.recency_emphasis {
        Some(value) => u32::try_from(value)
            .ok()
            .filter(|v| *v > 1)
            .ok_or_else(|| {
                invalid(
                    ValidationIssueType::RecencyEmphasis,
                    "Recency emphasis must be an integer greater than 1.",
                )
            })?,
        None => settings.default_recency_emphasis,
    };

    validate_imputation_option(&features, draft.imputation_option.as_ref())?;
    let rules = validate_rules(&features, draft.rules.as_deref())?;

    tracing::debug!(
        detector = name,
        shingle_size,
        recency_emphasis,
        high_cardinality = draft.category_fields.as_ref().is_some_and(|c| !c.is_empty()),
        "Detector configuration validated"
    );

    Ok(Config {
        id: draft.id.clone(),
        version: draft.version,
        name: name.to_string(),
        description: draft.description.clone().unwrap_or_default(),
        time_field: time_field.to_string(),
        indices: indices.clone(),
        features,
        filter_query,
        detection_interval,
        window_delay,
        shingle_size,
        explicit_shingle_size: explicit_shingle,
        schema_version: draft.schema_version.unwrap_or(0),
        category_fields: draft.category_fields.clone().unwrap_or_default(),
        result_index: draft.result_index.clone(),
        result_index_min_size: draft.result_index_min_size,
        result_index_min_age: draft.result_index_min_age,
        result_index_ttl: draft.result_index_ttl,
        flatten_custom_result_index: draft.flatten_custom_result_index,
        imputation_option: draft.imputation_option.clone(),
        recency_emphasis,
        suggested_seasonality: draft.suggested_seasonality,
        rules,
        last_update_time: draft.last_update_time,
    })
}

fn check_detection_interval(
    interval: Option<IntervalTimeConfiguration>,
) -> Result<IntervalTimeConfiguration> {
    let interval = interval.ok_or_else(|| {
        invalid(
            ValidationIssueType::DetectionInterval,
            "Detection interval should be set",
        )
    })?;
    if interval.interval() <= 0 {
        return Err(invalid(
            ValidationIssueType::DetectionInterval,
            "Detection interval must be a positive integer",
        ));
    }
    Ok(interval)
}

fn check_window_delay(
    delay: Option<IntervalTimeConfiguration>,
) -> Result<IntervalTimeConfiguration> {
    let delay = delay.ok_or_else(|| {
        invalid(ValidationIssueType::WindowDelay, "Window delay should be set")
    })?;
    if delay.interval() < 0 {
        return Err(invalid(
            ValidationIssueType::WindowDelay,
            format!("Interval {} should be non-negative", delay.interval()),
        ));
    }
    Ok(delay)
}

fn check_features(features: &[Feature]) -> Result<()> {
    let mut names = HashSet::with_capacity(features.len());
    for feature in features {
        feature.check_aggregation().map_err(|reason| {
            invalid(
                ValidationIssueType::FeatureAttributes,
                format!("Custom query error in feature \"{}\": {}", feature.name(), reason),
            )
        })?;
        if !names.insert(feature.name()) {
            return Err(invalid(
                ValidationIssueType::FeatureAttributes,
                format!("Detector has duplicate feature names: {}", feature.name()),
            ));
        }
    }
    Ok(())
}

fn check_shingle_size(shingle_size: Option<i64>, settings: &TimeSeriesSettings) -> Result<Option<u32>> {
    let Some(size) = shingle_size else {
        return Ok(None);
    };
    u32::try_from(size)
        .ok()
        .filter(|s| (1..=settings.max_shingle_size).contains(s))
        .map(Some)
        .ok_or_else(|| {
            invalid(
                ValidationIssueType::ShingleSize,
                format!(
                    "Shingle size must be a positive integer no larger than {}. Got {}",
                    settings.max_shingle_size, size
                ),
            )
        })
}

fn check_result_index_options(draft: &ConfigBuilder) -> Result<()> {
    let options = [
        ("Result index min size", draft.result_index_min_size),
        ("Result index min age", draft.result_index_min_age),
        ("Result index ttl", draft.result_index_ttl),
    ];
    for (label, value) in options {
        if let Some(value) = value {
            if value <= 0 {
                return Err(invalid(
                    ValidationIssueType::ResultIndex,
                    format!("{} must be a positive integer. Got {}", label, value),
                ));
            }
        }
    }
    Ok(())
}

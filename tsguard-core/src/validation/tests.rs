//! Tests for detector configuration validation.
//!
//! These cover each check of the validator, the order in which checks run,
//! and the messages reported to callers.

use super::*;
use crate::error::ValidationError;
use crate::models::*;
use crate::settings::CUSTOM_RESULT_INDEX_PREFIX;
use serde_json::json;

fn feature(name: &str, enabled: bool) -> Feature {
    Feature::new(
        Some(format!("{}-id", name)),
        name,
        enabled,
        json!({"max_value": {"max": {"field": "value"}}}),
    )
}

fn valid_builder() -> ConfigBuilder {
    ConfigBuilder::new()
        .with_name("test-detector")
        .with_time_field("timestamp")
        .with_indices(vec!["metrics".to_string()])
        .with_detection_interval(IntervalTimeConfiguration::minutes(10))
        .with_window_delay(IntervalTimeConfiguration::minutes(1))
        .with_feature(feature("cpu", true))
        .with_feature(feature("memory", false))
}

fn condition(feature_name: &str, threshold_type: ThresholdType) -> ConditionDraft {
    ConditionDraft {
        feature_name: Some(feature_name.to_string()),
        threshold_type: Some(threshold_type),
        operator: Some(Operator::Lte),
        value: Some(0.2),
    }
}

fn rule(conditions: Vec<Option<ConditionDraft>>) -> Option<RuleDraft> {
    Some(RuleDraft {
        action: Some(Action::IgnoreAnomaly),
        conditions: Some(conditions),
    })
}

fn failure(builder: &ConfigBuilder) -> ValidationError {
    match builder.build() {
        Err(TsGuardError::Validation(error)) => error,
        other => panic!("expected validation error, got {:?}", other),
    }
}

fn assert_failure(builder: &ConfigBuilder, issue_type: ValidationIssueType, message: &str) {
    let error = failure(builder);
    assert_eq!(error.issue_type(), issue_type);
    assert_eq!(error.message(), message);
}

#[test]
fn test_valid_builder_resolves_defaults() {
    let config = valid_builder().build().unwrap();
    assert_eq!(config.name(), "test-detector");
    assert_eq!(config.description(), "");
    assert!(config.filter_query().is_match_all());
    assert_eq!(config.shingle_size(), 8);
    assert_eq!(config.recency_emphasis(), 2560);
    assert_eq!(config.schema_version(), 0);
    assert!(config.category_fields().is_empty());
    assert!(!config.is_high_cardinality());
    assert!(config.rules().is_none());
    assert_eq!(config.enabled_feature_names(), vec!["cpu"]);
}

#[test]
fn test_structural_fields_required() {
    assert_failure(
        &valid_builder().with_name("  "),
        ValidationIssueType::Name,
        "Detector name should be set",
    );

    let mut builder = valid_builder();
    builder.time_field = None;
    assert_failure(&builder, ValidationIssueType::TimeField, "Time field should be set");

    assert_failure(
        &valid_builder().with_indices(vec![]),
        ValidationIssueType::Indices,
        "Indices should be set",
    );

    let mut builder = valid_builder();
    builder.detection_interval = None;
    assert_failure(
        &builder,
        ValidationIssueType::DetectionInterval,
        "Detection interval should be set",
    );

    let mut builder = valid_builder();
    builder.window_delay = None;
    assert_failure(&builder, ValidationIssueType::WindowDelay, "Window delay should be set");
}

#[test]
fn test_first_failure_wins() {
    let builder = ConfigBuilder::new()
        .with_detection_interval(IntervalTimeConfiguration::minutes(0))
        .with_shingle_size(-1);
    assert_eq!(failure(&builder).issue_type(), ValidationIssueType::Name);

    let builder = valid_builder()
        .with_detection_interval(IntervalTimeConfiguration::minutes(0))
        .with_window_delay(IntervalTimeConfiguration::minutes(-1));
    assert_eq!(
        failure(&builder).issue_type(),
        ValidationIssueType::DetectionInterval
    );
}

#[test]
fn test_detection_interval_must_be_positive() {
    for minutes in [0, -1] {
        assert_failure(
            &valid_builder().with_detection_interval(IntervalTimeConfiguration::minutes(minutes)),
            ValidationIssueType::DetectionInterval,
            "Detection interval must be a positive integer",
        );
    }
}

#[test]
fn test_window_delay_must_be_non_negative() {
    assert_failure(
        &valid_builder().with_window_delay(IntervalTimeConfiguration::minutes(-1)),
        ValidationIssueType::WindowDelay,
        "Interval -1 should be non-negative",
    );
    assert!(
        valid_builder()
            .with_window_delay(IntervalTimeConfiguration::minutes(0))
            .build()
            .is_ok()
    );
}

#[test]
fn test_filter_query_shape() {
    let error = failure(&valid_builder().with_filter_query(json!({"aa": "bb"})));
    assert_eq!(error.issue_type(), ValidationIssueType::FilterQuery);

    let config = valid_builder()
        .with_filter_query(json!({"bool": {"filter": [{"term": {"host": "a"}}]}}))
        .build()
        .unwrap();
    assert!(!config.filter_query().is_match_all());

    let config = valid_builder().with_filter_query(json!({})).build().unwrap();
    assert!(config.filter_query().is_match_all());
}

#[test]
fn test_feature_aggregation_shape() {
    let bad = Feature::new(None, "bad", true, json!({"aa": "bb"}));
    let error = failure(&valid_builder().with_feature(bad));
    assert_eq!(error.issue_type(), ValidationIssueType::FeatureAttributes);
    assert!(error.message().contains("\"bad\""));
}

#[test]
fn test_duplicate_feature_names() {
    assert_failure(
        &valid_builder().with_feature(feature("cpu", false)),
        ValidationIssueType::FeatureAttributes,
        "Detector has duplicate feature names: cpu",
    );
}

#[test]
fn test_shingle_size_bounds() {
    for size in [-1, 0, 65] {
        assert_failure(
            &valid_builder().with_shingle_size(size),
            ValidationIssueType::ShingleSize,
            &format!(
                "Shingle size must be a positive integer no larger than 64. Got {}",
                size
            ),
        );
    }
    assert_eq!(valid_builder().with_shingle_size(64).build().unwrap().shingle_size(), 64);
    assert_eq!(valid_builder().with_shingle_size(1).build().unwrap().shingle_size(), 1);
}

#[test]
fn test_shingle_size_derived_from_seasonality() {
    let config = valid_builder().with_suggested_seasonality(24).build().unwrap();
    assert_eq!(config.shingle_size(), 12);
    assert_eq!(config.suggested_seasonality(), Some(24));

    let config = valid_builder()
        .with_shingle_size(4)
        .with_suggested_seasonality(24)
        .build()
        .unwrap();
    assert_eq!(config.shingle_size(), 4);

    let settings = TimeSeriesSettings::new().with_default_shingle_size(16);
    let config = valid_builder().build_with(&settings).unwrap();
    assert_eq!(config.shingle_size(), 16);
}

#[test]
fn test_result_index_naming() {
    assert_failure(
        &valid_builder().with_result_index("test"),
        ValidationIssueType::ResultIndex,
        "Result index must start with opensearch-ad-plugin-result-",
    );
    assert_failure(
        &valid_builder().with_result_index(format!("{}abc#", CUSTOM_RESULT_INDEX_PREFIX)),
        ValidationIssueType::ResultIndex,
        "Result index name has invalid character. Valid characters are a-z, 0-9, -(hyphen) and _(underscore)",
    );

    let config = valid_builder()
        .with_result_index(format!("{}test", CUSTOM_RESULT_INDEX_PREFIX))
        .with_result_index_min_size(1500)
        .with_result_index_min_age(7)
        .with_result_index_ttl(30)
        .with_flatten_custom_result_index(true)
        .build()
        .unwrap();
    assert_eq!(config.result_index_min_size(), Some(1500));
    assert_eq!(config.result_index_min_age(), Some(7));
    assert_eq!(config.result_index_ttl(), Some(30));
    assert_eq!(config.flatten_custom_result_index(), Some(true));
}

#[test]
fn test_result_index_options_must_be_positive() {
    let error = failure(&valid_builder().with_result_index_min_size(0));
    assert_eq!(error.issue_type(), ValidationIssueType::ResultIndex);
    let error = failure(&valid_builder().with_result_index_ttl(-3));
    assert_eq!(error.issue_type(), ValidationIssueType::ResultIndex);
}

#[test]
fn test_recency_emphasis() {
    for value in [-1, 0, 1] {
        assert_failure(
            &valid_builder().with_recency_emphasis(value),
            ValidationIssueType::RecencyEmphasis,
            "Recency emphasis must be an integer greater than 1.",
        );
    }
    let config = valid_builder().with_recency_emphasis(2).build().unwrap();
    assert_eq!(config.recency_emphasis(), 2);
}

#[test]
fn test_fixed_value_imputation_requires_fills() {
    assert_failure(
        &valid_builder().with_imputation_option(ImputationOption::new(
            ImputationMethod::FixedValues,
        )),
        ValidationIssueType::Imputation,
        "Enabled features are present, but no default fill values are provided.",
    );

    let fills = vec![
        FeatureFill {
            feature_name: "cpu".into(),
            data: 3.0,
        },
        FeatureFill {
            feature_name: "memory".into(),
            data: 1.0,
        },
    ];
    assert_failure(
        &valid_builder().with_imputation_option(
            ImputationOption::new(ImputationMethod::FixedValues).with_default_fill(fills),
        ),
        ValidationIssueType::Imputation,
        "Incorrect number of values to fill. Got: 2. Expected: 1.",
    );

    let fills = vec![FeatureFill {
        feature_name: "memory".into(),
        data: 1.0,
    }];
    assert_failure(
        &valid_builder().with_imputation_option(
            ImputationOption::new(ImputationMethod::FixedValues).with_default_fill(fills),
        ),
        ValidationIssueType::Imputation,
        "Missing feature name: cpu.",
    );
}

#[test]
fn test_imputation_without_enabled_features() {
    let builder = ConfigBuilder {
        features: Some(vec![feature("cpu", false)]),
        ..valid_builder()
    }
    .with_imputation_option(ImputationOption::new(ImputationMethod::FixedValues));
    assert!(builder.build().is_ok());

    let builder =
        valid_builder().with_imputation_option(ImputationOption::new(ImputationMethod::Zero));
    assert!(builder.build().is_ok());
}

#[test]
fn test_rules_absent_or_empty() {
    assert!(validate_rules(&[], None).unwrap().is_none());
    assert_eq!(validate_rules(&[], Some([].as_slice())).unwrap(), Some(vec![]));
}

#[test]
fn test_rules_require_features() {
    let builder = ConfigBuilder {
        features: None,
        ..valid_builder()
    }
    .with_rule_drafts(vec![rule(vec![Some(condition(
        "cpu",
        ThresholdType::ActualOverExpectedRatio,
    ))])]);
    assert_failure(
        &builder,
        ValidationIssueType::Rule,
        "Suppression Rule Error: Features are not defined while suppression rules are provided.",
    );
}

#[test]
fn test_rules_null_entries() {
    assert_failure(
        &valid_builder().with_rule_drafts(vec![None]),
        ValidationIssueType::Rule,
        "Suppression Rule Error: A suppression rule or its conditions are not properly defined.",
    );

    let no_conditions = Some(RuleDraft {
        action: Some(Action::IgnoreAnomaly),
        conditions: None,
    });
    assert_failure(
        &valid_builder().with_rule_drafts(vec![no_conditions]),
        ValidationIssueType::Rule,
        "Suppression Rule Error: A suppression rule or its conditions are not properly defined.",
    );

    assert_failure(
        &valid_builder().with_rule_drafts(vec![rule(vec![None])]),
        ValidationIssueType::Rule,
        "Suppression Rule Error: A condition within a suppression rule is not properly defined.",
    );

    let unnamed = ConditionDraft {
        feature_name: None,
        ..condition("cpu", ThresholdType::ActualOverExpectedRatio)
    };
    assert_failure(
        &valid_builder().with_rule_drafts(vec![rule(vec![Some(unnamed)])]),
        ValidationIssueType::Rule,
        "Suppression Rule Error: A condition is missing the feature name.",
    );
}

#[test]
fn test_rules_feature_references() {
    assert_failure(
        &valid_builder().with_rule_drafts(vec![rule(vec![Some(condition(
            "disk",
            ThresholdType::ActualOverExpectedRatio,
        ))])]),
        ValidationIssueType::Rule,
        "Suppression Rule Error: Feature \"disk\" specified in a suppression rule does not exist.",
    );
    assert_failure(
        &valid_builder().with_rule_drafts(vec![rule(vec![Some(condition(
            "memory",
            ThresholdType::ActualOverExpectedRatio,
        ))])]),
        ValidationIssueType::Rule,
        "Suppression Rule Error: Feature \"memory\" specified in a suppression rule is not enabled.",
    );
}

#[test]
fn test_ratio_threshold_needs_positive_value_and_operator() {
    let invalid_values = [None, Some(f64::NAN), Some(f64::INFINITY)];
    for value in invalid_values {
        let draft = ConditionDraft {
            value,
            ..condition("cpu", ThresholdType::ExpectedOverActualRatio)
        };
        assert_failure(
            &valid_builder().with_rule_drafts(vec![rule(vec![Some(draft)])]),
            ValidationIssueType::Rule,
            "Suppression Rule Error: The threshold value for feature \"cpu\" is not a valid number.",
        );
    }

    for value in [0.0, -0.5] {
        let draft = ConditionDraft {
            value: Some(value),
            ..condition("cpu", ThresholdType::ActualOverExpectedRatio)
        };
        assert_failure(
            &valid_builder().with_rule_drafts(vec![rule(vec![Some(draft)])]),
            ValidationIssueType::Rule,
            "Suppression Rule Error: The threshold value for feature \"cpu\" must be a positive number.",
        );
    }

    let draft = ConditionDraft {
        operator: None,
        ..condition("cpu", ThresholdType::ActualOverExpectedRatio)
    };
    assert_failure(
        &valid_builder().with_rule_drafts(vec![rule(vec![Some(draft)])]),
        ValidationIssueType::Rule,
        "Suppression Rule Error: The operator for feature \"cpu\" is not specified.",
    );
}

#[test]
fn test_direction_only_threshold_rejects_operator_and_value() {
    let expected = "Suppression Rule Error: For threshold type \"ACTUAL_IS_BELOW_EXPECTED\", both operator and value must be empty or null, as this rule compares actual to expected values directly.";

    let with_operator = ConditionDraft {
        value: None,
        ..condition("cpu", ThresholdType::ActualIsBelowExpected)
    };
    let with_value = ConditionDraft {
        operator: None,
        ..condition("cpu", ThresholdType::ActualIsBelowExpected)
    };
    for draft in [with_operator, with_value] {
        assert_failure(
            &valid_builder().with_rule_drafts(vec![rule(vec![Some(draft)])]),
            ValidationIssueType::Rule,
            expected,
        );
    }

    let bare = ConditionDraft {
        operator: None,
        value: None,
        ..condition("cpu", ThresholdType::ActualIsBelowExpected)
    };
    let config = valid_builder()
        .with_rule_drafts(vec![rule(vec![Some(bare)])])
        .build()
        .unwrap();
    let rules = config.rules().unwrap();
    assert_eq!(rules[0].conditions[0].threshold_type, Some(ThresholdType::ActualIsBelowExpected));
    assert!(rules[0].conditions[0].operator.is_none());
}

#[test]
fn test_margin_and_untyped_conditions_are_unconstrained() {
    let margin = ConditionDraft {
        operator: None,
        value: Some(f64::NAN),
        ..condition("cpu", ThresholdType::ActualOverExpectedMargin)
    };
    let untyped = ConditionDraft {
        threshold_type: None,
        operator: None,
        value: None,
        ..condition("cpu", ThresholdType::ActualOverExpectedMargin)
    };
    let rules = validate_rules(
        &[feature("cpu", true)],
        Some(vec![rule(vec![Some(margin), Some(untyped)])].as_slice()),
    )
    .unwrap()
    .unwrap();
    assert_eq!(rules[0].action, Action::IgnoreAnomaly);
    assert_eq!(rules[0].conditions.len(), 2);
}

#[test]
fn test_valid_rules_are_kept() {
    let config = valid_builder()
        .with_rules(vec![Rule {
            action: Action::IgnoreAnomaly,
            conditions: vec![Condition {
                feature_name: "cpu".into(),
                threshold_type: Some(ThresholdType::ActualOverExpectedRatio),
                operator: Some(Operator::Lte),
                value: Some(0.2),
            }],
        }])
        .build()
        .unwrap();
    let rules = config.rules().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].conditions[0].feature_name, "cpu");
    assert_eq!(rules[0].conditions[0].value, Some(0.2));
}

//! Suppression rule validation.
//!
//! Rules reference features by name, so they can only be checked against
//! the feature list of the same detector.

use crate::error::{TsGuardError, ValidationIssueType};
use crate::models::{
    Condition, ConditionDraft, Feature, Rule, RuleDraft, ThresholdCategory,
};
use crate::Result;

const RULE_ERROR_PREFIX: &str = "Suppression Rule Error: ";

fn rule_error(message: impl std::fmt::Display) -> TsGuardError {
    TsGuardError::validation(
        ValidationIssueType::Rule,
        format!("{}{}", RULE_ERROR_PREFIX, message),
    )
}

/// Validates suppression rules against the configured features.
///
/// # Arguments
/// * `features` - Features of the detector
/// * `rules` - Rules in draft form; `None` means no rules were given
///
/// # Returns
/// The rules in validated form, or `None` when none were given.
///
/// # Errors
/// Returns `TsGuardError::Validation` with issue type `Rule` describing the
/// first problem found.
pub fn validate_rules(
    features: &[Feature],
    rules: Option<&[Option<RuleDraft>]>,
) -> Result<Option<Vec<Rule>>> {
    let Some(rules) = rules else {
        return Ok(None);
    };
    if !rules.is_empty() && features.is_empty() {
        return Err(rule_error(
            "Features are not defined while suppression rules are provided.",
        ));
    }

    let mut validated = Vec::with_capacity(rules.len());
    for rule in rules {
        let (Some(action), Some(conditions)) = rule
            .as_ref()
            .map_or((None, None), |r| (r.action, r.conditions.as_ref()))
        else {
            return Err(rule_error(
                "A suppression rule or its conditions are not properly defined.",
            ));
        };

        let conditions = conditions
            .iter()
            .map(|condition| {
                let condition = condition.as_ref().ok_or_else(|| {
                    rule_error("A condition within a suppression rule is not properly defined.")
                })?;
                validate_condition(features, condition)
            })
            .collect::<Result<Vec<_>>>()?;

        validated.push(Rule { action, conditions });
    }
    Ok(Some(validated))
}

fn validate_condition(features: &[Feature], condition: &ConditionDraft) -> Result<Condition> {
    let Some(feature_name) = condition.feature_name.as_deref() else {
        return Err(rule_error("A condition is missing the feature name."));
    };

    let Some(feature) = features.iter().find(|f| f.name() == feature_name) else {
        return Err(rule_error(format!(
            "Feature \"{}\" specified in a suppression rule does not exist.",
            feature_name
        )));
    };
    if !feature.is_enabled() {
        return Err(rule_error(format!(
            "Feature \"{}\" specified in a suppression rule is not enabled.",
            feature_name
        )));
    }

    if let Some(threshold_type) = condition.threshold_type {
        match threshold_type.category() {
            ThresholdCategory::Ratio => {
                let value = condition.value.filter(|v| v.is_finite()).ok_or_else(|| {
                    rule_error(format!(
                        "The threshold value for feature \"{}\" is not a valid number.",
                        feature_name
                    ))
                })?;
                if value <= 0.0 {
                    return Err(rule_error(format!(
                        "The threshold value for feature \"{}\" must be a positive number.",
                        feature_name
                    )));
                }
                if condition.operator.is_none() {
                    return Err(rule_error(format!(
                        "The operator for feature \"{}\" is not specified.",
                        feature_name
                    )));
                }
            }
            ThresholdCategory::DirectionOnly => {
                if condition.operator.is_some() || condition.value.is_some() {
                    return Err(rule_error(format!(
                        "For threshold type \"{}\", both operator and value must be empty or null, as this rule compares actual to expected values directly.",
                        threshold_type
                    )));
                }
            }
            ThresholdCategory::Other => {}
        }
    }

    Ok(Condition {
        feature_name: feature_name.to_string(),
        threshold_type: condition.threshold_type,
        operator: condition.operator,
        value: condition.value,
    })
}

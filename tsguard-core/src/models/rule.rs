//! Suppression rules.
//!
//! A rule suppresses (or explicitly reports) an anomaly when all of its
//! conditions hold. Conditions compare a feature's actual value against the
//! model's expected value.

use serde::{Deserialize, Serialize};

/// What to do with an anomaly matched by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Suppress anomalies matching every condition
    IgnoreAnomaly,
    /// Report anomalies matching every condition
    ReportAnomaly,
}

/// How a condition compares actual and expected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdType {
    /// Actual value exceeds expected by a margin
    ActualOverExpectedMargin,
    /// Expected value exceeds actual by a margin
    ExpectedOverActualMargin,
    /// Actual value exceeds expected by a ratio
    ActualOverExpectedRatio,
    /// Expected value exceeds actual by a ratio
    ExpectedOverActualRatio,
    /// Actual value is below expected
    ActualIsBelowExpected,
    /// Actual value is above expected
    ActualIsOverExpected,
}

/// Validation category of a threshold type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdCategory {
    /// Needs a positive threshold value and an operator
    Ratio,
    /// Compares direction only; operator and value must be absent
    DirectionOnly,
    /// No constraints on operator or value
    Other,
}

impl ThresholdType {
    /// Classifies this threshold type.
    pub fn category(&self) -> ThresholdCategory {
        match self {
            ThresholdType::ActualOverExpectedRatio | ThresholdType::ExpectedOverActualRatio => {
                ThresholdCategory::Ratio
            }
            ThresholdType::ActualIsBelowExpected | ThresholdType::ActualIsOverExpected => {
                ThresholdCategory::DirectionOnly
            }
            ThresholdType::ActualOverExpectedMargin | ThresholdType::ExpectedOverActualMargin => {
                ThresholdCategory::Other
            }
        }
    }

    /// Name as written in documents, e.g. `ACTUAL_IS_BELOW_EXPECTED`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThresholdType::ActualOverExpectedMargin => "ACTUAL_OVER_EXPECTED_MARGIN",
            ThresholdType::ExpectedOverActualMargin => "EXPECTED_OVER_ACTUAL_MARGIN",
            ThresholdType::ActualOverExpectedRatio => "ACTUAL_OVER_EXPECTED_RATIO",
            ThresholdType::ExpectedOverActualRatio => "EXPECTED_OVER_ACTUAL_RATIO",
            ThresholdType::ActualIsBelowExpected => "ACTUAL_IS_BELOW_EXPECTED",
            ThresholdType::ActualIsOverExpected => "ACTUAL_IS_OVER_EXPECTED",
        }
    }
}

impl std::fmt::Display for ThresholdType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
}

/// A validated condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Name of an enabled feature of the detector
    pub feature_name: String,
    /// Comparison kind; absent leaves operator and value unconstrained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_type: Option<ThresholdType>,
    /// Operator applied to the threshold value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    /// Threshold value; non-finite values are written as strings
    #[serde(
        default,
        with = "threshold_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<f64>,
}

/// A validated suppression rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// What to do when all conditions hold
    pub action: Action,
    /// Conditions, all of which must hold
    pub conditions: Vec<Condition>,
}

/// A condition as it arrives from a caller; any part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionDraft {
    /// Feature the condition applies to
    #[serde(default)]
    pub feature_name: Option<String>,
    /// Comparison kind
    #[serde(default)]
    pub threshold_type: Option<ThresholdType>,
    /// Comparison operator
    #[serde(default)]
    pub operator: Option<Operator>,
    /// Threshold value
    #[serde(default, with = "threshold_value")]
    pub value: Option<f64>,
}

/// A rule as it arrives from a caller; null entries are kept so they can be
/// reported instead of silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    /// Rule action
    #[serde(default)]
    pub action: Option<Action>,
    /// Conditions, with null entries preserved
    #[serde(default)]
    pub conditions: Option<Vec<Option<ConditionDraft>>>,
}

/// Threshold values in documents. JSON numbers cannot hold non-finite
/// values, so those are written as `"NaN"`, `"Infinity"` and `"-Infinity"`.
mod threshold_value {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match *value {
            None => serializer.serialize_none(),
            Some(v) if v.is_nan() => serializer.serialize_str("NaN"),
            Some(v) if v == f64::INFINITY => serializer.serialize_str("Infinity"),
            Some(v) if v == f64::NEG_INFINITY => serializer.serialize_str("-Infinity"),
            Some(v) => serializer.serialize_f64(v),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Number(v)) => Ok(Some(v)),
            Some(Raw::Text(text)) => match text.as_str() {
                "NaN" => Ok(Some(f64::NAN)),
                "Infinity" => Ok(Some(f64::INFINITY)),
                "-Infinity" => Ok(Some(f64::NEG_INFINITY)),
                other => Err(D::Error::custom(format!(
                    "invalid threshold value \"{}\"",
                    other
                ))),
            },
        }
    }
}

impl From<&Condition> for ConditionDraft {
    fn from(condition: &Condition) -> Self {
        Self {
            feature_name: Some(condition.feature_name.clone()),
            threshold_type: condition.threshold_type,
            operator: condition.operator,
            value: condition.value,
        }
    }
}

impl From<&Rule> for RuleDraft {
    fn from(rule: &Rule) -> Self {
        Self {
            action: Some(rule.action),
            conditions: Some(
                rule.conditions
                    .iter()
                    .map(|c| Some(ConditionDraft::from(c)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_threshold_categories() {
        use ThresholdCategory::*;
        let expected = [
            (ThresholdType::ActualOverExpectedMargin, Other),
            (ThresholdType::ExpectedOverActualMargin, Other),
            (ThresholdType::ActualOverExpectedRatio, Ratio),
            (ThresholdType::ExpectedOverActualRatio, Ratio),
            (ThresholdType::ActualIsBelowExpected, DirectionOnly),
            (ThresholdType::ActualIsOverExpected, DirectionOnly),
        ];
        for (threshold_type, category) in expected {
            assert_eq!(threshold_type.category(), category, "{}", threshold_type);
        }
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(ThresholdType::ActualIsBelowExpected).unwrap(),
            json!("ACTUAL_IS_BELOW_EXPECTED")
        );
        assert_eq!(serde_json::to_value(Operator::Lte).unwrap(), json!("LTE"));
        assert_eq!(
            serde_json::to_value(Action::IgnoreAnomaly).unwrap(),
            json!("IGNORE_ANOMALY")
        );
    }

    #[test]
    fn test_draft_keeps_null_entries() {
        let draft: RuleDraft = serde_json::from_value(json!({
            "action": "IGNORE_ANOMALY",
            "conditions": [
                null,
                {"feature_name": "cpu", "threshold_type": "ACTUAL_IS_OVER_EXPECTED",
                 "operator": null, "value": null}
            ]
        }))
        .unwrap();

        let conditions = draft.conditions.unwrap();
        assert_eq!(conditions.len(), 2);
        assert!(conditions[0].is_none());
        let condition = conditions[1].as_ref().unwrap();
        assert_eq!(condition.feature_name.as_deref(), Some("cpu"));
        assert!(condition.operator.is_none());
        assert!(condition.value.is_none());
    }

    #[test]
    fn test_non_finite_values_written_as_strings() {
        let condition = |value| Condition {
            feature_name: "cpu".to_string(),
            threshold_type: None,
            operator: None,
            value: Some(value),
        };
        for (value, written) in [
            (f64::NAN, "NaN"),
            (f64::INFINITY, "Infinity"),
            (f64::NEG_INFINITY, "-Infinity"),
        ] {
            let json = serde_json::to_value(condition(value)).unwrap();
            assert_eq!(json["value"], json!(written));

            let draft: ConditionDraft = serde_json::from_value(json).unwrap();
            let read = draft.value.unwrap();
            assert!(read.is_nan() == value.is_nan() && (read.is_nan() || read == value));
        }

        let json = serde_json::to_value(condition(1.5)).unwrap();
        assert_eq!(json["value"], json!(1.5));
        let draft: ConditionDraft = serde_json::from_value(json!({"value": 2})).unwrap();
        assert_eq!(draft.value, Some(2.0));
    }

    #[test]
    fn test_unknown_value_string_rejected() {
        let result = serde_json::from_value::<ConditionDraft>(json!({"value": "lots"}));
        assert!(result.is_err());
    }
}

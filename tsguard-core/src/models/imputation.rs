//! Imputation of missing feature values.

use serde::{Deserialize, Serialize};

/// Strategy for filling in missing feature values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImputationMethod {
    /// Fill with zero
    Zero,
    /// Fill with a configured value per feature
    FixedValues,
    /// Repeat the previous value
    Previous,
    /// Interpolate linearly
    Linear,
}

impl ImputationMethod {
    /// Whether the method needs one fill value per enabled feature.
    pub fn requires_fill_values(&self) -> bool {
        matches!(self, ImputationMethod::FixedValues)
    }
}

/// Fill value for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFill {
    /// Feature to fill
    pub feature_name: String,
    /// Fill value
    pub data: f64,
}

/// Imputation settings of a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationOption {
    /// Fill strategy
    pub method: ImputationMethod,
    /// Per-feature fill values, required for fixed values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fill: Option<Vec<FeatureFill>>,
}

impl ImputationOption {
    /// Creates an option without fill values.
    pub fn new(method: ImputationMethod) -> Self {
        Self {
            method,
            default_fill: None,
        }
    }

    /// Builder method to set the fill values.
    pub fn with_default_fill(mut self, fill: Vec<FeatureFill>) -> Self {
        self.default_fill = Some(fill);
        self
    }

    /// Fill value configured for `feature_name`, if any.
    pub fn fill_for(&self, feature_name: &str) -> Option<f64> {
        self.default_fill
            .as_deref()?
            .iter()
            .find(|fill| fill.feature_name == feature_name)
            .map(|fill| fill.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fixed_values() {
        let option: ImputationOption = serde_json::from_value(json!({
            "method": "FIXED_VALUES",
            "default_fill": [{"feature_name": "cpu", "data": 3}]
        }))
        .unwrap();
        assert!(option.method.requires_fill_values());
        assert_eq!(option.fill_for("cpu"), Some(3.0));
        assert_eq!(option.fill_for("memory"), None);
    }

    #[test]
    fn test_only_fixed_values_need_fills() {
        assert!(!ImputationMethod::Zero.requires_fill_values());
        assert!(!ImputationMethod::Previous.requires_fill_values());
        assert!(!ImputationMethod::Linear.requires_fill_values());

        let option = ImputationOption::new(ImputationMethod::Zero);
        assert_eq!(
            serde_json::to_value(&option).unwrap(),
            json!({"method": "ZERO"})
        );
    }
}

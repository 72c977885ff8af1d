//! Data model of a time-series anomaly detector.
//!
//! The [`Config`] entity is immutable and always valid; partially specified
//! input lives in [`ConfigBuilder`] until it passes validation.

pub mod detector;
pub mod feature;
pub mod imputation;
pub mod interval;
pub mod query;
pub mod rule;

pub use detector::{Config, ConfigBuilder, ParseOptions, Period, PeriodDocument};
pub use feature::Feature;
pub use imputation::{FeatureFill, ImputationMethod, ImputationOption};
pub use interval::{IntervalTimeConfiguration, SUPPORTED_UNITS, TimeUnit};
pub use query::Query;
pub use rule::{
    Action, Condition, ConditionDraft, Operator, Rule, RuleDraft, ThresholdCategory,
    ThresholdType,
};

/// One concrete combination of category field values, keyed by field name.
pub type Entity = std::collections::BTreeMap<String, serde_json::Value>;

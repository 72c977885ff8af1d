//! Core library for tsguard.
//!
//! Validates and normalizes time-series anomaly detector configurations and
//! resolves the representative "top entity" of high-cardinality detectors.
//!
//! # Guarantees
//! - A [`Config`] value is always valid; validation stops at the first
//!   violated invariant and reports it with a typed issue
//! - Validation is synchronous and free of side effects
//! - The [`SearchBackend`] trait is the only I/O boundary
//! - Missing data is a successful, empty result and never an error

pub mod error;
pub mod logging;
pub mod models;
pub mod search;
pub mod settings;
pub mod validation;

// Re-export commonly used types
pub use error::{Result, TsGuardError, ValidationError, ValidationIssueType};
pub use models::{
    Action, Condition, Config, ConfigBuilder, Entity, Feature, ImputationMethod,
    ImputationOption, IntervalTimeConfiguration, Operator, ParseOptions, Query, Rule,
    ThresholdCategory, ThresholdType, TimeUnit,
};
pub use search::{
    SearchBackend, SearchRequest, SearchResponse, TimeRangeBounds, TopEntity, TopEntityResolver,
};
pub use settings::TimeSeriesSettings;
pub use validation::validate_draft;

//! Error types for detector validation and top-entity resolution.
//!
//! Validation failures are caller-input defects and carry a typed
//! [`ValidationIssueType`] next to a human-readable message. Failures coming
//! out of a search backend are carried through with their original source
//! attached so no diagnostic detail is lost.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a configuration validation failure.
///
/// Callers use the issue type to point at the offending part of a detector
/// configuration (the field to highlight, the section to reopen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssueType {
    /// Detector name is blank
    Name,
    /// Timestamp field is missing
    TimeField,
    /// Source index list is empty
    Indices,
    /// A feature is malformed or duplicated
    FeatureAttributes,
    /// Data filter is not a well-formed query
    FilterQuery,
    /// Detection interval is missing or not positive
    DetectionInterval,
    /// Window delay is missing or negative
    WindowDelay,
    /// Shingle size is outside the allowed range
    ShingleSize,
    /// Custom result index name or options are invalid
    ResultIndex,
    /// Recency emphasis is not an integer greater than 1
    RecencyEmphasis,
    /// Imputation option does not match the enabled features
    Imputation,
    /// A suppression rule is malformed
    Rule,
}

impl std::fmt::Display for ValidationIssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValidationIssueType::Name => "name",
            ValidationIssueType::TimeField => "time_field",
            ValidationIssueType::Indices => "indices",
            ValidationIssueType::FeatureAttributes => "feature_attributes",
            ValidationIssueType::FilterQuery => "filter_query",
            ValidationIssueType::DetectionInterval => "detection_interval",
            ValidationIssueType::WindowDelay => "window_delay",
            ValidationIssueType::ShingleSize => "shingle_size",
            ValidationIssueType::ResultIndex => "result_index",
            ValidationIssueType::RecencyEmphasis => "recency_emphasis",
            ValidationIssueType::Imputation => "imputation_option",
            ValidationIssueType::Rule => "rules",
        };
        write!(f, "{}", name)
    }
}

/// A single configuration validation failure.
///
/// Validation stops at the first violated invariant, so one error always
/// describes exactly one problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    issue_type: ValidationIssueType,
    message: String,
}

impl ValidationError {
    /// Creates a validation error of the given type.
    pub fn new(issue_type: ValidationIssueType, message: impl Into<String>) -> Self {
        Self {
            issue_type,
            message: message.into(),
        }
    }

    /// Returns the issue type of this failure.
    pub fn issue_type(&self) -> ValidationIssueType {
        self.issue_type
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for tsguard operations.
#[derive(Debug, Error)]
pub enum TsGuardError {
    /// Detector configuration violates an invariant
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Interval or window delay expressed in a unit outside the allow-list
    #[error("Time unit {unit} is not supported")]
    InvalidTimeUnit { unit: String },

    /// Search backend request failed (transport, timeout, permissions)
    #[error("Search request failed: {context}")]
    Search {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Backend returned a response that does not have the requested shape
    #[error("Unexpected search response: {context}")]
    UnexpectedResponse { context: String },

    /// Settings or logging setup is invalid
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with TsGuardError
pub type Result<T> = std::result::Result<T, TsGuardError>;

impl TsGuardError {
    /// Creates a validation error
    pub fn validation(issue_type: ValidationIssueType, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(issue_type, message))
    }

    /// Creates an unsupported time unit error
    pub fn invalid_time_unit(unit: impl std::fmt::Display) -> Self {
        Self::InvalidTimeUnit {
            unit: unit.to_string(),
        }
    }

    /// Wraps a backend failure, keeping the original error as the source
    pub fn search_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Search {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an unexpected response error
    pub fn unexpected_response(context: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            context: context.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Returns the validation failure, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error),
            _ => None,
        }
    }
}

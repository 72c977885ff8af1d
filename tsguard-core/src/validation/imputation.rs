//! Imputation option consistency with the feature list.

use crate::error::{TsGuardError, ValidationIssueType};
use crate::models::{Feature, ImputationOption};
use crate::Result;

/// Checks that fixed fill values cover exactly the enabled features.
///
/// Only methods that need fill values are checked, and only when at least
/// one feature is enabled.
///
/// # Errors
/// Returns `TsGuardError::Validation` with issue type `Imputation`.
pub fn validate_imputation_option(
    features: &[Feature],
    option: Option<&ImputationOption>,
) -> Result<()> {
    let Some(option) = option else {
        return Ok(());
    };
    if !option.method.requires_fill_values() {
        return Ok(());
    }

    let enabled: Vec<&Feature> = features.iter().filter(|f| f.is_enabled()).collect();
    if enabled.is_empty() {
        return Ok(());
    }

    let fills = match option.default_fill.as_deref() {
        Some(fills) if !fills.is_empty() => fills,
        _ => {
            return Err(TsGuardError::validation(
                ValidationIssueType::Imputation,
                "Enabled features are present, but no default fill values are provided.",
            ));
        }
    };

    if fills.len() != enabled.len() {
        return Err(TsGuardError::validation(
            ValidationIssueType::Imputation,
            format!(
                "Incorrect number of values to fill. Got: {}. Expected: {}.",
                fills.len(),
                enabled.len()
            ),
        ));
    }

    if let Some(missing) = enabled
        .iter()
        .find(|feature| option.fill_for(feature.name()).is_none())
    {
        return Err(TsGuardError::validation(
            ValidationIssueType::Imputation,
            format!("Missing feature name: {}.", missing.name()),
        ));
    }

    Ok(())
}

//! Custom result index naming rules.

use crate::settings::TimeSeriesSettings;
use regex::Regex;
use std::sync::OnceLock;

/// Characters allowed in a custom result index name.
static VALID_INDEX_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn has_only_valid_characters(name: &str) -> bool {
    VALID_INDEX_NAME
        .get_or_init(|| Regex::new("^[a-z0-9_-]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

/// Checks a custom result index name or alias.
///
/// # Returns
/// The error message for the first violated rule, or `None` when the name
/// is acceptable. Rules are checked in order: prefix, length, characters.
pub fn validate_custom_result_index(
    name: &str,
    settings: &TimeSeriesSettings,
) -> Option<String> {
    let prefix = &settings.custom_result_index_prefix;
    if !name.starts_with(prefix.as_str()) {
        return Some(format!("Result index must start with {}", prefix));
    }
    let max_size = settings.max_result_index_name_size;
    if name.chars().count() > max_size {
        return Some(format!(
            "Result index name size must contains less than {} characters",
            max_size
        ));
    }
    if !has_only_valid_characters(name) {
        return Some(
            "Result index name has invalid character. Valid characters are a-z, 0-9, -(hyphen) and _(underscore)"
                .to_string(),
        );
    }
    None
}

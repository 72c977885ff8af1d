//! Detector features: named, independently enableable aggregations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One feature of a detector.
///
/// The aggregation query is kept as raw JSON because it is executed by the
/// search backend, not here. Only its shape is checked (see
/// [`Feature::check_aggregation`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "feature_id", default = "generate_feature_id")]
    id: String,
    #[serde(rename = "feature_name")]
    name: String,
    #[serde(rename = "feature_enabled")]
    enabled: bool,
    aggregation_query: Value,
}

/// Random identifier for features that arrive without one.
fn generate_feature_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl Feature {
    /// Creates a feature, generating an id when `id` is `None`.
    pub fn new(
        id: Option<String>,
        name: impl Into<String>,
        enabled: bool,
        aggregation_query: Value,
    ) -> Self {
        Self {
            id: id.unwrap_or_else(generate_feature_id),
            name: name.into(),
            enabled,
            aggregation_query,
        }
    }

    /// Returns the feature id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the feature name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the feature takes part in detection.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the raw aggregation query.
    pub fn aggregation_query(&self) -> &Value {
        &self.aggregation_query
    }

    /// Name of the aggregation inside the query, if the query is well formed.
    pub fn aggregation_name(&self) -> Option<&str> {
        single_entry(self.aggregation_query.as_object()).map(|(name, _)| name.as_str())
    }

    /// Checks the aggregation query shape.
    ///
    /// A well-formed query is `{"<name>": {"<agg type>": {...}}}`: exactly one
    /// named aggregation holding exactly one aggregation type whose body is an
    /// object.
    ///
    /// # Errors
    /// Returns a description of the first shape problem found.
    pub fn check_aggregation(&self) -> std::result::Result<(), String> {
        let Some((_, body)) = single_entry(self.aggregation_query.as_object()) else {
            return Err("expected exactly one named aggregation".to_string());
        };
        let Some((agg_type, agg_body)) = single_entry(body.as_object()) else {
            return Err("expected exactly one aggregation type".to_string());
        };
        if !agg_body.is_object() {
            return Err(format!("aggregation \"{}\" must be an object", agg_type));
        }
        Ok(())
    }
}

/// Returns the only entry of `map`, or `None` when it has zero or several.
pub(crate) fn single_entry(map: Option<&Map<String, Value>>) -> Option<(&String, &Value)> {
    let map = map?;
    if map.len() != 1 {
        return None;
    }
    map.iter().next()
}

//! Filter queries in the search backend's query DSL.

use super::feature::single_entry;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A query DSL fragment, kept as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(Value);

impl Default for Query {
    fn default() -> Self {
        Self::match_all()
    }
}

impl Query {
    /// `{"match_all": {}}`
    pub fn match_all() -> Self {
        Self(json!({"match_all": {}}))
    }

    /// Normalizes an optional filter: absent, null or `{}` become match-all.
    pub fn from_filter(filter: Option<Value>) -> Self {
        match filter {
            None | Some(Value::Null) => Self::match_all(),
            Some(Value::Object(map)) if map.is_empty() => Self::match_all(),
            Some(value) => Self(value),
        }
    }

    /// Range query `from <= field <= to`, both bounds in epoch millis.
    pub fn range(field: &str, from_ms: i64, to_ms: i64) -> Self {
        Self(json!({
            "range": {
                field: {
                    "gte": from_ms,
                    "lte": to_ms,
                    "format": "epoch_millis"
                }
            }
        }))
    }

    /// Exact term match on `field`.
    pub fn term(field: &str, value: Value) -> Self {
        Self(json!({"term": {field: {"value": value}}}))
    }

    /// Bool query whose filter clause holds every query in `filters`.
    pub fn bool_filter(filters: Vec<Query>) -> Self {
        let clauses: Vec<Value> = filters.into_iter().map(Query::into_value).collect();
        Self(json!({"bool": {"filter": clauses}}))
    }

    /// Whether this query is a plain match-all.
    pub fn is_match_all(&self) -> bool {
        single_entry(self.0.as_object()).is_some_and(|(kind, _)| kind == "match_all")
    }

    /// Checks that the query is an object with exactly one query type whose
    /// body is an object. Query type names are left to the backend's parser.
    ///
    /// # Errors
    /// Returns a description of the shape problem.
    pub fn check(&self) -> std::result::Result<(), String> {
        let Some((kind, body)) = single_entry(self.0.as_object()) else {
            return Err("expected exactly one query type".to_string());
        };
        if !body.is_object() {
            return Err(format!("[{}] query malformed, expected an object", kind));
        }
        Ok(())
    }

    /// Returns the JSON form.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the query, returning the JSON form.
    pub fn into_value(self) -> Value {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters_become_match_all() {
        assert!(Query::from_filter(None).is_match_all());
        assert!(Query::from_filter(Some(Value::Null)).is_match_all());
        assert!(Query::from_filter(Some(json!({}))).is_match_all());
        assert_eq!(Query::default().as_value(), &json!({"match_all": {}}));
    }

    #[test]
    fn test_filter_shape_check() {
        assert!(Query::from_filter(Some(json!({"term": {"host": "a"}}))).check().is_ok());
        assert!(Query::match_all().check().is_ok());

        let err = Query::from_filter(Some(json!({"aa": "bb"}))).check().unwrap_err();
        assert!(err.contains("aa"));

        assert!(Query::from_filter(Some(json!({"term": "x"}))).check().is_err());
        assert!(Query::from_filter(Some(json!([1, 2]))).check().is_err());
        assert!(
            Query::from_filter(Some(json!({"term": {}, "range": {}})))
                .check()
                .is_err()
        );
    }

    #[test]
    fn test_compound_and_specialized_filters_accepted() {
        let filters = [
            json!({"constant_score": {"filter": {"term": {"a": "b"}}}}),
            json!({"dis_max": {"queries": [{"term": {"a": "b"}}, {"term": {"c": "d"}}]}}),
            json!({"script": {"script": {"source": "doc['cpu'].value > 1"}}}),
            json!({"function_score": {"query": {"match_all": {}}}}),
            json!({"geo_distance": {"distance": "10km", "location": [1.0, 2.0]}}),
        ];
        for filter in filters {
            assert!(Query::from_filter(Some(filter.clone())).check().is_ok(), "{filter}");
        }
    }

    #[test]
    fn test_bool_filter_combines_clauses() {
        let query = Query::bool_filter(vec![
            Query::match_all(),
            Query::range("timestamp", 10, 20),
            Query::term("host", json!("server_1")),
        ]);
        assert_eq!(
            query.as_value(),
            &json!({"bool": {"filter": [
                {"match_all": {}},
                {"range": {"timestamp": {"gte": 10, "lte": 20, "format": "epoch_millis"}}},
                {"term": {"host": {"value": "server_1"}}}
            ]}})
        );
        assert!(!query.is_match_all());
    }
}

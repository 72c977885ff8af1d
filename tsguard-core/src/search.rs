//! Search backend boundary and top-entity resolution.
//!
//! The core never talks to a cluster itself. Every query goes through a
//! [`SearchBackend`], which receives a fully described [`SearchRequest`] and
//! answers with a [`SearchResponse`] decoded from the backend's JSON.
//! Transport, authentication and retries belong to the backend.

pub mod bounds;
pub mod resolver;

pub use bounds::{TimeRangeBounds, time_range_bounds};
pub use resolver::{TOP_AGGREGATION_NAME, TopEntity, TopEntityResolver};

use crate::models::Query;
use crate::{Result, error::TsGuardError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Executes search requests against the indexed data.
///
/// Implementations report transport, timeout and permission failures as
/// `TsGuardError::Search`; the resolver passes them through unchanged.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Runs one search request.
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse>;
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Bucketing aggregation attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationRequest {
    /// Terms aggregation on one field, buckets ordered by document count
    Terms { field: String, count_order: SortOrder },
    /// Composite aggregation over several fields, truncated to the `top`
    /// buckets with the highest document count
    Composite {
        fields: Vec<String>,
        size: u32,
        top: u32,
    },
}

impl AggregationRequest {
    fn source(&self) -> Value {
        match self {
            AggregationRequest::Terms { field, count_order } => json!({
                "terms": {
                    "field": field,
                    "order": {"_count": count_order.as_str()}
                }
            }),
            AggregationRequest::Composite { fields, size, top } => {
                let sources: Vec<Value> = fields
                    .iter()
                    .map(|field| json!({field.as_str(): {"terms": {"field": field}}}))
                    .collect();
                json!({
                    "composite": {"sources": sources, "size": size},
                    "aggs": {
                        "bucket_sort": {
                            "bucket_sort": {
                                "sort": [{"_count": {"order": "desc"}}],
                                "size": top
                            }
                        }
                    }
                })
            }
        }
    }
}

/// A search request, independent of any client library.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Indices or patterns to search
    pub indices: Vec<String>,
    /// Query selecting the documents
    pub query: Query,
    /// Field to sort hits on, with direction
    pub sort: Option<(String, SortOrder)>,
    /// Number of hits to return
    pub size: u32,
    /// Named aggregation to compute
    pub aggregation: Option<(String, AggregationRequest)>,
    /// Whether the backend should count all matching hits
    pub track_total_hits: bool,
    /// Caller-supplied timeout the backend should apply
    pub timeout: Duration,
}

impl SearchRequest {
    /// Creates a request returning no hits and no aggregations.
    pub fn new(indices: Vec<String>, query: Query, timeout: Duration) -> Self {
        Self {
            indices,
            query,
            sort: None,
            size: 0,
            aggregation: None,
            track_total_hits: false,
            timeout,
        }
    }

    /// Builder method to set the sort field and direction.
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    /// Builder method to set the number of hits.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Builder method to set the named aggregation.
    pub fn with_aggregation(mut self, name: impl Into<String>, aggregation: AggregationRequest) -> Self {
        self.aggregation = Some((name.into(), aggregation));
        self
    }

    /// Renders the request body in the query DSL.
    pub fn source(&self) -> Value {
        let mut body = Map::new();
        body.insert("query".to_string(), self.query.as_value().clone());
        body.insert("size".to_string(), json!(self.size));
        body.insert("track_total_hits".to_string(), json!(self.track_total_hits));
        body.insert(
            "timeout".to_string(),
            json!(format!("{}ms", self.timeout.as_millis())),
        );
        if let Some((field, order)) = &self.sort {
            body.insert(
                "sort".to_string(),
                json!([{field.as_str(): {"order": order.as_str()}}]),
            );
        }
        if let Some((name, aggregation)) = &self.aggregation {
            body.insert("aggs".to_string(), json!({name.as_str(): aggregation.source()}));
        }
        Value::Object(body)
    }
}

/// One search hit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchHit {
    /// Sort values of the hit, in request sort order
    #[serde(default)]
    pub sort: Vec<Value>,
    /// Source document
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
}

/// Hits section of a response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchHits {
    /// Returned hits
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// Bucket of a terms aggregation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TermsBucket {
    /// Raw bucket key
    pub key: Value,
    /// Backend rendering of the key, for non-string fields
    #[serde(default)]
    pub key_as_string: Option<String>,
    /// Number of documents in the bucket
    pub doc_count: u64,
}

impl TermsBucket {
    /// The bucket key as a string, preferring the backend's own rendering.
    /// Numeric and boolean keys without one are rendered as JSON text; a
    /// null key stays null.
    pub fn entity_value(&self) -> Value {
        match (&self.key_as_string, &self.key) {
            (Some(key), _) => Value::String(key.clone()),
            (None, Value::Null) => Value::Null,
            (None, Value::String(key)) => Value::String(key.clone()),
            (None, key) => Value::String(key.to_string()),
        }
    }
}

/// Bucket of a composite aggregation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompositeBucket {
    /// Field name to value, one entry per source field
    pub key: Map<String, Value>,
    /// Number of documents in the bucket
    pub doc_count: u64,
}

#[derive(Deserialize)]
struct Buckets<B> {
    buckets: Vec<B>,
}

/// A search response as decoded from the backend's JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    /// Hits section
    #[serde(default)]
    pub hits: SearchHits,
    /// Aggregation results by name
    #[serde(default)]
    pub aggregations: Option<Map<String, Value>>,
}

impl SearchResponse {
    /// Decodes a response body.
    ///
    /// # Errors
    /// Returns `TsGuardError::Serialization` when the body is not a search
    /// response.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TsGuardError::serialization("Failed to parse search response", e))
    }

    /// Raw aggregation result named `name`, if present.
    pub fn aggregation(&self, name: &str) -> Option<&Value> {
        self.aggregations.as_ref()?.get(name)
    }

    /// Buckets of the terms aggregation `name`.
    ///
    /// # Returns
    /// `None` when the response has no aggregations or none named `name`.
    ///
    /// # Errors
    /// Returns `TsGuardError::UnexpectedResponse` when the aggregation is not
    /// a terms aggregation.
    pub fn terms_buckets(&self, name: &str) -> Result<Option<Vec<TermsBucket>>> {
        let buckets: Option<Vec<TermsBucket>> = self.decode_buckets(name, "terms")?;
        if let Some(bucket) = buckets.iter().flatten().find(|b| b.key.is_object()) {
            return Err(TsGuardError::unexpected_response(format!(
                "aggregation {} is not a terms aggregation, got key {}",
                name, bucket.key
            )));
        }
        Ok(buckets)
    }

    /// Buckets of the composite aggregation `name`.
    ///
    /// # Returns
    /// `None` when the response has no aggregations or none named `name`.
    ///
    /// # Errors
    /// Returns `TsGuardError::UnexpectedResponse` when the aggregation is not
    /// a composite aggregation.
    pub fn composite_buckets(&self, name: &str) -> Result<Option<Vec<CompositeBucket>>> {
        self.decode_buckets(name, "composite")
    }

    fn decode_buckets<B: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        kind: &str,
    ) -> Result<Option<Vec<B>>> {
        let Some(raw) = self.aggregation(name) else {
            return Ok(None);
        };
        let decoded: Buckets<B> = serde_json::from_value(raw.clone()).map_err(|e| {
            TsGuardError::unexpected_response(format!(
                "aggregation {} is not a {} aggregation: {}",
                name, kind, e
            ))
        })?;
        Ok(Some(decoded.buckets))
    }
}

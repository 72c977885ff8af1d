//! Top-entity resolution for high-cardinality detectors.
//!
//! A high-cardinality detector splits its data by category fields into many
//! entities. Previews and validations that need a single concrete time
//! series use the entity with the most documents in a recent window.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tsguard_core::models::Config;
//! use tsguard_core::search::{SearchBackend, TopEntityResolver};
//!
//! # async fn example(config: Config, backend: Arc<dyn SearchBackend>) -> tsguard_core::Result<()> {
//! let resolver = TopEntityResolver::new(config, backend);
//! let top = resolver.check_if_hc().await?;
//! if let Some(latest) = top.latest_time_ms {
//!     println!("latest data at {latest}, entity {:?}", top.attributes);
//! }
//! # Ok(())
//! # }
//! ```

use super::{
    AggregationRequest, SearchBackend, SearchRequest, SearchResponse, SortOrder, time_range_bounds,
};
use crate::Result;
use crate::models::{Config, Entity, IntervalTimeConfiguration, Query};
use crate::settings::TimeSeriesSettings;
use chrono::DateTime;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the bucketing aggregation in top-entity requests.
pub const TOP_AGGREGATION_NAME: &str = "top_agg";

/// Result of a resolution: the latest data time and, for high-cardinality
/// detectors, the winning entity.
///
/// "No data" is `latest_time_ms == None` with empty attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopEntity {
    /// Latest data time in epoch millis
    pub latest_time_ms: Option<i64>,
    /// Category field values of the top entity
    pub attributes: Entity,
}

impl TopEntity {
    /// The "no data" result.
    pub fn none() -> Self {
        Self::default()
    }

    fn at(latest_time_ms: i64, attributes: Entity) -> Self {
        Self {
            latest_time_ms: Some(latest_time_ms),
            attributes,
        }
    }

    /// Whether no data was found.
    pub fn is_none(&self) -> bool {
        self.latest_time_ms.is_none() && self.attributes.is_empty()
    }
}

/// Finds the latest data time and top entity of one detector.
///
/// The resolver only holds immutable state and can be shared across tasks;
/// every call builds its own result.
pub struct TopEntityResolver {
    config: Arc<Config>,
    backend: Arc<dyn SearchBackend>,
    settings: TimeSeriesSettings,
    request_timeout: Duration,
}

impl TopEntityResolver {
    /// Creates a resolver with default settings.
    pub fn new(config: impl Into<Arc<Config>>, backend: Arc<dyn SearchBackend>) -> Self {
        let settings = TimeSeriesSettings::default();
        Self {
            config: config.into(),
            backend,
            request_timeout: settings.request_timeout(),
            settings,
        }
    }

    /// Builder method to use explicit settings. Also resets the request
    /// timeout to the one in `settings`.
    pub fn with_settings(mut self, settings: TimeSeriesSettings) -> Self {
        self.request_timeout = settings.request_timeout();
        self.settings = settings;
        self
    }

    /// Builder method to set the timeout passed with every request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Returns the detector configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Finds the latest data time in the source indices, optionally
    /// restricted to one entity.
    ///
    /// The detector filter is not applied: the result is the time of the
    /// most recent document in the indices (or of the entity).
    ///
    /// # Returns
    /// Epoch millis of the most recent document, or `None` when no document
    /// matches.
    ///
    /// # Errors
    /// Backend failures are returned unchanged.
    pub async fn latest_data_time(&self, entity: Option<&Entity>) -> Result<Option<i64>> {
        let filters: Vec<Query> = entity
            .into_iter()
            .flatten()
            .map(|(field, value)| Query::term(field, value.clone()))
            .collect();
        let query = if filters.is_empty() {
            Query::match_all()
        } else {
            Query::bool_filter(filters)
        };

        let time_field = self.config.time_field();
        let request = SearchRequest::new(self.config.indices().to_vec(), query, self.request_timeout)
        .with_sort(time_field, SortOrder::Desc)
        .with_size(1);

        debug!(detector = self.config.name(), "Querying latest data time");
        let response = self.backend.search(request).await?;
        Ok(extract_latest_time(&response, time_field))
    }

    /// Resolves the latest data time and, for high-cardinality detectors,
    /// the top entity at that time.
    ///
    /// # Errors
    /// Backend failures and malformed aggregation results are returned;
    /// missing data is not an error.
    pub async fn check_if_hc(&self) -> Result<TopEntity> {
        let Some(latest) = self.latest_data_time(None).await? else {
            debug!(detector = self.config.name(), "No data found");
            return Ok(TopEntity::none());
        };
        if !self.config.is_high_cardinality() {
            return Ok(TopEntity::at(latest, Entity::new()));
        }
        self.top_entity(latest).await
    }

    /// Finds the entity with the most documents in the lookback window
    /// ending at `latest_ms`.
    ///
    /// The window is `max(max_interval_rec_length_minutes, detector
    /// interval)` minutes long. Ties go to the first bucket of maximal
    /// count in the order the backend returned them.
    pub async fn top_entity(&self, latest_ms: i64) -> Result<TopEntity> {
        let category_fields = self.config.category_fields();
        if category_fields.is_empty() {
            return Ok(TopEntity::at(latest_ms, Entity::new()));
        }

        let lookback = IntervalTimeConfiguration::minutes(
            self.settings
                .max_interval_rec_length_minutes
                .max(self.config.interval_in_minutes()),
        );
        let bounds = time_range_bounds(&lookback, latest_ms);
        let query = Query::bool_filter(vec![
            Query::range(self.config.time_field(), bounds.min, bounds.max),
            self.config.filter_query().clone(),
        ]);

        let aggregation = match category_fields {
            [field] => AggregationRequest::Terms {
                field: field.clone(),
                count_order: SortOrder::Asc,
            },
            fields => AggregationRequest::Composite {
                fields: fields.to_vec(),
                size: self.settings.composite_page_size,
                top: 1,
            },
        };
        let request = SearchRequest::new(self.config.indices().to_vec(), query, self.request_timeout)
            .with_aggregation(TOP_AGGREGATION_NAME, aggregation);

        debug!(
            detector = self.config.name(),
            from = bounds.min,
            to = bounds.max,
            fields = ?category_fields,
            "Querying top entity"
        );
        let response = self.backend.search(request).await?;

        let attributes = match category_fields {
            [field] => single_field_entity(&response, field)?,
            fields => multi_field_entity(&response, fields)?,
        };
        Ok(match attributes {
            Some(attributes) => TopEntity::at(latest_ms, attributes),
            None => TopEntity::none(),
        })
    }
}

/// Returns the first element with the maximal `count`, unlike
/// `Iterator::max_by_key` which keeps the last.
fn first_max_by_count<T>(items: &[T], count: impl Fn(&T) -> u64) -> Option<&T> {
    items.iter().fold(None, |best, item| match best {
        Some(best) if count(best) >= count(item) => Some(best),
        _ => Some(item),
    })
}

fn single_field_entity(response: &SearchResponse, field: &str) -> Result<Option<Entity>> {
    let Some(buckets) = response.terms_buckets(TOP_AGGREGATION_NAME)? else {
        warn!("Empty aggregation in top entity response");
        return Ok(None);
    };
    let Some(top) = first_max_by_count(&buckets, |b| b.doc_count) else {
        return Ok(None);
    };
    let value = top.entity_value();
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(Entity::from([(field.to_string(), value)])))
}

fn multi_field_entity(response: &SearchResponse, fields: &[String]) -> Result<Option<Entity>> {
    let Some(buckets) = response.composite_buckets(TOP_AGGREGATION_NAME)? else {
        warn!("Empty aggregation in top entity response");
        return Ok(None);
    };
    let Some(top) = first_max_by_count(&buckets, |b| b.doc_count) else {
        return Ok(None);
    };
    // A partial key cannot identify a single time series.
    Ok(fields
        .iter()
        .map(|field| {
            top.key
                .get(field)
                .filter(|value| !value.is_null())
                .map(|value| (field.clone(), value.clone()))
        })
        .collect())
}

/// Latest time of the first hit: its first sort value, else its source
/// time field as epoch millis or an RFC 3339 string.
fn extract_latest_time(response: &SearchResponse, time_field: &str) -> Option<i64> {
    let hit = response.hits.hits.first()?;
    if let Some(millis) = hit.sort.first().and_then(Value::as_i64) {
        return Some(millis);
    }
    let latest = hit
        .source
        .as_ref()
        .and_then(|source| source.get(time_field))
        .and_then(|value| match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse::<i64>().ok().or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|t| t.timestamp_millis())
            }),
            _ => None,
        });
    if latest.is_none() {
        warn!(time_field, "Latest hit has no usable time value");
    }
    latest
}

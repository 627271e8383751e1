//! Metric points and the series grouper

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single field value of a metric point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(value) => write!(f, "{value}"),
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value}"),
            FieldValue::Boolean(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// Output unit handed to the accumulator
///
/// Tags and fields are kept in ordered maps so that two points built from the
/// same input compare and serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Series name (the alarm name)
    pub name: String,

    /// Tag set, keys unique
    pub tags: BTreeMap<String, String>,

    /// Field set
    pub fields: BTreeMap<String, FieldValue>,

    /// Time of the observation (the alarm's last state change)
    pub timestamp: DateTime<Utc>,
}

impl MetricPoint {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

type SeriesKey = (String, BTreeMap<String, String>, DateTime<Utc>);

/// Coalesces fields that belong to the same series, tag set and timestamp
///
/// Adding a field for a key that already exists merges it into the existing
/// point; a repeated field name overwrites the earlier value and `add`
/// returns `true`.
#[derive(Debug, Default)]
pub struct SeriesGrouper {
    series: BTreeMap<SeriesKey, BTreeMap<String, FieldValue>>,
}

impl SeriesGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        name: impl Into<String>,
        tags: BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> bool {
        self.series
            .entry((name.into(), tags, timestamp))
            .or_default()
            .insert(field.into(), value.into())
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Drain the grouper into points, ordered by (name, tags, timestamp)
    pub fn into_metrics(self) -> Vec<MetricPoint> {
        self.series
            .into_iter()
            .map(|((name, tags, timestamp), fields)| MetricPoint {
                name,
                tags,
                fields,
                timestamp,
            })
            .collect()
    }
}

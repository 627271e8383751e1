//! CloudWatch `DescribeAlarms` boundary
//!
//! The connector talks to CloudWatch through the [`AlarmsClient`] trait so
//! the fetch loop can be driven by a mock in tests. [`client::HttpCloudWatchClient`]
//! is the real implementation speaking the JSON 1.0 protocol.
//!
//! Every field of [`MetricAlarm`] is optional on the wire; validation into a
//! complete record happens in the aggregator.

pub mod client;
pub mod sigv4;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CloudWatchError;

pub use client::HttpCloudWatchClient;

/// Request descriptor for one `DescribeAlarms` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeAlarmsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_value: Option<String>,

    /// Continuation cursor from the previous page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// One page of `DescribeAlarms` results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeAlarmsOutput {
    #[serde(default)]
    pub metric_alarms: Vec<MetricAlarm>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: Option<String>,
    pub value: Option<String>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }
}

/// Alarm snapshot as returned by CloudWatch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricAlarm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm_arn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,

    #[serde(default)]
    pub dimensions: Vec<Dimension>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_value: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub state_updated_timestamp: Option<DateTime<Utc>>,
}

/// Access to the alarm-state API
#[async_trait]
pub trait AlarmsClient: Send + Sync {
    async fn describe_alarms(
        &self,
        input: &DescribeAlarmsInput,
    ) -> Result<DescribeAlarmsOutput, CloudWatchError>;
}

/// JSON protocol timestamps are epoch seconds; RFC 3339 strings are accepted too.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TimestampInput {
        Seconds(f64),
        Text(String),
    }

    let Some(input) = Option::<TimestampInput>::deserialize(deserializer)? else {
        return Ok(None);
    };

    match input {
        TimestampInput::Seconds(seconds) => {
            let whole = seconds.floor();
            let nanos = ((seconds - whole) * 1_000_000_000.0).round() as u32;
            Utc.timestamp_opt(whole as i64, nanos.min(999_999_999))
                .single()
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {seconds}")))
        }
        TimestampInput::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

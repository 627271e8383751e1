//! Alarm → metric point translation
//!
//! Every alarm becomes one point:
//!
//! ```text
//! series:    AlarmName
//! tags:      region, alarmArn, metricName, namespace, <dimension name>...
//! fields:    State = StateValue
//! timestamp: StateUpdatedTimestamp
//! ```
//!
//! Dimensions are applied after the fixed tags, so a dimension named like a
//! fixed tag overwrites it.
//!
//! Grouping happens after the tag filter. Two alarms with the same name and
//! timestamp whose tags only differ in filtered-out names end up as one
//! point carrying the later alarm's state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::accumulator::Accumulator;
use crate::cloudwatch::MetricAlarm;
use crate::error::AlarmsError;
use crate::filter::TagFilter;
use crate::metric::SeriesGrouper;

pub const TAG_REGION: &str = "region";
pub const TAG_ALARM_ARN: &str = "alarmArn";
pub const TAG_METRIC_NAME: &str = "metricName";
pub const TAG_NAMESPACE: &str = "namespace";

pub const FIELD_STATE: &str = "State";

/// An alarm with every field the translation needs
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRecord {
    pub name: String,
    pub arn: String,
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<(String, String)>,
    pub state_value: String,
    pub state_updated: DateTime<Utc>,
}

impl TryFrom<MetricAlarm> for AlarmRecord {
    type Error = AlarmsError;

    fn try_from(alarm: MetricAlarm) -> Result<Self, Self::Error> {
        let label = alarm
            .alarm_name
            .clone()
            .or_else(|| alarm.alarm_arn.clone())
            .unwrap_or_else(|| "<unnamed>".to_string());
        let missing = |field: &'static str| AlarmsError::MalformedRecord {
            alarm: label.clone(),
            field,
        };

        let dimensions = alarm
            .dimensions
            .into_iter()
            .map(|dimension| match (dimension.name, dimension.value) {
                (Some(name), Some(value)) => Ok((name, value)),
                (None, _) => Err(missing("Dimensions.Name")),
                (Some(_), None) => Err(missing("Dimensions.Value")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: alarm.alarm_name.ok_or_else(|| missing("AlarmName"))?,
            arn: alarm.alarm_arn.ok_or_else(|| missing("AlarmArn"))?,
            namespace: alarm.namespace.ok_or_else(|| missing("Namespace"))?,
            metric_name: alarm.metric_name.ok_or_else(|| missing("MetricName"))?,
            dimensions,
            state_value: alarm.state_value.ok_or_else(|| missing("StateValue"))?,
            state_updated: alarm
                .state_updated_timestamp
                .ok_or_else(|| missing("StateUpdatedTimestamp"))?,
        })
    }
}

impl AlarmRecord {
    /// Fixed tags followed by one tag per dimension
    pub fn tags(&self, region: &str) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::from([
            (TAG_REGION.to_string(), region.to_string()),
            (TAG_ALARM_ARN.to_string(), self.arn.clone()),
            (TAG_METRIC_NAME.to_string(), self.metric_name.clone()),
            (TAG_NAMESPACE.to_string(), self.namespace.clone()),
        ]);

        for (name, value) in &self.dimensions {
            tags.insert(name.clone(), value.clone());
        }

        tags
    }
}

/// Turns a fetched batch into points on an accumulator
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    region: &'a str,
    filter: &'a TagFilter,
}

impl<'a> Aggregator<'a> {
    pub fn new(region: &'a str, filter: &'a TagFilter) -> Self {
        Self { region, filter }
    }

    /// Translate, group and emit. Returns the number of points emitted.
    ///
    /// Malformed alarms are skipped and reported through `acc`; the rest of
    /// the batch is still emitted.
    #[instrument(skip_all, fields(region = %self.region, alarms = alarms.len()))]
    pub fn aggregate_alarms(&self, acc: &dyn Accumulator, alarms: Vec<MetricAlarm>) -> usize {
        let mut grouper = SeriesGrouper::new();

        for alarm in alarms {
            let record = match AlarmRecord::try_from(alarm) {
                Ok(record) => record,
                Err(e) => {
                    warn!("skipping alarm: {e}");
                    acc.add_error(e);
                    continue;
                }
            };

            let mut tags = record.tags(self.region);
            self.filter.apply(&mut tags);

            let replaced = grouper.add(
                record.name.as_str(),
                tags,
                record.state_updated,
                FIELD_STATE,
                record.state_value,
            );
            if replaced {
                warn!(
                    "alarm {} ({}) shares series, filtered tags and timestamp with an earlier alarm; keeping its state",
                    record.name, record.arn
                );
            }
        }

        let metrics = grouper.into_metrics();
        let emitted = metrics.len();
        for metric in metrics {
            acc.add_metric(metric);
        }

        debug!("emitted {emitted} alarm metrics");
        emitted
    }
}

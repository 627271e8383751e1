//! Paginated alarm fetch
//!
//! ```text
//! request(StateValue) → page 1 ─ NextToken? ─ yes → request(StateValue, NextToken) → page 2 ...
//!                                            └ no  → all pages concatenated
//! ```
//!
//! Any failing page aborts the whole fetch; no partial batch is returned and
//! nothing is retried. The next poll cycle is an independent attempt.

use std::sync::Arc;

use tracing::{debug, error, instrument, trace};

use crate::cloudwatch::{AlarmsClient, DescribeAlarmsInput, MetricAlarm};
use crate::error::AlarmsResult;

/// State harvested when none is configured
pub const DEFAULT_STATE_VALUE: &str = "ALARM";

/// Build the first-page request for a state filter
pub fn alarm_filter(state_value: &str) -> DescribeAlarmsInput {
    let state_value = if state_value.is_empty() {
        DEFAULT_STATE_VALUE
    } else {
        state_value
    };

    DescribeAlarmsInput {
        state_value: Some(state_value.to_string()),
        ..Default::default()
    }
}

#[derive(Clone)]
pub struct AlarmFetcher {
    client: Arc<dyn AlarmsClient>,
}

impl AlarmFetcher {
    pub fn new(client: Arc<dyn AlarmsClient>) -> Self {
        Self { client }
    }

    /// Request every page until the continuation cursor is absent
    #[instrument(skip_all, fields(state = ?params.state_value))]
    pub async fn describe_alarms(
        &self,
        mut params: DescribeAlarmsInput,
    ) -> AlarmsResult<Vec<MetricAlarm>> {
        let mut results = Vec::new();
        let mut pages = 0usize;

        loop {
            let response = match self.client.describe_alarms(&params).await {
                Ok(response) => response,
                Err(e) => {
                    error!("failed to get Alarm data on page {}: {e}", pages + 1);
                    return Err(e.into());
                }
            };

            pages += 1;
            trace!("page {pages}: {} alarms", response.metric_alarms.len());
            results.extend(response.metric_alarms);

            match response.next_token {
                Some(token) => params.next_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} alarms in {pages} pages", results.len());
        Ok(results)
    }
}

//! The alarm connector: one `gather` call per poll cycle
//!
//! ```text
//! Idle ──gather()──▶ Fetching ──ok──▶ Aggregating ──▶ Idle
//!                        └──err── report error ──────▶ Idle
//! ```
//!
//! A failed fetch is reported through the accumulator and the cycle emits
//! nothing. No error state is carried into the next cycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, instrument, trace};

use crate::accumulator::Accumulator;
use crate::aggregator::Aggregator;
use crate::cloudwatch::{AlarmsClient, HttpCloudWatchClient};
use crate::config::AlarmsConfig;
use crate::credentials;
use crate::error::{AlarmsError, AlarmsResult};
use crate::fetcher::{AlarmFetcher, alarm_filter};
use crate::filter::TagFilter;
use crate::metric::MetricPoint;

/// Where a poll cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleState {
    Idle,
    Fetching,
    Aggregating,
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Points handed to the accumulator
    pub points: usize,

    /// Errors reported to the accumulator
    pub errors: usize,
}

pub struct AlarmsInput {
    region: String,
    state_value: String,
    ratelimit: u32,
    filter: Arc<TagFilter>,
    fetcher: AlarmFetcher,
    state: watch::Sender<CycleState>,
}

impl std::fmt::Debug for AlarmsInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmsInput")
            .field("region", &self.region)
            .field("state_value", &self.state_value)
            .field("ratelimit", &self.ratelimit)
            .field("filter", &self.filter)
            .field("state", &self.cycle_state())
            .finish_non_exhaustive()
    }
}

impl AlarmsInput {
    /// Build the connector around an existing client
    ///
    /// The tag filter is compiled here, once; an invalid pattern fails
    /// construction and no cycle ever runs.
    pub fn new(config: &AlarmsConfig, client: Arc<dyn AlarmsClient>) -> AlarmsResult<Self> {
        if config.region.is_empty() {
            return Err(AlarmsError::Config("region must be set".to_string()));
        }

        let filter = TagFilter::new(&config.tags_include, &config.tags_exclude)?;
        let (state, _) = watch::channel(CycleState::Idle);

        Ok(Self {
            region: config.region.clone(),
            state_value: config.state_value.clone(),
            ratelimit: config.ratelimit,
            filter: Arc::new(filter),
            fetcher: AlarmFetcher::new(client),
            state,
        })
    }

    /// Build the connector with credentials resolved and a real HTTP client
    pub fn from_config(config: &AlarmsConfig) -> AlarmsResult<Self> {
        let credentials = credentials::resolve(&config.credentials)?;
        let client = HttpCloudWatchClient::new(
            &config.region,
            config.endpoint_url.as_deref(),
            credentials,
        )
        .map_err(AlarmsError::Client)?;

        Self::new(config, Arc::new(client))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ratelimit(&self) -> u32 {
        self.ratelimit
    }

    pub fn filter(&self) -> Arc<TagFilter> {
        Arc::clone(&self.filter)
    }

    pub fn cycle_state(&self) -> CycleState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CycleState> {
        self.state.subscribe()
    }

    fn enter(&self, state: CycleState) {
        trace!("cycle state -> {state:?}");
        self.state.send_replace(state);
    }

    /// Run one poll cycle against `acc`
    #[instrument(skip_all, fields(region = %self.region))]
    pub async fn gather(&self, acc: &dyn Accumulator) -> CycleReport {
        let acc = CountingAccumulator::new(acc);

        self.enter(CycleState::Fetching);
        let alarms = match self
            .fetcher
            .describe_alarms(alarm_filter(&self.state_value))
            .await
        {
            Ok(alarms) => alarms,
            Err(e) => {
                acc.add_error(e);
                self.enter(CycleState::Idle);
                return acc.report();
            }
        };

        self.enter(CycleState::Aggregating);
        Aggregator::new(&self.region, &self.filter).aggregate_alarms(&acc, alarms);
        self.enter(CycleState::Idle);

        let report = acc.report();
        debug!("cycle finished: {report:?}");
        report
    }
}

/// Counts what a single cycle hands to the real accumulator
struct CountingAccumulator<'a> {
    inner: &'a dyn Accumulator,
    points: AtomicUsize,
    errors: AtomicUsize,
}

impl<'a> CountingAccumulator<'a> {
    fn new(inner: &'a dyn Accumulator) -> Self {
        Self {
            inner,
            points: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        }
    }

    fn report(&self) -> CycleReport {
        CycleReport {
            points: self.points.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Accumulator for CountingAccumulator<'_> {
    fn add_metric(&self, point: MetricPoint) {
        self.points.fetch_add(1, Ordering::Relaxed);
        self.inner.add_metric(point);
    }

    fn add_error(&self, err: AlarmsError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.inner.add_error(err);
    }
}

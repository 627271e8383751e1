//! Output sink consumed by the connector
//!
//! The connector only needs two operations from whoever hosts it: hand over a
//! metric point, and report an error without aborting the process.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{error, trace};

use crate::actors::messages::AlarmMetricEvent;
use crate::error::AlarmsError;
use crate::metric::MetricPoint;

/// Sink for metric points and non-fatal errors
pub trait Accumulator: Send + Sync {
    fn add_metric(&self, point: MetricPoint);

    fn add_error(&self, err: AlarmsError);
}

/// Publishes every point on a broadcast channel
///
/// Send errors are ignored: having no subscriber is fine. Reported errors are
/// logged and counted.
#[derive(Debug)]
pub struct BroadcastAccumulator {
    metric_tx: broadcast::Sender<AlarmMetricEvent>,
    errors: AtomicU64,
}

impl BroadcastAccumulator {
    pub fn new(metric_tx: broadcast::Sender<AlarmMetricEvent>) -> Self {
        Self {
            metric_tx,
            errors: AtomicU64::new(0),
        }
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Accumulator for BroadcastAccumulator {
    fn add_metric(&self, point: MetricPoint) {
        let event = AlarmMetricEvent {
            point,
            collected_at: Utc::now(),
        };

        match self.metric_tx.send(event) {
            Ok(num_receivers) => trace!("published alarm metric to {num_receivers} receivers"),
            Err(_) => trace!("no receivers for alarm metric"),
        }
    }

    fn add_error(&self, err: AlarmsError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        error!("{err}");
    }
}

/// Collects everything in memory. Used by tests and one-shot callers.
#[derive(Debug, Default)]
pub struct MemoryAccumulator {
    metrics: Mutex<Vec<MetricPoint>>,
    errors: Mutex<Vec<AlarmsError>>,
}

impl MemoryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Vec<MetricPoint> {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    /// Error messages in the order they were reported
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .map(|errors| errors.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    pub fn take_errors(&self) -> Vec<AlarmsError> {
        self.errors
            .lock()
            .map(|mut errors| std::mem::take(&mut *errors))
            .unwrap_or_default()
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.lock().map(|m| m.len()).unwrap_or_default()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn has_measurement(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// First point with the given series name
    pub fn find(&self, name: &str) -> Option<MetricPoint> {
        self.metrics
            .lock()
            .ok()?
            .iter()
            .find(|point| point.name == name)
            .cloned()
    }
}

impl Accumulator for MemoryAccumulator {
    fn add_metric(&self, point: MetricPoint) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.push(point);
        }
    }

    fn add_error(&self, err: AlarmsError) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(err);
        }
    }
}

//! Message types for the poller actor
//!
//! 1. **Commands**: control messages sent to the poller via mpsc
//! 2. **Events**: metric points broadcast to every subscriber

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::input::CycleReport;
use crate::metric::MetricPoint;

/// Event published for every emitted alarm point
///
/// Broadcast channels may lag or drop events for slow subscribers. The next
/// poll re-emits the current alarm state, so gaps are acceptable.
#[derive(Debug, Clone)]
pub struct AlarmMetricEvent {
    /// The translated alarm
    pub point: MetricPoint,

    /// When the point was handed to the accumulator
    pub collected_at: DateTime<Utc>,
}

/// Commands that can be sent to an AlarmPollerActor
#[derive(Debug)]
pub enum PollerCommand {
    /// Run a poll cycle right away (bypassing the interval timer)
    PollNow {
        respond_to: oneshot::Sender<CycleReport>,
    },

    /// Change the polling interval. Takes effect immediately.
    UpdateInterval { interval_secs: u64 },

    /// Report of the most recent cycle, `None` before the first one
    GetLastReport {
        respond_to: oneshot::Sender<Option<CycleReport>>,
    },

    /// Stop after any in-flight cycle
    Shutdown,
}

//! AlarmPollerActor - runs the alarm connector on an interval
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → gather() → DescribeAlarms (all pages) → aggregate → Accumulator → [subscribers]
//!     ↑
//!     └─── Commands (PollNow, UpdateInterval, GetLastReport, Shutdown)
//! ```
//!
//! Only one cycle runs at a time per actor: commands and ticks are handled
//! sequentially in the actor loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, instrument, warn};

use crate::accumulator::Accumulator;
use crate::input::{AlarmsInput, CycleReport, CycleState};

use super::messages::PollerCommand;

/// Actor that polls CloudWatch for alarms of one connector
pub struct AlarmPollerActor {
    /// The connector (filter and client already built)
    input: Arc<AlarmsInput>,

    /// Where points and errors go
    accumulator: Arc<dyn Accumulator>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<PollerCommand>,

    /// Current polling interval
    interval_duration: Duration,

    last_report: Option<CycleReport>,
}

impl AlarmPollerActor {
    pub fn new(
        input: Arc<AlarmsInput>,
        accumulator: Arc<dyn Accumulator>,
        command_rx: mpsc::Receiver<PollerCommand>,
        interval_duration: Duration,
    ) -> Self {
        Self {
            input,
            accumulator,
            command_rx,
            interval_duration,
            last_report: None,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or the command channel is
    /// closed. The first cycle starts one interval after spawning.
    #[instrument(skip(self), fields(region = %self.input.region()))]
    pub async fn run(mut self) {
        debug!("starting alarm poller");

        let mut ticker = self.ticker();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll().await;
                }

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        warn!("command channel closed, shutting down");
                        break;
                    };

                    match cmd {
                        PollerCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            let report = self.poll().await;
                            let _ = respond_to.send(report);
                        }

                        PollerCommand::UpdateInterval { interval_secs } => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration = Duration::from_secs(interval_secs);
                            ticker = self.ticker();
                        }

                        PollerCommand::GetLastReport { respond_to } => {
                            let _ = respond_to.send(self.last_report);
                        }

                        PollerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }
            }
        }

        debug!("alarm poller stopped");
    }

    fn ticker(&self) -> tokio::time::Interval {
        // tokio panics on a zero period
        let period = self.interval_duration.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    async fn poll(&mut self) -> CycleReport {
        let report = self.input.gather(self.accumulator.as_ref()).await;
        if report.errors > 0 {
            warn!("poll cycle reported {} errors", report.errors);
        }
        self.last_report = Some(report);
        report
    }
}

/// Handle for controlling an AlarmPollerActor
///
/// Cheap to clone and share across tasks.
#[derive(Clone)]
pub struct PollerHandle {
    sender: mpsc::Sender<PollerCommand>,

    state_rx: watch::Receiver<CycleState>,

    pub region: String,
}

impl PollerHandle {
    /// Spawn a new poller actor and return its handle
    pub fn spawn(
        input: Arc<AlarmsInput>,
        accumulator: Arc<dyn Accumulator>,
        interval: Duration,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        let region = input.region().to_string();
        let state_rx = input.subscribe_state();

        let actor = AlarmPollerActor::new(input, accumulator, cmd_rx, interval);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            state_rx,
            region,
        }
    }

    /// Run a cycle now and wait for its report
    pub async fn poll_now(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(PollerCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    pub async fn last_report(&self) -> Result<Option<CycleReport>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::GetLastReport { respond_to: tx })
            .await
            .context("failed to send GetLastReport command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(PollerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }

    /// State of the cycle currently running (or `Idle`)
    pub fn cycle_state(&self) -> CycleState {
        *self.state_rx.borrow()
    }
}

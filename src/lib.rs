pub mod accumulator;
pub mod actors;
pub mod aggregator;
pub mod cloudwatch;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod input;
pub mod metric;

pub use accumulator::{Accumulator, BroadcastAccumulator, MemoryAccumulator};
pub use error::{AlarmsError, AlarmsResult, CloudWatchError};
pub use input::{AlarmsInput, CycleReport, CycleState};
pub use metric::{FieldValue, MetricPoint};

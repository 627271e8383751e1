//! Actor wrapper around the alarm connector
//!
//! The connector itself ([`crate::input::AlarmsInput`]) is a plain struct with
//! one `gather` call. This module runs it on an interval as an async task
//! controlled through a command channel.
//!
//! ```text
//!        ┌────────────────┐  commands   ┌──────────────────┐
//!        │  PollerHandle  │────────────▶│ AlarmPollerActor │
//!        └────────────────┘   (mpsc)    └────────┬─────────┘
//!                                                │ gather()
//!                                       ┌────────▼─────────┐
//!                                       │   Accumulator    │
//!                                       │ (broadcast/mem)  │
//!                                       └──────────────────┘
//! ```

pub mod messages;
pub mod poller;

//! The periodic scheduler ("beat"): a keyed set of cron or interval
//! entries, ticked on a fixed cadence, each publishing a freshly-minted
//! message to the broker when it comes due.
//!
//! # Examples
//!
//! ```
//! use celeris_broker::InMemoryBroker;
//! use celeris_scheduler::{Beat, Schedule, ScheduleEntry, ScheduleOptions, TaskSignature, Trigger};
//! use chrono::Duration;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let schedule = Arc::new(Schedule::new());
//! schedule.add(ScheduleEntry::new(
//!     "heartbeat",
//!     TaskSignature::new("tasks.heartbeat"),
//!     Trigger::Interval(Duration::seconds(30)),
//!     ScheduleOptions::new("default"),
//! ));
//!
//! let broker = Arc::new(InMemoryBroker::new());
//! let beat = Beat::new(schedule, broker);
//! let shutdown = tokio_util::sync::CancellationToken::new();
//! shutdown.cancel();
//! beat.run(shutdown).await;
//! # }
//! ```

mod beat;
mod entry;
mod error;
mod schedule;

pub use beat::{Beat, DEFAULT_CHECK_INTERVAL};
pub use entry::{ScheduleEntry, ScheduleOptions, TaskSignature, Trigger};
pub use error::SchedulerError;
pub use schedule::Schedule;

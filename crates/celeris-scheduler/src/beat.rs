//! The periodic scheduler tick loop.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use celeris_core::{SharedClock, SystemClock, TaskMessage};
use celeris_broker::Broker;
use chrono::Duration;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::schedule::Schedule;

/// Default tick cadence, matching the spec's "`check_interval`, default 1s".
pub const DEFAULT_CHECK_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// Drives a [`Schedule`], publishing a fresh message to the broker for
/// every entry that comes due on each tick.
pub struct Beat {
    schedule: Arc<Schedule>,
    broker: Arc<dyn Broker>,
    clock: SharedClock,
    check_interval: StdDuration,
    max_jitter: Duration,
    catch_up_on_startup: bool,
}

impl Beat {
    pub fn new(schedule: Arc<Schedule>, broker: Arc<dyn Broker>) -> Self {
        Self {
            schedule,
            broker,
            clock: Arc::new(SystemClock),
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_jitter: Duration::zero(),
            catch_up_on_startup: true,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_check_interval(mut self, interval: StdDuration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    pub fn with_catch_up_on_startup(mut self, catch_up: bool) -> Self {
        self.catch_up_on_startup = catch_up;
        self
    }

    /// Runs the tick loop until `shutdown` is cancelled.
    ///
    /// Unlike a consumer loop's delivery handling, `tick` has no fallible
    /// exit: every per-entry publish error is caught and logged inside
    /// `tick` itself, so there is no pass-level failure for this loop to
    /// catch and back off from. `shutdown` cancellation is the only way
    /// this loop ends.
    pub async fn run(&self, shutdown: CancellationToken) {
        if self.catch_up_on_startup {
            self.tick().await;
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.check_interval) => {
                    self.tick().await;
                }
            }
        }
    }

    /// Runs one pass over the schedule, publishing every due entry.
    /// Per-entry publish failures are logged and do not stop the pass;
    /// an unexpected failure of the pass itself triggers a fixed backoff
    /// before the caller's next iteration.
    async fn tick(&self) {
        let now = self.clock.now();
        for entry in self.schedule.snapshot() {
            if !entry.should_run(now) {
                continue;
            }

            let mut message = TaskMessage::builder(
                entry.task_signature.task_name.clone(),
                entry.options.queue.clone(),
            )
            .args(entry.task_signature.args.clone())
            .kwargs(entry.task_signature.kwargs.clone())
            .priority(entry.options.priority)
            .build()
            .unwrap_or_else(|_| {
                TaskMessage::builder(entry.task_signature.task_name.clone(), entry.options.queue.clone())
                    .build()
                    .expect("a minimal task message always builds")
            });

            if self.max_jitter > Duration::zero() {
                let jitter_millis = self.max_jitter.num_milliseconds().max(0);
                let offset = rand::rng().random_range(0..=jitter_millis);
                message.eta = Some(now + Duration::milliseconds(offset));
            }
            if let Some(expires_in) = entry.options.expires_in {
                message.expires = Some(now + expires_in);
            }

            match self.broker.publish(message).await {
                Ok(()) => self.schedule.record_run(&entry.name, now),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(entry = %entry.name, error = %err, "periodic publish failed");
                    #[cfg(not(feature = "tracing"))]
                    let _ = err;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ScheduleEntry, ScheduleOptions, TaskSignature, Trigger};
    use celeris_broker::InMemoryBroker;
    use celeris_core::FakeClock;
    use futures::StreamExt;

    #[tokio::test]
    async fn tick_publishes_due_entries_and_records_last_run() {
        let schedule = Arc::new(Schedule::new());
        schedule.add(ScheduleEntry::new(
            "heartbeat",
            TaskSignature::new("tasks.heartbeat"),
            Trigger::Interval(Duration::seconds(60)),
            ScheduleOptions::new("default"),
        ));
        let broker = Arc::new(InMemoryBroker::new());
        let clock: SharedClock = Arc::new(FakeClock::new(chrono::Utc::now()));
        let beat = Beat::new(schedule.clone(), broker.clone()).with_clock(clock.clone());

        beat.tick().await;

        let mut stream = broker.consume(vec!["default".to_string()]);
        let delivered = stream.next().await.unwrap();
        assert_eq!(delivered.message.task_name, "tasks.heartbeat");
        assert_eq!(schedule.snapshot()[0].last_run_time, Some(clock.now()));
    }

    #[tokio::test]
    async fn tick_skips_entries_not_yet_due() {
        let schedule = Arc::new(Schedule::new());
        let mut entry = ScheduleEntry::new(
            "heartbeat",
            TaskSignature::new("tasks.heartbeat"),
            Trigger::Interval(Duration::seconds(60)),
            ScheduleOptions::new("default"),
        );
        let now = chrono::Utc::now();
        entry.last_run_time = Some(now);
        schedule.add(entry);

        let broker = Arc::new(InMemoryBroker::new());
        let clock: SharedClock = Arc::new(FakeClock::new(now));
        let beat = Beat::new(schedule.clone(), broker.clone()).with_clock(clock);

        beat.tick().await;
        assert_eq!(schedule.snapshot()[0].last_run_time, Some(now));
    }
}

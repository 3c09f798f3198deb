//! A single periodic entry: what to run, when, and with what delivery
//! options.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use cron::Schedule as CronSchedule;
use serde_json::Value;

use crate::error::SchedulerError;

/// How an entry's run times are computed.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// A standard five-field cron expression (minute hour day-of-month
    /// month day-of-week). Internally widened to the six-field form the
    /// `cron` crate expects by prefixing a `0` seconds field.
    Cron(String),
    Interval(Duration),
}

impl Trigger {
    pub fn cron(expression: impl Into<String>) -> Result<Self, SchedulerError> {
        let expression = expression.into();
        Self::parsed_cron_schedule(&expression)?;
        Ok(Self::Cron(expression))
    }

    fn parsed_cron_schedule(expression: &str) -> Result<CronSchedule, SchedulerError> {
        let six_field = format!("0 {expression}");
        CronSchedule::from_str(&six_field).map_err(|err| SchedulerError::InvalidCron {
            expression: expression.to_string(),
            message: err.to_string(),
        })
    }

    fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Interval(interval) => Some(from + *interval),
            Trigger::Cron(expression) => {
                let schedule = Self::parsed_cron_schedule(expression).ok()?;
                schedule.after(&from).next()
            }
        }
    }
}

/// What to publish when this entry fires.
#[derive(Debug, Clone)]
pub struct TaskSignature {
    pub task_name: String,
    pub args: Value,
    pub kwargs: Value,
}

impl TaskSignature {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            args: Value::Array(Vec::new()),
            kwargs: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }
}

/// Delivery options applied to the message an entry publishes.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    pub queue: String,
    pub priority: u8,
    pub expires_in: Option<Duration>,
}

impl ScheduleOptions {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            priority: 0,
            expires_in: None,
        }
    }
}

/// A keyed, periodically-firing schedule entry.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub name: String,
    pub task_signature: TaskSignature,
    pub trigger: Trigger,
    pub enabled: bool,
    pub last_run_time: Option<DateTime<Utc>>,
    pub options: ScheduleOptions,
}

impl ScheduleEntry {
    pub fn new(
        name: impl Into<String>,
        task_signature: TaskSignature,
        trigger: Trigger,
        options: ScheduleOptions,
    ) -> Self {
        Self {
            name: name.into(),
            task_signature,
            trigger,
            enabled: true,
            last_run_time: None,
            options,
        }
    }

    /// The next time this entry should fire on or after `from`.
    ///
    /// - Interval entries: `last_run_time.unwrap_or(from) + interval`.
    /// - Cron entries: the next occurrence of the expression after `from`.
    pub fn get_next_run_time(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match &self.trigger {
            Trigger::Interval(interval) => Some(self.last_run_time.unwrap_or(from) + *interval),
            Trigger::Cron(_) => self.trigger.next_after(self.last_run_time.unwrap_or(from)),
        }
    }

    /// Whether this entry is due to fire, treating an entry that has
    /// never run as due since up to a day ago (so a freshly-added entry
    /// fires promptly rather than waiting a full period).
    pub fn should_run(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        let baseline = self.last_run_time.unwrap_or(now - Duration::days(1));
        match self.get_next_run_time(baseline) {
            Some(next) => next <= now,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_next_run_uses_last_run_time_when_present() {
        let mut entry = ScheduleEntry::new(
            "heartbeat",
            TaskSignature::new("tasks.heartbeat"),
            Trigger::Interval(Duration::seconds(60)),
            ScheduleOptions::new("default"),
        );
        let now = Utc::now();
        entry.last_run_time = Some(now);
        assert_eq!(entry.get_next_run_time(now), Some(now + Duration::seconds(60)));
    }

    #[test]
    fn interval_next_run_falls_back_to_from_when_never_run() {
        let entry = ScheduleEntry::new(
            "heartbeat",
            TaskSignature::new("tasks.heartbeat"),
            Trigger::Interval(Duration::seconds(60)),
            ScheduleOptions::new("default"),
        );
        let now = Utc::now();
        assert_eq!(entry.get_next_run_time(now), Some(now + Duration::seconds(60)));
    }

    #[test]
    fn cron_next_run_is_strictly_after_from() {
        let entry = ScheduleEntry::new(
            "midnight",
            TaskSignature::new("tasks.midnight"),
            Trigger::cron("0 0 * * *").unwrap(),
            ScheduleOptions::new("default"),
        );
        let now = Utc::now();
        let next = entry.get_next_run_time(now).unwrap();
        assert!(next > now);
    }

    #[test]
    fn invalid_cron_expression_is_rejected_eagerly() {
        assert!(Trigger::cron("not a cron expression").is_err());
    }

    #[test]
    fn disabled_entry_never_should_run() {
        let mut entry = ScheduleEntry::new(
            "heartbeat",
            TaskSignature::new("tasks.heartbeat"),
            Trigger::Interval(Duration::seconds(1)),
            ScheduleOptions::new("default"),
        );
        entry.enabled = false;
        assert!(!entry.should_run(Utc::now() + Duration::hours(1)));
    }

    #[test]
    fn freshly_added_entry_is_due_immediately() {
        let entry = ScheduleEntry::new(
            "heartbeat",
            TaskSignature::new("tasks.heartbeat"),
            Trigger::Interval(Duration::seconds(3600)),
            ScheduleOptions::new("default"),
        );
        assert!(entry.should_run(Utc::now()));
    }
}

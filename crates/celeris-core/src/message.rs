//! The task message envelope that flows from producer to broker to worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::CeleriError;

/// Current wire schema version produced by this crate.
pub const CURRENT_SCHEMA_VERSION: u16 = 1;

/// Highest schema version this worker knows how to decode.
pub const MAX_SUPPORTED_SCHEMA_VERSION: u16 = 1;

/// Clock skew tolerated between when a message was stamped and when its
/// `eta` asks for delivery. An `eta` further in the past than this relative
/// to `timestamp` indicates the producer and broker clocks have drifted, or
/// the caller built an obviously-wrong message.
fn max_eta_clock_skew() -> chrono::Duration {
    chrono::Duration::minutes(5)
}

/// A task invocation as it travels broker-side: name, arguments, retry
/// bookkeeping, and delivery constraints.
///
/// Invariants enforced by [`TaskMessageBuilder::build`]:
/// - `retries <= max_retries`
/// - if both `eta` and `expires` are set, `expires >= eta`
/// - if `eta` is set, `eta >= timestamp - 5min`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMessage {
    pub id: Uuid,
    pub task_name: String,
    pub content_type: String,
    pub args: serde_json::Value,
    pub kwargs: serde_json::Value,
    pub queue: String,
    pub eta: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub retries: u32,
    pub max_retries: u32,
    pub priority: u8,
    pub partition_key: Option<String>,
    pub headers: HashMap<String, String>,
    pub schema_version: u16,
    pub correlation_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub parent_id: Option<Uuid>,
    pub root_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub tenant_id: Option<String>,
}

impl TaskMessage {
    /// Starts a builder for a new message with generated id and current
    /// schema version.
    pub fn builder(task_name: impl Into<String>, queue: impl Into<String>) -> TaskMessageBuilder {
        TaskMessageBuilder::new(task_name, queue)
    }

    /// Whether this message has exhausted its retry budget.
    pub fn retries_exhausted(&self) -> bool {
        self.retries >= self.max_retries
    }

    /// Whether the message's expiry has passed relative to `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| now > expires)
    }

    /// Returns a copy of this message with `retries` incremented and a
    /// fresh `eta` set to `now + delay`, used when requeuing through the
    /// delayed store.
    pub fn into_retry(mut self, now: DateTime<Utc>, delay: chrono::Duration) -> Self {
        self.retries += 1;
        self.eta = Some(now + delay);
        self
    }
}

/// Builder for [`TaskMessage`], validating cross-field invariants at
/// construction time rather than on every read.
pub struct TaskMessageBuilder {
    id: Uuid,
    task_name: String,
    content_type: String,
    args: serde_json::Value,
    kwargs: serde_json::Value,
    queue: String,
    eta: Option<DateTime<Utc>>,
    expires: Option<DateTime<Utc>>,
    retries: u32,
    max_retries: u32,
    priority: u8,
    partition_key: Option<String>,
    headers: HashMap<String, String>,
    correlation_id: Option<Uuid>,
    timestamp: DateTime<Utc>,
    parent_id: Option<Uuid>,
    root_id: Option<Uuid>,
    batch_id: Option<Uuid>,
    tenant_id: Option<String>,
}

impl TaskMessageBuilder {
    fn new(task_name: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_name: task_name.into(),
            content_type: "application/json".to_string(),
            args: serde_json::Value::Array(Vec::new()),
            kwargs: serde_json::Value::Object(Default::default()),
            queue: queue.into(),
            eta: None,
            expires: None,
            retries: 0,
            max_retries: 3,
            priority: 0,
            partition_key: None,
            headers: HashMap::new(),
            correlation_id: None,
            timestamp: Utc::now(),
            parent_id: None,
            root_id: None,
            batch_id: None,
            tenant_id: None,
        }
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }

    pub fn kwargs(mut self, kwargs: serde_json::Value) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn eta(mut self, eta: DateTime<Utc>) -> Self {
        self.eta = Some(eta);
        self
    }

    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// Overrides the auto-stamped `timestamp`. Mainly for tests that need
    /// deterministic clock-skew scenarios.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn parent_id(mut self, id: Uuid) -> Self {
        self.parent_id = Some(id);
        self
    }

    pub fn root_id(mut self, id: Uuid) -> Self {
        self.root_id = Some(id);
        self
    }

    pub fn batch_id(mut self, id: Uuid) -> Self {
        self.batch_id = Some(id);
        self
    }

    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn build(self) -> Result<TaskMessage, CeleriError> {
        if self.retries > self.max_retries {
            return Err(CeleriError::InvalidMessage {
                reason: format!(
                    "retries ({}) exceeds max_retries ({})",
                    self.retries, self.max_retries
                ),
            });
        }
        if let (Some(eta), Some(expires)) = (self.eta, self.expires) {
            if expires < eta {
                return Err(CeleriError::InvalidMessage {
                    reason: "expires is before eta".to_string(),
                });
            }
        }
        if let Some(eta) = self.eta {
            let earliest = self.timestamp - max_eta_clock_skew();
            if eta < earliest {
                return Err(CeleriError::InvalidMessage {
                    reason: format!(
                        "eta {} is more than {} before timestamp {}",
                        eta,
                        max_eta_clock_skew(),
                        self.timestamp
                    ),
                });
            }
        }
        if self.task_name.is_empty() {
            return Err(CeleriError::InvalidMessage {
                reason: "task_name must not be empty".to_string(),
            });
        }
        Ok(TaskMessage {
            id: self.id,
            task_name: self.task_name,
            content_type: self.content_type,
            args: self.args,
            kwargs: self.kwargs,
            queue: self.queue,
            eta: self.eta,
            expires: self.expires,
            retries: self.retries,
            max_retries: self.max_retries,
            priority: self.priority,
            partition_key: self.partition_key,
            headers: self.headers,
            schema_version: CURRENT_SCHEMA_VERSION,
            correlation_id: self.correlation_id,
            timestamp: self.timestamp,
            parent_id: self.parent_id,
            root_id: self.root_id,
            batch_id: self.batch_id,
            tenant_id: self.tenant_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_minimal_message() {
        let msg = TaskMessage::builder("tasks.add", "default").build().unwrap();
        assert_eq!(msg.task_name, "tasks.add");
        assert_eq!(msg.retries, 0);
        assert_eq!(msg.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn rejects_expires_before_eta() {
        let now = Utc::now();
        let result = TaskMessage::builder("tasks.add", "default")
            .eta(now + chrono::Duration::seconds(10))
            .expires(now)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_task_name() {
        let result = TaskMessage::builder("", "default").build();
        assert!(result.is_err());
    }

    #[test]
    fn into_retry_increments_and_reschedules() {
        let now = Utc::now();
        let msg = TaskMessage::builder("tasks.add", "default").build().unwrap();
        let retried = msg.into_retry(now, chrono::Duration::seconds(30));
        assert_eq!(retried.retries, 1);
        assert!(retried.eta.unwrap() >= now + chrono::Duration::seconds(30));
    }

    #[test]
    fn rejects_eta_too_far_before_timestamp() {
        let timestamp = Utc::now();
        let result = TaskMessage::builder("tasks.add", "default")
            .timestamp(timestamp)
            .eta(timestamp - chrono::Duration::minutes(10))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn accepts_eta_within_clock_skew_tolerance() {
        let timestamp = Utc::now();
        let result = TaskMessage::builder("tasks.add", "default")
            .timestamp(timestamp)
            .eta(timestamp - chrono::Duration::minutes(2))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn detects_expiry() {
        let now = Utc::now();
        let msg = TaskMessage::builder("tasks.add", "default")
            .expires(now - chrono::Duration::seconds(1))
            .build()
            .unwrap();
        assert!(msg.is_expired(now));
    }
}

//! The per-message execution pipeline.
//!
//! [`Pipeline::dispatch`] takes one delivered [`BrokerMessage`] through
//! every stage from validation through outcome resolution, acking or
//! rejecting it exactly once. Nothing here loops over a queue or owns a
//! consumer; that's `celeris-worker`'s job. This crate only knows how to
//! process one message once it's been handed one.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use celeris_backend::Backend;
use celeris_broker::{Broker, BrokerMessage};
use celeris_core::{
    CancelReason, EventListener, PipelineError, ProgressReporter, RequeueReason, SharedClock,
    SystemClock, TaskEvent, TaskMessage, TaskResult, TaskState,
};
use celeris_deadletter::{DeadLetterReason, DeadLetterStore, ExceptionInfo};
use celeris_delayed::DelayedStore;
use celeris_ratelimiter::RateLimiter;
use celeris_registry::{Invoker, RegistryError, TaskContext, TaskRegistration, TaskRegistry};
use celeris_registry::FilterOutcome;
use celeris_retry::{ExponentialBackoff, RetryConfig, RetryDecision};
use celeris_revocation::RevocationStore;
use celeris_timelimiter::TimeLimiter;
use celeris_tracker::{ExecutionTracker, PartitionGate};

use crate::config::{PipelineConfig, ResilienceConfig};
use crate::security::{SecurityGate, SIGNATURE_HEADER};

/// What became of one [`Pipeline::dispatch`] call. Mostly useful for
/// tests and for the worker loop's own telemetry; the delivered message
/// has already been acked or rejected by the time this is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Success,
    Revoked,
    Rejected { reason: DeadLetterReason },
    Requeued { reason: RequeueReason },
    RetryScheduled { attempt: u32 },
    DeadLettered { reason: DeadLetterReason },
    ShutdownRequeued,
}

/// What a handler run resolved to, before outcome resolution maps it onto
/// state transitions, result storage, and ack/requeue/dead-letter.
enum HandlerOutcome {
    Success(Value),
    Failure(PipelineError),
    Cancelled(CancelReason),
}

/// Forwards `ProgressUpdated` events onto the backend's state, so a
/// handler calling `TaskContext::report_progress` is visible to anyone
/// polling the result backend, not just in-process listeners. `celeris-core`
/// has no backend dependency of its own, so this bridge lives here instead.
struct BackendProgressListener {
    backend: Arc<dyn Backend>,
}

impl EventListener<TaskEvent> for BackendProgressListener {
    fn on_event(&self, event: &TaskEvent) {
        if let TaskEvent::ProgressUpdated { task_id, progress, .. } = event {
            let backend = Arc::clone(&self.backend);
            let task_id = *task_id;
            let metadata = serde_json::to_value(progress).ok();
            tokio::spawn(async move {
                let _ = backend.update_state(task_id, TaskState::Progress, metadata).await;
            });
        }
    }
}

/// Ties every stage's collaborator together: broker, backend, registry,
/// and the gating/retry/security machinery each stage consults.
pub struct Pipeline {
    broker: Arc<dyn Broker>,
    backend: Arc<dyn Backend>,
    registry: Arc<TaskRegistry>,
    invoker: Invoker,
    delayed: Arc<dyn DelayedStore>,
    revocation: Arc<dyn RevocationStore>,
    dead_letter: Arc<dyn DeadLetterStore>,
    rate_limiter: Arc<RateLimiter>,
    tracker: Arc<ExecutionTracker>,
    partition_gate: Arc<PartitionGate>,
    security: SecurityGate,
    config: PipelineConfig,
    clock: SharedClock,
    progress: ProgressReporter,
    retry: RetryConfig<PipelineError>,
    shutdown: CancellationToken,
}

fn build_retry_config(resilience: &ResilienceConfig) -> RetryConfig<PipelineError> {
    let backoff = ExponentialBackoff::new(resilience.initial_delay)
        .multiplier(resilience.backoff_multiplier)
        .max_delay(resilience.max_delay);
    RetryConfig::builder().backoff(backoff).name("pipeline").build()
}

impl Pipeline {
    /// Required collaborators only; everything else defaults and can be
    /// overridden with the `with_*` methods before the pipeline is put to
    /// work.
    pub fn new(
        broker: Arc<dyn Broker>,
        backend: Arc<dyn Backend>,
        registry: Arc<TaskRegistry>,
        delayed: Arc<dyn DelayedStore>,
        revocation: Arc<dyn RevocationStore>,
        dead_letter: Arc<dyn DeadLetterStore>,
    ) -> Self {
        let config = PipelineConfig::default();
        let mut progress = ProgressReporter::new();
        progress.add_listener(BackendProgressListener { backend: backend.clone() });
        Self {
            invoker: Invoker::new(registry.clone()),
            broker,
            backend,
            registry,
            delayed,
            revocation,
            dead_letter,
            rate_limiter: Arc::new(RateLimiter::new()),
            tracker: Arc::new(ExecutionTracker::builder().name("pipeline-overlap").build()),
            partition_gate: Arc::new(PartitionGate::new()),
            security: SecurityGate::new(config.security.clone()),
            retry: build_retry_config(&config.resilience),
            config,
            clock: Arc::new(SystemClock),
            progress,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<ExecutionTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_partition_gate(mut self, gate: Arc<PartitionGate>) -> Self {
        self.partition_gate = gate;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.security = SecurityGate::new(config.security.clone());
        self.retry = build_retry_config(&config.resilience);
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_progress(mut self, mut progress: ProgressReporter) -> Self {
        progress.add_listener(BackendProgressListener { backend: self.backend.clone() });
        self.progress = progress;
        self
    }

    /// The token the worker cancels on graceful shutdown. Every in-flight
    /// dispatch derives a child of this token.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn progress_reporter(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Runs one delivered message through every pipeline stage, acking or
    /// rejecting it exactly once before returning.
    pub async fn dispatch(&self, delivery: BrokerMessage) -> DispatchOutcome {
        let message = delivery.message.clone();
        let task_id = message.id;
        let now = self.clock.now();

        // (a) validate & decode
        let payload = serde_json::to_vec(&message.args).unwrap_or_default();
        let signature = message.headers.get(SIGNATURE_HEADER).map(String::as_str);
        if let Err(err) = self.security.validate(&message, &payload, signature) {
            self.reject_with_reason(&delivery, &message, DeadLetterReason::Rejected, &err.to_string())
                .await;
            return DispatchOutcome::Rejected {
                reason: DeadLetterReason::Rejected,
            };
        }

        // (b) revocation check
        if matches!(self.revocation.is_revoked(task_id).await, Ok(true)) {
            self.backend.update_state(task_id, TaskState::Revoked, None).await.ok();
            self.progress.state_changed(task_id, TaskState::Pending, TaskState::Revoked);
            self.progress.revoked(task_id);
            let mut result = TaskResult::pending(task_id);
            result.state = TaskState::Revoked;
            result.finished_at = Some(now);
            self.backend.store_result(result, None).await.ok();
            let _ = self.broker.ack(&delivery).await;
            return DispatchOutcome::Revoked;
        }

        // (c) expiry check
        if message.is_expired(now) {
            self.reject_with_reason(&delivery, &message, DeadLetterReason::Expired, "message expired before delivery")
                .await;
            return DispatchOutcome::Rejected {
                reason: DeadLetterReason::Expired,
            };
        }

        // (d) lookup registration
        let registration = match self.registry.get(&message.task_name).cloned() {
            Some(registration) => registration,
            None => {
                let detail = format!("no handler registered for task {}", message.task_name);
                self.reject_with_reason(&delivery, &message, DeadLetterReason::UnknownTask, &detail)
                    .await;
                return DispatchOutcome::Rejected {
                    reason: DeadLetterReason::UnknownTask,
                };
            }
        };

        // (e) partition gate
        if let Some(partition_key) = message.partition_key.clone() {
            if !self
                .partition_gate
                .try_acquire(task_id, &partition_key, self.config.partition_lock_timeout)
            {
                self.requeue_with_delay(&delivery, message, self.config.partition_lock_timeout, true)
                    .await;
                return DispatchOutcome::Requeued {
                    reason: RequeueReason::PartitionBlocked,
                };
            }
        }

        // (f) overlap gate
        let overlap_key = registration.overlap_key(&message.args);
        if let Some(key) = &overlap_key {
            if !self
                .tracker
                .try_start(&message.task_name, task_id, Some(key.as_str()), self.config.overlap_lock_timeout)
            {
                self.release_partition(&message);
                self.requeue_with_delay(&delivery, message, self.config.overlap_lock_timeout, true)
                    .await;
                return DispatchOutcome::Requeued {
                    reason: RequeueReason::OverlapBlocked,
                };
            }
        }

        // (g) rate gate
        if let Some(policy) = &registration.rate_limit_policy {
            let lease = self.rate_limiter.try_acquire_at(&message.task_name, policy, now);
            if !lease.acquired {
                self.release_overlap(&message, overlap_key.as_deref());
                self.release_partition(&message);
                let delay = lease.retry_after.unwrap_or(StdDuration::from_secs(1));
                self.requeue_with_delay(&delivery, message, delay, false).await;
                return DispatchOutcome::Requeued {
                    reason: RequeueReason::RateLimited,
                };
            }
        }

        // (h) Received -> Started, build the task context
        self.backend.update_state(task_id, TaskState::Received, None).await.ok();
        self.progress.state_changed(task_id, TaskState::Pending, TaskState::Received);
        self.backend.update_state(task_id, TaskState::Started, None).await.ok();
        self.progress.state_changed(task_id, TaskState::Received, TaskState::Started);

        let started_at = now;
        let cancellation = self.shutdown.child_token();
        let ctx = TaskContext::new(task_id, message.task_name.clone(), message.retries)
            .headers(message.headers.clone())
            .progress_reporter(self.progress.clone())
            .cancellation_token(cancellation.clone());

        let watcher = self.spawn_revocation_watcher(task_id, cancellation.clone());

        // (i)-(l) time-limit setup, filter chain, invocation
        let outcome = self
            .run_filtered(&registration, message.args.clone(), ctx, cancellation.clone())
            .await;
        watcher.abort();

        let outcome = self.reconcile_cancellation(task_id, &cancellation, outcome).await;

        // (n) release leases unconditionally before resolving the outcome
        if let Some(key) = &overlap_key {
            self.tracker.stop(&message.task_name, task_id, Some(key.as_str()));
        }
        self.release_partition(&message);

        // (m) resolve outcome
        self.resolve_outcome(&delivery, message, &registration, outcome, started_at)
            .await
    }

    fn release_partition(&self, message: &TaskMessage) {
        if let Some(key) = &message.partition_key {
            self.partition_gate.release(message.id, key);
        }
    }

    fn release_overlap(&self, message: &TaskMessage, key: Option<&str>) {
        if let Some(key) = key {
            self.tracker.stop(&message.task_name, message.id, Some(key));
        }
    }

    /// Polls the revocation store while a task runs, cancelling its token
    /// the moment a `terminate: true` revocation is observed. Runs
    /// detached and is aborted by the caller once the run finishes.
    fn spawn_revocation_watcher(
        &self,
        task_id: Uuid,
        token: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let revocation = Arc::clone(&self.revocation);
        tokio::spawn(async move {
            loop {
                if token.is_cancelled() {
                    return;
                }
                if let Ok(Some(record)) = revocation.get(task_id).await {
                    if record.terminate {
                        token.cancel();
                        return;
                    }
                }
                tokio::time::sleep(StdDuration::from_millis(200)).await;
            }
        })
    }

    /// After a run completes, distinguishes *why* the shared cancellation
    /// token was flipped: a hard time limit already produces its own
    /// variant; otherwise check worker shutdown, then revocation.
    async fn reconcile_cancellation(
        &self,
        task_id: Uuid,
        cancellation: &CancellationToken,
        outcome: HandlerOutcome,
    ) -> HandlerOutcome {
        if matches!(outcome, HandlerOutcome::Cancelled(CancelReason::HardTimeLimit)) {
            return outcome;
        }
        if !cancellation.is_cancelled() {
            return outcome;
        }
        if self.shutdown.is_cancelled() {
            return HandlerOutcome::Cancelled(CancelReason::WorkerShutdown);
        }
        if matches!(self.revocation.is_revoked(task_id).await, Ok(true)) {
            return HandlerOutcome::Cancelled(CancelReason::Revoked);
        }
        outcome
    }

    async fn run_filtered(
        &self,
        registration: &Arc<TaskRegistration>,
        args: Value,
        ctx: TaskContext,
        cancellation: CancellationToken,
    ) -> HandlerOutcome {
        for filter in &registration.filters {
            match filter.on_executing() {
                FilterOutcome::Continue => {}
                FilterOutcome::ShortCircuitSuccess(value) => return HandlerOutcome::Success(value),
                FilterOutcome::ShortCircuitFail(err) => {
                    return HandlerOutcome::Failure(registry_error_to_pipeline(&registration.task_name, err))
                }
                FilterOutcome::Handled(value) => return HandlerOutcome::Success(value),
            }
        }

        let time_limiter = TimeLimiter::builder()
            .policy(registration.time_limit_policy.unwrap_or_default())
            .name(registration.task_name.clone())
            .build();

        let invoker = self.invoker.clone();
        let task_name = registration.task_name.clone();
        let run = time_limiter
            .run(cancellation, async move { invoker.invoke(&task_name, args, ctx).await })
            .await;

        let mut outcome = match run {
            Ok(Ok(value)) => HandlerOutcome::Success(value),
            Ok(Err(err)) => HandlerOutcome::Failure(registry_error_to_pipeline(&registration.task_name, err)),
            Err(_) => HandlerOutcome::Cancelled(CancelReason::HardTimeLimit),
        };

        for filter in registration.filters.iter().rev() {
            outcome = match outcome {
                HandlerOutcome::Success(value) => match filter.on_executed(&value) {
                    FilterOutcome::Continue => HandlerOutcome::Success(value),
                    FilterOutcome::ShortCircuitSuccess(v) | FilterOutcome::Handled(v) => {
                        HandlerOutcome::Success(v)
                    }
                    FilterOutcome::ShortCircuitFail(err) => {
                        HandlerOutcome::Failure(registry_error_to_pipeline(&registration.task_name, err))
                    }
                },
                HandlerOutcome::Failure(err) => {
                    let registry_err = RegistryError::HandlerFailed {
                        task_name: registration.task_name.clone(),
                        message: err.to_string(),
                    };
                    match filter.on_exception(&registry_err) {
                        FilterOutcome::Handled(v) | FilterOutcome::ShortCircuitSuccess(v) => {
                            HandlerOutcome::Success(v)
                        }
                        FilterOutcome::ShortCircuitFail(err) => {
                            HandlerOutcome::Failure(registry_error_to_pipeline(&registration.task_name, err))
                        }
                        FilterOutcome::Continue => HandlerOutcome::Failure(err),
                    }
                }
                cancelled @ HandlerOutcome::Cancelled(_) => cancelled,
            };
        }

        outcome
    }

    async fn resolve_outcome(
        &self,
        delivery: &BrokerMessage,
        message: TaskMessage,
        registration: &Arc<TaskRegistration>,
        outcome: HandlerOutcome,
        started_at: DateTime<Utc>,
    ) -> DispatchOutcome {
        let task_id = message.id;
        let finished_at = self.clock.now();

        match outcome {
            HandlerOutcome::Success(value) => {
                self.retry.record_success(message.retries + 1);
                self.backend.update_state(task_id, TaskState::Success, None).await.ok();
                self.progress.state_changed(task_id, TaskState::Started, TaskState::Success);
                let mut result = TaskResult::pending(task_id);
                result.state = TaskState::Success;
                result.value = Some(value);
                result.started_at = Some(started_at);
                result.finished_at = Some(finished_at);
                result.retries = message.retries;
                self.backend.store_result(result, None).await.ok();
                let _ = self.broker.ack(delivery).await;
                DispatchOutcome::Success
            }
            HandlerOutcome::Cancelled(CancelReason::Revoked) => {
                self.backend.update_state(task_id, TaskState::Revoked, None).await.ok();
                self.progress.state_changed(task_id, TaskState::Started, TaskState::Revoked);
                self.progress.revoked(task_id);
                let mut result = TaskResult::pending(task_id);
                result.state = TaskState::Revoked;
                result.started_at = Some(started_at);
                result.finished_at = Some(finished_at);
                result.retries = message.retries;
                self.backend.store_result(result, None).await.ok();
                let _ = self.broker.ack(delivery).await;
                DispatchOutcome::Revoked
            }
            HandlerOutcome::Cancelled(CancelReason::WorkerShutdown) => {
                let _ = self.delayed.add(message, finished_at).await;
                let _ = self.broker.ack(delivery).await;
                DispatchOutcome::ShutdownRequeued
            }
            HandlerOutcome::Cancelled(CancelReason::HardTimeLimit) => {
                let error = PipelineError::Cancelled {
                    reason: CancelReason::HardTimeLimit,
                };
                self.handle_failure(delivery, message, registration, error, started_at, finished_at)
                    .await
            }
            HandlerOutcome::Failure(error) => {
                self.handle_failure(delivery, message, registration, error, started_at, finished_at)
                    .await
            }
        }
    }

    async fn handle_failure(
        &self,
        delivery: &BrokerMessage,
        message: TaskMessage,
        registration: &Arc<TaskRegistration>,
        error: PipelineError,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> DispatchOutcome {
        let _ = registration;
        if !self.config.resilience.enable_retry {
            return self
                .dead_letter_failure(delivery, message, error, started_at, finished_at)
                .await;
        }

        match self.retry.decide(message.retries, message.max_retries, &error) {
            RetryDecision::Retry { delay } => {
                let task_id = message.id;
                self.backend.update_state(task_id, TaskState::Retry, None).await.ok();
                self.progress.state_changed(task_id, TaskState::Started, TaskState::Retry);
                self.progress.retried(task_id, message.retries + 1);

                let now = self.clock.now();
                let chrono_delay =
                    ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::zero());
                let retried = message.into_retry(now, chrono_delay);
                let deliver_at = retried.eta.unwrap_or(now + chrono_delay);
                let attempt = retried.retries;
                let _ = self.delayed.add(retried, deliver_at).await;
                let _ = self.broker.ack(delivery).await;
                DispatchOutcome::RetryScheduled { attempt }
            }
            RetryDecision::NotRetryable | RetryDecision::Exhausted | RetryDecision::BudgetExhausted => {
                self.dead_letter_failure(delivery, message, error, started_at, finished_at)
                    .await
            }
        }
    }

    async fn dead_letter_failure(
        &self,
        delivery: &BrokerMessage,
        message: TaskMessage,
        error: PipelineError,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> DispatchOutcome {
        let task_id = message.id;
        self.backend.update_state(task_id, TaskState::Rejected, None).await.ok();
        self.progress.state_changed(task_id, TaskState::Started, TaskState::Rejected);

        let mut result = TaskResult::pending(task_id);
        result.state = TaskState::Rejected;
        result.error = Some(error.clone());
        result.started_at = Some(started_at);
        result.finished_at = Some(finished_at);
        result.retries = message.retries;
        self.backend.store_result(result, None).await.ok();

        let payload = serde_json::to_vec(&message).unwrap_or_default();
        let exception = ExceptionInfo {
            exception_type: Some("PipelineError".to_string()),
            exception_message: Some(error.to_string()),
            exception_stack: None,
        };
        let _ = self
            .dead_letter
            .put(
                task_id,
                message.task_name.clone(),
                message.queue.clone(),
                payload,
                DeadLetterReason::MaxRetriesExceeded,
                exception,
            )
            .await;
        self.progress.dead_lettered(task_id);
        let _ = self.broker.ack(delivery).await;
        DispatchOutcome::DeadLettered {
            reason: DeadLetterReason::MaxRetriesExceeded,
        }
    }

    /// Stages (a)/(c)/(d): the message never reached `Started`, so its
    /// result is recorded as a direct `Rejected` rather than routed through
    /// the full state machine. There is no in-flight execution to unwind.
    async fn reject_with_reason(
        &self,
        delivery: &BrokerMessage,
        message: &TaskMessage,
        reason: DeadLetterReason,
        detail: &str,
    ) {
        let task_id = message.id;
        self.backend.update_state(task_id, TaskState::Rejected, None).await.ok();
        self.progress.state_changed(task_id, TaskState::Pending, TaskState::Rejected);

        let mut result = TaskResult::pending(task_id);
        result.state = TaskState::Rejected;
        result.error = Some(PipelineError::Validation {
            message: detail.to_string(),
        });
        result.finished_at = Some(self.clock.now());
        self.backend.store_result(result, None).await.ok();

        let payload = serde_json::to_vec(message).unwrap_or_default();
        let exception = ExceptionInfo {
            exception_type: Some(format!("{reason:?}")),
            exception_message: Some(detail.to_string()),
            exception_stack: None,
        };
        let _ = self
            .dead_letter
            .put(task_id, message.task_name.clone(), message.queue.clone(), payload, reason, exception)
            .await;
        self.progress.dead_lettered(task_id);
        let _ = self.broker.ack(delivery).await;
    }

    /// Stages (e)/(f)/(g): the message is eligible to run but can't right
    /// now. Always ack-then-republish through the delayed store rather than
    /// a raw broker reject-with-requeue, so the same message never risks
    /// redelivery down two paths at once.
    async fn requeue_with_delay(
        &self,
        delivery: &BrokerMessage,
        message: TaskMessage,
        delay: StdDuration,
        increment_retries: bool,
    ) {
        let task_id = message.id;
        self.backend.update_state(task_id, TaskState::Requeued, None).await.ok();
        self.progress.state_changed(task_id, TaskState::Pending, TaskState::Requeued);

        let now = self.clock.now();
        let chrono_delay = ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::zero());
        let requeued = if increment_retries {
            message.into_retry(now, chrono_delay)
        } else {
            let mut message = message;
            message.eta = Some(now + chrono_delay);
            message
        };
        let deliver_at = requeued.eta.unwrap_or(now + chrono_delay);
        let _ = self.delayed.add(requeued, deliver_at).await;
        let _ = self.broker.ack(delivery).await;
    }
}

fn registry_error_to_pipeline(task_name: &str, err: RegistryError) -> PipelineError {
    PipelineError::PermanentFailure {
        task_name: task_name.to_string(),
        message: err.to_string(),
    }
}

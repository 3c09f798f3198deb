//! The consume loop: pulls deliveries off the broker, bounds concurrent
//! dispatch with a semaphore the way the pack's bulkhead pattern bounds
//! concurrent calls, and fans each delivery out to the execution
//! pipeline without waiting for it to finish.

use std::sync::Arc;

use celeris_broker::Broker;
use celeris_pipeline::{DispatchOutcome, Pipeline};
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Drives one broker consume stream into the execution pipeline.
///
/// Graceful shutdown is two-phase, matching the consume-loop contract:
/// cancelling [`WorkerLoop::shutdown_token`] stops the loop from pulling
/// new deliveries and starts a grace-period wait for in-flight dispatches
/// to finish on their own. Only once that grace period elapses does the
/// loop cancel `pipeline_shutdown` (the token every in-flight dispatch's
/// cancellation is derived from), forcing them to wind down and requeue.
pub struct WorkerLoop {
    broker: Arc<dyn Broker>,
    pipeline: Arc<Pipeline>,
    config: WorkerConfig,
    semaphore: Arc<Semaphore>,
    request_shutdown: CancellationToken,
    pipeline_shutdown: CancellationToken,
}

impl WorkerLoop {
    /// `pipeline` must have been built with
    /// `.with_shutdown_token(pipeline_shutdown.clone())`. This loop only
    /// cancels `pipeline_shutdown` itself, after the grace period, so the
    /// two must be the same token for force-cancellation to reach
    /// in-flight dispatches.
    pub fn new(
        broker: Arc<dyn Broker>,
        pipeline: Arc<Pipeline>,
        pipeline_shutdown: CancellationToken,
        config: WorkerConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            broker,
            pipeline,
            config,
            semaphore,
            request_shutdown: CancellationToken::new(),
            pipeline_shutdown,
        }
    }

    pub fn with_request_token(mut self, token: CancellationToken) -> Self {
        self.request_shutdown = token;
        self
    }

    /// The token a caller cancels to request a graceful shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.request_shutdown.clone()
    }

    /// Runs until [`WorkerLoop::shutdown_token`] is cancelled, then drains.
    pub async fn run(&self) {
        let mut stream = self.broker.consume(self.config.queues.clone());
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = self.request_shutdown.cancelled() => break,
                maybe_delivery = stream.next() => {
                    let Some(delivery) = maybe_delivery else { break };
                    let permit = tokio::select! {
                        biased;
                        _ = self.request_shutdown.cancelled() => break,
                        permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break,
                        },
                    };

                    let pipeline = self.pipeline.clone();
                    in_flight.spawn(async move {
                        let _permit = permit;
                        pipeline.dispatch(delivery).await
                    });
                }
            }

            while in_flight.try_join_next().is_some() {}
        }

        self.drain(in_flight).await;
    }

    async fn drain(&self, mut in_flight: JoinSet<DispatchOutcome>) {
        if in_flight.is_empty() {
            return;
        }

        let drained = tokio::time::timeout(self.config.shutdown_grace_period, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                remaining = in_flight.len(),
                "shutdown grace period elapsed with dispatches still in flight, force-cancelling"
            );
            self.pipeline_shutdown.cancel();
            while in_flight.join_next().await.is_some() {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use celeris_backend::InMemoryBackend;
    use celeris_broker::InMemoryBroker;
    use celeris_deadletter::InMemoryDeadLetterStore;
    use celeris_delayed::{DelayedStore, InMemoryDelayedStore};
    use celeris_registry::{Handler, HandlerError, TaskContext, TaskRegistration, TaskRegistry, TypedHandler};
    use celeris_revocation::InMemoryRevocationStore;
    use celeris_core::TaskMessage;

    use super::*;

    fn counting_handler(name: &str, counter: Arc<AtomicUsize>) -> Arc<dyn Handler> {
        Arc::new(TypedHandler::new(name, move |_input: serde_json::Value, _ctx: TaskContext| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<serde_json::Value, HandlerError>(serde_json::json!("ok"))
            }
        }))
    }

    fn sleeping_handler(name: &str, millis: u64) -> Arc<dyn Handler> {
        Arc::new(TypedHandler::new(name, move |_input: serde_json::Value, _ctx: TaskContext| async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok::<serde_json::Value, HandlerError>(serde_json::json!("ok"))
        }))
    }

    #[tokio::test]
    async fn processes_published_messages_then_stops_on_shutdown() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(
            TaskRegistry::builder()
                .register(TaskRegistration::builder("tasks.count", counting_handler("tasks.count", counter.clone())).build())
                .unwrap()
                .build(),
        );
        let broker = Arc::new(InMemoryBroker::new());
        let backend = Arc::new(InMemoryBackend::new());
        let delayed = Arc::new(InMemoryDelayedStore::new());
        let revocation = Arc::new(InMemoryRevocationStore::new());
        let dead_letter = Arc::new(InMemoryDeadLetterStore::new(broker.clone()));

        let pipeline_shutdown = CancellationToken::new();
        let pipeline = Arc::new(
            Pipeline::new(broker.clone(), backend, registry, delayed, revocation, dead_letter)
                .with_shutdown_token(pipeline_shutdown.clone()),
        );

        for _ in 0..3 {
            broker
                .publish(TaskMessage::builder("tasks.count", "default").build().unwrap())
                .await
                .unwrap();
        }

        let config = WorkerConfig::builder().max_concurrency(2).build();
        let worker = Arc::new(WorkerLoop::new(broker, pipeline, pipeline_shutdown, config));
        let worker_for_run = worker.clone();
        let run_handle = tokio::spawn(async move { worker_for_run.run().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        worker.shutdown_token().cancel();
        run_handle.await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn force_cancels_after_grace_period_elapses() {
        let registry = Arc::new(
            TaskRegistry::builder()
                .register(TaskRegistration::builder("tasks.slow", sleeping_handler("tasks.slow", 500)).build())
                .unwrap()
                .build(),
        );
        let broker = Arc::new(InMemoryBroker::new());
        let backend = Arc::new(InMemoryBackend::new());
        let delayed = Arc::new(InMemoryDelayedStore::new());
        let revocation = Arc::new(InMemoryRevocationStore::new());
        let dead_letter = Arc::new(InMemoryDeadLetterStore::new(broker.clone()));

        let pipeline_shutdown = CancellationToken::new();
        let pipeline = Arc::new(
            Pipeline::new(broker.clone(), backend, registry, delayed.clone(), revocation, dead_letter)
                .with_shutdown_token(pipeline_shutdown.clone()),
        );

        broker
            .publish(TaskMessage::builder("tasks.slow", "default").build().unwrap())
            .await
            .unwrap();

        let config = WorkerConfig::builder()
            .max_concurrency(1)
            .shutdown_grace_period(Duration::from_millis(50))
            .build();
        let worker = Arc::new(WorkerLoop::new(broker, pipeline, pipeline_shutdown.clone(), config));
        let worker_for_run = worker.clone();
        let run_handle = tokio::spawn(async move { worker_for_run.run().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        worker.shutdown_token().cancel();
        run_handle.await.unwrap();

        assert!(pipeline_shutdown.is_cancelled());
        let due = delayed
            .get_due(chrono::Utc::now() + chrono::Duration::seconds(5), 10)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
    }
}

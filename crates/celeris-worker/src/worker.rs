//! The top-level facade: wires a broker, backend, registry, delayed
//! store, revocation store, dead-letter store, and execution pipeline
//! into a runnable worker, plus the optional delayed-promotion and beat
//! loops that ride alongside the consume loop.

use std::sync::Arc;

use celeris_backend::Backend;
use celeris_broker::Broker;
use celeris_core::{ProgressReporter, SharedClock, SystemClock};
use celeris_deadletter::DeadLetterStore;
use celeris_delayed::{DelayedStore, Promoter};
use celeris_pipeline::{Pipeline, PipelineConfig};
use celeris_registry::TaskRegistry;
use celeris_revocation::RevocationStore;
use celeris_scheduler::{Beat, Schedule};
use futures::future;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::loop_::WorkerLoop;

/// `Promoter` is generic over its concrete store and broker types, so
/// `Worker` carries the same two type parameters through to reuse it
/// rather than re-implementing delayed-message promotion. Everything
/// else the worker needs (`Pipeline`, `Beat`) takes trait objects, and
/// `Arc<B>`/`Arc<S>` coerce into those automatically at the call sites
/// that construct them.
pub struct Worker<B, S>
where
    B: Broker + 'static,
    S: DelayedStore + 'static,
{
    pipeline: Arc<Pipeline>,
    worker_loop: WorkerLoop,
    promoter: Promoter<S, B>,
    beat: Option<Beat>,
    shutdown: CancellationToken,
}

impl<B, S> Worker<B, S>
where
    B: Broker + 'static,
    S: DelayedStore + 'static,
{
    pub fn builder(
        broker: Arc<B>,
        backend: Arc<dyn Backend>,
        registry: Arc<TaskRegistry>,
        delayed: Arc<S>,
        revocation: Arc<dyn RevocationStore>,
        dead_letter: Arc<dyn DeadLetterStore>,
    ) -> WorkerBuilder<B, S> {
        WorkerBuilder::new(broker, backend, registry, delayed, revocation, dead_letter)
    }

    /// The token a caller cancels to request a graceful shutdown of the
    /// consume loop, the delayed-promotion loop, and the beat loop (if
    /// configured) together.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn progress_reporter(&self) -> &ProgressReporter {
        self.pipeline.progress_reporter()
    }

    /// Runs the consume loop, the delayed-promotion loop, and (if
    /// configured) the beat loop concurrently until
    /// [`Worker::shutdown_token`] is cancelled and every loop has wound
    /// down on its own terms.
    pub async fn run(&self) {
        match &self.beat {
            Some(beat) => {
                future::join3(self.worker_loop.run(), self.run_promoter(), beat.run(self.shutdown.clone())).await;
            }
            None => {
                future::join(self.worker_loop.run(), self.run_promoter()).await;
            }
        }
    }

    /// `Promoter::run` is signalled over a `oneshot` channel rather than
    /// a `CancellationToken`; this bridges the worker's shared token into
    /// that shape so a single cancellation stops every loop.
    async fn run_promoter(&self) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let shutdown = self.shutdown.clone();
        let watcher = tokio::spawn(async move {
            shutdown.cancelled().await;
            let _ = tx.send(());
        });
        self.promoter.run(rx).await;
        watcher.abort();
    }
}

pub struct WorkerBuilder<B, S>
where
    B: Broker + 'static,
    S: DelayedStore + 'static,
{
    broker: Arc<B>,
    backend: Arc<dyn Backend>,
    registry: Arc<TaskRegistry>,
    delayed: Arc<S>,
    revocation: Arc<dyn RevocationStore>,
    dead_letter: Arc<dyn DeadLetterStore>,
    worker_config: WorkerConfig,
    pipeline_config: Option<PipelineConfig>,
    schedule: Option<Arc<Schedule>>,
    clock: SharedClock,
}

impl<B, S> WorkerBuilder<B, S>
where
    B: Broker + 'static,
    S: DelayedStore + 'static,
{
    pub fn new(
        broker: Arc<B>,
        backend: Arc<dyn Backend>,
        registry: Arc<TaskRegistry>,
        delayed: Arc<S>,
        revocation: Arc<dyn RevocationStore>,
        dead_letter: Arc<dyn DeadLetterStore>,
    ) -> Self {
        Self {
            broker,
            backend,
            registry,
            delayed,
            revocation,
            dead_letter,
            worker_config: WorkerConfig::default(),
            pipeline_config: None,
            schedule: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn worker_config(mut self, config: WorkerConfig) -> Self {
        self.worker_config = config;
        self
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    /// Enables the beat loop, ticking the given schedule. Entries should
    /// already be registered on `schedule` before this is called.
    pub fn schedule(mut self, schedule: Arc<Schedule>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Worker<B, S> {
        let shutdown = CancellationToken::new();

        let mut pipeline = Pipeline::new(
            self.broker.clone(),
            self.backend,
            self.registry,
            self.delayed.clone(),
            self.revocation,
            self.dead_letter,
        )
        .with_clock(self.clock.clone())
        .with_shutdown_token(shutdown.clone());
        if let Some(config) = self.pipeline_config {
            pipeline = pipeline.with_config(config);
        }
        let pipeline = Arc::new(pipeline);

        let worker_loop = WorkerLoop::new(self.broker.clone(), pipeline.clone(), shutdown.clone(), self.worker_config)
            .with_request_token(shutdown.clone());

        let promoter = Promoter::new(self.delayed, self.broker.clone(), self.clock);

        let beat = self.schedule.map(|schedule| Beat::new(schedule, self.broker));

        Worker { pipeline, worker_loop, promoter, beat, shutdown }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use celeris_backend::InMemoryBackend;
    use celeris_broker::InMemoryBroker;
    use celeris_core::TaskMessage;
    use celeris_deadletter::InMemoryDeadLetterStore;
    use celeris_delayed::InMemoryDelayedStore;
    use celeris_registry::{Handler, HandlerError, TaskContext, TaskRegistration, TypedHandler};
    use celeris_revocation::InMemoryRevocationStore;
    use celeris_scheduler::{ScheduleEntry, ScheduleOptions, TaskSignature, Trigger};

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

    fn registry_with(counter: Arc<AtomicUsize>) -> Arc<TaskRegistry> {
        Arc::new(
            TaskRegistry::builder()
                .register(TaskRegistration::builder("tasks.count", counting_handler("tasks.count", counter)).build())
                .unwrap()
                .build(),
        )
    }

    #[tokio::test]
    async fn consumes_published_messages_and_shuts_down_cleanly() {
        let counter = Arc::new(AtomicUsize::new(0));
        let broker = Arc::new(InMemoryBroker::new());
        let worker = Worker::builder(
            broker.clone(),
            Arc::new(InMemoryBackend::new()),
            registry_with(counter.clone()),
            Arc::new(InMemoryDelayedStore::new()),
            Arc::new(InMemoryRevocationStore::new()),
            Arc::new(InMemoryDeadLetterStore::new(broker.clone())),
        )
        .worker_config(WorkerConfig::builder().max_concurrency(2).build())
        .build();
        let worker = Arc::new(worker);

        for _ in 0..3 {
            broker.publish(TaskMessage::builder("tasks.count", "default").build().unwrap()).await.unwrap();
        }

        let run_handle = tokio::spawn({
            let worker = worker.clone();
            async move { worker.run().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        worker.shutdown_token().cancel();
        run_handle.await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn beat_publishes_scheduled_messages_while_running() {
        let counter = Arc::new(AtomicUsize::new(0));
        let broker = Arc::new(InMemoryBroker::new());
        let schedule = Arc::new(Schedule::new());
        schedule.add(ScheduleEntry::new(
            "heartbeat",
            TaskSignature::new("tasks.count"),
            Trigger::Interval(chrono::Duration::milliseconds(10)),
            ScheduleOptions::new("default"),
        ));

        let worker = Worker::builder(
            broker.clone(),
            Arc::new(InMemoryBackend::new()),
            registry_with(counter.clone()),
            Arc::new(InMemoryDelayedStore::new()),
            Arc::new(InMemoryRevocationStore::new()),
            Arc::new(InMemoryDeadLetterStore::new(broker.clone())),
        )
        .worker_config(
            WorkerConfig::builder().max_concurrency(2).shutdown_grace_period(Duration::from_millis(100)).build(),
        )
        .schedule(schedule)
        .build();
        let worker = Arc::new(worker);

        let run_handle = tokio::spawn({
            let worker = worker.clone();
            async move { worker.run().await }
        });

        tokio::time::sleep(Duration::from_millis(120)).await;
        worker.shutdown_token().cancel();
        run_handle.await.unwrap();

        assert!(counter.load(Ordering::SeqCst) >= 1);
    }
}

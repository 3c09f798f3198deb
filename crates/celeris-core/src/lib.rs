//! Core infrastructure shared across the celeris workspace: the task
//! message envelope, the task state machine, the closed pipeline error
//! taxonomy, the event system used for observability, progress reporting,
//! and an injectable time source.

pub mod error;
pub mod events;
pub mod message;
pub mod progress;
pub mod result;
pub mod state;
pub mod time;

pub use error::{CancelReason, CeleriError, PipelineError, RequeueReason};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use message::{
    TaskMessage, TaskMessageBuilder, CURRENT_SCHEMA_VERSION, MAX_SUPPORTED_SCHEMA_VERSION,
};
pub use progress::{ProgressReporter, TaskEvent};
pub use result::{Progress, TaskResult};
pub use state::{validate_transition, TaskState};
pub use time::{Clock, FakeClock, SharedClock, SystemClock};

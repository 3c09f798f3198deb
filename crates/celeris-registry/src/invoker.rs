//! Resolves a task name to its registration and calls its handler.

use std::sync::Arc;

use serde_json::Value;

use crate::context::TaskContext;
use crate::error::RegistryError;
use crate::registry::TaskRegistry;

/// Thin wrapper around a shared [`TaskRegistry`] that performs the lookup +
/// dispatch step of the pipeline's invoke stage.
#[derive(Clone)]
pub struct Invoker {
    registry: Arc<TaskRegistry>,
}

impl Invoker {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Looks up `task_name` and invokes its handler with `args` and `ctx`.
    pub async fn invoke(
        &self,
        task_name: &str,
        args: Value,
        ctx: TaskContext,
    ) -> Result<Value, RegistryError> {
        let registration =
            self.registry
                .get(task_name)
                .ok_or_else(|| RegistryError::UnknownTask {
                    task_name: task_name.to_string(),
                })?;
        registration.handler.call(args, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, HandlerError, TypedHandler};
    use crate::registration::TaskRegistration;
    use uuid::Uuid;

    #[tokio::test]
    async fn invokes_registered_handler() {
        let handler: Arc<dyn Handler> = Arc::new(TypedHandler::new(
            "tasks.double",
            |input: i64, _ctx: TaskContext| async move { Ok::<i64, HandlerError>(input * 2) },
        ));
        let registry = Arc::new(
            TaskRegistry::builder()
                .register(TaskRegistration::builder("tasks.double", handler).build())
                .unwrap()
                .build(),
        );
        let invoker = Invoker::new(registry);
        let ctx = TaskContext::new(Uuid::new_v4(), "tasks.double", 0);
        let result = invoker
            .invoke("tasks.double", serde_json::json!(21), ctx)
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!(42));
    }

    #[tokio::test]
    async fn unknown_task_errors() {
        let registry = Arc::new(TaskRegistry::builder().build());
        let invoker = Invoker::new(registry);
        let ctx = TaskContext::new(Uuid::new_v4(), "tasks.missing", 0);
        let err = invoker
            .invoke("tasks.missing", Value::Null, ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTask { .. }));
    }
}

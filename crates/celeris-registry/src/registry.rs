//! The task registry: built once at startup, read-only thereafter so the
//! hot path never takes a lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::registration::TaskRegistration;

/// Maps task name to its registration. Construct with [`TaskRegistry::builder`],
/// then share the finished registry behind an `Arc`.
#[derive(Default)]
pub struct TaskRegistry {
    registrations: HashMap<String, Arc<TaskRegistration>>,
}

impl TaskRegistry {
    pub fn builder() -> TaskRegistryBuilder {
        TaskRegistryBuilder::new()
    }

    pub fn get(&self, task_name: &str) -> Option<&Arc<TaskRegistration>> {
        self.registrations.get(task_name)
    }

    pub fn contains(&self, task_name: &str) -> bool {
        self.registrations.contains_key(task_name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.registrations.keys().map(String::as_str)
    }
}

pub struct TaskRegistryBuilder {
    registrations: HashMap<String, Arc<TaskRegistration>>,
}

impl Default for TaskRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    pub fn register(mut self, registration: TaskRegistration) -> Result<Self, RegistryError> {
        if self.registrations.contains_key(&registration.task_name) {
            return Err(RegistryError::DuplicateRegistration {
                task_name: registration.task_name,
            });
        }
        self.registrations
            .insert(registration.task_name.clone(), Arc::new(registration));
        Ok(self)
    }

    pub fn build(self) -> TaskRegistry {
        TaskRegistry {
            registrations: self.registrations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TaskContext;
    use crate::handler::{Handler, HandlerError, TypedHandler};
    use crate::registration::TaskRegistration;
    use serde_json::Value;

    fn noop_handler() -> Arc<dyn Handler> {
        Arc::new(TypedHandler::new(
            "tasks.noop",
            |_input: Value, _ctx: TaskContext| async move { Ok::<Value, HandlerError>(Value::Null) },
        ))
    }

    #[test]
    fn lookup_finds_registered_task() {
        let registry = TaskRegistry::builder()
            .register(TaskRegistration::builder("tasks.noop", noop_handler()).build())
            .unwrap()
            .build();
        assert!(registry.contains("tasks.noop"));
        assert!(registry.get("tasks.noop").is_some());
    }

    #[test]
    fn lookup_misses_unknown_task() {
        let registry = TaskRegistry::builder().build();
        assert!(registry.get("tasks.missing").is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result = TaskRegistry::builder()
            .register(TaskRegistration::builder("tasks.noop", noop_handler()).build())
            .unwrap()
            .register(TaskRegistration::builder("tasks.noop", noop_handler()).build());
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateRegistration { .. })
        ));
    }
}

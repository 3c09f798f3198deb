//! A keyed set of [`ScheduleEntry`] records.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::entry::ScheduleEntry;
use crate::error::SchedulerError;

/// The set of periodic entries a [`crate::Beat`] drives. Mutated
/// concurrently with the tick loop, so access goes through a mutex rather
/// than requiring external synchronization.
#[derive(Default)]
pub struct Schedule {
    entries: Mutex<HashMap<String, ScheduleEntry>>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, entry: ScheduleEntry) {
        self.entries.lock().unwrap().insert(entry.name.clone(), entry);
    }

    pub fn remove(&self, name: &str) -> Option<ScheduleEntry> {
        self.entries.lock().unwrap().remove(name)
    }

    pub fn enable(&self, name: &str, enabled: bool) -> Result<(), SchedulerError> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(name)
            .ok_or_else(|| SchedulerError::UnknownEntry {
                name: name.to_string(),
            })?;
        entry.enabled = enabled;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn snapshot(&self) -> Vec<ScheduleEntry> {
        self.entries.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn record_run(&self, name: &str, at: chrono::DateTime<chrono::Utc>) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(name) {
            entry.last_run_time = Some(at);
        }
    }
}

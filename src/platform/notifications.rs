use std::{collections::HashMap, sync::Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub id: String,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Local notification scheduler.
///
/// `schedule` replaces any pending request with the same id, so a fixed id
/// never has more than one pending request. Callers treat every method as
/// fire-and-forget: errors are logged and otherwise ignored.
pub trait NotificationScheduler: Send + Sync {
    fn schedule(&self, request: NotificationRequest) -> Result<()>;
    fn cancel(&self, id: &str) -> Result<()>;
    fn cancel_all(&self) -> Result<()>;
}

/// Scheduler that only records what is pending. Used headless and in tests.
#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    pending: Mutex<HashMap<String, NotificationRequest>>,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, HashMap<String, NotificationRequest>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn pending(&self, id: &str) -> Option<NotificationRequest> {
        self.guard().get(id).cloned()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.guard().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn pending_count(&self) -> usize {
        self.guard().len()
    }
}

impl NotificationScheduler for InMemoryScheduler {
    fn schedule(&self, request: NotificationRequest) -> Result<()> {
        self.guard().insert(request.id.clone(), request);
        Ok(())
    }

    fn cancel(&self, id: &str) -> Result<()> {
        self.guard().remove(id);
        Ok(())
    }

    fn cancel_all(&self) -> Result<()> {
        self.guard().clear();
        Ok(())
    }
}

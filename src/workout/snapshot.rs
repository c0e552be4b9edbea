//! Recovery snapshot of a started session, spread over one key per purpose:
//! `isStarted_<day>`, `startTime_<day>`, `completedSets_<day>`,
//! `weights_<day>` and `effort_<day>`.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;

use crate::snapshot::KeyValueStore;

use super::ProgressSnapshot;

const STARTED: &str = "isStarted";
const START_TIME: &str = "startTime";
const COMPLETED_SETS: &str = "completedSets";
const WEIGHTS: &str = "weights";
const EFFORT: &str = "effort";

const ALL_PURPOSES: [&str; 5] = [STARTED, START_TIME, COMPLETED_SETS, WEIGHTS, EFFORT];

/// The storage keys owned by one workout day.
#[derive(Clone)]
pub struct SnapshotSlot {
    store: Arc<dyn KeyValueStore>,
    day_id: String,
}

impl SnapshotSlot {
    pub fn new(store: Arc<dyn KeyValueStore>, day_id: impl Into<String>) -> Self {
        Self {
            store,
            day_id: day_id.into(),
        }
    }

    pub fn day_id(&self) -> &str {
        &self.day_id
    }

    pub fn key(&self, purpose: &str) -> String {
        format!("{purpose}_{}", self.day_id)
    }

    pub fn save(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        self.put(START_TIME, &snapshot.started_at)?;
        self.put(COMPLETED_SETS, &snapshot.completed_sets)?;
        self.put(WEIGHTS, &snapshot.weights)?;
        self.put(EFFORT, &snapshot.effort)?;
        self.put(STARTED, &true)
    }

    /// `None` when nothing is saved, the session was not started, or any
    /// part is unreadable. Decode problems are logged, never returned.
    pub fn load(&self) -> Option<ProgressSnapshot> {
        match self.read() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(
                    "Ignoring unreadable workout snapshot for {}: {err:#}",
                    self.day_id
                );
                None
            }
        }
    }

    /// Removes every key of the day, even if one removal fails.
    pub fn clear(&self) -> Result<()> {
        let mut first_error = None;
        for purpose in ALL_PURPOSES {
            if let Err(err) = self.store.remove(&self.key(purpose)) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read(&self) -> Result<Option<ProgressSnapshot>> {
        let started: Option<bool> = self.get(STARTED)?;
        if started != Some(true) {
            return Ok(None);
        }

        let started_at: DateTime<Utc> = self
            .get(START_TIME)?
            .ok_or_else(|| anyhow!("started snapshot without a start time"))?;

        Ok(Some(ProgressSnapshot {
            started_at,
            completed_sets: self.get(COMPLETED_SETS)?.unwrap_or_default(),
            weights: self.get(WEIGHTS)?.unwrap_or_default(),
            effort: self.get(EFFORT)?.unwrap_or_default(),
        }))
    }

    fn get<T: DeserializeOwned>(&self, purpose: &str) -> Result<Option<T>> {
        let key = self.key(purpose);
        self.store
            .get(&key)
            .map(|raw| {
                serde_json::from_str(&raw).with_context(|| format!("failed to decode {key}"))
            })
            .transpose()
    }

    fn put<T: serde::Serialize>(&self, purpose: &str, value: &T) -> Result<()> {
        let key = self.key(purpose);
        let encoded = serde_json::to_string(value)?;
        self.store
            .set(&key, encoded)
            .with_context(|| format!("failed to write {key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::models::EffortLevel, snapshot::MemoryStore};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn sample() -> ProgressSnapshot {
        ProgressSnapshot {
            started_at: Utc.with_ymd_and_hms(2024, 6, 3, 18, 0, 0).unwrap(),
            completed_sets: BTreeMap::from([("Bench press".to_string(), 3)]),
            weights: BTreeMap::from([("Bench press".to_string(), 42.5)]),
            effort: BTreeMap::from([("Bench press".to_string(), EffortLevel::Normal)]),
        }
    }

    #[test]
    fn save_then_load() {
        let store = Arc::new(MemoryStore::new());
        let slot = SnapshotSlot::new(store.clone(), "day1");
        slot.save(&sample()).unwrap();

        assert_eq!(slot.load(), Some(sample()));
        assert_eq!(store.get("isStarted_day1").as_deref(), Some("true"));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn days_do_not_collide() {
        let store = Arc::new(MemoryStore::new());
        let day1 = SnapshotSlot::new(store.clone(), "day1");
        let day2 = SnapshotSlot::new(store.clone(), "day2");
        day1.save(&sample()).unwrap();

        assert_eq!(day2.load(), None);
        day2.clear().unwrap();
        assert_eq!(day1.load(), Some(sample()));
    }

    #[test]
    fn corrupt_or_partial_snapshots_load_as_none() {
        let store = Arc::new(MemoryStore::new());
        let slot = SnapshotSlot::new(store.clone(), "day3");
        slot.save(&sample()).unwrap();

        store.set("completedSets_day3", "{broken".into()).unwrap();
        assert_eq!(slot.load(), None);

        slot.save(&sample()).unwrap();
        store.remove("startTime_day3").unwrap();
        assert_eq!(slot.load(), None);

        slot.save(&sample()).unwrap();
        store.set("isStarted_day3", "false".into()).unwrap();
        assert_eq!(slot.load(), None);
    }

    #[test]
    fn clear_removes_every_key() {
        let store = Arc::new(MemoryStore::new());
        let slot = SnapshotSlot::new(store.clone(), "day1");
        slot.save(&sample()).unwrap();
        slot.clear().unwrap();

        assert!(store.is_empty());
        assert_eq!(slot.load(), None);
    }
}

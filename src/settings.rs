use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::rest_timer::RestPreset;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RestTimerSettings {
    pub default_duration_secs: u32,
}

impl Default for RestTimerSettings {
    fn default() -> Self {
        Self {
            default_duration_secs: RestPreset::default().secs(),
        }
    }
}

impl RestTimerSettings {
    /// Stored durations outside the preset set fall back to the default.
    pub fn preset(&self) -> RestPreset {
        RestPreset::try_from(self.default_duration_secs).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 18,
            minute: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    rest_timer: RestTimerSettings,
    reminders: ReminderSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn rest_timer(&self) -> RestTimerSettings {
        self.read().rest_timer.clone()
    }

    pub fn update_rest_timer(&self, settings: RestTimerSettings) -> Result<()> {
        let mut guard = self.write();
        guard.rest_timer = settings;
        self.persist(&guard)
    }

    pub fn reminders(&self) -> ReminderSettings {
        self.read().reminders.clone()
    }

    pub fn update_reminders(&self, settings: ReminderSettings) -> Result<()> {
        let mut guard = self.write();
        guard.reminders = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        assert_eq!(store.rest_timer().preset(), RestPreset::Secs90);
        assert_eq!(store.reminders(), ReminderSettings::default());
    }

    #[test]
    fn updates_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_rest_timer(RestTimerSettings {
                default_duration_secs: 120,
            })
            .unwrap();
        store
            .update_reminders(ReminderSettings {
                enabled: true,
                hour: 7,
                minute: 30,
            })
            .unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.rest_timer().preset(), RestPreset::Secs120);
        assert!(reopened.reminders().enabled);
        assert_eq!(reopened.reminders().hour, 7);
    }

    #[test]
    fn corrupt_file_and_bad_preset_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.rest_timer(), RestTimerSettings::default());

        fs::write(&path, r#"{"rest_timer":{"default_duration_secs":45}}"#).unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.rest_timer().default_duration_secs, 45);
        assert_eq!(store.rest_timer().preset(), RestPreset::Secs90);
        assert_eq!(store.reminders(), ReminderSettings::default());
    }
}

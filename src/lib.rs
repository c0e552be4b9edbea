pub mod catalog;
pub mod clock;
pub mod db;
pub mod platform;
pub mod reminders;
pub mod rest_timer;
pub mod settings;
pub mod snapshot;
pub mod stats;
pub mod utils;
pub mod workout;

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use log::{info, warn};

use catalog::{plan_for, WorkoutDay};
use db::Database;
use platform::Platform;
use rest_timer::{RestPreset, RestTimerConfig, RestTimerController};
use settings::{ReminderSettings, RestTimerSettings, SettingsStore};
use snapshot::{JsonFileStore, KeyValueStore};
use stats::{PeriodSummary, TimePeriod};
use workout::{SnapshotSlot, WorkoutConfig, WorkoutController};

const DATABASE_FILE: &str = "fittrack.sqlite3";
const SETTINGS_FILE: &str = "settings.json";
const SNAPSHOT_FILE: &str = "snapshots.json";

/// Logger for host apps and demos; reads `RUST_LOG`, defaults to info.
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

/// Everything a host app needs, rooted in one data directory.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    pub snapshots: Arc<JsonFileStore>,
    pub platform: Platform,
}

impl AppState {
    pub fn open(data_dir: PathBuf, platform: Platform) -> Result<Self> {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DATABASE_FILE))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let snapshots = Arc::new(JsonFileStore::open(data_dir.join(SNAPSHOT_FILE))?);

        // Interrupted sessions are resumed when their day is opened again.
        for day in WorkoutDay::ALL {
            let store: Arc<dyn KeyValueStore> = snapshots.clone();
            if let Some(snapshot) = SnapshotSlot::new(store, day.as_str()).load() {
                warn!(
                    "Found interrupted {} workout started at {}",
                    day.as_str(),
                    snapshot.started_at
                );
            }
        }

        info!("FitTrack data opened at {}", data_dir.display());

        Ok(Self {
            db,
            settings,
            snapshots,
            platform,
        })
    }

    /// Tracker for one plan day, resumed from its snapshot when one exists.
    pub async fn workout(&self, day: WorkoutDay) -> WorkoutController {
        WorkoutController::open(
            day.as_str(),
            plan_for(day),
            self.db.clone(),
            self.snapshots.clone(),
            self.platform.clock.clone(),
            WorkoutConfig::from_env(),
        )
        .await
    }

    pub fn rest_timer(&self) -> RestTimerController {
        let config = RestTimerConfig::from_settings(&self.settings.rest_timer());
        RestTimerController::new(config, self.platform.clone())
    }

    pub fn set_default_rest(&self, preset: RestPreset) -> Result<()> {
        self.settings.update_rest_timer(RestTimerSettings {
            default_duration_secs: preset.secs(),
        })
    }

    /// The plan day scheduled for today's weekday, if any.
    pub fn todays_workout(&self) -> Option<WorkoutDay> {
        let today = self.platform.clock.now().with_timezone(&Local).weekday();
        catalog::day_scheduled_on(today)
    }

    pub fn sync_reminders(&self) -> usize {
        let now = self.platform.clock.now().with_timezone(&Local);
        reminders::sync_reminders(
            self.platform.scheduler.as_ref(),
            &self.settings.reminders(),
            &now,
        )
    }

    pub fn update_reminders(&self, settings: ReminderSettings) -> Result<usize> {
        self.settings.update_reminders(settings)?;
        Ok(self.sync_reminders())
    }

    pub async fn period_summary(&self, period: TimePeriod) -> Result<PeriodSummary> {
        let sessions = self.db.list_sessions().await?;
        let now = self.platform.clock.now().with_timezone(&Local);
        Ok(stats::period_summary(&sessions, period, &now))
    }

    pub async fn week_streak(&self) -> Result<u32> {
        let sessions = self.db.list_sessions().await?;
        let now = self.platform.clock.now().with_timezone(&Local);
        Ok(stats::week_streak(&sessions, &now))
    }
}

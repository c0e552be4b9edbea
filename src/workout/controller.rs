use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::{
    catalog::WorkoutPlan,
    clock::Clock,
    db::{
        models::{EffortLevel, FinishedWorkout, WorkoutSessionRecord},
        Database,
    },
    snapshot::KeyValueStore,
};

use super::{snapshot::SnapshotSlot, SetOutcome, WorkoutProgress};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct WorkoutConfig {
    pub tick_interval: Duration,
    /// Log the elapsed time every this many ticks.
    pub log_every_ticks: u32,
}

impl Default for WorkoutConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            log_every_ticks: 60,
        }
    }
}

impl WorkoutConfig {
    /// `FITTRACK_DEBUG=1` logs every tick.
    pub fn from_env() -> Self {
        let debug_mode = std::env::var("FITTRACK_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            log_every_ticks: if debug_mode { 1 } else { 60 },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseOverview {
    pub name: String,
    pub completed_sets: u32,
    pub target_sets: u32,
    pub reps: u32,
    pub weight: f64,
    pub effort: Option<EffortLevel>,
    pub is_complete: bool,
}

/// What a workout screen renders.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutOverview {
    pub day_id: String,
    pub is_started: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub elapsed_label: String,
    pub total_exercises: usize,
    pub completed_exercises: usize,
    pub progress_ratio: f64,
    pub exercises: Vec<ExerciseOverview>,
}

impl WorkoutOverview {
    fn build(progress: &WorkoutProgress, now: DateTime<Utc>) -> Self {
        let exercises = progress
            .plan()
            .exercises()
            .map(|template| ExerciseOverview {
                name: template.name.clone(),
                completed_sets: progress.completed_sets(&template.name),
                target_sets: template.sets,
                reps: template.reps,
                weight: progress.weight_for(&template.name),
                effort: progress.effort(&template.name),
                is_complete: progress.is_exercise_complete(&template.name),
            })
            .collect();

        Self {
            day_id: progress.day_id().to_string(),
            is_started: progress.is_started(),
            started_at: progress.started_at(),
            elapsed_secs: progress.elapsed_secs(now),
            elapsed_label: progress.formatted_elapsed(now),
            total_exercises: progress.total_exercises(),
            completed_exercises: progress.completed_exercises_count(),
            progress_ratio: progress.progress_ratio(),
            exercises,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkoutEvent {
    ProgressChanged(WorkoutOverview),
    Elapsed { elapsed_secs: u64 },
    /// A non-final set was completed; the rest overlay should open.
    RestPrompt { exercise: String },
    Finished(WorkoutSessionRecord),
}

/// Drives one workout day screen: applies user actions, snapshots after
/// every applied mutation, ticks the elapsed clock and hands the finished
/// session to the history store.
#[derive(Clone)]
pub struct WorkoutController {
    progress: Arc<Mutex<WorkoutProgress>>,
    slot: SnapshotSlot,
    db: Database,
    clock: Arc<dyn Clock>,
    config: WorkoutConfig,
    events: broadcast::Sender<WorkoutEvent>,
    ticker: Arc<Mutex<Option<Ticker>>>,
}

/// Dropping the last controller clone drops this and stops the loop.
struct Ticker {
    cancel_guard: DropGuard,
    handle: JoinHandle<()>,
}

impl WorkoutController {
    /// Opens the tracker for `day_id`, resuming an interrupted session when
    /// a started snapshot exists.
    pub async fn open(
        day_id: impl Into<String>,
        plan: WorkoutPlan,
        db: Database,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: WorkoutConfig,
    ) -> Self {
        let day_id = day_id.into();
        let mut progress = WorkoutProgress::new(day_id.clone(), plan);

        match db.latest_weights_for_day(&day_id).await {
            Ok(weights) => progress.set_previous_weights(weights),
            Err(err) => log_warn!("Failed to load previous weights for {day_id}: {err:?}"),
        }

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let controller = Self {
            progress: Arc::new(Mutex::new(progress)),
            slot: SnapshotSlot::new(store, day_id),
            db,
            clock,
            config,
            events,
            ticker: Arc::new(Mutex::new(None)),
        };

        controller.resume().await;
        controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkoutEvent> {
        self.events.subscribe()
    }

    pub async fn overview(&self) -> WorkoutOverview {
        let progress = self.progress.lock().await;
        WorkoutOverview::build(&progress, self.clock.now())
    }

    pub async fn start(&self) -> bool {
        let applied = self
            .mutate(|progress, now| progress.start(now).then_some(()))
            .await
            .is_some();

        if applied {
            log_info!("Workout {} started", self.slot.day_id());
            self.spawn_ticker().await;
        }
        applied
    }

    pub async fn complete_set(&self, exercise: &str) -> Option<SetOutcome> {
        let outcome = self
            .mutate(|progress, _| progress.complete_set(exercise))
            .await?;

        if outcome.prompt_rest {
            self.emit(WorkoutEvent::RestPrompt {
                exercise: exercise.to_string(),
            });
        }
        Some(outcome)
    }

    pub async fn decrement_set(&self, exercise: &str) -> Option<u32> {
        self.mutate(|progress, _| progress.decrement_set(exercise))
            .await
    }

    pub async fn set_weight(&self, exercise: &str, value: f64) -> bool {
        self.mutate(|progress, _| progress.set_weight(exercise, value).then_some(()))
            .await
            .is_some()
    }

    pub async fn set_effort(&self, exercise: &str, level: Option<EffortLevel>) -> bool {
        self.mutate(|progress, _| progress.set_effort(exercise, level).then_some(()))
            .await
            .is_some()
    }

    /// Reloads the saved snapshot, if any, and restarts the elapsed ticker.
    /// Returns whether a started session was restored. A tracker that is
    /// already started in memory is never overwritten.
    pub async fn resume(&self) -> bool {
        let overview = {
            let mut progress = self.progress.lock().await;
            if progress.is_started() {
                return false;
            }
            let Some(snapshot) = self.slot.load() else {
                return false;
            };
            progress.restore(snapshot);
            WorkoutOverview::build(&progress, self.clock.now())
        };

        log_info!(
            "Resumed workout {} at {}",
            overview.day_id,
            overview.elapsed_label
        );

        self.spawn_ticker().await;
        self.emit(WorkoutEvent::ProgressChanged(overview));
        true
    }

    /// App is being suspended: make the snapshot current and stop ticking.
    pub async fn on_background(&self) {
        {
            let progress = self.progress.lock().await;
            self.persist(&progress);
        }
        self.cancel_ticker().await;
    }

    /// Back from suspension. In-memory progress wins over the snapshot,
    /// which may lag behind it after failed writes.
    pub async fn on_foreground(&self) {
        let started = {
            let progress = self.progress.lock().await;
            if progress.is_started() {
                self.persist(&progress);
            }
            progress.is_started()
        };

        if started {
            self.spawn_ticker().await;
        } else {
            self.resume().await;
        }
    }

    /// Writes the finished session to history, then clears the snapshot.
    /// `Ok(None)` when no session was started. On a history write failure
    /// the session stays in progress and its snapshot is kept.
    pub async fn finish(&self) -> Result<Option<FinishedWorkout>> {
        let (finished, overview) = {
            let mut progress = self.progress.lock().await;
            let now = self.clock.now();
            let Some(finished) = progress.finished_records(now) else {
                return Ok(None);
            };

            if let Err(err) = self.db.record_finished_workout(&finished).await {
                log_error!(
                    "Failed to record workout {}, keeping it in progress: {err:?}",
                    finished.session.workout_day
                );
                return Err(err).context("failed to save finished workout");
            }

            progress.reset();
            if let Err(err) = self.slot.clear() {
                log_warn!("Failed to clear workout snapshot: {err:?}");
            }
            (finished, WorkoutOverview::build(&progress, now))
        };

        self.cancel_ticker().await;

        log_info!(
            "Workout {} finished: {}/{} exercises in {}",
            finished.session.workout_day,
            finished.session.completed_exercises,
            finished.session.total_exercises,
            finished.session.formatted_duration()
        );

        self.emit(WorkoutEvent::Finished(finished.session.clone()));
        self.emit(WorkoutEvent::ProgressChanged(overview));
        Ok(Some(finished))
    }

    /// Abandons the session without writing history.
    pub async fn discard(&self) -> bool {
        let overview = {
            let mut progress = self.progress.lock().await;
            if !progress.is_started() {
                return false;
            }
            progress.reset();
            if let Err(err) = self.slot.clear() {
                log_warn!("Failed to clear workout snapshot: {err:?}");
            }
            WorkoutOverview::build(&progress, self.clock.now())
        };

        self.cancel_ticker().await;
        log_info!("Workout {} discarded", overview.day_id);
        self.emit(WorkoutEvent::ProgressChanged(overview));
        true
    }

    /// Applies `op`; when it reports a change, snapshots and notifies
    /// before the lock is released.
    async fn mutate<T, F>(&self, op: F) -> Option<T>
    where
        F: FnOnce(&mut WorkoutProgress, DateTime<Utc>) -> Option<T>,
    {
        let (result, overview) = {
            let mut progress = self.progress.lock().await;
            let now = self.clock.now();
            let result = op(&mut progress, now)?;
            self.persist(&progress);
            (result, WorkoutOverview::build(&progress, now))
        };

        self.emit(WorkoutEvent::ProgressChanged(overview));
        Some(result)
    }

    fn persist(&self, progress: &WorkoutProgress) {
        let Some(snapshot) = progress.to_snapshot() else {
            return;
        };
        if let Err(err) = self.slot.save(&snapshot) {
            log_warn!(
                "Failed to snapshot workout {}: {err:?}",
                progress.day_id()
            );
        }
    }

    fn emit(&self, event: WorkoutEvent) {
        let _ = self.events.send(event);
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        // Dropping the previous ticker cancels it.
        ticker_guard.take();

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(elapsed_loop(
            self.progress.clone(),
            self.clock.clone(),
            self.events.clone(),
            self.config.clone(),
            cancel_token.clone(),
        ));

        *ticker_guard = Some(Ticker {
            cancel_guard: cancel_token.drop_guard(),
            handle,
        });
    }

    async fn cancel_ticker(&self) {
        let ticker = self.ticker.lock().await.take();
        if let Some(Ticker {
            cancel_guard,
            handle,
        }) = ticker
        {
            drop(cancel_guard);
            if let Err(err) = handle.await {
                log_warn!("Workout ticker failed to join: {err:?}");
            }
        }
    }
}

/// Publishes the elapsed time until cancelled or the session ends.
async fn elapsed_loop(
    progress: Arc<Mutex<WorkoutProgress>>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<WorkoutEvent>,
    config: WorkoutConfig,
    cancel_token: CancellationToken,
) {
    let mut interval = time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let log_every = config.log_every_ticks.max(1);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let elapsed_secs = {
                    let guard = progress.lock().await;
                    if !guard.is_started() {
                        break;
                    }
                    guard.elapsed_secs(clock.now())
                };

                ticks = ticks.wrapping_add(1);
                if ticks % log_every == 0 {
                    log_debug!("Workout elapsed {elapsed_secs}s");
                }

                let _ = events.send(WorkoutEvent::Elapsed { elapsed_secs });
            }
            _ = cancel_token.cancelled() => {
                break;
            }
        }
    }
}

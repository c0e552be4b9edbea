use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::{
    platform::{NotificationRequest, Platform},
    settings::RestTimerSettings,
};

use super::{RefreshOutcome, RestPreset, RestTimerState};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// The single notification slot owned by the rest timer.
pub const REST_TIMER_NOTIFICATION_ID: &str = "rest-timer";

const HAPTIC_PULSES: u32 = 3;
const HAPTIC_SPACING: Duration = Duration::from_millis(400);
const AUTO_CLOSE_AFTER: Duration = Duration::from_secs(1);
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct RestTimerConfig {
    pub default_preset: RestPreset,
    pub extend_step_secs: u32,
    pub tick_interval: Duration,
}

impl Default for RestTimerConfig {
    fn default() -> Self {
        Self {
            default_preset: RestPreset::default(),
            extend_step_secs: 30,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl RestTimerConfig {
    pub fn from_settings(settings: &RestTimerSettings) -> Self {
        Self {
            default_preset: settings.preset(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestTimerSnapshot {
    pub state: RestTimerState,
    pub remaining_label: String,
    pub progress: f64,
}

impl From<&RestTimerState> for RestTimerSnapshot {
    fn from(state: &RestTimerState) -> Self {
        Self {
            state: state.clone(),
            remaining_label: state.formatted_remaining(),
            progress: state.progress(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestTimerEvent {
    StateChanged(RestTimerSnapshot),
    /// Countdown reached zero; the alert is playing.
    Finished,
    /// The overlay should go away.
    Closed,
}

/// Drives one rest overlay: owns the countdown state, the one-second ticker,
/// the pending "rest is over" notification and the finish alert.
#[derive(Clone)]
pub struct RestTimerController {
    state: Arc<Mutex<RestTimerState>>,
    platform: Platform,
    config: RestTimerConfig,
    events: broadcast::Sender<RestTimerEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    alert: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RestTimerController {
    pub fn new(config: RestTimerConfig, platform: Platform) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(RestTimerState::new(config.default_preset))),
            platform,
            config,
            events,
            ticker: Arc::new(Mutex::new(None)),
            alert: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RestTimerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> RestTimerSnapshot {
        RestTimerSnapshot::from(&*self.state.lock().await)
    }

    pub async fn select_duration(&self, preset: RestPreset) -> bool {
        let snapshot = {
            let mut state = self.state.lock().await;
            if !state.select_duration(preset) {
                return false;
            }
            RestTimerSnapshot::from(&*state)
        };
        self.emit(RestTimerEvent::StateChanged(snapshot));
        true
    }

    /// Starts the countdown. Returns the end time, or `None` if it was
    /// already running.
    pub async fn start(&self) -> Option<DateTime<Utc>> {
        self.cancel_alert().await;

        let (ends_at, snapshot) = {
            let mut state = self.state.lock().await;
            let ends_at = state.start(self.platform.clock.now())?;
            self.schedule_notification(ends_at);
            (ends_at, RestTimerSnapshot::from(&*state))
        };

        log_info!(
            "Rest timer started for {}s, ends at {}",
            snapshot.state.remaining_secs,
            ends_at
        );

        self.spawn_ticker().await;
        self.emit(RestTimerEvent::StateChanged(snapshot));
        Some(ends_at)
    }

    /// Adds the configured step (30 s by default) to a running countdown.
    pub async fn extend(&self) -> Option<DateTime<Utc>> {
        self.extend_by(self.config.extend_step_secs).await
    }

    pub async fn extend_by(&self, delta_secs: u32) -> Option<DateTime<Utc>> {
        let (ends_at, snapshot) = {
            let mut state = self.state.lock().await;
            let ends_at = state.extend(delta_secs)?;
            self.schedule_notification(ends_at);
            (ends_at, RestTimerSnapshot::from(&*state))
        };

        log_info!("Rest timer extended by {delta_secs}s, now ends at {ends_at}");
        self.emit(RestTimerEvent::StateChanged(snapshot));
        Some(ends_at)
    }

    /// Stop or skip. Cancels the pending notification before the reset.
    /// Returns whether a countdown was running.
    pub async fn stop(&self) -> bool {
        let snapshot = {
            let mut state = self.state.lock().await;
            if !state.is_running() {
                return false;
            }
            self.cancel_notification();
            state.stop();
            RestTimerSnapshot::from(&*state)
        };

        self.cancel_ticker().await;
        log_info!("Rest timer stopped");
        self.emit(RestTimerEvent::StateChanged(snapshot));
        true
    }

    /// The overlay went away: stop whatever is running and tell observers.
    pub async fn dismiss(&self) {
        self.stop().await;
        self.cancel_alert().await;
        self.emit(RestTimerEvent::Closed);
    }

    /// Re-derives the remaining time from the end timestamp after the app
    /// was suspended.
    pub async fn refresh_on_foreground(&self) -> RefreshOutcome {
        let outcome = self.advance().await;
        if !matches!(outcome, RefreshOutcome::Running { .. }) {
            self.cancel_ticker().await;
        }
        outcome
    }

    /// One display tick. The ticker task calls this every second.
    pub async fn tick(&self) -> RefreshOutcome {
        self.advance().await
    }

    async fn advance(&self) -> RefreshOutcome {
        let (outcome, snapshot) = {
            let mut state = self.state.lock().await;
            let outcome = state.refresh(self.platform.clock.now());
            if outcome == RefreshOutcome::Finished {
                self.cancel_notification();
            }
            (outcome, RestTimerSnapshot::from(&*state))
        };

        match outcome {
            RefreshOutcome::Idle => {}
            RefreshOutcome::Running { remaining_secs } => {
                log_debug!("Rest timer tick, {remaining_secs}s left");
                self.emit(RestTimerEvent::StateChanged(snapshot));
            }
            RefreshOutcome::Finished => {
                log_info!("Rest timer finished");
                self.emit(RestTimerEvent::StateChanged(snapshot));
                self.emit(RestTimerEvent::Finished);
                self.spawn_alert().await;
            }
        }

        outcome
    }

    fn schedule_notification(&self, ends_at: DateTime<Utc>) {
        let request = NotificationRequest {
            id: REST_TIMER_NOTIFICATION_ID.to_string(),
            fire_at: ends_at,
            title: "Rest is over".to_string(),
            body: "Time for the next set".to_string(),
        };
        if let Err(err) = self.platform.scheduler.schedule(request) {
            log_warn!("Failed to schedule rest notification: {err:?}");
        }
    }

    fn cancel_notification(&self) {
        if let Err(err) = self.platform.scheduler.cancel(REST_TIMER_NOTIFICATION_ID) {
            log_warn!("Failed to cancel rest notification: {err:?}");
        }
    }

    fn emit(&self, event: RestTimerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let tick_interval = self.config.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !matches!(controller.advance().await, RefreshOutcome::Running { .. }) {
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn spawn_alert(&self) {
        let feedback = self.platform.feedback.clone();
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            let finished_at = time::Instant::now();
            feedback.play_sound();
            for pulse in 0..HAPTIC_PULSES {
                if pulse > 0 {
                    time::sleep(HAPTIC_SPACING).await;
                }
                feedback.success_haptic();
            }
            time::sleep_until(finished_at + AUTO_CLOSE_AFTER).await;
            let _ = events.send(RestTimerEvent::Closed);
        });

        if let Some(previous) = self.alert.lock().await.replace(handle) {
            previous.abort();
        }
    }

    async fn cancel_alert(&self) {
        if let Some(handle) = self.alert.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        platform::{AlertFeedback, InMemoryScheduler},
    };
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFeedback {
        sounds: AtomicUsize,
        haptics: AtomicUsize,
    }

    impl AlertFeedback for CountingFeedback {
        fn play_sound(&self) {
            self.sounds.fetch_add(1, Ordering::SeqCst);
        }

        fn success_haptic(&self) {
            self.haptics.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        controller: RestTimerController,
        scheduler: Arc<InMemoryScheduler>,
        feedback: Arc<CountingFeedback>,
        clock: Arc<ManualClock>,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 18, 30, 0).unwrap()
    }

    fn harness(tick_interval: Duration) -> Harness {
        let scheduler = Arc::new(InMemoryScheduler::new());
        let feedback = Arc::new(CountingFeedback::default());
        let clock = Arc::new(ManualClock::new(t0()));
        let platform = Platform::new(scheduler.clone(), feedback.clone(), clock.clone());
        let config = RestTimerConfig {
            tick_interval,
            ..RestTimerConfig::default()
        };
        Harness {
            controller: RestTimerController::new(config, platform),
            scheduler,
            feedback,
            clock,
        }
    }

    fn quiet() -> Harness {
        harness(Duration::from_secs(3_600))
    }

    #[tokio::test]
    async fn start_schedules_one_notification_at_the_end() {
        let h = quiet();
        assert!(h.controller.select_duration(RestPreset::Secs60).await);
        let ends_at = h.controller.start().await.unwrap();

        assert_eq!(ends_at, t0() + chrono::Duration::seconds(60));
        assert_eq!(h.scheduler.pending_count(), 1);
        assert_eq!(
            h.scheduler.pending(REST_TIMER_NOTIFICATION_ID).map(|r| r.fire_at),
            Some(ends_at)
        );

        let snapshot = h.controller.snapshot().await;
        assert!(snapshot.state.is_running());
        assert_eq!(snapshot.state.remaining_secs, 60);
        assert_eq!(snapshot.remaining_label, "1:00");
    }

    #[tokio::test]
    async fn extend_replaces_the_pending_notification() {
        let h = quiet();
        let ends_at = h.controller.start().await.unwrap();
        let extended = h.controller.extend().await.unwrap();

        assert_eq!(extended, ends_at + chrono::Duration::seconds(30));
        assert_eq!(h.scheduler.pending_count(), 1);
        assert_eq!(
            h.scheduler.pending(REST_TIMER_NOTIFICATION_ID).map(|r| r.fire_at),
            Some(extended)
        );
        assert_eq!(h.controller.snapshot().await.state.remaining_secs, 120);
    }

    #[tokio::test]
    async fn stop_cancels_notification_and_resets() {
        let h = quiet();
        h.controller.start().await;
        h.clock.advance(chrono::Duration::seconds(20));
        h.controller.tick().await;

        assert!(h.controller.stop().await);
        assert_eq!(h.scheduler.pending_count(), 0);
        let snapshot = h.controller.snapshot().await;
        assert!(!snapshot.state.is_running());
        assert_eq!(snapshot.state.remaining_secs, 90);

        assert!(!h.controller.stop().await);
        assert!(h.controller.extend().await.is_none());
    }

    #[tokio::test]
    async fn foreground_refresh_after_suspension_finishes_once() {
        let h = quiet();
        let mut events = h.controller.subscribe();
        h.controller.start().await;

        h.clock.advance(chrono::Duration::minutes(5));
        assert_eq!(
            h.controller.refresh_on_foreground().await,
            RefreshOutcome::Finished
        );
        assert_eq!(
            h.controller.refresh_on_foreground().await,
            RefreshOutcome::Idle
        );
        assert_eq!(h.scheduler.pending_count(), 0);

        let mut finished = 0;
        while let Ok(event) = events.try_recv() {
            if event == RestTimerEvent::Finished {
                finished += 1;
            }
        }
        assert_eq!(finished, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn finish_plays_alert_then_closes() {
        let h = quiet();
        let mut events = h.controller.subscribe();
        h.controller.start().await;
        h.clock.advance(chrono::Duration::seconds(90));

        let started = time::Instant::now();
        h.controller.refresh_on_foreground().await;

        loop {
            if events.recv().await.unwrap() == RestTimerEvent::Closed {
                break;
            }
        }

        assert!(started.elapsed() >= AUTO_CLOSE_AFTER);
        assert_eq!(h.feedback.sounds.load(Ordering::SeqCst), 1);
        assert_eq!(h.feedback.haptics.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn ticker_notices_the_end() {
        let h = harness(Duration::from_millis(10));
        let mut events = h.controller.subscribe();
        h.controller.start().await;
        h.clock.advance(chrono::Duration::seconds(91));

        let finished = time::timeout(Duration::from_secs(5), async {
            loop {
                if events.recv().await.unwrap() == RestTimerEvent::Finished {
                    break;
                }
            }
        })
        .await;

        assert!(finished.is_ok());
        assert!(!h.controller.snapshot().await.state.is_running());
        assert_eq!(h.scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn dismiss_while_running_leaves_nothing_pending() {
        let h = quiet();
        let mut events = h.controller.subscribe();
        h.controller.start().await;
        h.controller.dismiss().await;

        assert_eq!(h.scheduler.pending_count(), 0);
        let mut closed = false;
        while let Ok(event) = events.try_recv() {
            closed |= event == RestTimerEvent::Closed;
        }
        assert!(closed);
    }
}

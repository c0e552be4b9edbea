use std::convert::TryFrom;

use anyhow::{anyhow, Error};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format::format_countdown;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "u32", into = "u32")]
pub enum RestPreset {
    Secs30,
    Secs60,
    #[default]
    Secs90,
    Secs120,
    Secs180,
}

impl RestPreset {
    pub const ALL: [RestPreset; 5] = [
        RestPreset::Secs30,
        RestPreset::Secs60,
        RestPreset::Secs90,
        RestPreset::Secs120,
        RestPreset::Secs180,
    ];

    pub fn secs(&self) -> u32 {
        match self {
            RestPreset::Secs30 => 30,
            RestPreset::Secs60 => 60,
            RestPreset::Secs90 => 90,
            RestPreset::Secs120 => 120,
            RestPreset::Secs180 => 180,
        }
    }
}

impl TryFrom<u32> for RestPreset {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        RestPreset::ALL
            .into_iter()
            .find(|preset| preset.secs() == value)
            .ok_or_else(|| anyhow!("{value}s is not a rest preset"))
    }
}

impl From<RestPreset> for u32 {
    fn from(preset: RestPreset) -> Self {
        preset.secs()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RestTimerStatus {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Idle,
    Running { remaining_secs: u32 },
    /// The countdown hit zero on this refresh; the state is already reset.
    Finished,
}

/// Countdown between sets.
///
/// While running, `ends_at` is the source of truth and `remaining_secs` is
/// re-derived from it on every refresh. While idle, `remaining_secs` equals
/// the selected preset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestTimerState {
    pub status: RestTimerStatus,
    pub selected: RestPreset,
    pub remaining_secs: u32,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Default for RestTimerState {
    fn default() -> Self {
        Self::new(RestPreset::default())
    }
}

impl RestTimerState {
    pub fn new(selected: RestPreset) -> Self {
        Self {
            status: RestTimerStatus::Idle,
            selected,
            remaining_secs: selected.secs(),
            ends_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RestTimerStatus::Running
    }

    pub fn select_duration(&mut self, preset: RestPreset) -> bool {
        if self.is_running() {
            return false;
        }
        self.selected = preset;
        self.remaining_secs = preset.secs();
        true
    }

    /// Returns the end time, or `None` when already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.is_running() {
            return None;
        }
        let ends_at = now + Duration::seconds(i64::from(self.remaining_secs));
        self.status = RestTimerStatus::Running;
        self.ends_at = Some(ends_at);
        Some(ends_at)
    }

    /// Pushes the end out by `delta_secs`. Returns the new end time, or
    /// `None` when idle.
    pub fn extend(&mut self, delta_secs: u32) -> Option<DateTime<Utc>> {
        if !self.is_running() {
            return None;
        }
        let ends_at = self.ends_at? + Duration::seconds(i64::from(delta_secs));
        self.remaining_secs = self.remaining_secs.saturating_add(delta_secs);
        self.ends_at = Some(ends_at);
        Some(ends_at)
    }

    pub fn refresh(&mut self, now: DateTime<Utc>) -> RefreshOutcome {
        let ends_at = match (self.status, self.ends_at) {
            (RestTimerStatus::Running, Some(ends_at)) => ends_at,
            _ => return RefreshOutcome::Idle,
        };

        let remaining = remaining_secs_until(ends_at, now);
        if remaining == 0 {
            self.stop();
            return RefreshOutcome::Finished;
        }

        self.remaining_secs = remaining;
        RefreshOutcome::Running {
            remaining_secs: remaining,
        }
    }

    /// Back to idle with the selected preset loaded. Returns whether the
    /// countdown was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.status = RestTimerStatus::Idle;
        self.ends_at = None;
        self.remaining_secs = self.selected.secs();
        was_running
    }

    pub fn progress(&self) -> f64 {
        let selected = f64::from(self.selected.secs());
        (f64::from(self.remaining_secs) / selected).clamp(0.0, 1.0)
    }

    pub fn formatted_remaining(&self) -> String {
        format_countdown(self.remaining_secs)
    }
}

/// Whole seconds left, rounded up so a fresh countdown shows its full
/// length until the first second has actually passed.
fn remaining_secs_until(ends_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = (ends_at - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let secs = (millis + 999) / 1000;
    u32::try_from(secs).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 18, 30, 0).unwrap()
    }

    #[test]
    fn every_preset_starts_with_its_full_length() {
        for preset in RestPreset::ALL {
            let mut state = RestTimerState::default();
            assert!(state.select_duration(preset));
            let ends_at = state.start(t0()).unwrap();

            assert!(state.is_running());
            assert_eq!(state.remaining_secs, preset.secs());
            assert_eq!(ends_at, t0() + Duration::seconds(i64::from(preset.secs())));
        }
    }

    #[test]
    fn presets_reject_other_durations() {
        assert_eq!(RestPreset::try_from(120).unwrap(), RestPreset::Secs120);
        assert!(RestPreset::try_from(45).is_err());
        assert!(serde_json::from_str::<RestPreset>("45").is_err());
        assert_eq!(serde_json::to_string(&RestPreset::Secs60).unwrap(), "60");
    }

    #[test]
    fn duration_is_locked_while_running() {
        let mut state = RestTimerState::new(RestPreset::Secs60);
        state.start(t0());
        assert!(!state.select_duration(RestPreset::Secs180));
        assert_eq!(state.selected, RestPreset::Secs60);
        assert!(state.start(t0()).is_none());
    }

    #[test]
    fn extend_moves_remaining_and_end_together() {
        let mut state = RestTimerState::new(RestPreset::Secs90);
        let ends_at = state.start(t0()).unwrap();

        let extended = state.extend(30).unwrap();
        assert_eq!(extended, ends_at + Duration::seconds(30));
        assert_eq!(state.remaining_secs, 120);
        assert_eq!(state.progress(), 1.0);

        assert_eq!(
            state.refresh(t0() + Duration::seconds(100)),
            RefreshOutcome::Running { remaining_secs: 20 }
        );
    }

    #[test]
    fn extend_is_ignored_while_idle() {
        let mut state = RestTimerState::default();
        assert!(state.extend(30).is_none());
        assert_eq!(state.remaining_secs, 90);
    }

    #[test]
    fn refresh_past_the_end_finishes_exactly_once() {
        let mut state = RestTimerState::new(RestPreset::Secs30);
        state.start(t0());

        let late = t0() + Duration::minutes(10);
        assert_eq!(state.refresh(late), RefreshOutcome::Finished);
        assert!(!state.is_running());
        assert_eq!(state.remaining_secs, 30);
        assert_eq!(state.ends_at, None);

        assert_eq!(state.refresh(late), RefreshOutcome::Idle);
    }

    #[test]
    fn partial_seconds_round_up() {
        let mut state = RestTimerState::new(RestPreset::Secs30);
        state.start(t0());
        assert_eq!(
            state.refresh(t0() + Duration::milliseconds(29_200)),
            RefreshOutcome::Running { remaining_secs: 1 }
        );
        assert_eq!(
            state.refresh(t0() + Duration::seconds(30)),
            RefreshOutcome::Finished
        );
    }

    #[test]
    fn stop_restores_selected_duration() {
        let mut state = RestTimerState::new(RestPreset::Secs120);
        state.start(t0());
        state.refresh(t0() + Duration::seconds(50));
        assert_eq!(state.remaining_secs, 70);
        assert_eq!(state.formatted_remaining(), "1:10");

        assert!(state.stop());
        assert_eq!(state.remaining_secs, 120);
        assert!(!state.stop());
    }
}

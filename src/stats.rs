//! Read-only progress figures derived from history records.
//!
//! Every function takes `now` in the user's time zone; calendar questions
//! (which day, which week) are answered in that zone.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::db::models::{CompletedExerciseRecord, WorkoutSessionRecord};

pub use crate::utils::format::format_total_minutes;

const MAX_STREAK_WEEKS: u32 = 52;
const CALENDAR_DAYS: u64 = 35;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimePeriod {
    #[default]
    Week,
    Month,
    ThreeMonths,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 3] = [TimePeriod::Week, TimePeriod::Month, TimePeriod::ThreeMonths];

    pub fn label(&self) -> &'static str {
        match self {
            TimePeriod::Week => "Week",
            TimePeriod::Month => "Month",
            TimePeriod::ThreeMonths => "3 months",
        }
    }

    pub fn start_date<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let now = now.clone();
        match self {
            TimePeriod::Week => now - Duration::days(7),
            TimePeriod::Month => now
                .clone()
                .checked_sub_months(Months::new(1))
                .unwrap_or(now),
            TimePeriod::ThreeMonths => now
                .clone()
                .checked_sub_months(Months::new(3))
                .unwrap_or(now),
        }
    }

    /// Three sessions a week.
    pub fn expected_workouts(&self) -> u32 {
        match self {
            TimePeriod::Week => 3,
            TimePeriod::Month => 12,
            TimePeriod::ThreeMonths => 36,
        }
    }
}

/// Summary cards of the progress screen.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub period: TimePeriod,
    pub sessions: usize,
    pub average_duration_minutes: u64,
    pub completion_rate: u32,
    pub regularity_rate: u32,
    pub total_minutes: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightPoint {
    pub date: NaiveDate,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub has_workout: bool,
}

pub fn sessions_in_period<Tz: TimeZone>(
    sessions: &[WorkoutSessionRecord],
    period: TimePeriod,
    now: &DateTime<Tz>,
) -> Vec<WorkoutSessionRecord> {
    let start = period.start_date(now);
    sessions
        .iter()
        .filter(|session| session.date >= start)
        .cloned()
        .collect()
}

pub fn average_duration_minutes(sessions: &[WorkoutSessionRecord]) -> u64 {
    if sessions.is_empty() {
        return 0;
    }
    let total: u64 = sessions.iter().map(|session| session.duration_secs).sum();
    total / sessions.len() as u64 / 60
}

/// Percentage of sessions with every exercise done, rounded down.
pub fn completion_rate(sessions: &[WorkoutSessionRecord]) -> u32 {
    if sessions.is_empty() {
        return 0;
    }
    let completed = sessions.iter().filter(|session| session.is_completed).count();
    (completed * 100 / sessions.len()) as u32
}

/// Sessions against the three-a-week target, capped at 100.
pub fn regularity_rate(session_count: usize, period: TimePeriod) -> u32 {
    let expected = period.expected_workouts() as usize;
    if expected == 0 {
        return 0;
    }
    (session_count * 100 / expected).min(100) as u32
}

/// Whole minutes per session, summed.
pub fn total_minutes(sessions: &[WorkoutSessionRecord]) -> u64 {
    sessions.iter().map(WorkoutSessionRecord::duration_minutes).sum()
}

pub fn period_summary<Tz: TimeZone>(
    sessions: &[WorkoutSessionRecord],
    period: TimePeriod,
    now: &DateTime<Tz>,
) -> PeriodSummary {
    let in_period = sessions_in_period(sessions, period, now);
    PeriodSummary {
        period,
        sessions: in_period.len(),
        average_duration_minutes: average_duration_minutes(&in_period),
        completion_rate: completion_rate(&in_period),
        regularity_rate: regularity_rate(in_period.len(), period),
        total_minutes: total_minutes(&in_period),
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

fn local_date<Tz: TimeZone>(session_date: &DateTime<chrono::Utc>, tz: &Tz) -> NaiveDate {
    session_date.with_timezone(tz).date_naive()
}

/// Sessions since Monday of the current week.
pub fn sessions_this_week<Tz: TimeZone>(
    sessions: &[WorkoutSessionRecord],
    now: &DateTime<Tz>,
) -> Vec<WorkoutSessionRecord> {
    let monday = week_start(now.date_naive());
    let tz = now.timezone();
    sessions
        .iter()
        .filter(|session| local_date(&session.date, &tz) >= monday)
        .cloned()
        .collect()
}

/// Consecutive weeks, counting back from the current one, with at least one
/// session. Stops at the first empty week.
pub fn week_streak<Tz: TimeZone>(sessions: &[WorkoutSessionRecord], now: &DateTime<Tz>) -> u32 {
    let tz = now.timezone();
    let active_weeks: BTreeSet<NaiveDate> = sessions
        .iter()
        .map(|session| week_start(local_date(&session.date, &tz)))
        .collect();

    let mut week = week_start(now.date_naive());
    let mut streak = 0;
    while streak < MAX_STREAK_WEEKS && active_weeks.contains(&week) {
        streak += 1;
        week = week - Days::new(7);
    }
    streak
}

pub fn weighted_exercise_names(records: &[CompletedExerciseRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|record| record.weight > 0.0)
        .map(|record| record.exercise_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Heaviest recorded weight per calendar day for `exercise`, oldest first.
pub fn weight_progression<Tz: TimeZone>(
    records: &[CompletedExerciseRecord],
    exercise: &str,
    tz: &Tz,
) -> Vec<WeightPoint> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| record.exercise_name == exercise && record.weight > 0.0)
    {
        let day = local_date(&record.date, tz);
        let entry = by_day.entry(day).or_insert(record.weight);
        *entry = entry.max(record.weight);
    }

    by_day
        .into_iter()
        .map(|(date, weight)| WeightPoint { date, weight })
        .collect()
}

/// Activity calendar: five weeks starting four weeks before this week's
/// Monday, flagging the days with at least one session.
pub fn workout_days_in_window<Tz: TimeZone>(
    sessions: &[WorkoutSessionRecord],
    now: &DateTime<Tz>,
) -> Vec<CalendarDay> {
    let tz = now.timezone();
    let days: BTreeSet<NaiveDate> = sessions
        .iter()
        .map(|session| local_date(&session.date, &tz))
        .collect();

    let first = week_start(now.date_naive()) - Days::new(28);
    (0..CALENDAR_DAYS)
        .map(|offset| {
            let date = first + Days::new(offset);
            CalendarDay {
                date,
                has_workout: days.contains(&date),
            }
        })
        .collect()
}

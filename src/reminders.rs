//! Weekly workout reminders, one per plan day.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use log::{info, warn};

use crate::{
    catalog::WorkoutDay,
    platform::{NotificationRequest, NotificationScheduler},
    settings::ReminderSettings,
};

/// `workout-2`, `workout-4`, `workout-6`: the weekday number counted from
/// Sunday = 1.
pub fn reminder_id(day: WorkoutDay) -> String {
    format!("workout-{}", day.scheduled_weekday().number_from_sunday())
}

pub fn reminder_ids() -> Vec<String> {
    WorkoutDay::ALL.into_iter().map(reminder_id).collect()
}

/// Next moment strictly after `now` that falls on `day`'s weekday at
/// `hour:minute` local time. `None` for an invalid time of day.
pub fn next_occurrence<Tz: TimeZone>(
    day: WorkoutDay,
    hour: u32,
    minute: u32,
    now: &DateTime<Tz>,
) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let weekday = day.scheduled_weekday();
    let today = now.date_naive();
    let days_ahead = (7 + weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;

    // Later weeks cover "today, but already past" and a local time that
    // does not exist on the first candidate date.
    (0..3)
        .map(|week| today + Duration::days(days_ahead + 7 * week))
        .filter_map(|date| {
            now.timezone()
                .from_local_datetime(&date.and_time(time))
                .earliest()
        })
        .map(|candidate| candidate.with_timezone(&Utc))
        .find(|candidate| *candidate > now.with_timezone(&Utc))
}

/// Cancels every reminder, then schedules the next occurrence of each plan
/// day when reminders are enabled. Returns how many were scheduled.
/// Scheduler failures are logged and skipped.
pub fn sync_reminders<Tz: TimeZone>(
    scheduler: &dyn NotificationScheduler,
    settings: &ReminderSettings,
    now: &DateTime<Tz>,
) -> usize {
    for id in reminder_ids() {
        if let Err(err) = scheduler.cancel(&id) {
            warn!("Failed to cancel reminder {id}: {err:?}");
        }
    }

    if !settings.enabled {
        info!("Workout reminders disabled");
        return 0;
    }

    let mut scheduled = 0;
    for day in WorkoutDay::ALL {
        let Some(fire_at) = next_occurrence(day, settings.hour, settings.minute, now) else {
            warn!(
                "Invalid reminder time {:02}:{:02}",
                settings.hour, settings.minute
            );
            return 0;
        };

        let request = NotificationRequest {
            id: reminder_id(day),
            fire_at,
            title: "Workout time".to_string(),
            body: format!("Today: {}", day.title()),
        };

        match scheduler.schedule(request) {
            Ok(()) => scheduled += 1,
            Err(err) => warn!("Failed to schedule reminder for {}: {err:?}", day.as_str()),
        }
    }

    info!(
        "Scheduled {scheduled} workout reminders at {:02}:{:02}",
        settings.hour, settings.minute
    );
    scheduled
}

//! Display helpers shared by the timers and the reporting views.

/// `m:ss` rendering used for workout elapsed time and session durations.
pub fn format_clock(total_secs: u64) -> String {
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    format!("{minutes}:{seconds:02}")
}

/// Rest countdown rendering: bare seconds under a minute, `m:ss` above.
pub fn format_countdown(remaining_secs: u32) -> String {
    let minutes = remaining_secs / 60;
    let seconds = remaining_secs % 60;
    if minutes > 0 {
        format!("{minutes}:{seconds:02}")
    } else {
        seconds.to_string()
    }
}

/// Total training time, e.g. `"45m"` or `"2h 5m"`.
pub fn format_total_minutes(total_minutes: u64) -> String {
    if total_minutes >= 60 {
        format!("{}h {}m", total_minutes / 60, total_minutes % 60)
    } else {
        format!("{total_minutes}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pads_seconds() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(3_725), "62:05");
    }

    #[test]
    fn countdown_drops_minutes_below_one_minute() {
        assert_eq!(format_countdown(45), "45");
        assert_eq!(format_countdown(0), "0");
        assert_eq!(format_countdown(90), "1:30");
        assert_eq!(format_countdown(180), "3:00");
    }

    #[test]
    fn total_minutes_switches_to_hours() {
        assert_eq!(format_total_minutes(45), "45m");
        assert_eq!(format_total_minutes(60), "1h 0m");
        assert_eq!(format_total_minutes(125), "2h 5m");
    }
}

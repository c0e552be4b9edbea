//! Finished-workout records. Append-only: rows are written once when a
//! session is finished and afterwards only read or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::format::format_clock;

use super::EffortLevel;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSessionRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub workout_day: String,
    pub duration_secs: u64,
    pub is_completed: bool,
    pub total_exercises: u32,
    pub completed_exercises: u32,
}

impl WorkoutSessionRecord {
    pub fn formatted_duration(&self) -> String {
        format_clock(self.duration_secs)
    }

    pub fn duration_minutes(&self) -> u64 {
        self.duration_secs / 60
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedExerciseRecord {
    pub id: String,
    pub session_id: String,
    pub exercise_name: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: f64,
    pub completed_sets: u32,
    pub date: DateTime<Utc>,
    pub workout_day: String,
    pub effort: Option<EffortLevel>,
}

impl CompletedExerciseRecord {
    pub fn is_completed(&self) -> bool {
        self.completed_sets >= self.sets
    }
}

/// Everything a finished session hands to the history store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinishedWorkout {
    pub session: WorkoutSessionRecord,
    pub exercises: Vec<CompletedExerciseRecord>,
}

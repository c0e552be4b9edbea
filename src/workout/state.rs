use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    catalog::{ExerciseTemplate, WorkoutPlan},
    db::models::{CompletedExerciseRecord, EffortLevel, FinishedWorkout, WorkoutSessionRecord},
    utils::format::format_clock,
};

/// Result of a successful `complete_set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    pub completed: u32,
    pub target: u32,
    /// Every set but the exercise's last one is followed by a rest prompt.
    pub prompt_rest: bool,
}

/// The mutable part of a started session, as written to recovery storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub started_at: DateTime<Utc>,
    pub completed_sets: BTreeMap<String, u32>,
    pub weights: BTreeMap<String, f64>,
    pub effort: BTreeMap<String, EffortLevel>,
}

/// Per-exercise set, weight and effort tracking for one workout day.
///
/// Operations whose preconditions do not hold (not started, unknown
/// exercise, count already at target or zero) change nothing and report
/// `None`/`false`.
#[derive(Debug, Clone)]
pub struct WorkoutProgress {
    day_id: String,
    plan: WorkoutPlan,
    started_at: Option<DateTime<Utc>>,
    completed_sets: BTreeMap<String, u32>,
    weights: BTreeMap<String, f64>,
    effort: BTreeMap<String, EffortLevel>,
    previous_weights: HashMap<String, f64>,
}

impl WorkoutProgress {
    pub fn new(day_id: impl Into<String>, plan: WorkoutPlan) -> Self {
        Self {
            day_id: day_id.into(),
            plan,
            started_at: None,
            completed_sets: BTreeMap::new(),
            weights: BTreeMap::new(),
            effort: BTreeMap::new(),
            previous_weights: HashMap::new(),
        }
    }

    pub fn day_id(&self) -> &str {
        &self.day_id
    }

    pub fn plan(&self) -> &WorkoutPlan {
        &self.plan
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Weights from the last finished session of this day, used when
    /// nothing has been recorded yet in the current one.
    pub fn set_previous_weights(&mut self, weights: HashMap<String, f64>) {
        self.previous_weights = weights;
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_started() {
            return false;
        }
        self.started_at = Some(now);
        self.completed_sets.clear();
        self.weights.clear();
        self.effort.clear();
        true
    }

    pub fn complete_set(&mut self, exercise: &str) -> Option<SetOutcome> {
        if !self.is_started() {
            return None;
        }
        let target = self.plan.exercise(exercise)?.sets;
        let count = self.completed_sets.entry(exercise.to_string()).or_insert(0);
        if *count >= target {
            return None;
        }
        *count += 1;
        Some(SetOutcome {
            completed: *count,
            target,
            prompt_rest: *count < target,
        })
    }

    /// Returns the new count.
    pub fn decrement_set(&mut self, exercise: &str) -> Option<u32> {
        let count = self.completed_sets.get_mut(exercise)?;
        if *count == 0 {
            return None;
        }
        *count -= 1;
        Some(*count)
    }

    pub fn set_weight(&mut self, exercise: &str, value: f64) -> bool {
        if !self.is_started() || self.plan.exercise(exercise).is_none() {
            return false;
        }
        if !value.is_finite() || value < 0.0 {
            return false;
        }
        self.weights.insert(exercise.to_string(), value);
        true
    }

    /// `None` clears the rating.
    pub fn set_effort(&mut self, exercise: &str, level: Option<EffortLevel>) -> bool {
        if !self.is_started() || self.plan.exercise(exercise).is_none() {
            return false;
        }
        match level {
            Some(level) => {
                self.effort.insert(exercise.to_string(), level);
            }
            None => {
                self.effort.remove(exercise);
            }
        }
        true
    }

    pub fn completed_sets(&self, exercise: &str) -> u32 {
        self.completed_sets.get(exercise).copied().unwrap_or(0)
    }

    pub fn effort(&self, exercise: &str) -> Option<EffortLevel> {
        self.effort.get(exercise).copied()
    }

    /// Recorded weight, else last session's, else the template default.
    pub fn weight_for(&self, exercise: &str) -> f64 {
        if let Some(weight) = self.weights.get(exercise) {
            return *weight;
        }
        if let Some(weight) = self.previous_weights.get(exercise) {
            return *weight;
        }
        self.plan
            .exercise(exercise)
            .and_then(|template| template.default_weight)
            .unwrap_or(0.0)
    }

    pub fn is_exercise_complete(&self, exercise: &str) -> bool {
        self.plan
            .exercise(exercise)
            .map(|template| self.template_complete(template))
            .unwrap_or(false)
    }

    fn template_complete(&self, template: &ExerciseTemplate) -> bool {
        self.completed_sets(&template.name) >= template.sets
    }

    pub fn total_exercises(&self) -> usize {
        self.plan.total_exercises()
    }

    pub fn completed_exercises_count(&self) -> usize {
        self.plan
            .exercises()
            .filter(|template| self.template_complete(template))
            .count()
    }

    pub fn progress_ratio(&self) -> f64 {
        let total = self.total_exercises();
        if total == 0 {
            return 0.0;
        }
        self.completed_exercises_count() as f64 / total as f64
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        self.started_at
            .map(|started_at| (now - started_at).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }

    pub fn formatted_elapsed(&self, now: DateTime<Utc>) -> String {
        format_clock(self.elapsed_secs(now))
    }

    pub fn to_snapshot(&self) -> Option<ProgressSnapshot> {
        Some(ProgressSnapshot {
            started_at: self.started_at?,
            completed_sets: self.completed_sets.clone(),
            weights: self.weights.clone(),
            effort: self.effort.clone(),
        })
    }

    /// Loads a recovered snapshot. Entries for exercises no longer in the
    /// plan are dropped and counts are capped at the target.
    pub fn restore(&mut self, snapshot: ProgressSnapshot) {
        self.started_at = Some(snapshot.started_at);
        self.completed_sets = snapshot
            .completed_sets
            .into_iter()
            .filter_map(|(name, count)| {
                let target = self.plan.exercise(&name)?.sets;
                Some((name, count.min(target)))
            })
            .collect();
        self.weights = snapshot
            .weights
            .into_iter()
            .filter(|(name, weight)| {
                self.plan.exercise(name).is_some() && weight.is_finite() && *weight >= 0.0
            })
            .collect();
        self.effort = snapshot
            .effort
            .into_iter()
            .filter(|(name, _)| self.plan.exercise(name).is_some())
            .collect();
    }

    /// Builds the history records for a finish at `now` without changing
    /// anything. `None` when the session was never started.
    pub fn finished_records(&self, now: DateTime<Utc>) -> Option<FinishedWorkout> {
        if !self.is_started() {
            return None;
        }

        let session_id = Uuid::new_v4().to_string();
        let total_exercises = self.total_exercises();
        let completed_exercises = self.completed_exercises_count();

        let session = WorkoutSessionRecord {
            id: session_id.clone(),
            date: now,
            workout_day: self.day_id.clone(),
            duration_secs: self.elapsed_secs(now),
            is_completed: completed_exercises == total_exercises,
            total_exercises: total_exercises as u32,
            completed_exercises: completed_exercises as u32,
        };

        let exercises = self
            .plan
            .exercises()
            .map(|template| CompletedExerciseRecord {
                id: Uuid::new_v4().to_string(),
                session_id: session_id.clone(),
                exercise_name: template.name.clone(),
                sets: template.sets,
                reps: template.reps,
                weight: self.weight_for(&template.name),
                completed_sets: self.completed_sets(&template.name),
                date: now,
                workout_day: self.day_id.clone(),
                effort: self.effort(&template.name),
            })
            .collect();

        Some(FinishedWorkout { session, exercises })
    }

    /// Back to a fresh, unstarted tracker. Weights recorded in the dropped
    /// session carry over to the next one.
    pub fn reset(&mut self) {
        for (name, weight) in std::mem::take(&mut self.weights) {
            if weight > 0.0 {
                self.previous_weights.insert(name, weight);
            }
        }
        self.started_at = None;
        self.completed_sets.clear();
        self.effort.clear();
    }

    pub fn finish(&mut self, now: DateTime<Utc>) -> Option<FinishedWorkout> {
        let finished = self.finished_records(now)?;
        self.reset();
        Some(finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workout::eighteen_set_plan;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 18, 0, 0).unwrap()
    }

    fn started() -> WorkoutProgress {
        let mut progress = WorkoutProgress::new("day1", eighteen_set_plan());
        assert!(progress.start(t0()));
        progress
    }

    #[test]
    fn nothing_moves_before_start() {
        let mut progress = WorkoutProgress::new("day1", eighteen_set_plan());
        assert!(progress.complete_set("Bench press").is_none());
        assert!(!progress.set_weight("Bench press", 50.0));
        assert!(!progress.set_effort("Bench press", Some(EffortLevel::Easy)));
        assert_eq!(progress.elapsed_secs(t0() + Duration::minutes(5)), 0);
        assert!(progress.to_snapshot().is_none());
        assert!(progress.finish(t0()).is_none());
    }

    #[test]
    fn start_only_once() {
        let mut progress = started();
        progress.complete_set("Bench press");
        assert!(!progress.start(t0() + Duration::minutes(1)));
        assert_eq!(progress.started_at(), Some(t0()));
        assert_eq!(progress.completed_sets("Bench press"), 1);
    }

    #[test]
    fn sets_climb_to_target_with_one_fewer_rest_prompt() {
        let mut progress = started();
        let mut prompts = 0;
        for expected in 1..=4 {
            let outcome = progress.complete_set("Bench press").unwrap();
            assert_eq!(outcome.completed, expected);
            assert_eq!(outcome.target, 4);
            if outcome.prompt_rest {
                prompts += 1;
            }
            assert_eq!(progress.is_exercise_complete("Bench press"), expected == 4);
        }
        assert_eq!(prompts, 3);

        assert!(progress.complete_set("Bench press").is_none());
        assert_eq!(progress.completed_sets("Bench press"), 4);
    }

    #[test]
    fn decrement_floors_at_zero_and_reopens_exercise() {
        let mut progress = started();
        assert!(progress.decrement_set("Lateral raise").is_none());

        for _ in 0..3 {
            progress.complete_set("Lateral raise");
        }
        assert!(progress.is_exercise_complete("Lateral raise"));

        assert_eq!(progress.decrement_set("Lateral raise"), Some(2));
        assert!(!progress.is_exercise_complete("Lateral raise"));

        assert_eq!(progress.decrement_set("Lateral raise"), Some(1));
        assert_eq!(progress.decrement_set("Lateral raise"), Some(0));
        assert!(progress.decrement_set("Lateral raise").is_none());
        assert_eq!(progress.completed_sets("Lateral raise"), 0);
    }

    #[test]
    fn unknown_exercises_are_ignored() {
        let mut progress = started();
        assert!(progress.complete_set("Squat").is_none());
        assert!(!progress.set_weight("Squat", 100.0));
        assert!(!progress.is_exercise_complete("Squat"));
    }

    #[test]
    fn weights_must_be_non_negative() {
        let mut progress = started();
        assert!(!progress.set_weight("Bench press", -2.5));
        assert!(!progress.set_weight("Bench press", f64::NAN));
        assert_eq!(progress.weight_for("Bench press"), 40.0);

        assert!(progress.set_weight("Bench press", 42.5));
        assert_eq!(progress.weight_for("Bench press"), 42.5);
        assert_eq!(progress.weight_for("Pec deck fly"), 0.0);
    }

    #[test]
    fn weight_fallback_order() {
        let mut progress = WorkoutProgress::new("day1", eighteen_set_plan());
        progress.set_previous_weights(HashMap::from([("Bench press".to_string(), 45.0)]));
        assert_eq!(progress.weight_for("Bench press"), 45.0);
        assert_eq!(progress.weight_for("Overhead press"), 20.0);
    }

    #[test]
    fn progress_ratio_counts_whole_exercises() {
        let mut progress = started();
        assert_eq!(progress.progress_ratio(), 0.0);
        for _ in 0..3 {
            progress.complete_set("Pec deck fly");
        }
        progress.complete_set("Bench press");
        assert_eq!(progress.completed_exercises_count(), 1);
        assert!((progress.progress_ratio() - 0.2).abs() < f64::EPSILON);

        let empty = WorkoutProgress::new("day1", WorkoutPlan::new(Vec::new()));
        assert_eq!(empty.progress_ratio(), 0.0);
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut progress = started();
        progress.complete_set("Bench press");
        progress.complete_set("Bench press");
        progress.set_weight("Overhead press", 22.5);
        progress.set_effort("Bench press", Some(EffortLevel::Hard));
        let snapshot = progress.to_snapshot().unwrap();

        let mut restored = WorkoutProgress::new("day1", eighteen_set_plan());
        restored.restore(snapshot.clone());

        assert_eq!(restored.to_snapshot(), Some(snapshot));
        assert_eq!(restored.completed_sets("Bench press"), 2);
        assert_eq!(restored.effort("Bench press"), Some(EffortLevel::Hard));
        assert_eq!(restored.weight_for("Overhead press"), 22.5);
    }

    #[test]
    fn restore_drops_stale_entries() {
        let snapshot = ProgressSnapshot {
            started_at: t0(),
            completed_sets: BTreeMap::from([
                ("Bench press".to_string(), 9),
                ("Removed exercise".to_string(), 2),
            ]),
            weights: BTreeMap::from([("Pec deck fly".to_string(), -5.0)]),
            effort: BTreeMap::from([("Removed exercise".to_string(), EffortLevel::Easy)]),
        };
        let mut progress = WorkoutProgress::new("day1", eighteen_set_plan());
        progress.restore(snapshot);

        assert!(progress.is_started());
        assert_eq!(progress.completed_sets("Bench press"), 4);
        assert_eq!(progress.completed_sets("Removed exercise"), 0);
        assert_eq!(progress.weight_for("Pec deck fly"), 0.0);
        assert_eq!(progress.effort("Removed exercise"), None);
    }

    #[test]
    fn full_workout_finishes_complete() {
        let mut progress = started();
        let names: Vec<String> = progress.plan().exercises().map(|e| e.name.clone()).collect();
        let mut calls = 0;
        for name in &names {
            while progress.complete_set(name).is_some() {
                calls += 1;
            }
        }
        assert_eq!(calls, 18);

        let finish_at = t0() + Duration::minutes(52);
        let finished = progress.finish(finish_at).unwrap();

        assert!(finished.session.is_completed);
        assert_eq!(finished.session.total_exercises, 5);
        assert_eq!(finished.session.completed_exercises, 5);
        assert_eq!(finished.session.duration_secs, 52 * 60);
        assert_eq!(finished.session.workout_day, "day1");
        assert_eq!(finished.exercises.len(), 5);
        for record in &finished.exercises {
            assert_eq!(record.session_id, finished.session.id);
            assert_eq!(record.completed_sets, record.sets);
            assert_eq!(record.date, finish_at);
        }

        assert!(!progress.is_started());
        assert_eq!(progress.completed_sets("Bench press"), 0);
    }

    #[test]
    fn finish_records_weights_effort_and_carries_weights_over() {
        let mut progress = started();
        progress.set_weight("Bench press", 50.0);
        progress.set_effort("Bench press", Some(EffortLevel::Easy));

        let finished = progress.finish(t0() + Duration::minutes(10)).unwrap();
        let bench = finished
            .exercises
            .iter()
            .find(|record| record.exercise_name == "Bench press")
            .unwrap();
        assert_eq!(bench.weight, 50.0);
        assert_eq!(bench.effort, Some(EffortLevel::Easy));
        assert!(!finished.session.is_completed);

        assert_eq!(progress.weight_for("Bench press"), 50.0);
        assert!(progress.start(t0() + Duration::days(7)));
        assert_eq!(progress.weight_for("Bench press"), 50.0);
        assert_eq!(progress.effort("Bench press"), None);
    }
}

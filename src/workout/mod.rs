pub mod controller;
pub mod snapshot;
pub mod state;

pub use controller::{
    ExerciseOverview, WorkoutConfig, WorkoutController, WorkoutEvent, WorkoutOverview,
};
pub use snapshot::SnapshotSlot;
pub use state::{ProgressSnapshot, SetOutcome, WorkoutProgress};

/// Five exercises, eighteen sets.
#[cfg(test)]
pub(crate) fn eighteen_set_plan() -> crate::catalog::WorkoutPlan {
    use crate::catalog::{ExerciseCategory, ExerciseTemplate, WorkoutPlan};

    WorkoutPlan::new(vec![
        ExerciseCategory {
            name: "Chest".into(),
            exercises: vec![
                ExerciseTemplate::new("Bench press", 4, 8, Some(40.0)),
                ExerciseTemplate::new("Pec deck fly", 3, 15, None),
            ],
        },
        ExerciseCategory {
            name: "Shoulders".into(),
            exercises: vec![
                ExerciseTemplate::new("Overhead press", 4, 10, Some(20.0)),
                ExerciseTemplate::new("Lateral raise", 3, 15, None),
            ],
        },
        ExerciseCategory {
            name: "Triceps".into(),
            exercises: vec![ExerciseTemplate::new("Rope pushdown", 4, 12, Some(25.0))],
        },
    ])
}

pub mod effort;
pub mod history;

pub use effort::EffortLevel;
pub use history::{CompletedExerciseRecord, FinishedWorkout, WorkoutSessionRecord};

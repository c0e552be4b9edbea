//! The fixed three-day training plan.
//!
//! Templates are immutable data; nothing here is mutated at runtime. Session
//! tracking keys everything by exercise name, so names are unique per day.

use std::hash::{Hash, Hasher};

use chrono::Weekday;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WorkoutDay {
    Day1,
    Day2,
    Day3,
}

impl WorkoutDay {
    pub const ALL: [WorkoutDay; 3] = [WorkoutDay::Day1, WorkoutDay::Day2, WorkoutDay::Day3];

    /// Stable identifier used in storage keys and history rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutDay::Day1 => "day1",
            WorkoutDay::Day2 => "day2",
            WorkoutDay::Day3 => "day3",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "day1" => Some(WorkoutDay::Day1),
            "day2" => Some(WorkoutDay::Day2),
            "day3" => Some(WorkoutDay::Day3),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WorkoutDay::Day1 => "Chest • Shoulders • Triceps",
            WorkoutDay::Day2 => "Back • Biceps",
            WorkoutDay::Day3 => "Legs • Abs",
        }
    }

    pub fn short_title(&self) -> &'static str {
        match self {
            WorkoutDay::Day1 => "Chest",
            WorkoutDay::Day2 => "Back",
            WorkoutDay::Day3 => "Legs",
        }
    }

    pub fn scheduled_weekday(&self) -> Weekday {
        match self {
            WorkoutDay::Day1 => Weekday::Mon,
            WorkoutDay::Day2 => Weekday::Wed,
            WorkoutDay::Day3 => Weekday::Fri,
        }
    }
}

/// Which plan day, if any, falls on `weekday`.
pub fn day_scheduled_on(weekday: Weekday) -> Option<WorkoutDay> {
    WorkoutDay::ALL
        .into_iter()
        .find(|day| day.scheduled_weekday() == weekday)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseTemplate {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub default_weight: Option<f64>,
}

impl ExerciseTemplate {
    pub fn new(name: impl Into<String>, sets: u32, reps: u32, default_weight: Option<f64>) -> Self {
        Self {
            name: name.into(),
            sets,
            reps,
            default_weight,
        }
    }

    pub fn sets_reps_text(&self) -> String {
        format!("{}×{}", self.sets, self.reps)
    }
}

// Identity is the name alone.
impl PartialEq for ExerciseTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ExerciseTemplate {}

impl Hash for ExerciseTemplate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCategory {
    pub name: String,
    pub exercises: Vec<ExerciseTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    pub categories: Vec<ExerciseCategory>,
}

impl WorkoutPlan {
    pub fn new(categories: Vec<ExerciseCategory>) -> Self {
        Self { categories }
    }

    pub fn exercises(&self) -> impl Iterator<Item = &ExerciseTemplate> {
        self.categories
            .iter()
            .flat_map(|category| category.exercises.iter())
    }

    pub fn exercise(&self, name: &str) -> Option<&ExerciseTemplate> {
        self.exercises().find(|exercise| exercise.name == name)
    }

    pub fn total_exercises(&self) -> usize {
        self.categories
            .iter()
            .map(|category| category.exercises.len())
            .sum()
    }

    pub fn total_sets(&self) -> u32 {
        self.exercises().map(|exercise| exercise.sets).sum()
    }
}

type CatalogEntry = (&'static str, u32, u32, Option<f64>);
type CatalogCategory = (&'static str, &'static [CatalogEntry]);

const DAY1: &[CatalogCategory] = &[
    ("Warm-up", &[("Bike or elliptical", 1, 5, None)]),
    (
        "Core activation",
        &[("Dead bug", 3, 10, None), ("Plank", 3, 30, None)],
    ),
    (
        "Chest",
        &[
            ("Pec deck fly", 3, 15, Some(25.0)),
            ("Machine chest press", 4, 12, Some(10.0)),
        ],
    ),
    (
        "Shoulders",
        &[
            ("Seated machine press", 3, 12, Some(20.0)),
            ("Dumbbell lateral raise", 3, 15, None),
        ],
    ),
    (
        "Triceps",
        &[
            ("Rope cable pushdown", 3, 15, Some(30.0)),
            ("Assisted dips", 3, 10, None),
        ],
    ),
    ("Cardio", &[("Walking", 1, 20, None)]),
];

const DAY2: &[CatalogCategory] = &[
    ("Warm-up", &[("Cardio", 1, 5, None)]),
    (
        "Core activation",
        &[("Dead bug", 3, 10, None), ("Side plank", 3, 20, None)],
    ),
    (
        "Back",
        &[
            ("Wide-grip lat pulldown", 4, 12, None),
            ("Seated cable row", 4, 12, None),
            ("Hammer strength row", 3, 12, None),
        ],
    ),
    (
        "Biceps",
        &[("Biceps curl", 3, 12, None), ("Hammer curl", 3, 12, None)],
    ),
    ("Rear delts", &[("Reverse pec deck", 3, 15, None)]),
    ("Cardio", &[("Walking", 1, 20, None)]),
];

const DAY3: &[CatalogCategory] = &[
    ("Warm-up", &[("Cardio", 1, 5, None)]),
    (
        "Activation",
        &[("Glute bridge", 3, 15, None), ("Dead bug", 3, 10, None)],
    ),
    (
        "Legs",
        &[
            ("Leg press", 4, 12, Some(20.0)),
            ("Leg extension", 3, 15, Some(25.0)),
            ("Lying leg curl", 3, 15, None),
            ("Hip adduction", 3, 15, Some(30.0)),
            ("Hip abduction", 3, 15, Some(35.0)),
            ("Calf raise", 3, 20, Some(10.0)),
        ],
    ),
    (
        "Abs",
        &[
            ("Machine crunch", 3, 15, Some(30.0)),
            ("Captain's chair leg raise", 3, 10, None),
        ],
    ),
    ("Cardio", &[("Walking", 1, 20, None)]),
];

fn build_plan(table: &[CatalogCategory]) -> WorkoutPlan {
    let categories = table
        .iter()
        .map(|(name, exercises)| ExerciseCategory {
            name: (*name).to_string(),
            exercises: exercises
                .iter()
                .map(|(exercise, sets, reps, weight)| {
                    ExerciseTemplate::new(*exercise, *sets, *reps, *weight)
                })
                .collect(),
        })
        .collect();
    WorkoutPlan::new(categories)
}

pub fn plan_for(day: WorkoutDay) -> WorkoutPlan {
    match day {
        WorkoutDay::Day1 => build_plan(DAY1),
        WorkoutDay::Day2 => build_plan(DAY2),
        WorkoutDay::Day3 => build_plan(DAY3),
    }
}

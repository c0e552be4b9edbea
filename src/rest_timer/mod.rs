pub mod controller;
pub mod state;

pub use controller::{
    RestTimerConfig, RestTimerController, RestTimerEvent, RestTimerSnapshot,
    REST_TIMER_NOTIFICATION_ID,
};
pub use state::{RefreshOutcome, RestPreset, RestTimerState, RestTimerStatus};

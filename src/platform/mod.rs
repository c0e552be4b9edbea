//! Capability seams for the host platform: local notifications, the
//! sound/haptic alert and the wall clock. The state machines only talk to
//! these traits.

mod feedback;
mod notifications;

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};

pub use feedback::{AlertFeedback, SilentFeedback};
pub use notifications::{InMemoryScheduler, NotificationRequest, NotificationScheduler};

/// Platform services handed to the controllers.
#[derive(Clone)]
pub struct Platform {
    pub scheduler: Arc<dyn NotificationScheduler>,
    pub feedback: Arc<dyn AlertFeedback>,
    pub clock: Arc<dyn Clock>,
}

impl Platform {
    pub fn new(
        scheduler: Arc<dyn NotificationScheduler>,
        feedback: Arc<dyn AlertFeedback>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler,
            feedback,
            clock,
        }
    }

    /// No real notifications or alerts; wall-clock time.
    pub fn headless() -> Self {
        Self::new(
            Arc::new(InMemoryScheduler::new()),
            Arc::new(SilentFeedback),
            Arc::new(SystemClock),
        )
    }
}

/// Foreground alert played when a rest countdown reaches zero.
pub trait AlertFeedback: Send + Sync {
    fn play_sound(&self);
    fn success_haptic(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFeedback;

impl AlertFeedback for SilentFeedback {
    fn play_sound(&self) {}

    fn success_haptic(&self) {}
}

use exam_core::model::TestResult;

/// Callbacks into the application that owns the session view.
pub trait SessionHost: Send + Sync {
    /// Called exactly once, when the session is scored.
    fn on_complete(&self, result: TestResult);

    /// Called when leaving a session without completing it. The durable slot
    /// already holds the paused snapshot, or is empty after an abandon.
    fn on_exit(&self);
}

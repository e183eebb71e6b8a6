use crate::model::TestMode;

/// Penalty subtracted for each wrong attempted answer under negative marking.
pub const NEGATIVE_MARK: f64 = 0.25;

/// Behavioral switches that differ between Practice and Exam sessions.
///
/// | Aspect                 | Practice            | Exam                     |
/// |------------------------|---------------------|--------------------------|
/// | Feedback               | immediate           | withheld until submit    |
/// | Answer lock            | after first grading | never                    |
/// | Auto-submit on timeout | when timed          | always when timed        |
/// | Clear response         | not available       | available until submit   |
/// | Explicit pause         | yes, view obscured  | only via save and pause  |
///
/// Negative marking is a config flag honored identically in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    mode: TestMode,
}

impl ModePolicy {
    #[must_use]
    pub const fn new(mode: TestMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn mode(self) -> TestMode {
        self.mode
    }

    /// Correctness and explanation are revealed as soon as an option is picked.
    #[must_use]
    pub const fn immediate_feedback(self) -> bool {
        matches!(self.mode, TestMode::Practice)
    }

    /// A graded question rejects further selections.
    #[must_use]
    pub const fn locks_answers(self) -> bool {
        matches!(self.mode, TestMode::Practice)
    }

    #[must_use]
    pub const fn allows_clear_response(self) -> bool {
        matches!(self.mode, TestMode::Exam)
    }

    /// Pause in place (without leaving the session view).
    #[must_use]
    pub const fn allows_inline_pause(self) -> bool {
        matches!(self.mode, TestMode::Practice)
    }

    /// The current question is hidden while paused.
    #[must_use]
    pub const fn obscures_when_paused(self) -> bool {
        matches!(self.mode, TestMode::Practice)
    }

    /// Expiry submits immediately, skipping the confirmation prompt.
    ///
    /// Untimed sessions never expire, so this only matters for countdowns.
    #[must_use]
    pub const fn auto_submits_on_timeout(self, timed: bool) -> bool {
        timed
    }
}

impl From<TestMode> for ModePolicy {
    fn from(mode: TestMode) -> Self {
        Self::new(mode)
    }
}

use exam_core::PaletteState;
use exam_core::model::{QuestionId, QuestionStatus};

/// What a Practice selection reveals right away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeFeedback {
    pub question_id: QuestionId,
    pub status: QuestionStatus,
    pub correct_option: String,
    pub explanation: String,
}

/// Running Practice tallies, derived from the graded statuses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PracticeStats {
    pub correct: usize,
    pub wrong: usize,
    pub attempted: usize,
    pub marked: usize,
}

/// One palette cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub index: usize,
    pub question_id: QuestionId,
    pub state: PaletteState,
    /// Marked and answered at once; shown as a marked cell with a badge.
    pub is_marked_and_answered: bool,
    pub is_current: bool,
}

/// Question palette with its legend counts.
///
/// Counts are independent: a marked question that is also answered counts
/// toward both `marked` and `answered`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteSummary {
    pub answered: usize,
    pub not_answered: usize,
    pub marked: usize,
    pub not_visited: usize,
    pub entries: Vec<PaletteEntry>,
}

/// Shown in the submit confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitSummary {
    pub total: usize,
    pub answered: usize,
    pub marked: usize,
    pub skipped: usize,
    /// `None` for untimed sessions.
    pub time_left_secs: Option<u32>,
}

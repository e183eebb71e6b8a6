use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::{Question, QuestionId, QuestionStatus, TestProgress};
use crate::policy::ModePolicy;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),

    #[error("question {0} is already graded and locked")]
    AnswerLocked(QuestionId),

    #[error("clearing a response is not available in this mode")]
    ClearNotAllowed,
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of a successful selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Stored without revealing correctness.
    Recorded,
    /// Stored and graded on the spot.
    Graded(QuestionStatus),
}

/// Palette classification of a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteState {
    Marked,
    Answered,
    NotAnswered,
    NotVisited,
}

//
// ─── LEDGER ────────────────────────────────────────────────────────────────────
//

/// Mutable record of answers, grading, marks and visits for one session.
///
/// Every key is a member of the session's question ids, and every answered
/// question is also visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerLedger {
    policy: ModePolicy,
    question_ids: BTreeSet<QuestionId>,
    answers: BTreeMap<QuestionId, String>,
    statuses: BTreeMap<QuestionId, QuestionStatus>,
    marked: BTreeSet<QuestionId>,
    visited: BTreeSet<QuestionId>,
}

impl AnswerLedger {
    #[must_use]
    pub fn new(policy: ModePolicy, questions: &[Question]) -> Self {
        Self {
            policy,
            question_ids: questions.iter().map(|q| q.id).collect(),
            answers: BTreeMap::new(),
            statuses: BTreeMap::new(),
            marked: BTreeSet::new(),
            visited: BTreeSet::new(),
        }
    }

    /// Rebuild a ledger from a validated progress snapshot.
    ///
    /// Answered and graded questions count as visited even if the snapshot
    /// predates visit tracking.
    #[must_use]
    pub fn restore(policy: ModePolicy, questions: &[Question], progress: &TestProgress) -> Self {
        let mut ledger = Self::new(policy, questions);
        let ids = ledger.question_ids.clone();

        ledger.answers = progress
            .answers
            .iter()
            .filter(|(id, _)| ids.contains(*id))
            .map(|(id, option)| (*id, option.clone()))
            .collect();
        if policy.immediate_feedback() {
            let answered = &ledger.answers;
            ledger.statuses = progress
                .statuses
                .iter()
                .filter(|(id, _)| answered.contains_key(*id))
                .map(|(id, status)| (*id, *status))
                .collect();
        }
        ledger.marked = progress
            .marked_questions
            .iter()
            .copied()
            .filter(|id| ids.contains(id))
            .collect();
        ledger.visited = progress
            .visited_questions
            .iter()
            .chain(ledger.answers.keys())
            .copied()
            .filter(|id| ids.contains(id))
            .collect();
        ledger
    }

    fn ensure_known(&self, id: QuestionId) -> Result<(), LedgerError> {
        if self.question_ids.contains(&id) {
            Ok(())
        } else {
            Err(LedgerError::UnknownQuestion(id))
        }
    }

    /// Record `option` as the response to `question`.
    ///
    /// Overwrites an earlier response unless the policy locks graded
    /// questions. No check is made that `option` is one of the offered
    /// options; grading is plain string equality.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownQuestion` for a foreign question and
    /// `LedgerError::AnswerLocked` when the question is already graded in a
    /// locking mode.
    pub fn select(&mut self, question: &Question, option: &str) -> Result<Selection, LedgerError> {
        self.ensure_known(question.id)?;
        if self.policy.locks_answers() && self.statuses.contains_key(&question.id) {
            return Err(LedgerError::AnswerLocked(question.id));
        }

        self.visited.insert(question.id);
        self.answers.insert(question.id, option.to_string());

        if self.policy.immediate_feedback() {
            let status = QuestionStatus::from_correct(question.is_correct(option));
            self.statuses.insert(question.id, status);
            Ok(Selection::Graded(status))
        } else {
            Ok(Selection::Recorded)
        }
    }

    /// Remove the response to `id`. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ClearNotAllowed` in modes without a clear action.
    pub fn clear(&mut self, id: QuestionId) -> Result<bool, LedgerError> {
        if !self.policy.allows_clear_response() {
            return Err(LedgerError::ClearNotAllowed);
        }
        self.ensure_known(id)?;
        Ok(self.answers.remove(&id).is_some())
    }

    /// Flip the review flag. Returns the new flag value.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownQuestion` for a foreign question.
    pub fn toggle_mark(&mut self, id: QuestionId) -> Result<bool, LedgerError> {
        self.ensure_known(id)?;
        if self.marked.remove(&id) {
            Ok(false)
        } else {
            self.marked.insert(id);
            Ok(true)
        }
    }

    /// Set the review flag. Returns true if it was newly set.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownQuestion` for a foreign question.
    pub fn mark(&mut self, id: QuestionId) -> Result<bool, LedgerError> {
        self.ensure_known(id)?;
        Ok(self.marked.insert(id))
    }

    /// Record a visit. Idempotent; a visited question stays visited.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UnknownQuestion` for a foreign question.
    pub fn visit(&mut self, id: QuestionId) -> Result<bool, LedgerError> {
        self.ensure_known(id)?;
        Ok(self.visited.insert(id))
    }

    #[must_use]
    pub fn answer(&self, id: QuestionId) -> Option<&str> {
        self.answers.get(&id).map(String::as_str)
    }

    #[must_use]
    pub fn status(&self, id: QuestionId) -> Option<QuestionStatus> {
        self.statuses.get(&id).copied()
    }

    #[must_use]
    pub fn is_marked(&self, id: QuestionId) -> bool {
        self.marked.contains(&id)
    }

    #[must_use]
    pub fn is_visited(&self, id: QuestionId) -> bool {
        self.visited.contains(&id)
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, String> {
        &self.answers
    }

    #[must_use]
    pub fn statuses(&self) -> &BTreeMap<QuestionId, QuestionStatus> {
        &self.statuses
    }

    #[must_use]
    pub fn marked(&self) -> &BTreeSet<QuestionId> {
        &self.marked
    }

    #[must_use]
    pub fn visited(&self) -> &BTreeSet<QuestionId> {
        &self.visited
    }

    /// Palette classification: marked beats answered beats visited.
    #[must_use]
    pub fn palette_state(&self, id: QuestionId) -> PaletteState {
        if self.marked.contains(&id) {
            PaletteState::Marked
        } else if self.answers.contains_key(&id) {
            PaletteState::Answered
        } else if self.visited.contains(&id) {
            PaletteState::NotAnswered
        } else {
            PaletteState::NotVisited
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

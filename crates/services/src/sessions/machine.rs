use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info, warn};

use exam_core::model::{
    Question, QuestionStatus, TestProgress, TestResult, TestSession, validate_question_set,
};
use exam_core::{
    AnswerLedger, AnswerSheet, ModePolicy, PaletteState, Selection, SessionTimer, TickOutcome,
    score_session,
};

use super::progress::{
    PaletteEntry, PaletteSummary, PracticeFeedback, PracticeStats, SubmitSummary,
};
use crate::error::SessionError;

//
// ─── STATES ────────────────────────────────────────────────────────────────────
//

/// Lifecycle position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Clock running, answering permitted.
    Active,
    /// Clock frozen. Practice hides the question.
    Paused,
    /// Submit prompt open. The global clock runs, per-question time does not.
    AwaitingSubmitConfirmation,
    /// Terminal.
    Submitted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::AwaitingSubmitConfirmation => "awaiting submit confirmation",
            Self::Submitted => "submitted",
        };
        f.write_str(label)
    }
}

/// What one clock tick did to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineTick {
    Frozen,
    Advanced,
    /// The countdown ran out and the machine moved to `Submitted`.
    /// Call `finalize` to score.
    Expired,
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

/// In-memory state machine for one test-taking session.
///
/// Owns the timer and answer ledger and applies the mode policy to every
/// action. It performs no I/O; `SessionRunner` adds persistence and host
/// callbacks on top.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    session: TestSession,
    policy: ModePolicy,
    ledger: AnswerLedger,
    timer: SessionTimer,
    current: usize,
    state: SessionState,
    result: Option<TestResult>,
}

impl SessionMachine {
    /// Start a session, restoring from `session.progress` when present.
    ///
    /// Progress that does not match the question set is discarded and the
    /// session starts fresh at the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when there are no questions and
    /// `SessionError::Question` for duplicate question ids.
    pub fn start(mut session: TestSession) -> Result<Self, SessionError> {
        if session.questions.is_empty() {
            return Err(SessionError::Empty);
        }
        validate_question_set(&session.questions)?;

        let policy = ModePolicy::from(session.config.mode());
        let limit = session.config.time_limit_secs();
        let restored = session.progress.take().and_then(|progress| {
            match progress.validate(&session.questions) {
                Ok(()) => Some(progress),
                Err(err) => {
                    warn!(session = %session.id, error = %err, "ignoring invalid progress");
                    None
                }
            }
        });

        let (ledger, timer, current) = match &restored {
            Some(progress) => (
                AnswerLedger::restore(policy, &session.questions, progress),
                SessionTimer::restore(limit, progress.elapsed_seconds, progress.time_spent.clone()),
                progress.current_q_index,
            ),
            None => (
                AnswerLedger::new(policy, &session.questions),
                SessionTimer::new(limit),
                0,
            ),
        };

        let mut machine = Self {
            session,
            policy,
            ledger,
            timer,
            current,
            state: SessionState::Active,
            result: None,
        };
        let first = machine.current_question().id;
        machine.ledger.visit(first)?;

        if restored.is_some() {
            info!(
                session = %machine.session.id,
                index = machine.current,
                elapsed = machine.timer.elapsed_secs(),
                "resumed session"
            );
        } else {
            info!(
                session = %machine.session.id,
                mode = %machine.policy.mode(),
                questions = machine.session.total_questions(),
                "started session"
            );
        }
        Ok(machine)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> &TestSession {
        &self.session
    }

    #[must_use]
    pub fn policy(&self) -> ModePolicy {
        self.policy
    }

    #[must_use]
    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    #[must_use]
    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.session.total_questions()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.session.questions[self.current]
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.total_questions()
    }

    /// The question the host may display, hidden while a Practice session is
    /// paused and after submission.
    #[must_use]
    pub fn visible_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::Submitted => None,
            SessionState::Paused if self.policy.obscures_when_paused() => None,
            _ => Some(self.current_question()),
        }
    }

    /// The scored result, once finalized.
    #[must_use]
    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    fn ensure(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::NotActive { state: self.state })
        }
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Record `option` for the current question.
    ///
    /// Returns the revealed feedback in Practice, `None` in Exam.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active` and
    /// `SessionError::Ledger` when the question is locked.
    pub fn select_option(
        &mut self,
        option: &str,
    ) -> Result<Option<PracticeFeedback>, SessionError> {
        self.ensure(SessionState::Active)?;
        let question = &self.session.questions[self.current];
        let selection = self.ledger.select(question, option)?;
        debug!(question = %question.id, ?selection, "option selected");

        Ok(match selection {
            Selection::Recorded => None,
            Selection::Graded(status) => Some(feedback_for(question, status)),
        })
    }

    /// Remove the current question's response. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active` and
    /// `SessionError::Ledger` in modes without a clear action.
    pub fn clear_response(&mut self) -> Result<bool, SessionError> {
        self.ensure(SessionState::Active)?;
        let id = self.current_question().id;
        Ok(self.ledger.clear(id)?)
    }

    /// Flip the review mark on the current question. Returns the new flag.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active`.
    pub fn toggle_mark(&mut self) -> Result<bool, SessionError> {
        self.ensure(SessionState::Active)?;
        let id = self.current_question().id;
        Ok(self.ledger.toggle_mark(id)?)
    }

    /// Mark the current question and move to the next one, if any.
    /// Returns whether the position moved.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active`.
    pub fn mark_and_next(&mut self) -> Result<bool, SessionError> {
        self.ensure(SessionState::Active)?;
        let id = self.current_question().id;
        self.ledger.mark(id)?;
        self.next()
    }

    //
    // ─── NAVIGATION ────────────────────────────────────────────────────────────
    //

    /// Jump to `index`. Out-of-range requests are ignored and return `false`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active`.
    pub fn navigate_to(&mut self, index: usize) -> Result<bool, SessionError> {
        self.ensure(SessionState::Active)?;
        if index >= self.total_questions() {
            debug!(index, total = self.total_questions(), "ignoring out-of-range navigation");
            return Ok(false);
        }
        self.current = index;
        let id = self.current_question().id;
        self.ledger.visit(id)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active`.
    pub fn next(&mut self) -> Result<bool, SessionError> {
        self.navigate_to(self.current + 1)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active`.
    pub fn previous(&mut self) -> Result<bool, SessionError> {
        match self.current.checked_sub(1) {
            Some(index) => self.navigate_to(index),
            None => {
                self.ensure(SessionState::Active)?;
                Ok(false)
            }
        }
    }

    //
    // ─── PAUSE / RESUME ────────────────────────────────────────────────────────
    //

    /// Pause in place.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PauseNotAllowed` in Exam mode (use
    /// `save_and_pause`) and `SessionError::NotActive` outside `Active`.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.ensure(SessionState::Active)?;
        if !self.policy.allows_inline_pause() {
            return Err(SessionError::PauseNotAllowed);
        }
        self.state = SessionState::Paused;
        debug!(elapsed = self.timer.elapsed_secs(), "paused");
        Ok(())
    }

    /// Freeze the session before leaving it. Available in both modes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active`.
    pub fn save_and_pause(&mut self) -> Result<(), SessionError> {
        self.ensure(SessionState::Active)?;
        self.state = SessionState::Paused;
        debug!(elapsed = self.timer.elapsed_secs(), "saved and paused");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotActive` unless paused.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.ensure(SessionState::Paused)?;
        self.state = SessionState::Active;
        debug!(elapsed = self.timer.elapsed_secs(), "resumed");
        Ok(())
    }

    //
    // ─── SUBMISSION ────────────────────────────────────────────────────────────
    //

    /// Open the submit confirmation prompt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside `Active`.
    pub fn request_submit(&mut self) -> Result<SubmitSummary, SessionError> {
        self.ensure(SessionState::Active)?;
        self.state = SessionState::AwaitingSubmitConfirmation;
        Ok(self.submit_summary())
    }

    /// Close the prompt without submitting.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` unless the prompt is open.
    pub fn cancel_submit(&mut self) -> Result<(), SessionError> {
        self.ensure(SessionState::AwaitingSubmitConfirmation)?;
        self.state = SessionState::Active;
        Ok(())
    }

    /// Confirm the open prompt and enter `Submitted`. Scoring happens in
    /// `finalize`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` on a repeat and
    /// `SessionError::NotActive` when the prompt is not open.
    pub fn begin_submit(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::AwaitingSubmitConfirmation => {
                self.state = SessionState::Submitted;
                info!(session = %self.session.id, "submission confirmed");
                Ok(())
            }
            SessionState::Submitted => Err(SessionError::AlreadySubmitted),
            state => Err(SessionError::NotActive { state }),
        }
    }

    /// Score a submitted session. Runs once; later calls are rejected.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` before submission and
    /// `SessionError::AlreadySubmitted` once a result exists.
    pub fn finalize(&mut self, completed_at: DateTime<Utc>) -> Result<TestResult, SessionError> {
        self.ensure(SessionState::Submitted)?;
        if self.result.is_some() {
            return Err(SessionError::AlreadySubmitted);
        }

        let sheet = AnswerSheet {
            answers: self.ledger.answers(),
            time_spent: self.timer.question_times(),
            total_time_secs: self.total_time_secs(),
            completed_at,
        };
        let result = score_session(&self.session, &sheet);
        info!(
            session = %self.session.id,
            percentage = result.percentage,
            status = ?result.status,
            "session scored"
        );
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Active seconds consumed: duration minus remaining for countdowns.
    fn total_time_secs(&self) -> u32 {
        let elapsed = self.timer.elapsed_secs();
        self.timer
            .limit_secs()
            .map_or(elapsed, |limit| elapsed.min(limit))
    }

    //
    // ─── CLOCK ─────────────────────────────────────────────────────────────────
    //

    /// Apply one second of wall time.
    ///
    /// While the submit prompt is open the global clock still runs, but no
    /// question is charged. Expiry moves straight to `Submitted`.
    pub fn tick(&mut self) -> MachineTick {
        if self.state == SessionState::Submitted {
            return MachineTick::Frozen;
        }
        let paused = self.state == SessionState::Paused;
        let charge_to =
            (self.state == SessionState::Active).then(|| self.current_question().id);

        match self.timer.tick(paused, charge_to) {
            TickOutcome::Frozen => MachineTick::Frozen,
            TickOutcome::Advanced => MachineTick::Advanced,
            TickOutcome::Expired => {
                if self.policy.auto_submits_on_timeout(self.timer.is_countdown()) {
                    info!(session = %self.session.id, "time expired, auto-submitting");
                    self.state = SessionState::Submitted;
                    MachineTick::Expired
                } else {
                    MachineTick::Advanced
                }
            }
        }
    }

    //
    // ─── SNAPSHOTS & VIEWS ─────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn progress(&self, now: DateTime<Utc>) -> TestProgress {
        TestProgress {
            answers: self.ledger.answers().clone(),
            statuses: self.ledger.statuses().clone(),
            marked_questions: self.ledger.marked().clone(),
            visited_questions: self.ledger.visited().clone(),
            time_spent: self.timer.question_times().clone(),
            elapsed_seconds: self.timer.elapsed_secs(),
            current_q_index: self.current,
            last_updated: now,
        }
    }

    /// Full resumable copy of the session.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> TestSession {
        self.session.clone().with_progress(self.progress(now))
    }

    /// Feedback for an already graded question. Practice only.
    #[must_use]
    pub fn feedback(&self, index: usize) -> Option<PracticeFeedback> {
        if !self.policy.immediate_feedback() {
            return None;
        }
        let question = self.session.questions.get(index)?;
        let status = self.ledger.status(question.id)?;
        Some(feedback_for(question, status))
    }

    #[must_use]
    pub fn palette(&self) -> PaletteSummary {
        let entries: Vec<PaletteEntry> = self
            .session
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let state = self.ledger.palette_state(question.id);
                PaletteEntry {
                    index,
                    question_id: question.id,
                    state,
                    is_marked_and_answered: state == PaletteState::Marked
                        && self.ledger.answer(question.id).is_some(),
                    is_current: index == self.current,
                }
            })
            .collect();

        let answered = self.ledger.answers().len();
        let visited = self.ledger.visited().len();
        PaletteSummary {
            answered,
            not_answered: visited.saturating_sub(answered),
            marked: self.ledger.marked().len(),
            not_visited: self.total_questions().saturating_sub(visited),
            entries,
        }
    }

    #[must_use]
    pub fn practice_stats(&self) -> PracticeStats {
        let statuses = self.ledger.statuses();
        let correct = statuses
            .values()
            .filter(|status| **status == QuestionStatus::Correct)
            .count();
        PracticeStats {
            correct,
            wrong: statuses.len() - correct,
            attempted: statuses.len(),
            marked: self.ledger.marked().len(),
        }
    }

    #[must_use]
    pub fn submit_summary(&self) -> SubmitSummary {
        let answered = self.ledger.answers().len();
        SubmitSummary {
            total: self.total_questions(),
            answered,
            marked: self.ledger.marked().len(),
            skipped: self.total_questions().saturating_sub(answered),
            time_left_secs: self.timer.remaining_secs(),
        }
    }
}

fn feedback_for(question: &Question, status: QuestionStatus) -> PracticeFeedback {
    PracticeFeedback {
        question_id: question.id,
        status,
        correct_option: question.answer.clone(),
        explanation: question.explanation.clone(),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

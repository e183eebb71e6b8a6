use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use exam_core::model::{Question, TestConfig, TestSession};

use crate::error::SessionError;

/// Builds the ordered question list for a new session from a question bank.
///
/// Applies the configuration in order: keep the selected difficulties,
/// optionally shuffle, truncate to `question_count`, optionally shuffle each
/// question's options. Shuffling options never touches `answer`, so grading
/// by string equality is unaffected.
pub struct SessionBuilder<'a> {
    config: &'a TestConfig,
}

impl<'a> SessionBuilder<'a> {
    #[must_use]
    pub fn new(config: &'a TestConfig) -> Self {
        Self { config }
    }

    /// Pick and order the session's questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no question matches the selected
    /// difficulties.
    pub fn select<R: Rng + ?Sized>(
        &self,
        bank: impl IntoIterator<Item = Question>,
        rng: &mut R,
    ) -> Result<Vec<Question>, SessionError> {
        let mut questions: Vec<Question> = bank
            .into_iter()
            .filter(|q| self.config.difficulties().contains(&q.difficulty))
            .collect();

        if self.config.shuffle_questions() {
            questions.shuffle(rng);
        }
        let limit = usize::try_from(self.config.question_count()).unwrap_or(usize::MAX);
        questions.truncate(limit);

        if self.config.shuffle_options() {
            for question in &mut questions {
                question.options.shuffle(rng);
            }
        }

        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        debug!(selected = questions.len(), limit, "planned session questions");
        Ok(questions)
    }

    /// Select questions and wrap them in a fresh `TestSession`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when nothing is selected and
    /// `SessionError::Question` when the bank has duplicate ids.
    pub fn build<R: Rng + ?Sized>(
        &self,
        bank: impl IntoIterator<Item = Question>,
        started_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<TestSession, SessionError> {
        let questions = self.select(bank, rng)?;
        Ok(TestSession::new(self.config.clone(), questions, started_at)?)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::config::TestConfig;
use crate::model::ids::{QuestionId, SessionId};
use crate::model::progress::TestProgress;
use crate::model::question::{Question, QuestionError, validate_question_set};

/// One attempt at a configured set of questions.
///
/// `questions` is already filtered, shuffled and truncated by the time a
/// session exists. `progress` is present only when the session is resumed
/// from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSession {
    pub id: SessionId,
    pub config: TestConfig,
    pub questions: Vec<Question>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<TestProgress>,
}

impl TestSession {
    /// Create a fresh session with a generated id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the question list is empty or has duplicate ids.
    pub fn new(
        config: TestConfig,
        questions: Vec<Question>,
        start_time: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        validate_question_set(&questions)?;
        Ok(Self {
            id: SessionId::generate(),
            config,
            questions,
            start_time,
            progress: None,
        })
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Position of the question with the given id.
    #[must_use]
    pub fn index_of(&self, id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id == id)
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Returns the same session carrying the given progress snapshot.
    #[must_use]
    pub fn with_progress(mut self, progress: TestProgress) -> Self {
        self.progress = Some(progress);
        self
    }
}

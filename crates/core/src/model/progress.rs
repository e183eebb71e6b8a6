use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress references unknown question {0}")]
    UnknownQuestion(QuestionId),

    #[error("current index {index} is out of range for {total} questions")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("question {0} has a status but no recorded answer")]
    StatusWithoutAnswer(QuestionId),
}

/// Per-question grading state revealed during Practice sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
    Correct,
    Wrong,
}

impl QuestionStatus {
    #[must_use]
    pub fn from_correct(correct: bool) -> Self {
        if correct { Self::Correct } else { Self::Wrong }
    }
}

/// Resumable snapshot of an in-flight session.
///
/// `answers` holds one entry per attempted question and never contains
/// unattempted ones. `statuses` is only populated in Practice mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestProgress {
    pub answers: BTreeMap<QuestionId, String>,
    #[serde(default)]
    pub statuses: BTreeMap<QuestionId, QuestionStatus>,
    #[serde(default)]
    pub marked_questions: BTreeSet<QuestionId>,
    #[serde(default)]
    pub visited_questions: BTreeSet<QuestionId>,
    #[serde(default)]
    pub time_spent: BTreeMap<QuestionId, u32>,
    pub elapsed_seconds: u32,
    pub current_q_index: usize,
    pub last_updated: DateTime<Utc>,
}

impl TestProgress {
    /// Checks the snapshot against the questions it claims to belong to.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` when any key references a question outside the
    /// session, the current index is out of range, or a status exists for an
    /// unanswered question.
    pub fn validate(&self, questions: &[Question]) -> Result<(), ProgressError> {
        if self.current_q_index >= questions.len() {
            return Err(ProgressError::IndexOutOfRange {
                index: self.current_q_index,
                total: questions.len(),
            });
        }

        let known: HashSet<QuestionId> = questions.iter().map(|q| q.id).collect();
        let keys = self
            .answers
            .keys()
            .chain(self.statuses.keys())
            .chain(self.marked_questions.iter())
            .chain(self.visited_questions.iter())
            .chain(self.time_spent.keys());
        for id in keys {
            if !known.contains(id) {
                return Err(ProgressError::UnknownQuestion(*id));
            }
        }

        if let Some(id) = self
            .statuses
            .keys()
            .find(|id| !self.answers.contains_key(id))
        {
            return Err(ProgressError::StatusWithoutAnswer(*id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::Difficulty;
    use crate::time::fixed_now;

    fn questions() -> Vec<Question> {
        [11_u64, 4, 30]
            .into_iter()
            .map(|id| Question {
                id: QuestionId::new(id),
                text: String::new(),
                options: vec!["A".into(), "B".into()],
                answer: "A".into(),
                explanation: String::new(),
                difficulty: Difficulty::Medium,
                topic: "T".into(),
            })
            .collect()
    }

    fn progress() -> TestProgress {
        TestProgress {
            answers: BTreeMap::from([(QuestionId::new(4), "B".to_string())]),
            statuses: BTreeMap::from([(QuestionId::new(4), QuestionStatus::Wrong)]),
            marked_questions: BTreeSet::from([QuestionId::new(30)]),
            visited_questions: BTreeSet::from([QuestionId::new(11), QuestionId::new(4)]),
            time_spent: BTreeMap::new(),
            elapsed_seconds: 10,
            current_q_index: 1,
            last_updated: fixed_now(),
        }
    }

    #[test]
    fn accepts_consistent_progress() {
        assert!(progress().validate(&questions()).is_ok());
    }

    #[test]
    fn rejects_unknown_keys() {
        let mut p = progress();
        p.answers.insert(QuestionId::new(99), "A".into());
        assert_eq!(
            p.validate(&questions()),
            Err(ProgressError::UnknownQuestion(QuestionId::new(99)))
        );
    }

    #[test]
    fn rejects_out_of_range_index() {
        let mut p = progress();
        p.current_q_index = 3;
        assert!(matches!(
            p.validate(&questions()),
            Err(ProgressError::IndexOutOfRange { index: 3, total: 3 })
        ));
    }

    #[test]
    fn rejects_orphan_status() {
        let mut p = progress();
        p.statuses.insert(QuestionId::new(11), QuestionStatus::Correct);
        assert_eq!(
            p.validate(&questions()),
            Err(ProgressError::StatusWithoutAnswer(QuestionId::new(11)))
        );
    }

    #[test]
    fn older_snapshots_without_visits_still_parse() {
        let json = r#"{"answers":{"4":"A"},"elapsed_seconds":5,"current_q_index":0,"last_updated":"2023-11-14T22:13:20Z"}"#;
        let p: TestProgress = serde_json::from_str(json).unwrap();
        assert!(p.visited_questions.is_empty());
        assert!(p.time_spent.is_empty());
        assert_eq!(p.answers.get(&QuestionId::new(4)).map(String::as_str), Some("A"));
    }
}

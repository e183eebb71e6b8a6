use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question set is empty")]
    Empty,

    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Authoring difficulty of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Parses a difficulty label, ignoring ASCII case.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question.
///
/// Supplied by the authoring pipeline and read-only for the lifetime of a
/// session. Grading compares a selected option against `answer` by exact,
/// case-sensitive string equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
    pub difficulty: Difficulty,
    pub topic: String,
}

impl Question {
    /// Returns true if `selected` is exactly the correct option.
    #[must_use]
    pub fn is_correct(&self, selected: &str) -> bool {
        self.answer == selected
    }
}

/// Checks that a question list can back a session.
///
/// # Errors
///
/// Returns `QuestionError::Empty` for an empty list and
/// `QuestionError::DuplicateId` when two questions share an id.
pub fn validate_question_set(questions: &[Question]) -> Result<(), QuestionError> {
    if questions.is_empty() {
        return Err(QuestionError::Empty);
    }
    let mut seen = HashSet::with_capacity(questions.len());
    for question in questions {
        if !seen.insert(question.id) {
            return Err(QuestionError::DuplicateId(question.id));
        }
    }
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u64) -> Question {
        Question {
            id: QuestionId::new(id),
            text: format!("Q{id}"),
            options: vec!["A".into(), "B".into()],
            answer: "A".into(),
            explanation: String::new(),
            difficulty: Difficulty::Easy,
            topic: "General".into(),
        }
    }

    #[test]
    fn grading_is_exact_and_case_sensitive() {
        let q = question(1);
        assert!(q.is_correct("A"));
        assert!(!q.is_correct("a"));
        assert!(!q.is_correct("A "));
    }

    #[test]
    fn difficulty_labels_parse_loosely() {
        assert_eq!(Difficulty::from_label(" hard "), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_label("MEDIUM"), Some(Difficulty::Medium));
        assert_eq!(Difficulty::from_label("expert"), None);
    }

    #[test]
    fn question_set_rejects_duplicates_and_empty() {
        assert_eq!(validate_question_set(&[]), Err(QuestionError::Empty));
        let err = validate_question_set(&[question(5), question(9), question(5)]).unwrap_err();
        assert_eq!(err, QuestionError::DuplicateId(QuestionId::new(5)));
        assert!(validate_question_set(&[question(10), question(3)]).is_ok());
    }

    #[test]
    fn question_deserializes_without_explanation() {
        let json = r#"{"id":3,"text":"2+2?","options":["3","4"],"answer":"4","difficulty":"Easy","topic":"Math"}"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.id, QuestionId::new(3));
        assert!(q.explanation.is_empty());
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::question::Difficulty;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("test name cannot be empty")]
    EmptyName,

    #[error("question count must be > 0")]
    InvalidQuestionCount,

    #[error("at least one difficulty must be selected")]
    NoDifficulties,
}

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

/// Rule set a session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestMode {
    /// Immediate feedback, answers lock after first grading.
    Practice,
    /// Feedback withheld until submission, answers freely changeable.
    Exam,
}

impl TestMode {
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "practice" => Some(Self::Practice),
            "exam" => Some(Self::Exam),
            _ => None,
        }
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestMode::Practice => f.write_str("PRACTICE"),
            TestMode::Exam => f.write_str("EXAM"),
        }
    }
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Unvalidated configuration as entered by the host or read from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct TestConfigDraft {
    pub test_name: String,
    pub question_count: u32,
    /// Zero means untimed (the clock counts up).
    pub duration_minutes: u32,
    pub difficulties: Vec<Difficulty>,
    pub mode: TestMode,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default)]
    pub shuffle_options: bool,
    #[serde(default)]
    pub negative_marking: bool,
}

impl TestConfigDraft {
    /// Draft with the host's default preferences: 20 questions, 60 minutes,
    /// every difficulty.
    #[must_use]
    pub fn with_defaults(test_name: impl Into<String>, mode: TestMode) -> Self {
        Self {
            test_name: test_name.into(),
            question_count: 20,
            duration_minutes: 60,
            difficulties: Difficulty::ALL.to_vec(),
            mode,
            shuffle_questions: false,
            shuffle_options: false,
            negative_marking: false,
        }
    }

    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the name is blank, the question count is zero
    /// or no difficulty is selected.
    pub fn validate(self) -> Result<TestConfig, ConfigError> {
        let test_name = self.test_name.trim().to_string();
        if test_name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.question_count == 0 {
            return Err(ConfigError::InvalidQuestionCount);
        }
        let mut difficulties = self.difficulties;
        difficulties.sort();
        difficulties.dedup();
        if difficulties.is_empty() {
            return Err(ConfigError::NoDifficulties);
        }

        Ok(TestConfig {
            test_name,
            question_count: self.question_count,
            duration_minutes: self.duration_minutes,
            difficulties,
            mode: self.mode,
            shuffle_questions: self.shuffle_questions,
            shuffle_options: self.shuffle_options,
            negative_marking: self.negative_marking,
        })
    }
}

/// Immutable per-session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TestConfigDraft", into = "TestConfigDraft")]
#[allow(clippy::struct_excessive_bools)]
pub struct TestConfig {
    test_name: String,
    question_count: u32,
    duration_minutes: u32,
    difficulties: Vec<Difficulty>,
    mode: TestMode,
    shuffle_questions: bool,
    shuffle_options: bool,
    negative_marking: bool,
}

impl TestConfig {
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Countdown length in seconds, or `None` for an untimed session.
    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        (self.duration_minutes > 0).then(|| self.duration_minutes.saturating_mul(60))
    }

    #[must_use]
    pub fn difficulties(&self) -> &[Difficulty] {
        &self.difficulties
    }

    #[must_use]
    pub fn mode(&self) -> TestMode {
        self.mode
    }

    #[must_use]
    pub fn shuffle_questions(&self) -> bool {
        self.shuffle_questions
    }

    #[must_use]
    pub fn shuffle_options(&self) -> bool {
        self.shuffle_options
    }

    /// When true, each wrong attempted answer costs 0.25 points.
    #[must_use]
    pub fn negative_marking(&self) -> bool {
        self.negative_marking
    }
}

impl TryFrom<TestConfigDraft> for TestConfig {
    type Error = ConfigError;

    fn try_from(draft: TestConfigDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<TestConfig> for TestConfigDraft {
    fn from(config: TestConfig) -> Self {
        Self {
            test_name: config.test_name,
            question_count: config.question_count,
            duration_minutes: config.duration_minutes,
            difficulties: config.difficulties,
            mode: config.mode,
            shuffle_questions: config.shuffle_questions,
            shuffle_options: config.shuffle_options,
            negative_marking: config.negative_marking,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = TestConfigDraft::with_defaults("  Mock 1 ", TestMode::Exam)
            .validate()
            .unwrap();
        assert_eq!(config.test_name(), "Mock 1");
        assert_eq!(config.time_limit_secs(), Some(3600));
        assert_eq!(config.difficulties().len(), 3);
    }

    #[test]
    fn zero_duration_is_untimed() {
        let mut draft = TestConfigDraft::with_defaults("Drill", TestMode::Practice);
        draft.duration_minutes = 0;
        assert_eq!(draft.validate().unwrap().time_limit_secs(), None);
    }

    #[test]
    fn rejects_invalid_drafts() {
        let mut draft = TestConfigDraft::with_defaults("   ", TestMode::Exam);
        assert_eq!(draft.clone().validate(), Err(ConfigError::EmptyName));

        draft.test_name = "Name".into();
        draft.question_count = 0;
        assert_eq!(
            draft.clone().validate(),
            Err(ConfigError::InvalidQuestionCount)
        );

        draft.question_count = 5;
        draft.difficulties.clear();
        assert_eq!(draft.validate(), Err(ConfigError::NoDifficulties));
    }

    #[test]
    fn deserializing_runs_validation() {
        let json = r#"{"test_name":"X","question_count":0,"duration_minutes":1,"difficulties":["Easy"],"mode":"EXAM"}"#;
        assert!(serde_json::from_str::<TestConfig>(json).is_err());

        let json = r#"{"test_name":"X","question_count":3,"duration_minutes":1,"difficulties":["Hard","Easy","Hard"],"mode":"PRACTICE"}"#;
        let config: TestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.mode(), TestMode::Practice);
        assert_eq!(config.difficulties(), &[Difficulty::Easy, Difficulty::Hard]);
        assert!(!config.negative_marking());
    }
}

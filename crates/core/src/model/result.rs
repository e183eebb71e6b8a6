use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::config::TestMode;
use crate::model::ids::{QuestionId, SessionId};
use crate::model::question::Difficulty;

/// Minimum percentage for a passing result.
pub const PASS_PERCENTAGE: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassStatus {
    Pass,
    Fail,
}

impl PassStatus {
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= PASS_PERCENTAGE {
            Self::Pass
        } else {
            Self::Fail
        }
    }
}

/// Review record for one question of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub question_id: QuestionId,
    pub question_text: String,
    pub selected_option: Option<String>,
    pub correct_option: String,
    pub is_correct: bool,
    pub time_spent_seconds: u32,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub topic: String,
    pub options: Vec<String>,
}

/// Aggregate row for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAnalysis {
    pub topic: String,
    pub total_questions: u32,
    pub correct: u32,
    pub wrong: u32,
    pub unattempted: u32,
    /// Percentage of the topic's questions answered correctly.
    pub accuracy: f64,
    pub time_spent: u32,
}

/// Aggregate row for one difficulty level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyBreakdown {
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub correct: u32,
    pub wrong: u32,
    pub unattempted: u32,
    pub accuracy: f64,
}

/// Terminal artifact of a submitted session. Never mutated after creation.
///
/// `total_score` and `percentage` are clamped at zero even when negative
/// marking drives the raw score below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: SessionId,
    pub test_name: String,
    pub date: DateTime<Utc>,
    pub mode: TestMode,
    pub total_score: f64,
    pub max_score: u32,
    pub percentage: f64,
    pub total_time_seconds: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub unattempted_count: u32,
    pub answers: Vec<UserAnswer>,
    pub topic_analysis: Vec<TopicAnalysis>,
    pub difficulty_analysis: Vec<DifficultyBreakdown>,
    pub status: PassStatus,
}

impl TestResult {
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.status == PassStatus::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_boundary_is_inclusive() {
        assert_eq!(PassStatus::from_percentage(40.0), PassStatus::Pass);
        assert_eq!(PassStatus::from_percentage(39.99), PassStatus::Fail);
        assert_eq!(PassStatus::from_percentage(0.0), PassStatus::Fail);
    }

    #[test]
    fn status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&PassStatus::Pass).unwrap(), r#""PASS""#);
    }
}

mod config;
mod ids;
mod progress;
mod question;
mod result;
mod session;

pub use config::{ConfigError, TestConfig, TestConfigDraft, TestMode};
pub use ids::{QuestionId, SessionId};
pub use progress::{ProgressError, QuestionStatus, TestProgress};
pub use question::{Difficulty, Question, QuestionError, validate_question_set};
pub use result::{
    DifficultyBreakdown, PASS_PERCENTAGE, PassStatus, TestResult, TopicAnalysis, UserAnswer,
};
pub use session::TestSession;

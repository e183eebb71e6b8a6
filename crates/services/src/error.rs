//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::LedgerError;
use exam_core::model::{ConfigError, QuestionError};

use crate::sessions::SessionState;

/// Errors emitted by session services.
///
/// Everything except `Empty`, `Question` and `Config` is a rejected action:
/// the session is left unchanged and play continues.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("action not available while {state}")]
    NotActive { state: SessionState },
    #[error("pausing in place is not available in this mode")]
    PauseNotAllowed,
    #[error("session already submitted")]
    AlreadySubmitted,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

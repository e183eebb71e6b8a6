#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;

pub use exam_core::Clock;

pub use error::SessionError;

pub use sessions::{
    AutosaveBridge, LiveSession, PaletteEntry, PaletteSummary, PracticeFeedback, PracticeStats,
    SessionBuilder, SessionHost, SessionMachine, SessionRunner, SessionState, SubmitSummary,
    TickReport,
};

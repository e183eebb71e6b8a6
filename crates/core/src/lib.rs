#![forbid(unsafe_code)]

pub mod ledger;
pub mod model;
pub mod policy;
pub mod scoring;
pub mod time;
pub mod timer;

pub use ledger::{AnswerLedger, LedgerError, PaletteState, Selection};
pub use policy::{ModePolicy, NEGATIVE_MARK};
pub use scoring::{AnswerSheet, score_session};
pub use time::Clock;
pub use timer::{LOW_TIME_SECS, SessionTimer, TickOutcome, format_clock};

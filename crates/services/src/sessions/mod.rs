mod autosave;
mod host;
mod machine;
mod plan;
mod progress;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use autosave::{AutosaveBridge, SNAPSHOT_VERSION};
pub use host::SessionHost;
pub use machine::{MachineTick, SessionMachine, SessionState};
pub use plan::SessionBuilder;
pub use progress::{PaletteEntry, PaletteSummary, PracticeFeedback, PracticeStats, SubmitSummary};
pub use workflow::{LiveSession, SessionRunner, TickReport};

use std::sync::Arc;
use tracing::{debug, info, warn};

use exam_core::model::{TestResult, TestSession};
use storage::repository::{ActiveSessionRepository, Storage};

use super::autosave::AutosaveBridge;
use super::host::SessionHost;
use super::machine::{MachineTick, SessionMachine, SessionState};
use super::progress::{PracticeFeedback, SubmitSummary};
use crate::Clock;
use crate::error::SessionError;

/// Outcome of one tick of the host's one-second loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    Frozen,
    Advanced,
    /// Time ran out; the session was submitted and the host notified.
    Submitted(TestResult),
}

/// Starts, resumes and discards sessions against the durable slot.
#[derive(Clone)]
pub struct SessionRunner {
    clock: Clock,
    autosave: AutosaveBridge,
    host: Arc<dyn SessionHost>,
}

impl SessionRunner {
    #[must_use]
    pub fn new(
        clock: Clock,
        repo: Arc<dyn ActiveSessionRepository>,
        host: Arc<dyn SessionHost>,
    ) -> Self {
        Self {
            clock,
            autosave: AutosaveBridge::new(repo),
            host,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage, host: Arc<dyn SessionHost>) -> Self {
        Self::new(clock, Arc::clone(&storage.active_sessions), host)
    }

    /// The stored session the host may offer to resume.
    pub async fn resumable(&self) -> Option<TestSession> {
        self.autosave.load().await
    }

    /// Start a brand-new session, discarding any stored one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the session has no questions or duplicate
    /// question ids. Storage failures are logged, not returned.
    pub async fn start(&self, mut session: TestSession) -> Result<LiveSession, SessionError> {
        session.progress = None;
        let machine = SessionMachine::start(session)?;
        self.autosave.clear().await;

        let mut live = self.live(machine);
        live.persist().await;
        Ok(live)
    }

    /// Continue the stored session, if there is a usable one.
    pub async fn resume(&self) -> Option<LiveSession> {
        let session = self.autosave.load().await?;
        match SessionMachine::start(session) {
            Ok(machine) => {
                let mut live = self.live(machine);
                live.persist().await;
                Some(live)
            }
            Err(err) => {
                warn!(error = %err, "stored session cannot be resumed");
                self.autosave.clear().await;
                None
            }
        }
    }

    /// Drop the stored session. Returns whether the store accepted it.
    pub async fn discard(&self) -> bool {
        info!("discarding stored session");
        self.autosave.clear().await
    }

    fn live(&self, machine: SessionMachine) -> LiveSession {
        LiveSession {
            machine,
            clock: self.clock,
            autosave: self.autosave.clone(),
            host: Arc::clone(&self.host),
            durable: true,
        }
    }
}

/// A running session: the state machine plus autosave and host callbacks.
///
/// Every accepted change is written through before the call returns.
/// Rejected actions leave both the machine and the slot untouched.
pub struct LiveSession {
    machine: SessionMachine,
    clock: Clock,
    autosave: AutosaveBridge,
    host: Arc<dyn SessionHost>,
    durable: bool,
}

impl LiveSession {
    #[must_use]
    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// False when the most recent autosave did not reach the store.
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    async fn persist(&mut self) {
        let now = self.clock.now();
        let snapshot = self.machine.snapshot(now);
        self.durable = self.autosave.save(&snapshot, now).await;
    }

    /// # Errors
    ///
    /// See `SessionMachine::select_option`.
    pub async fn select(&mut self, option: &str) -> Result<Option<PracticeFeedback>, SessionError> {
        let feedback = self.machine.select_option(option)?;
        self.persist().await;
        Ok(feedback)
    }

    /// # Errors
    ///
    /// See `SessionMachine::clear_response`.
    pub async fn clear_response(&mut self) -> Result<bool, SessionError> {
        let cleared = self.machine.clear_response()?;
        if cleared {
            self.persist().await;
        }
        Ok(cleared)
    }

    /// # Errors
    ///
    /// See `SessionMachine::toggle_mark`.
    pub async fn toggle_mark(&mut self) -> Result<bool, SessionError> {
        let marked = self.machine.toggle_mark()?;
        self.persist().await;
        Ok(marked)
    }

    /// # Errors
    ///
    /// See `SessionMachine::mark_and_next`.
    pub async fn mark_and_next(&mut self) -> Result<bool, SessionError> {
        let moved = self.machine.mark_and_next()?;
        self.persist().await;
        Ok(moved)
    }

    /// # Errors
    ///
    /// See `SessionMachine::navigate_to`.
    pub async fn navigate_to(&mut self, index: usize) -> Result<bool, SessionError> {
        let moved = self.machine.navigate_to(index)?;
        if moved {
            self.persist().await;
        }
        Ok(moved)
    }

    /// # Errors
    ///
    /// See `SessionMachine::next`.
    pub async fn next(&mut self) -> Result<bool, SessionError> {
        let index = self.machine.current_index() + 1;
        self.navigate_to(index).await
    }

    /// # Errors
    ///
    /// See `SessionMachine::previous`.
    pub async fn previous(&mut self) -> Result<bool, SessionError> {
        let moved = self.machine.previous()?;
        if moved {
            self.persist().await;
        }
        Ok(moved)
    }

    /// Pause in place, saving the frozen clock.
    ///
    /// # Errors
    ///
    /// See `SessionMachine::pause`.
    pub async fn pause(&mut self) -> Result<(), SessionError> {
        self.machine.pause()?;
        self.persist().await;
        Ok(())
    }

    /// # Errors
    ///
    /// See `SessionMachine::resume`.
    pub async fn resume(&mut self) -> Result<(), SessionError> {
        self.machine.resume()?;
        self.persist().await;
        Ok(())
    }

    /// Save the paused snapshot and hand control back to the host.
    ///
    /// # Errors
    ///
    /// See `SessionMachine::save_and_pause`.
    pub async fn save_and_pause(&mut self) -> Result<(), SessionError> {
        self.machine.save_and_pause()?;
        self.persist().await;
        info!(
            session = %self.machine.session().id,
            durable = self.durable,
            "session saved for later"
        );
        self.host.on_exit();
        Ok(())
    }

    /// Leave without a resumable snapshot. Consumes the session so nothing
    /// can write the slot again afterwards.
    pub async fn abandon(self) {
        self.autosave.clear().await;
        info!(session = %self.machine.session().id, "session abandoned");
        self.host.on_exit();
    }

    /// # Errors
    ///
    /// See `SessionMachine::request_submit`.
    pub fn request_submit(&mut self) -> Result<SubmitSummary, SessionError> {
        self.machine.request_submit()
    }

    /// # Errors
    ///
    /// See `SessionMachine::cancel_submit`.
    pub fn cancel_submit(&mut self) -> Result<(), SessionError> {
        self.machine.cancel_submit()
    }

    /// Submit from the confirmation prompt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadySubmitted` on a repeat and
    /// `SessionError::NotActive` when the prompt is not open.
    pub async fn confirm_submit(&mut self) -> Result<TestResult, SessionError> {
        self.machine.begin_submit()?;
        self.complete().await
    }

    /// Clear the slot, score once, notify the host.
    async fn complete(&mut self) -> Result<TestResult, SessionError> {
        self.autosave.clear().await;
        let result = self.machine.finalize(self.clock.now())?;
        self.host.on_complete(result.clone());
        Ok(result)
    }

    /// Advance the session clock by one second.
    pub async fn tick(&mut self) -> TickReport {
        match self.machine.tick() {
            MachineTick::Frozen => TickReport::Frozen,
            MachineTick::Advanced => {
                self.persist().await;
                TickReport::Advanced
            }
            MachineTick::Expired => match self.complete().await {
                Ok(result) => TickReport::Submitted(result),
                Err(err) => {
                    debug!(error = %err, "expiry after submission ignored");
                    TickReport::Frozen
                }
            },
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::SessionId;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of the single in-flight session.
///
/// `payload` is opaque to storage; the autosave layer owns its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSessionRecord {
    pub session_id: SessionId,
    pub payload: String,
    pub saved_at: DateTime<Utc>,
}

impl ActiveSessionRecord {
    #[must_use]
    pub fn new(session_id: SessionId, payload: impl Into<String>, saved_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            payload: payload.into(),
            saved_at,
        }
    }
}

/// Repository contract for the one resumable session slot.
///
/// At most one record exists at any time. Saving overwrites the previous
/// record in full.
#[async_trait]
pub trait ActiveSessionRepository: Send + Sync {
    /// Fetch the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn load_active(&self) -> Result<Option<ActiveSessionRecord>, StorageError>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_active(&self, record: &ActiveSessionRecord) -> Result<(), StorageError>;

    /// Remove the stored session. Clearing an empty slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the slot cannot be cleared.
    async fn clear_active(&self) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    active: Arc<Mutex<Option<ActiveSessionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl ActiveSessionRepository for InMemoryRepository {
    async fn load_active(&self) -> Result<Option<ActiveSessionRecord>, StorageError> {
        let guard = self
            .active
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_active(&self, record: &ActiveSessionRecord) -> Result<(), StorageError> {
        let mut guard = self
            .active
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(record.clone());
        Ok(())
    }

    async fn clear_active(&self) -> Result<(), StorageError> {
        let mut guard = self
            .active
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub active_sessions: Arc<dyn ActiveSessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let active_sessions: Arc<dyn ActiveSessionRepository> =
            Arc::new(InMemoryRepository::new());
        Self { active_sessions }
    }
}

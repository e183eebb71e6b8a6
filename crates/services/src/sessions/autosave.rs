use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

use exam_core::model::{TestSession, validate_question_set};
use storage::repository::{ActiveSessionRecord, ActiveSessionRepository};

/// Schema version written into every snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope<'a> {
    version: u32,
    session: Cow<'a, TestSession>,
}

/// Writes the in-flight session to the single durable slot.
///
/// Storage failures are logged and reported as `false`; they never surface as
/// errors, so a broken store only costs resumability.
#[derive(Clone)]
pub struct AutosaveBridge {
    repo: Arc<dyn ActiveSessionRepository>,
}

impl AutosaveBridge {
    #[must_use]
    pub fn new(repo: Arc<dyn ActiveSessionRepository>) -> Self {
        Self { repo }
    }

    /// Overwrite the slot with `snapshot`. Returns whether the write landed.
    pub async fn save(&self, snapshot: &TestSession, saved_at: DateTime<Utc>) -> bool {
        let envelope = Envelope {
            version: SNAPSHOT_VERSION,
            session: Cow::Borrowed(snapshot),
        };
        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(session = %snapshot.id, error = %err, "failed to encode snapshot");
                return false;
            }
        };

        let record = ActiveSessionRecord::new(snapshot.id, payload, saved_at);
        match self.repo.save_active(&record).await {
            Ok(()) => true,
            Err(err) => {
                warn!(session = %snapshot.id, error = %err, "autosave failed");
                false
            }
        }
    }

    /// Read the stored session, if a usable one exists.
    ///
    /// An unreadable store yields `None`. A snapshot that does not decode, has
    /// another schema version or carries an invalid question set is treated
    /// as malformed: the slot is cleared and `None` is returned.
    pub async fn load(&self) -> Option<TestSession> {
        let record = match self.repo.load_active().await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "failed to read stored session");
                return None;
            }
        };

        match decode(&record.payload) {
            Ok(session) => {
                debug!(session = %session.id, saved_at = %record.saved_at, "loaded stored session");
                Some(session)
            }
            Err(reason) => {
                warn!(session = %record.session_id, %reason, "discarding malformed snapshot");
                self.clear().await;
                None
            }
        }
    }

    /// Empty the slot. Returns whether the store accepted the delete.
    pub async fn clear(&self) -> bool {
        match self.repo.clear_active().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to clear stored session");
                false
            }
        }
    }
}

fn decode(payload: &str) -> Result<TestSession, String> {
    let envelope: Envelope<'static> =
        serde_json::from_str(payload).map_err(|err| err.to_string())?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(format!("unsupported snapshot version {}", envelope.version));
    }
    let session = envelope.session.into_owned();
    validate_question_set(&session.questions).map_err(|err| err.to_string())?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Difficulty, Question, QuestionId, TestConfigDraft, TestMode};
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn session() -> TestSession {
        let config = TestConfigDraft::with_defaults("Autosave", TestMode::Exam)
            .validate()
            .unwrap();
        let questions = vec![Question {
            id: QuestionId::new(1),
            text: "2 + 2".into(),
            options: vec!["3".into(), "4".into()],
            answer: "4".into(),
            explanation: String::new(),
            difficulty: Difficulty::Easy,
            topic: "Arithmetic".into(),
        }];
        TestSession::new(config, questions, fixed_now()).unwrap()
    }

    fn bridge() -> (AutosaveBridge, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        (AutosaveBridge::new(Arc::new(repo.clone())), repo)
    }

    #[tokio::test]
    async fn save_then_load_returns_the_same_session() {
        let (bridge, _) = bridge();
        let session = session();
        assert!(bridge.save(&session, fixed_now()).await);
        assert_eq!(bridge.load().await, Some(session));
    }

    #[tokio::test]
    async fn snapshot_is_a_versioned_envelope() {
        let (bridge, repo) = bridge();
        let session = session();
        bridge.save(&session, fixed_now()).await;

        let record = repo.load_active().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&record.payload).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["session"]["config"]["mode"], "EXAM");
        assert_eq!(record.session_id, session.id);
    }

    #[tokio::test]
    async fn garbage_payload_is_cleared() {
        let (bridge, repo) = bridge();
        let record = ActiveSessionRecord::new(session().id, "{not json", fixed_now());
        repo.save_active(&record).await.unwrap();

        assert!(bridge.load().await.is_none());
        assert!(repo.load_active().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_version_is_cleared() {
        let (bridge, repo) = bridge();
        let session = session();
        let payload = serde_json::json!({ "version": 99, "session": session }).to_string();
        repo.save_active(&ActiveSessionRecord::new(session.id, payload, fixed_now()))
            .await
            .unwrap();

        assert!(bridge.load().await.is_none());
        assert!(repo.load_active().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_empties_the_slot() {
        let (bridge, _) = bridge();
        bridge.save(&session(), fixed_now()).await;
        assert!(bridge.clear().await);
        assert!(bridge.load().await.is_none());
    }
}

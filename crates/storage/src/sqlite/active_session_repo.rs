use async_trait::async_trait;
use exam_core::model::SessionId;
use sqlx::Row;
use sqlx::types::Uuid;

use super::SqliteRepository;
use crate::repository::{ActiveSessionRecord, ActiveSessionRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ActiveSessionRepository for SqliteRepository {
    async fn load_active(&self) -> Result<Option<ActiveSessionRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT session_id, payload, saved_at
            FROM active_session
            WHERE slot = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let session_id: Uuid = row.try_get("session_id").map_err(ser)?;
        let payload: String = row.try_get("payload").map_err(ser)?;
        let saved_at = row.try_get("saved_at").map_err(ser)?;

        Ok(Some(ActiveSessionRecord {
            session_id: SessionId::from_uuid(session_id),
            payload,
            saved_at,
        }))
    }

    async fn save_active(&self, record: &ActiveSessionRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO active_session (slot, session_id, payload, saved_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(slot) DO UPDATE SET
                session_id = excluded.session_id,
                payload = excluded.payload,
                saved_at = excluded.saved_at
            ",
        )
        .bind(1_i64)
        .bind(record.session_id.as_uuid())
        .bind(&record.payload)
        .bind(record.saved_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        tracing::trace!(
            session = %record.session_id,
            bytes = record.payload.len(),
            "saved active session"
        );
        Ok(())
    }

    async fn clear_active(&self) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM active_session WHERE slot = 1")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        tracing::debug!(removed = res.rows_affected(), "cleared active session");
        Ok(())
    }
}

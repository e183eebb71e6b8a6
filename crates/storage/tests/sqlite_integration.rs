use chrono::Duration;
use exam_core::model::SessionId;
use exam_core::time::fixed_now;
use storage::repository::{ActiveSessionRecord, ActiveSessionRepository, Storage};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_slot_starts_empty() {
    let repo = connect("memdb_empty").await;
    assert!(repo.load_active().await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_roundtrip_preserves_payload_and_identity() {
    let repo = connect("memdb_roundtrip").await;
    let record = ActiveSessionRecord::new(
        SessionId::generate(),
        r#"{"version":1,"session":{"answers":{"7":"B"}}}"#,
        fixed_now(),
    );

    repo.save_active(&record).await.unwrap();
    let loaded = repo.load_active().await.unwrap().expect("record");
    assert_eq!(loaded, record);
}

#[tokio::test]
async fn sqlite_save_overwrites_single_slot() {
    let repo = connect("memdb_overwrite").await;
    let first = ActiveSessionRecord::new(SessionId::generate(), "first", fixed_now());
    let second = ActiveSessionRecord::new(
        SessionId::generate(),
        "second",
        fixed_now() + Duration::seconds(5),
    );

    repo.save_active(&first).await.unwrap();
    repo.save_active(&second).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM active_session")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(repo.load_active().await.unwrap(), Some(second));
}

#[tokio::test]
async fn sqlite_clear_removes_record_and_tolerates_empty_slot() {
    let repo = connect("memdb_clear").await;
    repo.clear_active().await.unwrap();

    let record = ActiveSessionRecord::new(SessionId::generate(), "payload", fixed_now());
    repo.save_active(&record).await.unwrap();
    repo.clear_active().await.unwrap();

    assert!(repo.load_active().await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");

    let versions: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(repo.pool())
        .await
        .unwrap();
    assert_eq!(versions, vec![1]);
}

#[tokio::test]
async fn storage_sqlite_builds_working_aggregate() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let record = ActiveSessionRecord::new(SessionId::generate(), "agg", fixed_now());
    storage.active_sessions.save_active(&record).await.unwrap();
    assert_eq!(
        storage.active_sessions.load_active().await.unwrap(),
        Some(record)
    );
}

//! Integration tests for worker heartbeats and the known-face registry.

use sqlx::SqlitePool;
use visage_core::recognition::KnownFace;
use visage_core::types::now_ms;
use visage_core::worker_pool::liveness_cutoff;
use visage_db::models::worker::RegisterWorker;
use visage_db::repositories::{KnownFaceRepo, WorkerRepo};

fn worker(id: &str) -> RegisterWorker {
    RegisterWorker {
        worker_id: id.to_string(),
        hostname: "host-1".to_string(),
        queues: vec!["detection".to_string()],
        concurrency: 1,
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn registered_worker_is_live(pool: SqlitePool) {
    let row = WorkerRepo::register(&pool, &worker("w1")).await.unwrap();
    assert_eq!(row.queues.0, vec!["detection".to_string()]);
    assert_eq!(row.total_completed, 0);

    let live = WorkerRepo::list_live(&pool, liveness_cutoff(now_ms(), 30))
        .await
        .unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].worker_id, "w1");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stale_and_stopped_workers_are_not_live(pool: SqlitePool) {
    WorkerRepo::register(&pool, &worker("w1")).await.unwrap();
    WorkerRepo::register(&pool, &worker("w2")).await.unwrap();
    WorkerRepo::mark_stopped(&pool, "w2").await.unwrap();

    let now = now_ms();
    assert_eq!(WorkerRepo::count_live(&pool, liveness_cutoff(now, 30)).await.unwrap(), 1);
    // A cutoff in the future excludes every heartbeat.
    assert_eq!(WorkerRepo::count_live(&pool, now + 1_000).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reregistration_keeps_completed_count(pool: SqlitePool) {
    WorkerRepo::register(&pool, &worker("w1")).await.unwrap();
    WorkerRepo::record_completion(&pool, "w1").await.unwrap();
    WorkerRepo::record_completion(&pool, "w1").await.unwrap();
    WorkerRepo::mark_stopped(&pool, "w1").await.unwrap();

    let row = WorkerRepo::register(&pool, &worker("w1")).await.unwrap();
    assert_eq!(row.total_completed, 2);
    assert!(row.stopped_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn heartbeat_unknown_worker_returns_false(pool: SqlitePool) {
    assert!(!WorkerRepo::heartbeat(&pool, "ghost").await.unwrap());
    WorkerRepo::register(&pool, &worker("w1")).await.unwrap();
    assert!(WorkerRepo::heartbeat(&pool, "w1").await.unwrap());
}

// ---------------------------------------------------------------------------
// Known faces
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn upsert_replaces_encoding_and_bumps_version(pool: SqlitePool) {
    let empty = KnownFaceRepo::version(&pool).await.unwrap();
    assert_eq!(empty.count, 0);

    KnownFaceRepo::upsert(&pool, "Ada", &[0.1, 0.2], "ada.jpg")
        .await
        .unwrap();
    let first = KnownFaceRepo::version(&pool).await.unwrap();
    assert_eq!(first.count, 1);
    assert_ne!(first, empty);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    KnownFaceRepo::upsert(&pool, "Ada", &[0.3, 0.4], "ada.png")
        .await
        .unwrap();
    let second = KnownFaceRepo::version(&pool).await.unwrap();
    assert_eq!(second.count, 1);
    assert_ne!(second, first);

    let faces: Vec<KnownFace> = KnownFaceRepo::list_all(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(KnownFace::from)
        .collect();
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].encoding, vec![0.3, 0.4]);
}

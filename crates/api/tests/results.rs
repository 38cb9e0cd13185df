//! Integration tests for the results ledger, aggregates and clean-up.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, delete, detect_record, get, image_part, png_bytes, post_empty, submit,
    wait_terminal, TestApp,
};
use sqlx::SqlitePool;
use visage_db::models::ledger::{LedgerStatus, NewLedgerRecord};
use visage_db::repositories::LedgerRepo;

async fn seed(app: &TestApp) {
    for record in [
        detect_record("job-1", "a.png", true, 2.0, 1),
        detect_record("job-2", "b.png", true, 4.0, 2),
        detect_record("job-3", "c.png", true, 6.0, 3),
        detect_record("job-4", "d.png", false, 0.5, 0),
    ] {
        assert!(LedgerRepo::append(app.pool(), &record).await.unwrap());
    }
    // Registrations never count towards detection aggregates.
    let registration = NewLedgerRecord {
        job_id: "job-5".to_string(),
        job_kind: "register".to_string(),
        display_name: "ada.png".to_string(),
        faces_detected: 1,
        recognized_labels: vec!["Ada".to_string()],
        duration_seconds: 9.0,
        worker_id: "worker-seed".to_string(),
        artifact_ref: "ada.png".to_string(),
        status: LedgerStatus::Success,
        error_message: None,
    };
    assert!(LedgerRepo::append(app.pool(), &registration).await.unwrap());
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn stats_aggregate_detection_records(pool: SqlitePool) {
    let app = TestApp::new(pool);
    seed(&app).await;

    let response = get(app.router(), "/api/v1/stats").await;
    assert_eq!(response.status(), StatusCode::OK);

    let stats = &body_json(response).await["data"];
    assert_eq!(stats["total_processed"], 4);
    assert_eq!(stats["successful"], 3);
    assert_eq!(stats["failed"], 1);
    assert_eq!(stats["total_faces"], 6);
    assert_eq!(stats["average_duration"], 4.0);
    assert_eq!(stats["success_rate"], 75.0);
    assert_eq!(stats["active_workers"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stats_on_an_empty_ledger_are_zero(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let stats = &body_json(get(app.router(), "/api/v1/stats").await).await["data"];
    assert_eq!(stats["total_processed"], 0);
    assert_eq!(stats["average_duration"], 0.0);
    assert_eq!(stats["success_rate"], 0.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dashboard_reports_today_and_performance(pool: SqlitePool) {
    let app = TestApp::new(pool);
    seed(&app).await;

    let dashboard = &body_json(get(app.router(), "/api/v1/dashboard").await).await["data"];
    assert_eq!(dashboard["workers"]["total"], 0);
    assert_eq!(dashboard["tasks"]["active"], 0);
    assert_eq!(dashboard["tasks"]["queued"], 0);
    assert_eq!(dashboard["tasks"]["completed_today"], 3);
    assert_eq!(dashboard["tasks"]["failed_today"], 1);
    assert_eq!(dashboard["performance"]["avg_time_per_image"], 4.0);
    assert_eq!(dashboard["performance"]["samples"], 3);

    let hourly = dashboard["hourly"].as_array().unwrap();
    assert_eq!(hourly.len(), 24);
    let per_hour: i64 = hourly.iter().map(|h| h["count"].as_i64().unwrap()).sum();
    assert_eq!(per_hour, 3);

    let daily = dashboard["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0]["count"], 3);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn results_can_be_filtered(pool: SqlitePool) {
    let app = TestApp::new(pool);
    seed(&app).await;

    let all = body_json(get(app.router(), "/api/v1/results").await).await;
    assert_eq!(all["data"].as_array().unwrap().len(), 5);

    let errors = body_json(get(app.router(), "/api/v1/results?status=error").await).await;
    assert_eq!(errors["data"].as_array().unwrap().len(), 1);
    assert_eq!(errors["data"][0]["error_message"], "Cannot decode image");

    let registrations = body_json(get(app.router(), "/api/v1/results?kind=register").await).await;
    assert_eq!(registrations["data"][0]["recognized_labels"][0], "Ada");

    let page = body_json(get(app.router(), "/api/v1/results?limit=2").await).await;
    assert_eq!(page["data"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Clean-up
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn clear_removes_records_and_files(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let worker = app.spawn_worker("worker-clear");
    let ids = submit(
        &app,
        vec![
            image_part("x.png", png_bytes([120, 30, 30])),
            image_part("y.png", png_bytes([30, 120, 30])),
        ],
    )
    .await;
    for id in &ids {
        wait_terminal(&app, id).await;
    }
    worker.stop().await;

    let response = post_empty(app.router(), "/api/v1/results/clear").await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = &body_json(response).await["data"];
    assert_eq!(report["records_deleted"], 2);
    assert_eq!(report["artifacts_deleted"], 2);
    assert_eq!(report["uploads_deleted"], 2);
    assert!(report["failures"].as_array().unwrap().is_empty());

    assert_eq!(LedgerRepo::count(app.pool()).await.unwrap(), 0);
    assert_eq!(std::fs::read_dir(&app.config().results_dir).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(&app.config().upload_dir).unwrap().count(), 0);

    let stats = &body_json(get(app.router(), "/api/v1/stats").await).await["data"];
    assert_eq!(stats["total_processed"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn clear_keeps_uploads_of_jobs_still_queued(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let ids = submit(&app, vec![image_part("later.png", png_bytes([90, 60, 30]))]).await;
    let staged = app.config().upload_dir.join(format!("{}_later.png", ids[0]));

    let response = post_empty(app.router(), "/api/v1/results/clear").await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = &body_json(response).await["data"];
    assert_eq!(report["uploads_deleted"], 0);
    assert!(staged.is_file());

    // The queued job still runs to completion afterwards.
    let worker = app.spawn_worker("worker-after-clear");
    let status = wait_terminal(&app, &ids[0]).await;
    worker.stop().await;
    assert_eq!(status["state"], "SUCCESS", "{status}");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn clear_touches_no_file_when_the_ledger_cannot_be_cleared(pool: SqlitePool) {
    let app = TestApp::new(pool);
    std::fs::create_dir_all(&app.config().results_dir).unwrap();
    std::fs::create_dir_all(&app.config().upload_dir).unwrap();
    let artifact = app.config().results_dir.join("old_result.png");
    let upload = app.config().upload_dir.join("old-job_old.png");
    std::fs::write(&artifact, png_bytes([1, 2, 3])).unwrap();
    std::fs::write(&upload, png_bytes([1, 2, 3])).unwrap();

    sqlx::query("DROP TABLE processing_results")
        .execute(app.pool())
        .await
        .unwrap();

    let response = post_empty(app.router(), "/api/v1/results/clear").await;
    assert!(response.status().is_server_error());
    assert!(artifact.is_file());
    assert!(upload.is_file());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn clear_on_an_empty_system_is_a_no_op(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let response = post_empty(app.router(), "/api/v1/results/clear").await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = &body_json(response).await["data"];
    assert_eq!(report["records_deleted"], 0);
    assert_eq!(report["artifacts_deleted"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_removes_one_result(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let worker = app.spawn_worker("worker-delete");
    let ids = submit(
        &app,
        vec![
            image_part("keep.png", png_bytes([10, 200, 10])),
            image_part("drop.png", png_bytes([200, 10, 10])),
        ],
    )
    .await;
    let kept = wait_terminal(&app, &ids[0]).await;
    let dropped = wait_terminal(&app, &ids[1]).await;
    worker.stop().await;

    let response = delete(app.router(), "/api/v1/results/drop.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = &body_json(response).await["data"];
    assert_eq!(report["records_deleted"], 1);
    assert_eq!(report["files_deleted"], 2);

    let dropped_artifact = dropped["result"]["artifact"].as_str().unwrap();
    let kept_artifact = kept["result"]["artifact"].as_str().unwrap();
    assert!(!app.config().results_dir.join(dropped_artifact).exists());
    assert!(app.config().results_dir.join(kept_artifact).is_file());
    assert_eq!(LedgerRepo::count(app.pool()).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_unknown_result_returns_404(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let response = delete(app.router(), "/api/v1/results/ghost.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

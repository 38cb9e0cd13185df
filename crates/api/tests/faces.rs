//! Integration tests for face registration and recognition.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, get, image_part, png_bytes, post_multipart, submit, wait_terminal, Part, TestApp,
};
use sqlx::SqlitePool;

fn registration<'a>(filename: &'a str, bytes: Vec<u8>, name: &'a str) -> Vec<Part<'a>> {
    vec![
        Part::File {
            field: "image",
            filename,
            bytes,
        },
        Part::Text {
            field: "name",
            value: name,
        },
    ]
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn registered_face_is_recognized_in_later_jobs(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let worker = app.spawn_worker("worker-faces");

    let response = post_multipart(
        app.router(),
        "/api/v1/faces",
        registration("ada.png", png_bytes([180, 60, 90]), "  Ada   Lovelace "),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered = &body_json(response).await["data"];
    assert_eq!(registered["label"], "Ada Lovelace");
    assert_eq!(registered["reference"], "ada_lovelace.png");
    assert!(app.config().known_faces_dir.join("ada_lovelace.png").is_file());

    let image = get(app.router(), "/api/v1/faces/ada_lovelace.png").await;
    assert_eq!(image.status(), StatusCode::OK);
    assert_eq!(image.headers()["content-type"], "image/png");

    let faces = body_json(get(app.router(), "/api/v1/faces").await).await;
    let faces = faces["data"].as_array().unwrap();
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0]["label"], "Ada Lovelace");
    assert!(faces[0].get("encoding").is_none());

    let ids = submit(
        &app,
        vec![
            image_part("match.png", png_bytes([180, 60, 90])),
            image_part("stranger.png", png_bytes([0, 0, 255])),
        ],
    )
    .await;
    let matched = wait_terminal(&app, &ids[0]).await;
    let stranger = wait_terminal(&app, &ids[1]).await;
    worker.stop().await;

    assert_eq!(matched["result"]["faces_detected"], 1);
    assert_eq!(
        matched["result"]["recognized_faces"],
        serde_json::json!(["Ada Lovelace (100.0%)"])
    );
    assert_eq!(stranger["result"]["faces_detected"], 1);
    assert!(stranger["result"]["recognized_faces"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reregistering_a_label_replaces_it(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let worker = app.spawn_worker("worker-reregister");

    for color in [[10, 200, 10], [200, 200, 10]] {
        let response = post_multipart(
            app.router(),
            "/api/v1/faces",
            registration("grace.jpg", png_bytes(color), "Grace"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let ids = submit(&app, vec![image_part("now.png", png_bytes([200, 200, 10]))]).await;
    let status = wait_terminal(&app, &ids[0]).await;
    worker.stop().await;

    let faces = body_json(get(app.router(), "/api/v1/faces").await).await;
    assert_eq!(faces["data"].as_array().unwrap().len(), 1);
    assert_eq!(faces["data"][0]["reference_ref"], "grace.jpg");
    assert_eq!(
        status["result"]["recognized_faces"],
        serde_json::json!(["Grace (100.0%)"])
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn registration_without_a_face_is_rejected(pool: SqlitePool) {
    let app = TestApp::new(pool);
    let worker = app.spawn_worker("worker-no-face");

    let response = post_multipart(
        app.router(),
        "/api/v1/faces",
        registration("dark.png", png_bytes([0, 0, 0]), "Nobody"),
    )
    .await;
    worker.stop().await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "No face found in the reference image");

    let faces = body_json(get(app.router(), "/api/v1/faces").await).await;
    assert!(faces["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn blank_name_is_rejected_before_enqueue(pool: SqlitePool) {
    let app = TestApp::new(pool);

    let response = post_multipart(
        app.router(),
        "/api/v1/faces",
        registration("ada.png", png_bytes([1, 2, 3]), "   "),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let queue = body_json(get(app.router(), "/api/v1/queue").await).await;
    assert_eq!(queue["data"]["total"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_image_field_is_bad_request(pool: SqlitePool) {
    let app = TestApp::new(pool);

    let response = post_multipart(
        app.router(),
        "/api/v1/faces",
        vec![Part::Text {
            field: "name",
            value: "Ada",
        }],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No image provided");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn registration_reports_pending_when_no_worker_picks_it_up(pool: SqlitePool) {
    let app = TestApp::with_config(pool, |config| config.register_wait_secs = 1);

    let response = post_multipart(
        app.router(),
        "/api/v1/faces",
        registration("ada.png", png_bytes([180, 60, 90]), "Ada"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["state"], "PENDING");
    let job_id = json["data"]["job_id"].as_str().unwrap();

    // The job stays queued and can still be polled.
    let status = body_json(get(app.router(), &format!("/api/v1/jobs/{job_id}/status")).await).await;
    assert_eq!(status["data"]["state"], "PENDING");
    let queue = body_json(get(app.router(), "/api/v1/queue").await).await;
    assert_eq!(queue["data"]["total"], 1);
}

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use timetable_backend::api::router;
use timetable_backend::state::AppState;

use common::{seed_teacher, seed_version, test_pool};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_returns_ok() {
    let pool = test_pool().await;
    let app = router(AppState { db: pool });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_activate_and_fetch_active_version() {
    let pool = test_pool().await;
    let app = router(AppState { db: pool });

    // No active version yet: dependents must see an explicit 404.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/versions/active")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/versions")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "2026-spring",
                        "display_name": "Spring 2026",
                        "start_date": "2026-03-01",
                        "end_date": "2026-08-31"
                    })
                    .to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["is_active"], json!(false));
    let id = created["id"].as_str().expect("id").to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/versions/{}/activate", id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/versions/active")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let active = body_json(response).await;
    assert_eq!(active["id"].as_str(), Some(id.as_str()));
}

#[tokio::test]
async fn cascading_delete_requires_explicit_confirmation() {
    let pool = test_pool().await;
    let v = seed_version(&pool, "v").await;
    let teacher = seed_teacher(&pool, &v.id, "Kim").await;
    let app = router(AppState { db: pool.clone() });

    // Step one: the non-destructive report.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/dependencies/teacher/{}", teacher.id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["total"], json!(0));

    // Destructive call without confirm=true is rejected.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/dependencies/teacher/{}", teacher.id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // With confirmation it proceeds.
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/dependencies/teacher/{}?confirm=true", teacher.id))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let remaining =
        timetable_backend::db::repository::find_teacher_by_id(&pool, &teacher.id)
            .await
            .expect("find");
    assert!(remaining.is_none());
}

#[tokio::test]
async fn unknown_entity_type_is_a_bad_request() {
    let pool = test_pool().await;
    let app = router(AppState { db: pool });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/dependencies/campus/some-id")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

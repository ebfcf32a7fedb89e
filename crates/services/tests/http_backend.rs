use std::sync::Arc;

use mockito::{Matcher, Server};
use serde_json::json;

use course_core::model::{CourseId, GradeRecord, ModuleKind};
use course_core::time::fixed_clock;
use services::{
    AccessToken, ApiConfig, ApiError, AppServices, CredentialRefresher, Credentials,
    GradeBackend, HttpBackend, ModuleProvider, PlayerPhase, RefreshToken,
};
use storage::repository::Storage;

fn modules_body() -> String {
    json!({
        "total": 2,
        "items": [
            {
                "id": "m2",
                "course": {"id": "c1", "title": "Rust", "description": "Intro", "approximateTime": "2h", "imageUrl": null},
                "moduleType": "VIDEO",
                "moduleNum": 2,
                "moduleTitle": "Watch",
                "text": null,
                "video": {"id": "v1", "videoUrl": "https://video.example/v1"},
                "test": null
            },
            {
                "id": "m1",
                "course": {"id": "c1", "title": "Rust", "description": "Intro", "approximateTime": "2h", "imageUrl": null},
                "moduleType": "TEXT",
                "moduleNum": 1,
                "moduleTitle": "Read",
                "text": "hello",
                "video": null,
                "test": null
            }
        ]
    })
    .to_string()
}

fn backend(server: &Server) -> HttpBackend {
    HttpBackend::new(ApiConfig::new(&server.url()).unwrap())
}

#[tokio::test]
async fn fetch_modules_sends_bearer_and_decodes_page() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/modules/course/c1")
        .match_header("authorization", "Bearer a1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(modules_body())
        .create_async()
        .await;

    let page = backend(&server)
        .fetch_modules(&AccessToken::new("a1"), &CourseId::new("c1"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].kind(), ModuleKind::Video);
    assert_eq!(page.course.unwrap().title(), "Rust");
}

#[tokio::test]
async fn rejected_token_maps_to_auth_expired() {
    let mut server = Server::new_async().await;
    for status in [401, 403] {
        let mock = server
            .mock("GET", "/api/modules/course/c1")
            .with_status(status)
            .create_async()
            .await;
        let err = backend(&server)
            .fetch_modules(&AccessToken::new("a1"), &CourseId::new("c1"))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::AuthExpired);
        mock.remove_async().await;
    }
}

#[tokio::test]
async fn other_statuses_and_bad_bodies_are_distinguished() {
    let mut server = Server::new_async().await;
    let _failing = server
        .mock("GET", "/api/modules/course/broken")
        .with_status(500)
        .create_async()
        .await;
    let _garbled = server
        .mock("GET", "/api/modules/course/garbled")
        .with_status(200)
        .with_body("{\"total\": \"many\"}")
        .create_async()
        .await;
    let backend = backend(&server);
    let token = AccessToken::new("a1");

    let err = backend
        .fetch_modules(&token, &CourseId::new("broken"))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::HttpStatus(reqwest::StatusCode::INTERNAL_SERVER_ERROR));

    let err = backend
        .fetch_modules(&token, &CourseId::new("garbled"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn module_with_missing_payload_is_rejected() {
    let mut server = Server::new_async().await;
    let body = json!({
        "total": 1,
        "items": [{
            "id": "m1",
            "course": {"id": "c1", "title": "Rust"},
            "moduleType": "TEXT",
            "moduleNum": 1,
            "moduleTitle": "Read",
            "text": null,
            "video": null,
            "test": null
        }]
    });
    let _mock = server
        .mock("GET", "/api/modules/course/c1")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let err = backend(&server)
        .fetch_modules(&AccessToken::new("a1"), &CourseId::new("c1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidModule { index: 0, .. }));
}

#[tokio::test]
async fn post_grade_sends_backend_field_names() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/test-grades/c1")
        .match_header("authorization", "Bearer a1")
        .match_body(Matcher::Json(json!({"courseMaxTest": 3, "userGrade": 2})))
        .with_status(201)
        .create_async()
        .await;

    backend(&server)
        .post_grade(
            &AccessToken::new("a1"),
            &CourseId::new("c1"),
            &GradeRecord {
                total_questions: 3,
                correct_count: 2,
            },
        )
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn refresh_keeps_refresh_token_when_not_rotated() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/auth/refresh")
        .match_body(Matcher::Json(json!({"refreshToken": "r1"})))
        .with_status(200)
        .with_body(json!({"accessToken": "a2"}).to_string())
        .create_async()
        .await;

    let creds = backend(&server)
        .refresh(&RefreshToken::new("r1"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(creds, Credentials::new("a2", "r1"));
}

#[tokio::test]
async fn expired_token_is_refreshed_during_course_load() {
    let mut server = Server::new_async().await;
    let expired = server
        .mock("GET", "/api/modules/course/c1")
        .match_header("authorization", "Bearer a1")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/refresh")
        .with_status(200)
        .with_body(json!({"accessToken": "a2", "refreshToken": "r2"}).to_string())
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/api/modules/course/c1")
        .match_header("authorization", "Bearer a2")
        .with_status(200)
        .with_body(modules_body())
        .expect(1)
        .create_async()
        .await;

    let backend = Arc::new(backend(&server));
    let services = AppServices::from_parts(
        backend.clone(),
        backend.clone(),
        backend,
        &Storage::in_memory(),
        fixed_clock(),
    );
    services.session().sign_in(Credentials::new("a1", "r1"));

    let player = services.open_course(CourseId::new("c1")).await;

    expired.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;
    assert_eq!(player.phase(), PlayerPhase::Ready);
    assert_eq!(player.outline().len(), 2);
    assert_eq!(services.session().current_access(), Some(AccessToken::new("a2")));
}

use axum::{body::Body, http::Request, http::StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn livez_healthy_and_api_requires_auth() {
    let state = qz_api::test_state("test-key");
    let app = qz_api::create_router(state);

    let livez_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(livez_response.status(), StatusCode::OK);

    let unauthorized = app
        .oneshot(
            Request::builder()
                .uri("/api/users/1/notifications")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_api_key_is_rejected_before_touching_storage() {
    let state = qz_api::test_state("test-key");
    let app = qz_api::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/1/rating")
                .header("x-api-key", "not-the-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn responses_carry_a_request_id_header() {
    let state = qz_api::test_state("test-key");
    let app = qz_api::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn submit_with_malformed_body_is_a_client_error() {
    let state = qz_api::test_state("test-key");
    let app = qz_api::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/quizzes/1/questions/2/answers")
                .header("x-api-key", "test-key")
                .header("content-type", "application/json")
                .body(Body::from("{\"user_id\": \"oops\"}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

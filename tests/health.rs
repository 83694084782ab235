mod common;

use axum::http::StatusCode;
use smart_canteen_api::routes::health::health_check;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.service, "smart-canteen-api");
}

#[tokio::test]
async fn health_route_is_public_and_tagged_with_request_id() {
    let response = common::offline_app()
        .oneshot(common::request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_route_returns_json_not_found() {
    let response = common::offline_app()
        .oneshot(common::request("GET", "/nope/here", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::json_body(response).await;
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["path"], "/nope/here");
}

#[tokio::test]
async fn docs_are_served() {
    let response = common::offline_app()
        .oneshot(common::request("GET", "/docs", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

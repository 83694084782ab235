mod common;

use axum::http::StatusCode;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use smart_canteen_api::{dto::auth::Claims, models::Role};
use tower::ServiceExt;
use uuid::Uuid;

use common::{json_body, offline_app, request, token_for};

fn claims(iss: &str, aud: &str, exp_offset: i64) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: Uuid::new_v4().to_string(),
        name: "mallory".into(),
        role: "Admin".into(),
        jti: Uuid::new_v4().to_string(),
        iss: iss.into(),
        aud: aud.into(),
        iat: now,
        exp: now + exp_offset,
    }
}

fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn status_of(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> StatusCode {
    offline_app()
        .oneshot(request(method, uri, token, body))
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = offline_app()
        .oneshot(request("GET", "/api/user", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert!(body["message"].as_str().unwrap().starts_with("Unauthorized"));
}

#[tokio::test]
async fn malformed_and_foreign_tokens_are_unauthorized() {
    let secret = common::test_config(common::UNUSED_DATABASE_URL).jwt.secret;

    let garbage = "not-a-jwt";
    let wrong_secret = sign(&claims("smart-canteen", "smart-canteen-clients", 600), "other-secret");
    let wrong_issuer = sign(&claims("someone-else", "smart-canteen-clients", 600), &secret);
    let wrong_audience = sign(&claims("smart-canteen", "other-clients", 600), &secret);
    let expired = sign(&claims("smart-canteen", "smart-canteen-clients", -3600), &secret);

    for token in [garbage.to_string(), wrong_secret, wrong_issuer, wrong_audience, expired] {
        assert_eq!(
            status_of("GET", "/api/user", Some(&token), None).await,
            StatusCode::UNAUTHORIZED
        );
    }
}

#[tokio::test]
async fn non_bearer_scheme_is_unauthorized() {
    let response = offline_app()
        .oneshot(
            axum::http::Request::builder()
                .uri("/api/user")
                .header("authorization", "Basic YWRtaW46YWRtaW4=")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_only_routes_reject_users() {
    let user = token_for(Uuid::new_v4(), Role::User);
    let order_id = Uuid::new_v4();

    assert_eq!(status_of("GET", "/api/user", Some(&user), None).await, StatusCode::FORBIDDEN);
    assert_eq!(status_of("GET", "/api/order", Some(&user), None).await, StatusCode::FORBIDDEN);
    assert_eq!(
        status_of("DELETE", &format!("/api/order/{order_id}"), Some(&user), None).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_of(
            "PUT",
            &format!("/api/order/{order_id}/status"),
            Some(&user),
            Some(json!({ "status": "Completed" }))
        )
        .await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_of("POST", "/api/category", Some(&user), Some(json!({ "name": "Soups" }))).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_of(
            "DELETE",
            &format!("/api/product/{}", Uuid::new_v4()),
            Some(&user),
            None
        )
        .await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn user_scoped_paths_reject_other_users() {
    let me = Uuid::new_v4();
    let someone_else = Uuid::new_v4();
    let token = token_for(me, Role::User);

    for uri in [
        format!("/api/cart/user/{someone_else}"),
        format!("/api/order/user/{someone_else}"),
        format!("/api/favorite/user/{someone_else}"),
        format!("/api/user/{someone_else}"),
        format!("/api/cart/count?user_id={someone_else}"),
    ] {
        assert_eq!(
            status_of("GET", &uri, Some(&token), None).await,
            StatusCode::FORBIDDEN,
            "{uri}"
        );
    }
}

#[tokio::test]
async fn users_cannot_act_for_someone_else() {
    let token = token_for(Uuid::new_v4(), Role::User);
    let body = json!({
        "product_id": Uuid::new_v4(),
        "quantity": 1,
        "user_id": Uuid::new_v4(),
    });

    assert_eq!(
        status_of("POST", "/api/cart", Some(&token), Some(body)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_of(
            "POST",
            "/api/order",
            Some(&token),
            Some(json!({ "cart_ids": [Uuid::new_v4()], "user_id": Uuid::new_v4() }))
        )
        .await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn order_placement_rejects_empty_and_duplicate_cart_ids() {
    let token = token_for(Uuid::new_v4(), Role::User);
    let line = Uuid::new_v4();

    let empty = offline_app()
        .oneshot(request("POST", "/api/order", Some(&token), Some(json!({ "cart_ids": [] }))))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    let body = json_body(empty).await;
    assert_eq!(body["data"]["error"], "Bad Request Cart IDs cannot be empty.");

    assert_eq!(
        status_of("POST", "/api/order", Some(&token), Some(json!({ "cart_ids": [line, line] }))).await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn unknown_order_status_is_rejected() {
    let admin = token_for(Uuid::new_v4(), Role::Admin);
    let uri = format!("/api/order/{}/status", Uuid::new_v4());

    assert_eq!(
        status_of("PUT", &uri, Some(&admin), Some(json!({ "status": "Shipped" }))).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of("PUT", &uri, Some(&admin), Some(json!({ "status": "  " }))).await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn cart_quantity_must_be_positive() {
    let token = token_for(Uuid::new_v4(), Role::User);
    let uri = format!("/api/cart/{}", Uuid::new_v4());

    assert_eq!(
        status_of("PUT", &uri, Some(&token), Some(json!({ "quantity": 0 }))).await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn unknown_role_lookup_is_not_found() {
    let admin = token_for(Uuid::new_v4(), Role::Admin);
    assert_eq!(
        status_of("GET", "/api/user/role/Chef", Some(&admin), None).await,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn registration_validates_every_field() {
    let response = offline_app()
        .oneshot(request(
            "POST",
            "/api/authenticate/register",
            None,
            Some(json!({
                "username": "",
                "email": "not-an-email",
                "password": "123",
                "full_name": "",
                "role": "Chef",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    let fields: Vec<&str> = body["data"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    for expected in ["username", "email", "password", "full_name", "role"] {
        assert!(fields.contains(&expected), "missing {expected} in {fields:?}");
    }
}

#[tokio::test]
async fn missing_body_field_is_reported_in_envelope() {
    let response = offline_app()
        .oneshot(request(
            "POST",
            "/api/authenticate/register",
            None,
            Some(json!({
                "username": "siti",
                "password": "secret123",
                "full_name": "Siti Aminah",
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["data"]["fields"][0]["field"], "email");
}

#[tokio::test]
async fn mistyped_body_field_is_reported_in_envelope() {
    let token = token_for(Uuid::new_v4(), Role::User);
    let response = offline_app()
        .oneshot(request(
            "PUT",
            &format!("/api/cart/{}", Uuid::new_v4()),
            Some(&token),
            Some(json!({ "quantity": "two" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["data"]["fields"][0]["field"], "quantity");
}

#[tokio::test]
async fn malformed_ids_and_queries_are_bad_requests() {
    let token = token_for(Uuid::new_v4(), Role::User);

    for uri in [
        "/api/order/not-a-uuid",
        "/api/cart/user/42",
        "/api/product?page=first",
    ] {
        let response = offline_app()
            .oneshot(request("GET", uri, Some(&token), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = json_body(response).await;
        assert!(
            body["message"].as_str().unwrap().starts_with("Bad Request"),
            "{uri}: {body}"
        );
    }
}

#[tokio::test]
async fn admin_self_registration_is_disabled_by_default() {
    let status = status_of(
        "POST",
        "/api/authenticate/register",
        None,
        Some(json!({
            "username": "boss",
            "email": "boss@canteen.local",
            "password": "secret123",
            "full_name": "The Boss",
            "role": "admin",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

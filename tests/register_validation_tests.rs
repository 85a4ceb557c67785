// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Input validation tests for the unauthenticated operations.
//!
//! The app here uses the offline mock database, which errors on any
//! access: a 400 response proves the handler rejected the request before
//! touching the store, i.e. no record could have been created.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

use common::MultipartBuilder;

fn register_request(content_type: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/users/register")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_register_missing_field_rejected_before_any_side_effect() {
    // Each case drops one required text field
    let cases: [&[&str]; 4] = [
        &["email", "username", "password"],
        &["fullName", "username", "password"],
        &["fullName", "email", "password"],
        &["fullName", "email", "username"],
    ];

    for fields in cases {
        let (app, _) = common::create_test_app();

        let mut builder = MultipartBuilder::new();
        for field in fields {
            builder = builder.text(field, "value");
        }
        let (content_type, body) = builder
            .file("avatar", "avatar.png", "image/png", b"fake-png-bytes")
            .build();

        let response = app
            .oneshot(register_request(&content_type, body))
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 when {:?} are the only fields",
            fields
        );
    }
}

#[tokio::test]
async fn test_register_blank_field_rejected() {
    let (app, _) = common::create_test_app();

    let (content_type, body) = MultipartBuilder::new()
        .text("fullName", "   ")
        .text("email", "jane@x.com")
        .text("username", "Jane")
        .text("password", "secret1")
        .file("avatar", "avatar.png", "image/png", b"fake-png-bytes")
        .build();

    let response = app
        .oneshot(register_request(&content_type, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = common::response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["statusCode"], 400);
}

#[tokio::test]
async fn test_register_missing_avatar_rejected() {
    let (app, _) = common::create_test_app();

    let (content_type, body) = MultipartBuilder::new()
        .text("fullName", "Jane Doe")
        .text("email", "jane@x.com")
        .text("username", "Jane")
        .text("password", "secret1")
        .build();

    let response = app
        .oneshot(register_request(&content_type, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_requires_username_or_email() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"password": "secret1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_requires_password() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"username": "jane"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_without_token_is_unauthorized() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/users/refresh-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = common::response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"], serde_json::json!([]));
}

#[tokio::test]
async fn test_change_password_requires_both_fields() {
    let (app, state) = common::create_test_app();
    let user = common::test_user("user-1", "jane");
    let token = state.tokens.sign_access_token(&user).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/v1/users/change-password")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"oldPassword": "secret1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_account_requires_full_name_and_email() {
    let (app, state) = common::create_test_app();
    let user = common::test_user("user-1", "jane");
    let token = state.tokens.sign_access_token(&user).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/v1/users/update-account")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"email": "new@x.com"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_avatar_requires_file() {
    let (app, state) = common::create_test_app();
    let user = common::test_user("user-1", "jane");
    let token = state.tokens.sign_access_token(&user).unwrap();

    // Multipart body with no avatar part at all
    let (content_type, body) = MultipartBuilder::new().text("unrelated", "x").build();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/v1/users/update-avatar")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

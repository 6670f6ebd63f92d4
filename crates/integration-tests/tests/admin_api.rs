//! The `/api/admin` JSON API, signed in as an admin.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use nullbyte_core::Role;
use nullbyte_integration_tests::TestApp;
use nullbyte_storefront::auth::profile::PROFILES_TABLE;
use nullbyte_storefront::services::admin::AUDIT_FUNCTION;
use nullbyte_storefront::supabase::User;
use nullbyte_storefront::testing::FakeConnector;
use serde_json::json;

fn admin_app() -> (TestApp, User) {
    TestApp::signed_in_as(FakeConnector::new(), "ada@example.com", Role::Admin)
}

#[tokio::test]
async fn users_are_listed_with_their_roles() {
    let (app, _) = admin_app();
    app.seed_account("grace@example.com", "Grace Hopper", Role::User);

    let response = app.get("/api/admin/users").await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    let grace = users
        .iter()
        .find(|u| u["email"] == "grace@example.com")
        .unwrap();
    assert_eq!(grace["role"], "user");
    assert_eq!(grace["first_name"], "Grace");
    assert_eq!(grace["last_name"], "Hopper");
}

#[tokio::test]
async fn promoting_a_user_is_audited() {
    let (app, _) = admin_app();
    let grace = app.seed_account("grace@example.com", "Grace Hopper", Role::User);

    let response = app
        .send_json(
            Method::PATCH,
            &format!("/api/admin/users/{}", grace.id),
            &json!({ "role": "admin" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["role"], "admin");

    let calls = app.connector.db.rpc_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, AUDIT_FUNCTION);
    assert_eq!(calls[0].1["p_record_id"], grace.id.to_string());

    let stored = app
        .connector
        .db
        .rows(PROFILES_TABLE)
        .into_iter()
        .find(|row| row["user_id"] == json!(grace.id))
        .unwrap();
    assert_eq!(stored["role"], "admin");
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let (app, _) = admin_app();
    let grace = app.seed_account("grace@example.com", "Grace Hopper", Role::User);

    let response = app
        .send_json(
            Method::PATCH,
            &format!("/api/admin/users/{}", grace.id),
            &json!({}),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["data"].is_null());
    assert!(app.connector.db.rpc_calls().is_empty());
}

#[tokio::test]
async fn malformed_json_gets_an_envelope() {
    let (app, _) = admin_app();

    let response = app
        .send(
            Method::POST,
            "/api/admin/categories",
            Some("application/json"),
            axum::body::Body::from("{not json"),
        )
        .await;

    assert!(response.status.is_client_error());
    let body = response.json();
    assert!(body["data"].is_null());
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn admin_cannot_delete_themselves() {
    let (app, ada) = admin_app();

    let response = app
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", ada.id),
            None,
            axum::body::Body::empty(),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.connector.accounts.find("ada@example.com").is_some());
}

#[tokio::test]
async fn deleting_another_user_removes_the_account() {
    let (app, _) = admin_app();
    let grace = app.seed_account("grace@example.com", "Grace Hopper", Role::User);

    let response = app
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", grace.id),
            None,
            axum::body::Body::empty(),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["data"]["id"], grace.id.to_string());
    assert!(body["error"].is_null());
    assert!(app.connector.accounts.find("grace@example.com").is_none());
}

#[tokio::test]
async fn user_listing_without_service_role_is_unavailable() {
    let (app, _) = TestApp::signed_in_as(
        FakeConnector::without_directory(),
        "ada@example.com",
        Role::Admin,
    );

    let response = app.get("/api/admin/users").await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn category_create_returns_201_with_slug() {
    let (app, _) = admin_app();

    let response = app
        .send_json(
            Method::POST,
            "/api/admin/categories",
            &json!({ "name": "Display Fonts" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json()["data"]["slug"], "display-fonts");
    assert_eq!(app.connector.db.rows("categories").len(), 1);
    assert_eq!(app.connector.db.rpc_calls().len(), 1);
}

#[tokio::test]
async fn unknown_category_update_is_404() {
    let (app, _) = admin_app();

    let response = app
        .send_json(
            Method::PATCH,
            "/api/admin/categories/00000000-0000-4000-8000-000000000000",
            &json!({ "name": "Nope" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_audit_does_not_fail_the_mutation() {
    let (app, _) = admin_app();
    app.connector.db.fail_rpc();

    let response = app
        .send_json(
            Method::POST,
            "/api/admin/categories",
            &json!({ "name": "Grotesques" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
}

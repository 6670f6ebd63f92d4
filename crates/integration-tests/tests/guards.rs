//! Route table and guard responses, through the whole router.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::{StatusCode, header};
use nullbyte_core::Role;
use nullbyte_integration_tests::TestApp;
use nullbyte_storefront::testing::FakeConnector;

#[tokio::test]
async fn health_is_always_ok() {
    let app = TestApp::new(FakeConnector::new());
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn anonymous_settings_redirects_to_sign_in_with_return_path() {
    let app = TestApp::new(FakeConnector::new());

    let response = app.get("/settings").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/auth?next=%2Fsettings"));
}

#[tokio::test]
async fn anonymous_admin_api_gets_401_envelope() {
    let app = TestApp::new(FakeConnector::new());

    let response = app.get("/api/admin/stats").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let body = response.json();
    assert!(body["data"].is_null());
    assert_eq!(body["error"], "Please sign in to continue");
}

#[tokio::test]
async fn regular_user_is_turned_away_from_admin() {
    let (app, _) = TestApp::signed_in_as(FakeConnector::new(), "grace@example.com", Role::User);

    let page = app.get("/admin").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/"));

    let api = app.get("/api/admin/users").await;
    assert_eq!(api.status, StatusCode::FORBIDDEN);
    assert_eq!(api.json()["error"], "Admin access required");
}

#[tokio::test]
async fn regular_user_reaches_settings() {
    let (app, _) = TestApp::signed_in_as(FakeConnector::new(), "grace@example.com", Role::User);

    let response = app.get("/settings").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("grace@example.com"));
}

#[tokio::test]
async fn admin_reaches_dashboard_and_api() {
    let (app, _) = TestApp::signed_in_as(FakeConnector::new(), "ada@example.com", Role::Admin);

    let page = app.get("/admin").await;
    assert_eq!(page.status, StatusCode::OK);

    let stats = app.get("/api/admin/stats").await;
    assert_eq!(stats.status, StatusCode::OK);
    let body = stats.json();
    assert!(body["error"].is_null());
    assert_eq!(body["data"]["total_users"], 1);
}

#[tokio::test]
async fn unknown_admin_section_is_not_found() {
    let (app, _) = TestApp::signed_in_as(FakeConnector::new(), "ada@example.com", Role::Admin);
    let response = app.get("/admin/payroll").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn signed_in_visitor_is_sent_away_from_auth_pages() {
    let (app, _) = TestApp::signed_in_as(FakeConnector::new(), "grace@example.com", Role::User);

    let response = app.get("/auth?mode=sign-up").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn lookalike_paths_are_public() {
    let app = TestApp::new(FakeConnector::new());
    let response = app.get("/administrator").await;
    // Not guarded, just unrouted.
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn unsettled_auth_answers_loading_then_decides() {
    let connector = FakeConnector::new();
    connector.hang_sessions();
    let app = TestApp::new(connector);

    let api = app.get("/api/admin/stats").await;
    assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        api.headers.get(header::RETRY_AFTER).unwrap().to_str().unwrap(),
        "1"
    );
    assert!(api.json()["data"].is_null());

    let page = app.get("/settings").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("/settings"));

    // The session fetch gives up and the visitor settles as signed out.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let api = app.get("/api/admin/stats").await;
    assert_eq!(api.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn security_headers_are_set() {
    let app = TestApp::new(FakeConnector::new());
    let response = app.get("/health").await;
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

//! Catalog, cart, checkout and the contact form.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use nullbyte_core::{ProductId, Role};
use nullbyte_integration_tests::TestApp;
use nullbyte_storefront::testing::FakeConnector;
use serde_json::json;

fn product(title: &str, price: &str, active: bool) -> (ProductId, serde_json::Value) {
    let id = ProductId::random();
    let row = json!({
        "id": id,
        "title": title,
        "price": price,
        "active": active,
        "featured": true,
        "created_at": "2026-01-01T00:00:00Z",
        "category": { "name": "Fonts", "slug": "fonts" },
    });
    (id, row)
}

fn shop() -> (TestApp, ProductId, ProductId) {
    let app = TestApp::new(FakeConnector::new());
    let (live, live_row) = product("Mono Sans", "12.00", true);
    let (retired, retired_row) = product("Old Serif", "5.00", false);
    app.connector.db.seed("products", [live_row, retired_row]);
    (app, live, retired)
}

#[tokio::test]
async fn listing_shows_only_active_products() {
    let (app, _, _) = shop();

    let response = app.get("/products").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Mono Sans"));
    assert!(!response.body.contains("Old Serif"));
}

#[tokio::test]
async fn home_features_active_products() {
    let (app, _, _) = shop();
    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Mono Sans"));
}

#[tokio::test]
async fn inactive_product_page_is_not_found() {
    let (app, live, retired) = shop();

    assert_eq!(app.get(&format!("/product/{live}")).await.status, StatusCode::OK);
    assert_eq!(
        app.get(&format!("/product/{retired}")).await.status,
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn cart_add_update_and_clear() {
    let (app, live, _) = shop();
    let id = live.to_string();

    let added = app
        .post_form("/cart/add", &[("product_id", &id), ("quantity", "2")])
        .await;
    assert_eq!(added.status, StatusCode::SEE_OTHER);
    assert_eq!(added.location(), Some("/cart"));

    let cart = app.get("/cart").await;
    assert!(cart.body.contains("Added to your cart."));
    assert!(cart.body.contains("Mono Sans"));
    assert!(cart.body.contains("$24.00"));

    app.post_form("/cart/update", &[("product_id", &id), ("quantity", "0")])
        .await;
    let cart = app.get("/cart").await;
    assert!(!cart.body.contains("Mono Sans"));

    app.post_form("/cart/add", &[("product_id", &id)]).await;
    app.post_form("/cart/clear", &[]).await;
    let cart = app.get("/cart").await;
    assert!(cart.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn inactive_product_cannot_be_added() {
    let (app, _, retired) = shop();

    let response = app
        .post_form("/cart/add", &[("product_id", &retired.to_string())])
        .await;
    assert_eq!(response.location(), Some("/cart"));

    let cart = app.get("/cart").await;
    assert!(!cart.body.contains("Old Serif"));
}

#[tokio::test]
async fn empty_cart_checkout_goes_back_to_products() {
    let app = TestApp::new(FakeConnector::new());

    let response = app.get("/checkout").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), Some("/products"));
}

#[tokio::test]
async fn checkout_prefills_and_confirms() {
    let connector = FakeConnector::new();
    let (live, row) = product("Mono Sans", "12.00", true);
    connector.db.seed("products", [row]);
    let (app, _) = TestApp::signed_in_as(connector, "grace@example.com", Role::User);

    app.post_form("/cart/add", &[("product_id", &live.to_string())])
        .await;

    let page = app.get("/checkout").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("grace@example.com"));

    let incomplete = app
        .post_form("/checkout", &[("first_name", "Grace")])
        .await;
    assert_eq!(incomplete.status, StatusCode::OK);
    assert!(incomplete.body.contains("last name"));

    let confirmed = app
        .post_form(
            "/checkout",
            &[
                ("first_name", "Grace"),
                ("last_name", "Hopper"),
                ("email", "grace@example.com"),
                ("address", "1 Navy Way"),
                ("city", "Arlington"),
                ("state", "VA"),
                ("zip_code", "22202"),
                ("country", "US"),
            ],
        )
        .await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert!(confirmed.body.contains("Details confirmed"));
}

#[tokio::test]
async fn contact_form_is_stored() {
    let app = TestApp::new(FakeConnector::new());

    let response = app
        .post_form(
            "/contact",
            &[
                ("name", "Grace"),
                ("email", "grace@example.com"),
                ("subject", "Licensing"),
                ("message", "Can I use Mono Sans in print?"),
            ],
        )
        .await;

    assert_eq!(response.location(), Some("/contact"));
    let rows = app.connector.db.rows("contact_submissions");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["subject"], "Licensing");
}

#[tokio::test]
async fn incomplete_contact_form_is_not_stored() {
    let app = TestApp::new(FakeConnector::new());

    let response = app.post_form("/contact", &[("name", "Grace")]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(app.connector.db.rows("contact_submissions").is_empty());
}

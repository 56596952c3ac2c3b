//! Database-backed scenarios. Ignored by default; run with a Postgres
//! `DATABASE_URL` and `cargo test -- --ignored`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use atelier_commerce::api::{build_app, AppState};
use atelier_commerce::cart::{CartService, NewCartItem};
use atelier_commerce::checkout::{CheckoutMetadata, CheckoutService, CheckoutUrls};
use atelier_commerce::db;
use atelier_commerce::db::fabrics::NewFabric;
use atelier_commerce::db::products::{NewProduct, ProductChanges};
use atelier_commerce::domain::aggregates::{BodyMeasurements, CartItemUpdate, Fabric, MeasurementUnit, Product, ShippingAddress, SuitConfiguration};
use atelier_commerce::domain::value_objects::Quantity;
use atelier_commerce::measurements::MeasurementSessions;
use atelier_commerce::pricing::PricingConfig;
use atelier_commerce::providers::measurement::MockMeasurementProvider;
use atelier_commerce::providers::payment::MockPaymentProvider;
use atelier_commerce::publisher::EventPublisher;
use atelier_commerce::MarketplaceError;

async fn seed_fabric(pool: &PgPool) -> Fabric {
    let fabric = NewFabric { name: "Navy Twill".into(), description: None, price_add: Decimal::new(100, 0), is_active: true, position: 1 };
    db::fabrics::insert(pool, &fabric).await.expect("insert fabric")
}

async fn seed_product(pool: &PgPool, fabric: &Fabric, price: i64) -> Product {
    let configuration: SuitConfiguration =
        serde_json::from_value(serde_json::json!({ "modelId": "classic", "fabricId": fabric.id })).expect("configuration");
    let product = NewProduct {
        tailor_id: Uuid::new_v4(),
        title: "Navy Classic".into(),
        description: None,
        price: Decimal::new(price, 0),
        currency: "eur".into(),
        configuration,
    };
    db::products::insert(pool, &product).await.expect("insert product")
}

fn carts(pool: &PgPool) -> CartService {
    CartService::new(pool.clone(), Arc::new(PricingConfig::default()), EventPublisher::disabled())
}

fn app(pool: &PgPool) -> Router {
    build_app(AppState::new(
        pool.clone(),
        PricingConfig::default(),
        CheckoutUrls::from_base("https://atelier.test"),
        Arc::new(MockMeasurementProvider::new("https://atelier.test")),
        Arc::new(MockPaymentProvider::new("https://atelier.test")),
        EventPublisher::disabled(),
    ))
}

async fn call(app: &Router, method: &str, uri: &str, user: Uuid, role: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri).header("x-user-id", user.to_string()).header("x-user-role", role);
    let request = match body {
        Some(body) => builder.header("content-type", "application/json").body(Body::from(body.to_string())).expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json parse") };
    (status, json)
}

fn item(product_id: Uuid, session: Option<Uuid>) -> NewCartItem {
    NewCartItem { product_id, measurement_session_id: session, quantity: Quantity::new(2).unwrap(), notes: None }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Ada Lovelace".into(),
        line1: "12 Savile Row".into(),
        line2: None,
        city: "London".into(),
        state: None,
        postal_code: "W1S 3PQ".into(),
        country: "GB".into(),
    }
}

fn measurements() -> BodyMeasurements {
    BodyMeasurements {
        chest: 102.0, waist: 88.0, hips: 100.0, shoulder_width: 46.0, sleeve_length: 64.0, jacket_length: 76.0,
        neck: 40.0, inseam: 82.0, outseam: 106.0, thigh: 58.0, unit: MeasurementUnit::Cm, confidence: 0.94,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn same_product_twice_is_a_conflict(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    let product = seed_product(&pool, &fabric, 860).await;
    let user = Uuid::new_v4();
    let service = carts(&pool);

    let first = service.add_item(user, item(product.id, None)).await.expect("first add");
    let err = service.add_item(user, item(product.id, None)).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Conflict { existing_item_id: Some(id), .. } if id == first.id), "got {err:?}");
    assert_eq!(service.current(user).await.unwrap().cart.items().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn price_change_keeps_cart_snapshot(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    let product = seed_product(&pool, &fabric, 860).await;
    let user = Uuid::new_v4();
    let service = carts(&pool);
    service.add_item(user, item(product.id, None)).await.expect("add");

    let changes = ProductChanges { price: Some(Decimal::new(990, 0)), ..Default::default() };
    db::products::update(&pool, product.id, &changes).await.expect("update").expect("product exists");

    let view = service.current(user).await.unwrap();
    assert_eq!(view.cart.items()[0].price_at_add.amount(), Decimal::new(860, 0));
    assert_eq!(view.totals.subtotal.amount(), Decimal::new(1720, 0));
    assert_eq!(view.totals.platform_fee.amount(), Decimal::new(172, 0));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn referenced_fabric_cannot_be_deleted(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    seed_product(&pool, &fabric, 860).await;

    assert_eq!(db::fabrics::count_products_using(&pool, fabric.id).await.unwrap(), 1);
    let err = db::fabrics::delete(&pool, fabric.id).await.unwrap_err();
    assert!(db::is_foreign_key_violation(&err), "got {err:?}");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn another_users_item_is_forbidden(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    let product = seed_product(&pool, &fabric, 860).await;
    let service = carts(&pool);
    let added = service.add_item(Uuid::new_v4(), item(product.id, None)).await.expect("add");

    let err = service.remove_item(Uuid::new_v4(), added.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden), "got {err:?}");
    let err = service.remove_item(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::NotFound { .. }), "got {err:?}");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn checkout_waits_for_completed_measurements(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    let product = seed_product(&pool, &fabric, 860).await;
    let user = Uuid::new_v4();
    let pricing = Arc::new(PricingConfig::default());
    let payments = Arc::new(MockPaymentProvider::new("https://atelier.test"));
    let sessions = MeasurementSessions::new(pool.clone(), Arc::new(MockMeasurementProvider::new("https://atelier.test")), EventPublisher::disabled());
    let checkout = CheckoutService::new(pool.clone(), Arc::clone(&pricing), CheckoutUrls::from_base("https://atelier.test"), payments.clone(), EventPublisher::disabled());
    let service = carts(&pool);

    let added = service.add_item(user, item(product.id, None)).await.expect("add");
    let err = checkout.checkout_cart(user, None, address()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::MissingMeasurements(ref items) if items.len() == 1), "got {err:?}");

    let session = sessions.create(user, None).await.expect("session");
    let update = CartItemUpdate { measurement_session_id: Some(Some(session.id)), ..Default::default() };
    service.update_item(user, added.id, update).await.expect("link session");
    let err = checkout.checkout_cart(user, None, address()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::IncompleteMeasurements(ref items) if items[0].status.as_deref() == Some("created")), "got {err:?}");

    sessions.complete(user, session.id, measurements()).await.expect("complete");
    let created = checkout.checkout_cart(user, Some("ada@atelier.test"), address()).await.expect("checkout");
    assert!(created.session_id.starts_with("cs_mock_"));

    let sent = payments.created().await;
    let metadata = CheckoutMetadata::decode(&sent[0].metadata).expect("decodable metadata");
    assert_eq!(metadata.total, Decimal::new(1892, 0));
    assert_eq!(metadata.items[0].measurement_session_id, Some(session.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_add_over_http_names_the_existing_item(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    let product = seed_product(&pool, &fabric, 860).await;
    let app = app(&pool);
    let user = Uuid::new_v4();

    let (status, first) = call(&app, "POST", "/api/v1/cart", user, "customer", Some(json!({ "productId": product.id }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, "POST", "/api/v1/cart", user, "customer", Some(json!({ "productId": product.id, "quantity": 3 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(body["error"]["details"]["existingItemId"], first["id"]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn removing_an_item_over_http_returns_it(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    let product = seed_product(&pool, &fabric, 860).await;
    let app = app(&pool);
    let user = Uuid::new_v4();

    let (_, added) = call(&app, "POST", "/api/v1/cart", user, "customer", Some(json!({ "productId": product.id }))).await;
    let uri = format!("/api/v1/cart/{}", added["id"].as_str().expect("item id"));
    let (status, body) = call(&app, "DELETE", &uri, Uuid::new_v4(), "customer", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, removed) = call(&app, "DELETE", &uri, user, "customer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["id"], added["id"]);
    let (_, cart) = call(&app, "GET", "/api/v1/cart", user, "customer", None).await;
    assert_eq!(cart["cart"]["items"].as_array().map(Vec::len), Some(0));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cart_checkout_over_http_lists_incomplete_items(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    let product = seed_product(&pool, &fabric, 860).await;
    let app = app(&pool);
    let user = Uuid::new_v4();

    let (status, session) = call(&app, "POST", "/api/v1/measurements", user, "customer", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let body = json!({ "productId": product.id, "measurementSessionId": session["id"] });
    let (status, _) = call(&app, "POST", "/api/v1/cart", user, "customer", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let shipping = json!({ "shippingAddress": { "name": "Ada Lovelace", "line1": "12 Savile Row", "city": "London", "postalCode": "W1S 3PQ", "country": "GB" } });
    let (status, body) = call(&app, "POST", "/api/v1/cart/checkout", user, "customer", Some(shipping)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "incomplete_measurements");
    let blocking = &body["error"]["details"]["itemsWithIncompleteMeasurements"][0];
    assert_eq!(blocking["productTitle"], "Navy Classic");
    assert_eq!(blocking["status"], "created");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn deleting_a_referenced_fabric_over_http_is_refused(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    seed_product(&pool, &fabric, 860).await;
    let app = app(&pool);
    let uri = format!("/api/v1/fabrics/{}", fabric.id);

    let (status, body) = call(&app, "DELETE", &uri, Uuid::new_v4(), "admin", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "fabric_in_use");
    assert_eq!(body["error"]["details"]["productCount"], 1);
    assert!(db::fabrics::find(&pool, fabric.id).await.expect("lookup").is_some());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unused_fabric_delete_returns_the_fabric(pool: PgPool) {
    let fabric = seed_fabric(&pool).await;
    let app = app(&pool);

    let (status, body) = call(&app, "DELETE", &format!("/api/v1/fabrics/{}", fabric.id), Uuid::new_v4(), "admin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(fabric.id));
    assert!(db::fabrics::find(&pool, fabric.id).await.expect("lookup").is_none());
}

//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{BuyerId, Money};
use event_store::InMemoryEventStore;
use inventory::ProductOffering;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    state: Arc<AppState<InMemoryEventStore>>,
}

impl TestApp {
    fn new() -> Self {
        let offerings = [
            ProductOffering::new("X", "Widget", Money::from_minor(1_000), 5),
            ProductOffering::new("Y", "Gadget", Money::from_minor(250), 10),
        ];
        let state =
            api::create_state(InMemoryEventStore::new(), &Config::default(), &offerings).unwrap();
        let app = api::create_app(state.clone(), get_metrics_handle());
        Self { app, state }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        buyer: Option<BuyerId>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(buyer) = buyer {
            request = request.header("x-buyer-id", buyer.to_string());
        }
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn add(&self, buyer: BuyerId, sku: &str, quantity: u32) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/cart/items",
            Some(buyer),
            Some(json!({ "sku": sku, "quantity": quantity })),
        )
        .await
    }

    async fn commit(&self, buyer: BuyerId) -> (StatusCode, Value) {
        self.send("POST", "/orders", Some(buyer), None).await
    }

    async fn available(&self, sku: &str) -> u64 {
        let (status, json) = self.send("GET", &format!("/products/{sku}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        json["available"].as_u64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let t = TestApp::new();

    let (status, json) = t.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_cart_requires_buyer_header() {
    let t = TestApp::new();

    let (status, json) = t.send("GET", "/cart", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("x-buyer-id"));

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/cart")
                .header("x-buyer-id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_lines_and_totals() {
    let t = TestApp::new();
    let buyer = BuyerId::new();

    t.add(buyer, "X", 2).await;
    let (status, cart) = t.add(buyer, "Y", 4).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 2);
    assert_eq!(cart["total"], 3_000);
    assert_eq!(cart["total_units"], 6);

    let (status, cart) = t
        .send(
            "PUT",
            "/cart/items/X",
            Some(buyer),
            Some(json!({ "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total"], 2_000);

    let (status, cart) = t.send("DELETE", "/cart/items/Y", Some(buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"][0]["sku"], "X");
    assert_eq!(cart["lines"][0]["name"], "Widget");

    let (status, cart) = t.send("DELETE", "/cart", Some(buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cart["lines"].as_array().unwrap().is_empty());

    // Cart edits never move stock.
    assert_eq!(t.available("X").await, 5);
}

#[tokio::test]
async fn test_cart_validation_errors() {
    let t = TestApp::new();
    let buyer = BuyerId::new();

    let (status, _) = t.add(buyer, "X", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.add(buyer, "NOPE", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .send(
            "PUT",
            "/cart/items/Y",
            Some(buyer),
            Some(json!({ "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = t.add(buyer, "X", 6).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["unavailable"][0]["available"], 5);
    assert_eq!(json["unavailable"][0]["requested"], 6);
}

#[tokio::test]
async fn test_commit_creates_order_and_reserves_stock() {
    let t = TestApp::new();
    let buyer = BuyerId::new();
    t.add(buyer, "X", 3).await;

    let (status, order) = t.commit(buyer).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["state"], "new");
    assert_eq!(order["buyer_id"], buyer.to_string());
    assert_eq!(order["total_amount"], 3_000);
    assert_eq!(order["lines"][0]["name"], "Widget");
    assert_eq!(t.available("X").await, 2);

    let (_, cart) = t.send("GET", "/cart", Some(buyer), None).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_commit_with_contact() {
    let t = TestApp::new();
    let buyer = BuyerId::new();
    let contact = uuid::Uuid::new_v4();
    t.add(buyer, "Y", 1).await;

    let (status, order) = t
        .send(
            "POST",
            "/orders",
            Some(buyer),
            Some(json!({ "contact_id": contact.to_string() })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["contact_id"], contact.to_string());
}

#[tokio::test]
async fn test_commit_reports_unavailable_lines() {
    let t = TestApp::new();
    let buyer = BuyerId::new();
    t.add(buyer, "X", 5).await;
    t.state.ledger.set_quantity("X", 2).await;

    let (status, json) = t.commit(buyer).await;

    assert_eq!(status, StatusCode::CONFLICT);
    let line = &json["unavailable"][0];
    assert_eq!(line["sku"], "X");
    assert_eq!(line["name"], "Widget");
    assert_eq!(line["available"], 2);
    assert_eq!(line["requested"], 5);
    assert_eq!(t.available("X").await, 2);
}

#[tokio::test]
async fn test_commit_empty_cart() {
    let t = TestApp::new();

    let (status, _) = t.commit(BuyerId::new()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_orders_are_private_to_their_buyer() {
    let t = TestApp::new();
    let buyer = BuyerId::new();
    t.add(buyer, "Y", 2).await;
    let (_, order) = t.commit(buyer).await;
    let id = order["id"].as_str().unwrap().to_string();

    let (status, list) = t.send("GET", "/orders", Some(buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, found) = t
        .send("GET", &format!("/orders/{id}"), Some(buyer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], id);

    let stranger = BuyerId::new();
    let (status, _) = t
        .send("GET", &format!("/orders/{id}"), Some(stranger), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t
        .send("POST", &format!("/orders/{id}/cancel"), Some(stranger), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = t.send("GET", "/orders", Some(stranger), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_transitions() {
    let t = TestApp::new();
    let buyer = BuyerId::new();
    t.add(buyer, "Y", 1).await;
    let (_, order) = t.commit(buyer).await;
    let uri = format!("/orders/{}/transition", order["id"].as_str().unwrap());

    let (status, json) = t
        .send("POST", &uri, None, Some(json!({ "to": "sent" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("not adjacent"));

    for to in ["confirmed", "assembled", "sent", "delivered"] {
        let (status, json) = t.send("POST", &uri, None, Some(json!({ "to": to }))).await;
        assert_eq!(status, StatusCode::OK, "transition to {to}");
        assert_eq!(json["state"], to);
    }

    let (status, json) = t
        .send("POST", &uri, None, Some(json!({ "to": "canceled" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("terminal"));
}

#[tokio::test]
async fn test_cancel_restores_stock_once() {
    let t = TestApp::new();
    let buyer = BuyerId::new();
    t.add(buyer, "Y", 4).await;
    let (_, order) = t.commit(buyer).await;
    assert_eq!(t.available("Y").await, 6);
    let uri = format!("/orders/{}/cancel", order["id"].as_str().unwrap());

    let (status, json) = t
        .send("POST", &uri, Some(buyer), Some(json!({ "reason": "changed my mind" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "canceled");
    assert_eq!(json["cancellation"]["reason"], "changed my mind");
    assert_eq!(json["cancellation"]["from"], "new");
    assert_eq!(t.available("Y").await, 10);

    let (status, _) = t.send("POST", &uri, Some(buyer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(t.available("Y").await, 10);
}

#[tokio::test]
async fn test_invalid_order_id() {
    let t = TestApp::new();

    let (status, _) = t
        .send("GET", "/orders/not-a-uuid", Some(BuyerId::new()), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_id_is_not_an_order_id() {
    let t = TestApp::new();
    let buyer = BuyerId::new();
    t.add(buyer, "Y", 1).await;
    // The buyer's cart stream shares the buyer's uuid.
    let base = format!("/orders/{buyer}");

    let (status, _) = t.send("GET", &base, Some(buyer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .send("POST", &format!("{base}/cancel"), Some(buyer), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .send(
            "POST",
            &format!("{base}/transition"),
            None,
            Some(json!({ "to": "confirmed" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = t.send("GET", "/cart", Some(buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_product_lookup() {
    let t = TestApp::new();

    let (status, json) = t.send("GET", "/products/X", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Widget");
    assert_eq!(json["unit_price"], 1_000);
    assert_eq!(json["available"], 5);

    let (status, _) = t.send("GET", "/products/NOPE", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = TestApp::new();
    let buyer = BuyerId::new();
    t.add(buyer, "X", 1).await;
    t.commit(buyer).await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkout_commits_total"));
}

#[tokio::test]
async fn test_default_state_seeds_demo_catalog() {
    let state = api::create_default_state(InMemoryEventStore::new(), &Config::default()).unwrap();
    assert_eq!(
        state.catalog.entries().await.len(),
        api::demo_offerings().len()
    );

    let config = Config {
        seed_demo_catalog: false,
        ..Config::default()
    };
    let state = api::create_default_state(InMemoryEventStore::new(), &config).unwrap();
    assert!(state.catalog.entries().await.is_empty());
}

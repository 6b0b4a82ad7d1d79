#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use oms_api::{
    build_router,
    config::AppConfig,
    db::{self, DbConfig},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Helper harness for spinning up the application over a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to migrate test database");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a raw body with an explicit content type.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        content_type: &str,
        body: &'static str,
    ) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(body))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Creates an order through the API and returns its JSON body.
    pub async fn create_order(&self, payload: Value) -> Value {
        let response = self
            .request(Method::POST, "/api/orders/create", Some(payload))
            .await;
        assert_eq!(response.status(), 201, "order creation failed");
        response_json(response).await
    }

    /// Creates a single-line order for `total` and returns its id.
    pub async fn seed_order(&self, external_id: &str, total: &str) -> i64 {
        let body = self
            .create_order(order_payload(external_id, total, &[(1, total)]))
            .await;
        body["id"].as_i64().expect("order id")
    }

    pub async fn set_status(&self, order_id: i64, status: &str) -> Response {
        self.request(
            Method::PATCH,
            &format!("/api/orders/update/{order_id}"),
            Some(json!({ "status": status })),
        )
        .await
    }

    /// Walks an order along `statuses`, asserting every step succeeds.
    pub async fn advance(&self, order_id: i64, statuses: &[&str]) {
        for status in statuses {
            let response = self.set_status(order_id, status).await;
            assert_eq!(response.status(), 200, "transition to {status} failed");
        }
    }

    pub async fn get_order(&self, order_id: i64) -> Response {
        self.request(
            Method::GET,
            &format!("/api/orders/update/{order_id}"),
            None,
        )
        .await
    }
}

pub fn order_payload(external_id: &str, total: &str, items: &[(i64, &str)]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(index, (quantity, unit_price))| {
            json!({
                "product_id": format!("SKU-{}", index + 1),
                "product_name": format!("Product {}", index + 1),
                "quantity": quantity,
                "unit_price": unit_price,
            })
        })
        .collect();
    json!({
        "external_id": external_id,
        "customer_id": "CUST-1",
        "total_amount": total,
        "items": items,
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Rule of the first violation in an error body.
pub fn first_rule(body: &Value) -> &str {
    body["errors"][0]["rule"].as_str().unwrap_or_default()
}

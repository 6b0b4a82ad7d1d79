//! Order management service library
//!
//! Orders with line items, a fixed order lifecycle, one invoice per order and
//! one warehouse fulfillment request per order, served over HTTP with `axum`
//! and stored with `sea-orm`.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

pub use errors::ServiceError;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// The eight order-management routes, relative to the API prefix.
pub fn api_routes() -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/orders/create",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/orders/update/:id",
            get(handlers::orders::get_order).patch(handlers::orders::update_order_status),
        );

    let oms = Router::new()
        .route(
            "/oms/invoice",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            "/oms/fulfillment",
            get(handlers::fulfillment::list_fulfillment_requests)
                .post(handlers::fulfillment::create_fulfillment_request),
        );

    orders.merge(oms)
}

/// Full application router: API routes under `config.api_prefix`, health
/// probes, the OpenAPI document, request ids, HTTP tracing, request timeout and
/// body size limit.
///
/// CORS and compression are left to the binary.
pub fn build_router(state: AppState) -> Router {
    let cfg = &state.config;
    let prefix = cfg.api_prefix.clone();
    let timeout = Duration::from_secs(cfg.request_timeout_secs);
    let body_limit = cfg.max_body_size;

    let router = Router::<AppState>::new()
        .route("/", get(|| async { "oms-api up" }))
        .nest("/health", handlers::health::health_routes())
        .merge(openapi::openapi_routes(&prefix));
    let router = match prefix.trim_end_matches('/') {
        "" => router.merge(api_routes()),
        nested => router.nest(nested, api_routes()),
    };

    router
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::db::{with_transaction, DbPool};
    pub use crate::entities::{FulfillmentStatus, InvoiceStatus, OrderStatus};
    pub use crate::errors::{ErrorResponse, Rule, ServiceError, Violation};
    pub use crate::services::*;
    pub use crate::{build_router, AppState};
}

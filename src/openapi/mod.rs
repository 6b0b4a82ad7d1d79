use axum::{routing::get, Json, Router};
use utoipa::openapi::OpenApi as OpenApiDoc;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "OMS API",
        version = "0.1.0",
        description = r#"
# Order Management API

Orders, invoices and warehouse fulfillment requests.

## Order lifecycle

```text
PENDING -> CONFIRMED -> FULFILLMENT_REQUESTED -> COMPLETED
PENDING -> CANCELLED
FULFILLMENT_REQUESTED -> CANCELLED
```

Any other status change is rejected with `400`.

## Error Handling

Failed requests return a JSON body with the HTTP reason, a message and, for
rejected input, one entry per broken rule:

```json
{
  "error": "Bad Request",
  "message": "Validation error: total_amount: Total amount does not match item totals.",
  "errors": [{"field": "total_amount", "rule": "total_mismatch", "message": "..."}],
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order creation and lifecycle"),
        (name = "Invoices", description = "One invoice per order"),
        (name = "Fulfillment", description = "Warehouse dispatch of confirmed orders"),
        (name = "Health", description = "Liveness and readiness probes")
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::list_invoices,
        crate::handlers::fulfillment::create_fulfillment_request,
        crate::handlers::fulfillment::list_fulfillment_requests,
        crate::handlers::health::liveness_check,
        crate::handlers::health::readiness_check,
    ),
    components(
        schemas(
            // Order types
            crate::services::CreateOrderRequest,
            crate::services::CreateOrderItemRequest,
            crate::handlers::orders::UpdateOrderStatusRequest,
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderItemResponse,
            crate::entities::OrderStatus,

            // Invoice types
            crate::services::CreateInvoiceRequest,
            crate::handlers::invoices::InvoiceResponse,
            crate::entities::InvoiceStatus,

            // Fulfillment types
            crate::services::CreateFulfillmentRequest,
            crate::handlers::fulfillment::FulfillmentResponse,
            crate::entities::FulfillmentStatus,

            // Health types
            crate::handlers::health::LivenessResponse,
            crate::handlers::health::ReadinessResponse,
            crate::handlers::health::ComponentStatus,

            // Error types
            crate::errors::ErrorResponse,
            crate::errors::Violation,
            crate::errors::Rule
        )
    )
)]
pub struct ApiDoc;

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Generated document with every operation path under `api_prefix`.
pub fn openapi_for_prefix(api_prefix: &str) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    if api_prefix != "/api" {
        let paths = std::mem::take(&mut doc.paths.paths);
        doc.paths.paths = paths
            .into_iter()
            .map(|(path, item)| match path.strip_prefix("/api/") {
                Some(rest) => (format!("{}/{}", api_prefix.trim_end_matches('/'), rest), item),
                None => (path, item),
            })
            .collect();
    }
    doc
}

/// Serves the OpenAPI document as JSON.
pub fn openapi_routes<S>(api_prefix: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let doc = openapi_for_prefix(api_prefix);
    Router::new().route(OPENAPI_JSON_PATH, get(move || async move { Json(doc) }))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::normalize_money;
use crate::entities::order::OrderStatus;
use crate::entities::order_item::Model as OrderItemModel;
use crate::errors::ServiceError;
use crate::handlers::common::{decode_body, parse_order_id, ApiJson};
use crate::repositories::OrderWithItems;
use crate::services::CreateOrderRequest;
use crate::AppState;

/// Order as returned by the API, items included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "WEB-ORDER-00123")]
    pub external_id: String,
    #[schema(example = "CUST-42")]
    pub customer_id: String,
    pub status: OrderStatus,
    #[schema(value_type = String, example = "120.50")]
    pub total_amount: Decimal,
    #[schema(example = "TND")]
    pub currency: String,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i64,
    #[schema(example = "SKU-1")]
    pub product_id: String,
    #[schema(example = "Blue mug")]
    pub product_name: String,
    #[schema(example = 1)]
    pub quantity: i32,
    #[schema(value_type = String, example = "100.00")]
    pub unit_price: Decimal,
}

impl From<OrderItemModel> for OrderItemResponse {
    fn from(item: OrderItemModel) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: normalize_money(item.unit_price),
        }
    }
}

impl From<OrderWithItems> for OrderResponse {
    fn from((order, items): OrderWithItems) -> Self {
        Self {
            id: order.id,
            external_id: order.external_id,
            customer_id: order.customer_id,
            status: order.status,
            total_amount: normalize_money(order.total_amount),
            currency: order.currency,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Body of a status change. Status is the only client-mutable order field.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    #[schema(example = "CONFIRMED")]
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/api/orders/create",
    summary = "List orders",
    description = "All orders with their items, ordered by id",
    responses(
        (status = 200, description = "Orders listed", body = [OrderResponse]),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    let orders = state.services.orders.list_orders().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/orders/create",
    summary = "Create order",
    description = "Create a PENDING order whose total equals the sum of its item lines",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse,
            headers(("x-request-id" = String, description = "Request identifier"))
        ),
        (status = 400, description = "Invalid order", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ServiceError> {
    let created = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/orders/update/{id}",
    summary = "Get order",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let order_id = parse_order_id(&id)?;
    let order = state.services.orders.get_order(order_id).await?;
    Ok(Json(order.into()))
}

#[utoipa::path(
    patch,
    path = "/api/orders/update/{id}",
    summary = "Change order status",
    description = "Move an order along the lifecycle; only listed transitions are accepted",
    params(("id" = i64, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Invalid status or transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<ApiJson<serde_json::Value>, ServiceError>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let order_id = parse_order_id(&id)?;
    state.services.orders.ensure_exists(order_id).await?;
    let ApiJson(body) = body?;
    let request: UpdateOrderStatusRequest = decode_body(body)?;
    let updated = state
        .services
        .orders
        .transition_status(order_id, &request.status)
        .await?;
    Ok(Json(updated.into()))
}

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::fulfillment_request::{FulfillmentStatus, Model as FulfillmentModel};
use crate::errors::ServiceError;
use crate::handlers::common::{decode_body, order_reference, ApiJson};
use crate::services::CreateFulfillmentRequest;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FulfillmentResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 1)]
    pub order: i64,
    #[schema(example = "WH-1")]
    pub warehouse_code: String,
    pub status: FulfillmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FulfillmentModel> for FulfillmentResponse {
    fn from(request: FulfillmentModel) -> Self {
        Self {
            id: request.id,
            order: request.order_id,
            warehouse_code: request.warehouse_code,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/oms/fulfillment",
    summary = "Request fulfillment",
    description = "Dispatch a CONFIRMED order to a warehouse and move it to FULFILLMENT_REQUESTED",
    request_body = CreateFulfillmentRequest,
    responses(
        (status = 201, description = "Fulfillment requested", body = FulfillmentResponse),
        (status = 400, description = "Duplicate request or order not CONFIRMED", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Fulfillment"
)]
pub async fn create_fulfillment_request(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<(StatusCode, Json<FulfillmentResponse>), ServiceError> {
    if let Some(order_id) = order_reference(&body) {
        state.services.orders.ensure_exists(order_id).await?;
    }
    let request: CreateFulfillmentRequest = decode_body(body)?;
    let created = state
        .services
        .fulfillment
        .create_fulfillment_request(request)
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/oms/fulfillment",
    summary = "List fulfillment requests",
    responses(
        (status = 200, description = "Fulfillment requests listed", body = [FulfillmentResponse]),
    ),
    tag = "Fulfillment"
)]
pub async fn list_fulfillment_requests(
    State(state): State<AppState>,
) -> Result<Json<Vec<FulfillmentResponse>>, ServiceError> {
    let requests = state.services.fulfillment.list_fulfillment_requests().await?;
    Ok(Json(requests.into_iter().map(FulfillmentResponse::from).collect()))
}

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::normalize_money;
use crate::entities::invoice::{InvoiceStatus, Model as InvoiceModel};
use crate::errors::ServiceError;
use crate::handlers::common::{decode_body, order_reference, ApiJson};
use crate::services::CreateInvoiceRequest;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceResponse {
    #[schema(example = 1)]
    pub id: i64,
    /// Internal id of the invoiced order
    #[schema(example = 1)]
    pub order: i64,
    #[schema(value_type = String, example = "120.50")]
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    #[schema(example = "COD")]
    pub payment_method: String,
}

impl From<InvoiceModel> for InvoiceResponse {
    fn from(invoice: InvoiceModel) -> Self {
        Self {
            id: invoice.id,
            order: invoice.order_id,
            amount: normalize_money(invoice.amount),
            status: invoice.status,
            issued_at: invoice.issued_at,
            paid_at: invoice.paid_at,
            payment_method: invoice.payment_method,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/oms/invoice",
    summary = "Issue invoice",
    description = "Issue the single invoice of an order; the amount must equal the order total",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice issued", body = InvoiceResponse),
        (status = 400, description = "Amount mismatch, duplicate or cancelled order", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ServiceError> {
    // a missing order outranks every body error
    if let Some(order_id) = order_reference(&body) {
        state.services.orders.ensure_exists(order_id).await?;
    }
    let request: CreateInvoiceRequest = decode_body(body)?;
    let invoice = state.services.invoices.create_invoice(request).await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

#[utoipa::path(
    get,
    path = "/api/oms/invoice",
    summary = "List invoices",
    responses(
        (status = 200, description = "Invoices listed", body = [InvoiceResponse]),
    ),
    tag = "Invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceResponse>>, ServiceError> {
    let invoices = state.services.invoices.list_invoices().await?;
    Ok(Json(invoices.into_iter().map(InvoiceResponse::from).collect()))
}

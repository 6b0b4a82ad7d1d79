use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::common::{normalize_money, validate_money};
use crate::config::validate_currency;
use crate::db::with_transaction;
use crate::errors::{Rule, ServiceError};
use crate::repositories::order_repository::duplicate_external_id;
use crate::repositories::{NewOrder, NewOrderItem, OrderRepository, OrderWithItems};
use crate::services::order_status::{ensure_transition, parse_status};

/// Body of an order creation request.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "WEB-ORDER-00123")]
    pub external_id: String,
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "CUST-42")]
    pub customer_id: String,
    #[validate(custom = "validate_money")]
    #[schema(value_type = String, example = "120.50")]
    pub total_amount: Decimal,
    /// Defaults to the configured currency (TND)
    #[serde(default)]
    #[validate(custom = "validate_currency")]
    #[schema(example = "TND")]
    pub currency: Option<String>,
    #[validate]
    pub items: Vec<CreateOrderItemRequest>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderItemRequest {
    #[validate(length(min = 1, max = 64))]
    #[schema(example = "SKU-1")]
    pub product_id: String,
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Blue mug")]
    pub product_name: String,
    #[validate(range(min = 1))]
    #[schema(example = 1)]
    pub quantity: i32,
    #[validate(custom = "validate_money")]
    #[schema(value_type = String, example = "100.00")]
    pub unit_price: Decimal,
}

/// Σ quantity × unit_price, exact.
pub fn items_total(items: &[CreateOrderItemRequest]) -> Decimal {
    items
        .iter()
        .map(|item| Decimal::from(item.quantity) * item.unit_price)
        .sum()
}

fn ensure_items_present(request: &CreateOrderRequest) -> Result<(), ServiceError> {
    if request.items.is_empty() {
        return Err(ServiceError::violation(
            "items",
            Rule::ItemsRequired,
            "At least one item is required.",
        ));
    }
    Ok(())
}

fn ensure_total_matches(request: &CreateOrderRequest) -> Result<(), ServiceError> {
    let computed = items_total(&request.items);
    if computed != request.total_amount {
        return Err(ServiceError::violation(
            "total_amount",
            Rule::TotalMismatch,
            format!(
                "Total amount does not match item totals (expected {}).",
                normalize_money(computed)
            ),
        ));
    }
    Ok(())
}

/// Creation-time checks that need no storage access, in contract order:
/// items present, field formats, then the total.
pub fn check_create_order(request: &CreateOrderRequest) -> Result<(), ServiceError> {
    ensure_items_present(request)?;
    request.validate()?;
    ensure_total_matches(request)
}

/// Order lifecycle operations
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    default_currency: String,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, default_currency: impl Into<String>) -> Self {
        Self {
            db,
            default_currency: default_currency.into(),
        }
    }

    /// Validates and stores a new PENDING order with its items.
    #[instrument(skip(self, request), fields(external_id = %request.external_id, items = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderWithItems, ServiceError> {
        check_create_order(&request).map_err(|e| {
            warn!(error = %e, "Order rejected");
            e
        })?;

        let order = NewOrder {
            external_id: request.external_id,
            customer_id: request.customer_id,
            total_amount: request.total_amount,
            currency: request
                .currency
                .unwrap_or_else(|| self.default_currency.clone()),
        };
        let items = request
            .items
            .into_iter()
            .map(|item| NewOrderItem {
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect::<Vec<_>>();

        let created = with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let orders = OrderRepository::new(txn);
                if orders.external_id_exists(&order.external_id).await? {
                    return Err(duplicate_external_id(&order.external_id));
                }
                orders.insert_with_items(order, items).await
            })
        })
        .await
        .map_err(|e| {
            if e.status_code().is_server_error() {
                error!(error = %e, "Failed to create order");
            } else {
                warn!(error = %e, "Order rejected");
            }
            e
        })?;

        info!(order_id = created.0.id, order = %created.0, "Order created");
        Ok(created)
    }

    /// Moves an order to `raw_status` if the transition table allows it.
    #[instrument(skip(self), fields(order_id = order_id, target = %raw_status))]
    pub async fn transition_status(
        &self,
        order_id: i64,
        raw_status: &str,
    ) -> Result<OrderWithItems, ServiceError> {
        let raw_status = raw_status.to_owned();
        let updated = with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let orders = OrderRepository::new(txn);
                let order = orders
                    .find_by_id(order_id)
                    .await?
                    .ok_or_else(|| ServiceError::order_not_found(order_id))?;

                let target = parse_status(&raw_status)?;
                ensure_transition(order.status, target)?;

                if !orders
                    .compare_and_set_status(order_id, order.status, target)
                    .await?
                {
                    return Err(ServiceError::violation(
                        "status",
                        Rule::InvalidTransition,
                        format!("Order {} changed status concurrently", order_id),
                    ));
                }

                orders
                    .find_with_items(order_id)
                    .await?
                    .ok_or_else(|| ServiceError::order_not_found(order_id))
            })
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "Status change rejected");
            e
        })?;

        info!(order = %updated.0, "Order status updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i64) -> Result<OrderWithItems, ServiceError> {
        OrderRepository::new(&*self.db)
            .find_with_items(order_id)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))
    }

    /// Fails with not found unless the order exists.
    #[instrument(skip(self))]
    pub async fn ensure_exists(&self, order_id: i64) -> Result<(), ServiceError> {
        OrderRepository::new(&*self.db)
            .find_by_id(order_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::order_not_found(order_id))
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<OrderWithItems>, ServiceError> {
        OrderRepository::new(&*self.db).list_with_items().await
    }

    /// Removes an order together with its items, invoice and fulfillment request.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, order_id: i64) -> Result<(), ServiceError> {
        let deleted = OrderRepository::new(&*self.db).delete(order_id).await?;
        if !deleted {
            return Err(ServiceError::order_not_found(order_id));
        }
        info!(order_id, "Order deleted");
        Ok(())
    }
}

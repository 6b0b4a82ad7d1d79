use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::with_transaction;
use crate::entities::fulfillment_request::Model as FulfillmentModel;
use crate::entities::order::{Model as OrderModel, OrderStatus};
use crate::errors::{Rule, ServiceError};
use crate::repositories::fulfillment_repository::duplicate_fulfillment;
use crate::repositories::{FulfillmentRepository, NewFulfillmentRequest, OrderRepository};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateFulfillmentRequest {
    /// Internal id of the order to dispatch
    #[serde(rename = "order", alias = "order_id")]
    #[schema(example = 1)]
    pub order_id: i64,
    #[validate(length(min = 1, max = 32))]
    #[schema(example = "WH-1")]
    pub warehouse_code: String,
}

/// Rules after the order has been found: duplicate first, then the status gate.
pub fn check_fulfillment_rules(
    order: &OrderModel,
    already_requested: bool,
) -> Result<(), ServiceError> {
    if already_requested {
        return Err(duplicate_fulfillment(order.id));
    }
    if order.status != OrderStatus::Confirmed {
        return Err(invalid_order_status(order.status));
    }
    Ok(())
}

fn invalid_order_status(status: OrderStatus) -> ServiceError {
    ServiceError::violation(
        "order",
        Rule::InvalidOrderStatus,
        format!("Order status {} does not allow fulfillment", status),
    )
}

#[derive(Clone)]
pub struct FulfillmentService {
    db: Arc<DatabaseConnection>,
}

impl FulfillmentService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Records the fulfillment request and advances the order to
    /// FULFILLMENT_REQUESTED in one transaction.
    #[instrument(skip(self, request), fields(order_id = request.order_id, warehouse = %request.warehouse_code))]
    pub async fn create_fulfillment_request(
        &self,
        request: CreateFulfillmentRequest,
    ) -> Result<FulfillmentModel, ServiceError> {
        let order_id = request.order_id;

        let fulfillment = with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let orders = OrderRepository::new(txn);
                let order = orders
                    .find_by_id(order_id)
                    .await?
                    .ok_or_else(|| ServiceError::order_not_found(order_id))?;

                request.validate()?;

                let requests = FulfillmentRepository::new(txn);
                let already_requested = requests.exists_for_order(order_id).await?;
                check_fulfillment_rules(&order, already_requested)?;

                let created = requests
                    .insert(NewFulfillmentRequest {
                        order_id,
                        warehouse_code: request.warehouse_code,
                    })
                    .await?;

                let advanced = orders
                    .compare_and_set_status(
                        order_id,
                        OrderStatus::Confirmed,
                        OrderStatus::FulfillmentRequested,
                    )
                    .await?;
                if !advanced {
                    // dropping out here rolls back the insert above
                    return Err(ServiceError::violation(
                        "order",
                        Rule::InvalidOrderStatus,
                        format!("Order {} changed status concurrently", order_id),
                    ));
                }

                Ok(created)
            })
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "Fulfillment request rejected");
            e
        })?;

        info!(fulfillment_id = fulfillment.id, fulfillment = %fulfillment, "Fulfillment requested");
        Ok(fulfillment)
    }

    #[instrument(skip(self))]
    pub async fn list_fulfillment_requests(&self) -> Result<Vec<FulfillmentModel>, ServiceError> {
        FulfillmentRepository::new(&*self.db).list().await
    }
}

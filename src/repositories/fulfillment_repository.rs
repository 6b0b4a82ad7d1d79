use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::fulfillment_request::{
    ActiveModel as FulfillmentActiveModel, Column, Entity as FulfillmentRequest,
    FulfillmentStatus, Model as FulfillmentModel,
};
use crate::errors::{Rule, ServiceError};

use super::map_unique_violation;

#[derive(Debug, Clone)]
pub struct NewFulfillmentRequest {
    pub order_id: i64,
    pub warehouse_code: String,
}

pub struct FulfillmentRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> FulfillmentRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    pub async fn exists_for_order(&self, order_id: i64) -> Result<bool, ServiceError> {
        let count = FulfillmentRequest::find()
            .filter(Column::OrderId.eq(order_id))
            .count(self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn insert(
        &self,
        request: NewFulfillmentRequest,
    ) -> Result<FulfillmentModel, ServiceError> {
        let order_id = request.order_id;
        FulfillmentActiveModel {
            order_id: Set(request.order_id),
            warehouse_code: Set(request.warehouse_code),
            status: Set(FulfillmentStatus::Created),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(|e| map_unique_violation(e, || duplicate_fulfillment(order_id)))
    }

    pub async fn list(&self) -> Result<Vec<FulfillmentModel>, ServiceError> {
        Ok(FulfillmentRequest::find()
            .order_by_asc(Column::Id)
            .all(self.conn)
            .await?)
    }
}

pub(crate) fn duplicate_fulfillment(order_id: i64) -> ServiceError {
    ServiceError::violation(
        "order",
        Rule::DuplicateFulfillment,
        format!("Fulfillment request already exists for order {}", order_id),
    )
}

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::order::{
    ActiveModel as OrderActiveModel, Column, Entity as Order, Model as OrderModel, OrderStatus,
};
use crate::entities::order_item::{
    self, ActiveModel as OrderItemActiveModel, Entity as OrderItem, Model as OrderItemModel,
};
use crate::errors::{Rule, ServiceError};

use super::map_unique_violation;

/// Order row plus its line items, ordered by item id.
pub type OrderWithItems = (OrderModel, Vec<OrderItemModel>);

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub external_id: String,
    pub customer_id: String,
    pub total_amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Repository for order and order item rows
pub struct OrderRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> OrderRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<OrderModel>, ServiceError> {
        Ok(Order::find_by_id(id).one(self.conn).await?)
    }

    pub async fn find_with_items(&self, id: i64) -> Result<Option<OrderWithItems>, ServiceError> {
        let Some(order) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let items = order
            .find_related(OrderItem)
            .order_by_asc(order_item::Column::Id)
            .all(self.conn)
            .await?;
        Ok(Some((order, items)))
    }

    /// All orders by ascending id, each with its items.
    pub async fn list_with_items(&self) -> Result<Vec<OrderWithItems>, ServiceError> {
        let mut rows = Order::find()
            .order_by_asc(Column::Id)
            .find_with_related(OrderItem)
            .all(self.conn)
            .await?;
        for (_, items) in rows.iter_mut() {
            items.sort_by_key(|item| item.id);
        }
        Ok(rows)
    }

    pub async fn external_id_exists(&self, external_id: &str) -> Result<bool, ServiceError> {
        let count = Order::find()
            .filter(Column::ExternalId.eq(external_id))
            .count(self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Inserts the order as PENDING together with its items.
    ///
    /// Callers pass a transaction so a failing item insert leaves no order behind.
    pub async fn insert_with_items(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<OrderWithItems, ServiceError> {
        let external_id = order.external_id.clone();
        let created = OrderActiveModel {
            external_id: Set(order.external_id),
            customer_id: Set(order.customer_id),
            status: Set(OrderStatus::Pending),
            total_amount: Set(order.total_amount),
            currency: Set(order.currency),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(|e| map_unique_violation(e, || duplicate_external_id(&external_id)))?;

        let mut stored_items = Vec::with_capacity(items.len());
        for item in items {
            let stored = OrderItemActiveModel {
                order_id: Set(created.id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                ..Default::default()
            }
            .insert(self.conn)
            .await?;
            stored_items.push(stored);
        }

        Ok((created, stored_items))
    }

    /// Moves `id` from `expected` to `next`; returns false when the order is
    /// gone or no longer in `expected`.
    pub async fn compare_and_set_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<bool, ServiceError> {
        let result = Order::update_many()
            .col_expr(Column::Status, Expr::value(next))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(expected))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Deletes the order; items, invoice and fulfillment request go with it.
    pub async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        let result = Order::delete_by_id(id).exec(self.conn).await?;
        Ok(result.rows_affected == 1)
    }
}

pub(crate) fn duplicate_external_id(external_id: &str) -> ServiceError {
    ServiceError::violation(
        "external_id",
        Rule::DuplicateExternalId,
        format!("order with external_id '{}' already exists.", external_id),
    )
}

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::invoice::{
    ActiveModel as InvoiceActiveModel, Column, Entity as Invoice, InvoiceStatus,
    Model as InvoiceModel,
};
use crate::errors::{Rule, ServiceError};

use super::map_unique_violation;

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub order_id: i64,
    pub amount: Decimal,
    pub payment_method: String,
}

pub struct InvoiceRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> InvoiceRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    pub async fn exists_for_order(&self, order_id: i64) -> Result<bool, ServiceError> {
        let count = Invoice::find()
            .filter(Column::OrderId.eq(order_id))
            .count(self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Inserts an ISSUED invoice stamped with the current time.
    pub async fn insert(&self, invoice: NewInvoice) -> Result<InvoiceModel, ServiceError> {
        let order_id = invoice.order_id;
        InvoiceActiveModel {
            order_id: Set(invoice.order_id),
            amount: Set(invoice.amount),
            status: Set(InvoiceStatus::Issued),
            payment_method: Set(invoice.payment_method),
            paid_at: Set(None),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .map_err(|e| map_unique_violation(e, || duplicate_invoice(order_id)))
    }

    pub async fn list(&self) -> Result<Vec<InvoiceModel>, ServiceError> {
        Ok(Invoice::find()
            .order_by_asc(Column::Id)
            .all(self.conn)
            .await?)
    }
}

pub(crate) fn duplicate_invoice(order_id: i64) -> ServiceError {
    ServiceError::violation(
        "order",
        Rule::DuplicateInvoice,
        format!("Invoice already exists for order {}", order_id),
    )
}

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::common::{normalize_money, validate_money};
use crate::db::with_transaction;
use crate::entities::invoice::Model as InvoiceModel;
use crate::entities::order::{Model as OrderModel, OrderStatus};
use crate::errors::{Rule, ServiceError};
use crate::repositories::invoice_repository::duplicate_invoice;
use crate::repositories::{InvoiceRepository, NewInvoice, OrderRepository};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateInvoiceRequest {
    /// Internal id of the invoiced order
    #[serde(rename = "order", alias = "order_id")]
    #[schema(example = 1)]
    pub order_id: i64,
    #[validate(custom = "validate_money")]
    #[schema(value_type = String, example = "120.50")]
    pub amount: Decimal,
    /// Defaults to the configured payment method (COD)
    #[serde(default)]
    #[validate(length(min = 1, max = 16))]
    #[schema(example = "COD")]
    pub payment_method: Option<String>,
}

/// Issuance rules after the order has been found, in contract order:
/// amount, duplicate, cancelled.
pub fn check_invoice_rules(
    order: &OrderModel,
    amount: Decimal,
    already_invoiced: bool,
) -> Result<(), ServiceError> {
    if amount != normalize_money(order.total_amount) {
        return Err(ServiceError::violation(
            "amount",
            Rule::AmountMismatch,
            "Invoice amount must match order total",
        ));
    }
    if already_invoiced {
        return Err(duplicate_invoice(order.id));
    }
    if order.status == OrderStatus::Cancelled {
        return Err(ServiceError::violation(
            "order",
            Rule::OrderCancelled,
            "Cannot invoice a cancelled order",
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct InvoiceService {
    db: Arc<DatabaseConnection>,
    default_payment_method: String,
}

impl InvoiceService {
    pub fn new(db: Arc<DatabaseConnection>, default_payment_method: impl Into<String>) -> Self {
        Self {
            db,
            default_payment_method: default_payment_method.into(),
        }
    }

    /// Issues the single invoice an order may carry.
    #[instrument(skip(self, request), fields(order_id = request.order_id, amount = %request.amount))]
    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
    ) -> Result<InvoiceModel, ServiceError> {
        let payment_method = request
            .payment_method
            .clone()
            .unwrap_or_else(|| self.default_payment_method.clone());
        let order_id = request.order_id;

        let invoice = with_transaction(&self.db, move |txn| {
            Box::pin(async move {
                let order = OrderRepository::new(txn)
                    .find_by_id(order_id)
                    .await?
                    .ok_or_else(|| ServiceError::order_not_found(order_id))?;

                request.validate()?;

                let invoices = InvoiceRepository::new(txn);
                let already_invoiced = invoices.exists_for_order(order_id).await?;
                check_invoice_rules(&order, request.amount, already_invoiced)?;

                invoices
                    .insert(NewInvoice {
                        order_id,
                        amount: normalize_money(request.amount),
                        payment_method,
                    })
                    .await
            })
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "Invoice rejected");
            e
        })?;

        info!(invoice_id = invoice.id, invoice = %invoice, "Invoice issued");
        Ok(invoice)
    }

    #[instrument(skip(self))]
    pub async fn list_invoices(&self) -> Result<Vec<InvoiceModel>, ServiceError> {
        InvoiceRepository::new(&*self.db).list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn order(status: OrderStatus, total: Decimal) -> OrderModel {
        OrderModel {
            id: 1,
            external_id: "WEB-1".into(),
            customer_id: "C".into(),
            status,
            total_amount: total,
            currency: "TND".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn confirmed_order_with_matching_amount_is_invoiceable() {
        let o = order(OrderStatus::Confirmed, dec!(120.50));
        assert!(check_invoice_rules(&o, dec!(120.50), false).is_ok());
        // stores without a decimal type return a shortened scale
        let o = order(OrderStatus::Pending, dec!(120.5));
        assert!(check_invoice_rules(&o, dec!(120.50), false).is_ok());
    }

    #[test]
    fn amount_mismatch_outranks_every_other_rule() {
        let o = order(OrderStatus::Cancelled, dec!(120.50));
        let err = check_invoice_rules(&o, dec!(100), true).unwrap_err();
        assert_matches!(err.rule(), Some(Rule::AmountMismatch));
    }

    #[test]
    fn duplicate_outranks_cancelled() {
        let o = order(OrderStatus::Cancelled, dec!(10));
        let err = check_invoice_rules(&o, dec!(10), true).unwrap_err();
        assert_matches!(err.rule(), Some(Rule::DuplicateInvoice));
    }

    #[test]
    fn cancelled_orders_are_not_invoiced() {
        let o = order(OrderStatus::Cancelled, dec!(10));
        let err = check_invoice_rules(&o, dec!(10), false).unwrap_err();
        assert_matches!(err.rule(), Some(Rule::OrderCancelled));
    }

    #[test]
    fn status_gate_only_blocks_cancelled() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::FulfillmentRequested,
            OrderStatus::Completed,
        ] {
            assert!(check_invoice_rules(&order(status, dec!(1)), dec!(1), false).is_ok());
        }
    }
}

//! Entity store access.
//!
//! Repositories borrow any [`ConnectionTrait`] so the same queries run
//! against the pool or inside a unit of work opened by
//! [`with_transaction`](crate::db::with_transaction).

use sea_orm::{DbErr, SqlErr};

use crate::errors::ServiceError;

pub mod fulfillment_repository;
pub mod invoice_repository;
pub mod order_repository;

pub use fulfillment_repository::{FulfillmentRepository, NewFulfillmentRequest};
pub use invoice_repository::{InvoiceRepository, NewInvoice};
pub use order_repository::{NewOrder, NewOrderItem, OrderRepository, OrderWithItems};

/// Turns a storage uniqueness violation into the domain error a pre-check
/// would have raised; any other failure stays a database error.
pub(crate) fn map_unique_violation(
    err: DbErr,
    on_duplicate: impl FnOnce() -> ServiceError,
) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::warn!(%detail, "unique constraint rejected insert");
            on_duplicate()
        }
        _ => ServiceError::DatabaseError(err),
    }
}

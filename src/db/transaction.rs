//! Unit-of-work helper over sea-orm transactions.

use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use tracing::{debug, warn};

/// Runs `f` inside one database transaction.
///
/// The transaction commits when `f` returns `Ok` and rolls back on `Err`;
/// the closure's `ServiceError` reaches the caller unchanged.
///
/// ```rust,ignore
/// let created = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         let orders = OrderRepository::new(txn);
///         if orders.external_id_exists(&order.external_id).await? {
///             return Err(duplicate_external_id(&order.external_id));
///         }
///         orders.insert_with_items(order, items).await
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let start = std::time::Instant::now();
    counter!("oms_db.transaction.started", 1);

    let result = db.transaction::<_, T, ServiceError>(f).await;

    let elapsed = start.elapsed();
    histogram!("oms_db.transaction.duration", elapsed);

    match result {
        Ok(value) => {
            counter!("oms_db.transaction.committed", 1);
            debug!(?elapsed, "Transaction committed");
            Ok(value)
        }
        Err(TransactionError::Connection(e)) => {
            counter!("oms_db.transaction.rolled_back", 1);
            warn!(?elapsed, error = %e, "Transaction failed at the connection level");
            Err(ServiceError::DatabaseError(e))
        }
        Err(TransactionError::Transaction(e)) => {
            counter!("oms_db.transaction.rolled_back", 1);
            debug!(?elapsed, error = %e, "Transaction rolled back");
            Err(e)
        }
    }
}

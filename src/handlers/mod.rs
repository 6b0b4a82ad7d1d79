pub mod common;
pub mod fulfillment;
pub mod health;
pub mod invoices;
pub mod orders;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::{FulfillmentService, InvoiceService, OrderService};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub invoices: Arc<InvoiceService>,
    pub fulfillment: Arc<FulfillmentService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        Self {
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                config.default_currency.clone(),
            )),
            invoices: Arc::new(InvoiceService::new(
                db_pool.clone(),
                config.default_payment_method.clone(),
            )),
            fulfillment: Arc::new(FulfillmentService::new(db_pool)),
        }
    }
}

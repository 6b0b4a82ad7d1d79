pub mod fulfillment;
pub mod invoicing;
pub mod order_status;
pub mod orders;

pub use fulfillment::{CreateFulfillmentRequest, FulfillmentService};
pub use invoicing::{CreateInvoiceRequest, InvoiceService};
pub use orders::{CreateOrderItemRequest, CreateOrderRequest, OrderService};

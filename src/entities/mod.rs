pub mod fulfillment_request;
pub mod invoice;
pub mod order;
pub mod order_item;

pub use fulfillment_request::FulfillmentStatus;
pub use invoice::InvoiceStatus;
pub use order::OrderStatus;

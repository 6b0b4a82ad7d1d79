//! Storage-level guarantees: cascades, uniqueness and units of work.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use oms_api::db::with_transaction;
use oms_api::entities::{fulfillment_request, invoice, order_item, OrderStatus};
use oms_api::errors::{Rule, ServiceError};
use oms_api::repositories::{
    FulfillmentRepository, InvoiceRepository, NewFulfillmentRequest, NewInvoice, NewOrder,
    NewOrderItem, OrderRepository,
};
use oms_api::services::{CreateInvoiceRequest, CreateOrderItemRequest, CreateOrderRequest};
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};

fn new_order(external_id: &str) -> NewOrder {
    NewOrder {
        external_id: external_id.to_string(),
        customer_id: "CUST-1".to_string(),
        total_amount: dec!(20.00),
        currency: "TND".to_string(),
    }
}

fn new_item() -> NewOrderItem {
    NewOrderItem {
        product_id: "SKU-1".to_string(),
        product_name: "Mug".to_string(),
        quantity: 2,
        unit_price: dec!(10.00),
    }
}

#[tokio::test]
async fn deleting_an_order_removes_its_dependents() {
    let app = TestApp::new().await;
    let db = app.state.db.clone();
    let id = app.seed_order("WEB-DEL", "10.00").await;
    app.advance(id, &["CONFIRMED"]).await;

    let services = &app.state.services;
    services
        .invoices
        .create_invoice(CreateInvoiceRequest {
            order_id: id,
            amount: dec!(10.00),
            payment_method: None,
        })
        .await
        .unwrap();
    FulfillmentRepository::new(&*db)
        .insert(NewFulfillmentRequest {
            order_id: id,
            warehouse_code: "WH-1".into(),
        })
        .await
        .unwrap();

    services.orders.delete_order(id).await.unwrap();

    assert_eq!(order_item::Entity::find().count(&*db).await.unwrap(), 0);
    assert_eq!(invoice::Entity::find().count(&*db).await.unwrap(), 0);
    assert_eq!(fulfillment_request::Entity::find().count(&*db).await.unwrap(), 0);
    assert_matches!(
        services.orders.delete_order(id).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn store_rejects_duplicate_external_id() {
    let app = TestApp::new().await;
    let orders = OrderRepository::new(&*app.state.db);
    orders
        .insert_with_items(new_order("WEB-UNIQ"), vec![new_item()])
        .await
        .unwrap();

    let err = orders
        .insert_with_items(new_order("WEB-UNIQ"), vec![new_item()])
        .await
        .unwrap_err();
    assert_eq!(err.rule(), Some(Rule::DuplicateExternalId));
}

#[tokio::test]
async fn store_rejects_second_invoice_and_fulfillment() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let (order, _) = OrderRepository::new(db)
        .insert_with_items(new_order("WEB-ONE"), vec![new_item()])
        .await
        .unwrap();

    let invoices = InvoiceRepository::new(db);
    let invoice = || NewInvoice {
        order_id: order.id,
        amount: dec!(20.00),
        payment_method: "COD".into(),
    };
    invoices.insert(invoice()).await.unwrap();
    assert_eq!(
        invoices.insert(invoice()).await.unwrap_err().rule(),
        Some(Rule::DuplicateInvoice)
    );

    let requests = FulfillmentRepository::new(db);
    let request = || NewFulfillmentRequest {
        order_id: order.id,
        warehouse_code: "WH-1".into(),
    };
    requests.insert(request()).await.unwrap();
    assert_eq!(
        requests.insert(request()).await.unwrap_err().rule(),
        Some(Rule::DuplicateFulfillment)
    );
}

#[tokio::test]
async fn failed_unit_of_work_leaves_no_trace() {
    let app = TestApp::new().await;
    let db = app.state.db.clone();

    let result: Result<(), ServiceError> = with_transaction(&db, |txn| {
        Box::pin(async move {
            OrderRepository::new(txn)
                .insert_with_items(new_order("WEB-ROLLBACK"), vec![new_item()])
                .await?;
            Err(ServiceError::InternalError("abort".into()))
        })
    })
    .await;
    assert_matches!(result, Err(ServiceError::InternalError(_)));

    let orders = OrderRepository::new(&*db);
    assert!(!orders.external_id_exists("WEB-ROLLBACK").await.unwrap());
    assert_eq!(order_item::Entity::find().count(&*db).await.unwrap(), 0);
}

#[tokio::test]
async fn fulfillment_insert_rolls_back_when_status_moved() {
    let app = TestApp::new().await;
    let db = app.state.db.clone();
    let (order, _) = OrderRepository::new(&*db)
        .insert_with_items(new_order("WEB-RACE"), vec![new_item()])
        .await
        .unwrap();
    let order_id = order.id;

    let result: Result<(), ServiceError> = with_transaction(&db, move |txn| {
        Box::pin(async move {
            FulfillmentRepository::new(txn)
                .insert(NewFulfillmentRequest {
                    order_id,
                    warehouse_code: "WH-1".into(),
                })
                .await?;
            let advanced = OrderRepository::new(txn)
                .compare_and_set_status(
                    order_id,
                    OrderStatus::Confirmed,
                    OrderStatus::FulfillmentRequested,
                )
                .await?;
            assert!(!advanced);
            Err(ServiceError::violation(
                "order",
                Rule::InvalidOrderStatus,
                "status moved",
            ))
        })
    })
    .await;
    assert_eq!(result.unwrap_err().rule(), Some(Rule::InvalidOrderStatus));

    assert_eq!(fulfillment_request::Entity::find().count(&*db).await.unwrap(), 0);
    let stored = OrderRepository::new(&*db).find_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
}

#[tokio::test]
async fn compare_and_set_only_moves_from_expected_status() {
    let app = TestApp::new().await;
    let orders = OrderRepository::new(&*app.state.db);
    let (order, _) = orders
        .insert_with_items(new_order("WEB-CAS"), vec![new_item()])
        .await
        .unwrap();

    assert!(!orders
        .compare_and_set_status(order.id, OrderStatus::Confirmed, OrderStatus::Completed)
        .await
        .unwrap());
    assert!(orders
        .compare_and_set_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
        .await
        .unwrap());
    let stored = orders.find_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn service_creates_order_with_configured_currency() {
    let mut cfg = common::test_config();
    cfg.default_currency = "EUR".into();
    let app = TestApp::with_config(cfg).await;

    let (order, items) = app
        .state
        .services
        .orders
        .create_order(CreateOrderRequest {
            external_id: "WEB-EUR".into(),
            customer_id: "CUST-9".into(),
            total_amount: dec!(7.50),
            currency: None,
            items: vec![CreateOrderItemRequest {
                product_id: "SKU-1".into(),
                product_name: "Sticker".into(),
                quantity: 3,
                unit_price: dec!(2.50),
            }],
        })
        .await
        .unwrap();

    assert_eq!(order.currency, "EUR");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].line_total(), dec!(7.50));
}

//! Property-based tests for order totals, money handling and the transition table.
//!
//! These tests use proptest to verify invariants across a wide range of inputs,
//! helping to catch edge cases that unit tests might miss.

use oms_api::common::{normalize_money, validate_money};
use oms_api::entities::OrderStatus;
use oms_api::errors::Rule;
use oms_api::services::order_status::{ensure_transition, parse_status, ALLOWED_TRANSITIONS};
use oms_api::services::orders::{check_create_order, items_total};
use oms_api::services::{CreateOrderItemRequest, CreateOrderRequest};
use proptest::prelude::*;
use rust_decimal::Decimal;
use sea_orm::Iterable;

// Strategies for generating test data
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn item_strategy() -> impl Strategy<Value = CreateOrderItemRequest> {
    (1i32..50, price_strategy()).prop_map(|(quantity, unit_price)| CreateOrderItemRequest {
        product_id: "SKU".into(),
        product_name: "Item".into(),
        quantity,
        unit_price,
    })
}

fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop::sample::select(OrderStatus::iter().collect::<Vec<_>>())
}

fn request(total: Decimal, items: Vec<CreateOrderItemRequest>) -> CreateOrderRequest {
    CreateOrderRequest {
        external_id: "WEB-PROP".into(),
        customer_id: "CUST".into(),
        total_amount: total,
        currency: None,
        items,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn exact_line_sum_is_always_accepted(items in prop::collection::vec(item_strategy(), 1..8)) {
        let total = items_total(&items);
        prop_assert!(check_create_order(&request(total, items)).is_ok());
    }

    #[test]
    fn any_cent_of_drift_is_a_mismatch(
        items in prop::collection::vec(item_strategy(), 1..8),
        drift in prop_oneof![(1i64..10_000), (-10_000i64..-1)],
    ) {
        let total = items_total(&items) + Decimal::new(drift, 2);
        prop_assume!(!total.is_sign_negative());
        let err = check_create_order(&request(total, items)).unwrap_err();
        prop_assert_eq!(err.rule(), Some(Rule::TotalMismatch));
    }

    #[test]
    fn normalized_money_has_two_digits_and_same_value(cents in 0i64..10_000_000_000) {
        let value = Decimal::new(cents, 2);
        let normalized = normalize_money(value.normalize());
        prop_assert_eq!(normalized, value);
        prop_assert_eq!(normalized.scale(), 2);
        prop_assert!(validate_money(&value).is_ok());
    }

    #[test]
    fn transitions_follow_the_table(from in status_strategy(), to in status_strategy()) {
        let listed = ALLOWED_TRANSITIONS
            .iter()
            .any(|(f, next)| *f == from && next.contains(&to));
        prop_assert_eq!(ensure_transition(from, to).is_ok(), listed);
        prop_assert_eq!(from.can_transition_to(to), listed);
    }

    #[test]
    fn no_walk_escapes_a_terminal_status(steps in prop::collection::vec(status_strategy(), 0..20)) {
        let mut current = OrderStatus::Pending;
        for step in steps {
            if current.is_terminal() {
                prop_assert!(ensure_transition(current, step).is_err());
            }
            if current.can_transition_to(step) {
                current = step;
            }
        }
    }

    #[test]
    fn only_exact_status_names_parse(raw in "[A-Za-z_ ]{0,24}") {
        let parsed = parse_status(&raw);
        let known = OrderStatus::iter().any(|s| s.to_string() == raw);
        prop_assert_eq!(parsed.is_ok(), known);
    }
}

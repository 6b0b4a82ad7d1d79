//! Order lifecycle transition table.
//!
//! ```text
//! PENDING ──> CONFIRMED ──> FULFILLMENT_REQUESTED ──> COMPLETED
//!    │                              │
//!    └──────────> CANCELLED <───────┘
//! ```

use std::str::FromStr;

use crate::entities::order::OrderStatus;
use crate::errors::{Rule, ServiceError};

use OrderStatus::*;

/// Every legal move, one row per current status. No status lists itself.
pub const ALLOWED_TRANSITIONS: [(OrderStatus, &[OrderStatus]); 5] = [
    (Pending, &[Confirmed, Cancelled]),
    (Confirmed, &[FulfillmentRequested]),
    (FulfillmentRequested, &[Completed, Cancelled]),
    (Completed, &[]),
    (Cancelled, &[]),
];

impl OrderStatus {
    pub fn allowed_next(self) -> &'static [OrderStatus] {
        ALLOWED_TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

/// Parses a client-supplied status name; matching is exact.
pub fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw).map_err(|_| {
        ServiceError::violation(
            "status",
            Rule::InvalidStatusValue,
            format!("Invalid status value '{}'", raw),
        )
    })
}

pub fn ensure_transition(current: OrderStatus, target: OrderStatus) -> Result<(), ServiceError> {
    if current.can_transition_to(target) {
        Ok(())
    } else {
        Err(ServiceError::violation(
            "status",
            Rule::InvalidTransition,
            format!("Invalid status transition from {} to {}", current, target),
        ))
    }
}

//! Order status lifecycle and the inventory side-effect rule.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Expected progression:
/// ```text
/// pending ─┬─► confirmed ─► processing ─► ready_to_ship ─► shipped ─► delivered
///          ├─► cancelled
///          └─► failed
/// ```
///
/// The transition graph is deliberately unconstrained: admins may move an
/// order between any two statuses, and the engine enforces business rules
/// only for the inventory side effect, not for status topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order has been placed, awaiting payment or admin confirmation.
    #[default]
    Pending,

    /// Order is confirmed; inventory has been decremented.
    Confirmed,

    /// Order is being prepared.
    Processing,

    /// Order is packed and awaiting pickup.
    ReadyToShip,

    /// Order has been handed to the courier.
    Shipped,

    /// Order reached the customer.
    Delivered,

    /// Order was cancelled.
    Cancelled,

    /// Order failed (payment or fulfilment).
    Failed,
}

impl OrderStatus {
    /// Returns the status name as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::ReadyToShip => "ready_to_ship",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status of an order, an axis independent of [`OrderStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment not yet received.
    #[default]
    Pending,

    /// Payment captured by the gateway.
    Paid,

    /// Payment attempt failed.
    Failed,

    /// Payment was refunded.
    Refunded,
}

impl PaymentStatus {
    /// Returns the payment status as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inventory side effect implied by a status transition.
///
/// This is the only business rule the engine enforces in-process. It must be
/// evaluated against the status read fresh immediately before the write, so
/// an order can be decremented at most once per confirm/cancel cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryEffect {
    /// No ledger change.
    None,
    /// Stock is reduced (entering `confirmed`).
    Decrement,
    /// Stock is restored (leaving `confirmed` for `cancelled`/`failed`).
    Increment,
}

impl InventoryEffect {
    /// Decides the ledger effect for a transition from `previous` to `next`.
    pub fn for_transition(previous: OrderStatus, next: OrderStatus) -> Self {
        if next == OrderStatus::Confirmed && previous != OrderStatus::Confirmed {
            InventoryEffect::Decrement
        } else if previous == OrderStatus::Confirmed
            && matches!(next, OrderStatus::Cancelled | OrderStatus::Failed)
        {
            InventoryEffect::Increment
        } else {
            InventoryEffect::None
        }
    }
}

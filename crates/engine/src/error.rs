//! Engine error types.

use common::{OrderKey, ProductKey};
use domain::OrderStatus;
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur while driving a status transition.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The target order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderKey),

    /// The verification loop exhausted its attempts and the stored status
    /// still disagrees with the intended one. The caller must re-query to
    /// learn the real state.
    #[error("Status verification failed for order {order}: expected {expected}, found {actual}")]
    VerificationFailed {
        order: OrderKey,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// A bulk write touched fewer rows than requested.
    #[error("Bulk status write touched {actual} of {expected} orders")]
    BulkWriteMismatch { expected: usize, actual: usize },

    /// Some orders in a bulk transition could not be verified.
    #[error("Bulk status verification failed for {} orders", orders.len())]
    BulkVerificationFailed { orders: Vec<OrderKey> },

    /// The ledger adjustment loop lost the optimistic-concurrency race on
    /// every attempt.
    #[error("Ledger contention for product {product}")]
    LedgerContention { product: ProductKey },

    /// A store error occurred.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;

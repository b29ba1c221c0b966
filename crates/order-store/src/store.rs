use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderKey, ProductKey, PublicOrderId};
use domain::{Order, OrderStatus, PaymentStatus, StockLedger};

use crate::Result;

/// The status cell of an order row, as returned by status reads and writes.
///
/// Status writes return the row they claim to have produced; the engine's
/// verification loop re-reads it afterwards because the two have been
/// observed to disagree under load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub key: OrderKey,
    pub public_id: PublicOrderId,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

/// Payment fields written by the gateway callback path.
///
/// Optional fields map to columns the store intermittently rejects; the
/// reduced fallback write carries the payment status alone.
#[derive(Debug, Clone, Default)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
    pub status: Option<OrderStatus>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
}

/// Row-level access to the orders table.
///
/// All implementations must be thread-safe (Send + Sync). No method holds a
/// lock across calls; two callers racing on the same order see plain
/// last-write-wins row semantics, which is exactly what the engine's
/// verify-and-repair loop compensates for.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order row.
    ///
    /// Fails with `DuplicatePublicId` when the public identifier is already
    /// taken; the caller regenerates and retries, bounded.
    async fn insert_order(&self, order: Order) -> Result<Order>;

    /// Loads a full order row by internal key.
    async fn get_order(&self, key: OrderKey) -> Result<Option<Order>>;

    /// Loads a full order row by its public identifier.
    async fn find_by_public_id(&self, public_id: &PublicOrderId) -> Result<Option<Order>>;

    /// Reads the current status cell, fresh. Fails with `NotFound` when the
    /// order does not exist.
    async fn read_status(&self, key: OrderKey) -> Result<StatusRow>;

    /// Reads the status cells for a batch of orders in one round trip.
    ///
    /// Missing keys are simply absent from the result; the caller compares
    /// row counts.
    async fn read_status_bulk(&self, keys: &[OrderKey]) -> Result<Vec<StatusRow>>;

    /// Writes the status and `updated_at` of one order, returning the row
    /// the write claims to have produced.
    async fn write_status(
        &self,
        key: OrderKey,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusRow>;

    /// Writes the status of a batch of orders in one round trip.
    async fn write_status_bulk(
        &self,
        keys: &[OrderKey],
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<StatusRow>>;

    /// Writes the full payment payload (gateway callback path).
    async fn write_payment(&self, key: OrderKey, update: PaymentUpdate) -> Result<()>;

    /// Writes the payment status alone — the reduced payload used when the
    /// full one is rejected with a schema mismatch.
    async fn write_payment_core(&self, key: OrderKey, payment_status: PaymentStatus) -> Result<()>;

    /// Next public-id sequence number for the current month.
    async fn next_public_sequence(&self) -> Result<u32>;
}

/// Row-level access to per-product stock ledgers.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Creates the ledger row for a product.
    async fn insert_ledger(&self, product: ProductKey, ledger: StockLedger) -> Result<()>;

    /// Loads the ledger for a product.
    async fn get_ledger(&self, product: ProductKey) -> Result<Option<StockLedger>>;

    /// Replaces the ledger, conditional on the version it was read at.
    ///
    /// The stored row's version must equal `ledger.version`; on success the
    /// stored version is bumped. A mismatch fails with `VersionConflict`
    /// and the caller re-reads and re-applies its adjustment.
    async fn put_ledger(&self, product: ProductKey, ledger: StockLedger) -> Result<()>;
}

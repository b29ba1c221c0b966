use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use common::{OrderKey, ProductKey, PublicOrderId};
use domain::{Order, OrderStatus, PaymentStatus, StockLedger};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{LedgerStore, OrderStore, PaymentUpdate, StatusRow},
};

#[derive(Default)]
struct StoreState {
    orders: HashMap<OrderKey, Order>,
    ledgers: HashMap<ProductKey, StockLedger>,
    // Fault injection for tests.
    revert_status_writes: usize,
    fail_writes: usize,
    reject_payment_payload: bool,
    failing_ledgers: HashSet<ProductKey>,
}

/// In-memory store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation, plus fault
/// injection to simulate the backing store's observed misbehavior: silently
/// reverted status writes, transient failures, and schema-mismatch
/// rejections of the composite payment payload.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` status writes report success while leaving the
    /// stored row untouched — the "silent revert" failure mode.
    pub async fn set_revert_status_writes(&self, n: usize) {
        self.state.write().await.revert_status_writes = n;
    }

    /// Makes the next `n` write operations fail with a transient error.
    pub async fn set_fail_writes(&self, n: usize) {
        self.state.write().await.fail_writes = n;
    }

    /// Makes full payment writes fail with a schema mismatch.
    pub async fn set_reject_payment_payload(&self, reject: bool) {
        self.state.write().await.reject_payment_payload = reject;
    }

    /// Makes ledger writes for one product fail with a transient error.
    pub async fn set_fail_ledger_for(&self, product: ProductKey) {
        self.state.write().await.failing_ledgers.insert(product);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    fn take_write_fault(state: &mut StoreState) -> Result<()> {
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(StoreError::Transient("injected write failure".into()));
        }
        Ok(())
    }
}

fn status_row(order: &Order) -> StatusRow {
    StatusRow {
        key: order.key,
        public_id: order.public_id.clone(),
        status: order.status,
        updated_at: order.updated_at,
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: Order) -> Result<Order> {
        let mut state = self.state.write().await;
        Self::take_write_fault(&mut state)?;

        if state
            .orders
            .values()
            .any(|o| o.public_id == order.public_id)
        {
            return Err(StoreError::DuplicatePublicId(
                order.public_id.as_str().to_string(),
            ));
        }
        state.orders.insert(order.key, order.clone());
        Ok(order)
    }

    async fn get_order(&self, key: OrderKey) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&key).cloned())
    }

    async fn find_by_public_id(&self, public_id: &PublicOrderId) -> Result<Option<Order>> {
        Ok(self
            .state
            .read()
            .await
            .orders
            .values()
            .find(|o| &o.public_id == public_id)
            .cloned())
    }

    async fn read_status(&self, key: OrderKey) -> Result<StatusRow> {
        let state = self.state.read().await;
        state
            .orders
            .get(&key)
            .map(status_row)
            .ok_or_else(|| StoreError::NotFound(format!("order {key}")))
    }

    async fn read_status_bulk(&self, keys: &[OrderKey]) -> Result<Vec<StatusRow>> {
        let state = self.state.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| state.orders.get(key).map(status_row))
            .collect())
    }

    async fn write_status(
        &self,
        key: OrderKey,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusRow> {
        let mut state = self.state.write().await;
        Self::take_write_fault(&mut state)?;

        let revert = state.revert_status_writes > 0;
        if revert {
            state.revert_status_writes -= 1;
        }

        let order = state
            .orders
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("order {key}")))?;
        if !revert {
            order.status = status;
            order.updated_at = updated_at;
        }

        // A reverted write still reports the row it claims to have produced.
        Ok(StatusRow {
            key,
            public_id: order.public_id.clone(),
            status,
            updated_at,
        })
    }

    async fn write_status_bulk(
        &self,
        keys: &[OrderKey],
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<StatusRow>> {
        let mut state = self.state.write().await;
        Self::take_write_fault(&mut state)?;

        let revert = state.revert_status_writes > 0;
        if revert {
            state.revert_status_writes -= 1;
        }

        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(order) = state.orders.get_mut(key) {
                if !revert {
                    order.status = status;
                    order.updated_at = updated_at;
                }
                rows.push(StatusRow {
                    key: *key,
                    public_id: order.public_id.clone(),
                    status,
                    updated_at,
                });
            }
        }
        Ok(rows)
    }

    async fn write_payment(&self, key: OrderKey, update: PaymentUpdate) -> Result<()> {
        let mut state = self.state.write().await;
        Self::take_write_fault(&mut state)?;

        if state.reject_payment_payload {
            return Err(StoreError::SchemaMismatch(
                "column \"payment_method\" is not in the schema cache".into(),
            ));
        }

        let order = state
            .orders
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("order {key}")))?;
        order.payment_status = update.payment_status;
        if let Some(status) = update.status {
            order.status = status;
        }
        Ok(())
    }

    async fn write_payment_core(&self, key: OrderKey, payment_status: PaymentStatus) -> Result<()> {
        let mut state = self.state.write().await;
        Self::take_write_fault(&mut state)?;

        let order = state
            .orders
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("order {key}")))?;
        order.payment_status = payment_status;
        Ok(())
    }

    async fn next_public_sequence(&self) -> Result<u32> {
        let now = Utc::now();
        let state = self.state.read().await;
        let this_month = state
            .orders
            .values()
            .filter(|o| o.created_at.year() == now.year() && o.created_at.month() == now.month())
            .count();
        Ok(this_month as u32 + 1)
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_ledger(&self, product: ProductKey, ledger: StockLedger) -> Result<()> {
        self.state.write().await.ledgers.insert(product, ledger);
        Ok(())
    }

    async fn get_ledger(&self, product: ProductKey) -> Result<Option<StockLedger>> {
        Ok(self.state.read().await.ledgers.get(&product).cloned())
    }

    async fn put_ledger(&self, product: ProductKey, ledger: StockLedger) -> Result<()> {
        let mut state = self.state.write().await;

        if state.failing_ledgers.contains(&product) {
            return Err(StoreError::Transient(format!(
                "injected ledger failure for product {product}"
            )));
        }

        let stored = state
            .ledgers
            .get_mut(&product)
            .ok_or_else(|| StoreError::NotFound(format!("ledger for product {product}")))?;
        if stored.version != ledger.version {
            return Err(StoreError::VersionConflict {
                product,
                expected: ledger.version,
                actual: stored.version,
            });
        }

        *stored = ledger;
        stored.version += 1;
        Ok(())
    }
}

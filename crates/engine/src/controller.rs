//! Single-order status transition controller.

use chrono::Utc;
use common::OrderKey;
use domain::{InventoryEffect, Order, OrderStatus, decrement, increment};
use order_store::{LedgerStore, OrderStore, StoreError};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Drives status transitions against a backing store that offers no
/// transactions and has been observed to silently revert writes.
///
/// Every transition follows the same protocol: fresh read of the previous
/// status, checked write, inventory side effect derived from the status
/// movement, then a bounded verify-and-repair loop that re-reads the row
/// and re-issues the write until it sticks.
pub struct TransitionController<S> {
    store: S,
    config: EngineConfig,
}

impl<S> TransitionController<S>
where
    S: OrderStore + LedgerStore,
{
    /// Creates a controller over the given store.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Transitions one order to `new_status`, adjusting inventory and
    /// verifying that the write stuck.
    ///
    /// The payment status axis is never touched here.
    #[tracing::instrument(skip(self))]
    pub async fn update_order_status(&self, key: OrderKey, new_status: OrderStatus) -> Result<()> {
        metrics::counter!("order_status_transitions_total").increment(1);
        let start = std::time::Instant::now();
        let store = &self.store;

        // 1. Fresh read of the previous status. Inventory decisions key off
        //    the stored row, never off what the caller believes.
        let previous = self
            .config
            .retry
            .run(|| store.read_status(key))
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => EngineError::OrderNotFound(key),
                other => EngineError::Store(other),
            })?;

        // 2. Write the new status. The write's read-back disagreeing with
        //    the intent counts as a transient failure and is retried.
        self.write_status_checked(key, new_status).await?;

        // 3. Inventory side effect, decided from the movement alone.
        let effect = InventoryEffect::for_transition(previous.status, new_status);
        if effect != InventoryEffect::None
            && let Some(order) = self.config.retry.run(|| store.get_order(key)).await?
        {
            self.apply_inventory(&order, effect).await?;
        }

        // 4. Verify the write survived; re-issue it when the store reverts.
        self.verify_status(key, new_status, self.config.verify_delay)
            .await?;

        metrics::histogram!("status_transition_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(%key, from = %previous.status, to = %new_status, "order status updated");
        Ok(())
    }

    /// Writes the status and checks the row the write claims to have
    /// produced. A disagreement is surfaced as a transient store failure so
    /// the harness retries it.
    pub(crate) async fn write_status_checked(
        &self,
        key: OrderKey,
        status: OrderStatus,
    ) -> Result<()> {
        let store = &self.store;
        self.config
            .retry
            .run(|| async move {
                let row = store.write_status(key, status, Utc::now()).await?;
                if row.status != status {
                    return Err(StoreError::Transient(format!(
                        "status write for order {key} returned {}, expected {status}",
                        row.status
                    )));
                }
                Ok(())
            })
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => EngineError::OrderNotFound(key),
                other => EngineError::Store(other),
            })
    }

    /// Applies the inventory effect for one order through the optimistic
    /// ledger loop.
    ///
    /// Orders without a product reference and products without a ledger row
    /// are no-ops. Losing the version race re-reads and re-applies, bounded.
    pub(crate) async fn apply_inventory(&self, order: &Order, effect: InventoryEffect) -> Result<()> {
        let Some(product) = order.product else {
            tracing::debug!(key = %order.key, "order has no product reference, skipping inventory");
            return Ok(());
        };

        let store = &self.store;
        let quantity = order.effective_quantity();
        let attempts = self.config.ledger_attempts.max(1);

        for _ in 0..attempts {
            let Some(ledger) = self.config.retry.run(|| store.get_ledger(product)).await? else {
                tracing::debug!(%product, "no ledger row, skipping inventory");
                return Ok(());
            };

            let adjusted = match effect {
                InventoryEffect::Decrement => decrement(&ledger, &order.colors, quantity),
                InventoryEffect::Increment => increment(&ledger, &order.colors, quantity),
                InventoryEffect::None => return Ok(()),
            };

            match self
                .config
                .retry
                .run(|| {
                    let adjusted = adjusted.clone();
                    store.put_ledger(product, adjusted)
                })
                .await
            {
                Ok(()) => {
                    metrics::counter!("inventory_adjustments_total").increment(1);
                    tracing::info!(
                        %product,
                        key = %order.key,
                        ?effect,
                        quantity,
                        total_stock = adjusted.total_stock,
                        "inventory adjusted"
                    );
                    return Ok(());
                }
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(%product, "ledger version conflict, re-reading");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::LedgerContention { product })
    }

    /// Re-reads the status until it matches the intent, re-issuing the
    /// write whenever the store has reverted it.
    async fn verify_status(
        &self,
        key: OrderKey,
        expected: OrderStatus,
        delay: std::time::Duration,
    ) -> Result<()> {
        let store = &self.store;

        for attempt in 1..=self.config.verify_attempts.max(1) {
            tokio::time::sleep(delay).await;

            let row = self.config.retry.run(|| store.read_status(key)).await?;
            if row.status == expected {
                return Ok(());
            }

            metrics::counter!("status_write_reverts_total").increment(1);
            tracing::warn!(
                %key,
                %expected,
                actual = %row.status,
                attempt,
                "status write was reverted, re-issuing"
            );
            self.write_status_checked(key, expected).await?;
        }

        // One last read so the error reports what the store actually holds.
        let row = self.config.retry.run(|| store.read_status(key)).await?;
        if row.status == expected {
            return Ok(());
        }

        Err(EngineError::VerificationFailed {
            order: key,
            expected,
            actual: row.status,
        })
    }
}

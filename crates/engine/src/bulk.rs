//! Bulk status transitions.
//!
//! The bulk path trades per-order rigor for round trips: one batch read,
//! one batch write, per-order inventory adjustments that never abort the
//! batch, and a verification loop that rewrites only the reverted subset.

use std::collections::HashMap;

use chrono::Utc;
use common::OrderKey;
use domain::{InventoryEffect, OrderStatus};
use order_store::{LedgerStore, OrderStore, StoreError};

use crate::controller::TransitionController;
use crate::error::{EngineError, Result};

impl<S> TransitionController<S>
where
    S: OrderStore + LedgerStore,
{
    /// Transitions a batch of orders to `new_status` in one pass.
    ///
    /// The batch write must touch every requested order; a row-count
    /// mismatch aborts before any inventory moves. Inventory failures are
    /// isolated per order and logged, never failing the batch.
    #[tracing::instrument(skip(self, keys), fields(orders = keys.len()))]
    pub async fn update_orders_status(
        &self,
        keys: &[OrderKey],
        new_status: OrderStatus,
    ) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        metrics::counter!("order_status_transitions_total").increment(keys.len() as u64);
        let store = self.store();
        let config = self.config();

        // 1. Batch read of previous statuses.
        let previous = config.retry.run(|| store.read_status_bulk(keys)).await?;
        let previous: HashMap<OrderKey, OrderStatus> =
            previous.into_iter().map(|r| (r.key, r.status)).collect();

        // 2. Batch write, checked against the requested row count.
        let written = config
            .retry
            .run(|| async move {
                let rows = store.write_status_bulk(keys, new_status, Utc::now()).await?;
                if rows.iter().any(|r| r.status != new_status) {
                    return Err(StoreError::Transient(
                        "bulk status write returned a row with the wrong status".into(),
                    ));
                }
                Ok(rows)
            })
            .await?;
        if written.len() != keys.len() {
            return Err(EngineError::BulkWriteMismatch {
                expected: keys.len(),
                actual: written.len(),
            });
        }

        // 3. Per-order inventory, isolated. One bad ledger must not poison
        //    the rest of the batch.
        for key in keys {
            let Some(&prev) = previous.get(key) else {
                continue;
            };
            let effect = InventoryEffect::for_transition(prev, new_status);
            if effect == InventoryEffect::None {
                continue;
            }

            let order = match config.retry.run(|| store.get_order(*key)).await {
                Ok(Some(order)) => order,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(%key, error = %e, "skipping inventory for order in bulk update");
                    continue;
                }
            };
            if let Err(e) = self.apply_inventory(&order, effect).await {
                tracing::warn!(%key, error = %e, "inventory adjustment failed in bulk update");
            }
        }

        // 4. Verify, rewriting only the subset the store reverted.
        let mut pending: Vec<OrderKey> = keys.to_vec();
        for attempt in 1..=config.verify_attempts.max(1) {
            tokio::time::sleep(config.bulk_verify_delay).await;

            let seen = config
                .retry
                .run(|| {
                    let pending = pending.clone();
                    async move { store.read_status_bulk(&pending).await }
                })
                .await?;
            let good: Vec<OrderKey> = seen
                .iter()
                .filter(|r| r.status == new_status)
                .map(|r| r.key)
                .collect();
            pending.retain(|k| !good.contains(k));

            if pending.is_empty() {
                tracing::info!(orders = keys.len(), status = %new_status, "bulk status update verified");
                return Ok(());
            }

            metrics::counter!("status_write_reverts_total").increment(pending.len() as u64);
            tracing::warn!(
                reverted = pending.len(),
                attempt,
                status = %new_status,
                "bulk status write partially reverted, re-issuing"
            );
            config
                .retry
                .run(|| {
                    let pending = pending.clone();
                    async move { store.write_status_bulk(&pending, new_status, Utc::now()).await }
                })
                .await?;
        }

        // Last look before giving up.
        let seen = config
            .retry
            .run(|| {
                let pending = pending.clone();
                async move { store.read_status_bulk(&pending).await }
            })
            .await?;
        pending.retain(|k| {
            !seen
                .iter()
                .any(|r| r.key == *k && r.status == new_status)
        });
        if pending.is_empty() {
            return Ok(());
        }

        Err(EngineError::BulkVerificationFailed { orders: pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ProductKey, PublicOrderId};
    use domain::{ColorStock, NewOrder, Order, StockLedger};
    use order_store::InMemoryStore;

    use crate::config::EngineConfig;

    async fn seed_order(store: &InMemoryStore, public_id: &str, product: ProductKey) -> Order {
        let order = NewOrder {
            product: Some(product),
            product_name: "Tussar Silk".to_string(),
            quantity: 1,
            colors: vec!["red".to_string()],
            amount: 150_000,
            vendor_initial: None,
        }
        .into_order(PublicOrderId::new(public_id), Utc::now());
        store.insert_order(order).await.unwrap()
    }

    async fn seed_ledger(store: &InMemoryStore, stock: u32) -> ProductKey {
        let product = ProductKey::new();
        store
            .insert_ledger(
                product,
                StockLedger::with_colors(vec![ColorStock::new("red", stock)]),
            )
            .await
            .unwrap();
        product
    }

    fn controller(store: InMemoryStore) -> TransitionController<InMemoryStore> {
        TransitionController::new(store, EngineConfig::fast())
    }

    #[tokio::test]
    async fn test_bulk_confirm_updates_all_and_decrements_each() {
        let store = InMemoryStore::new();
        let p1 = seed_ledger(&store, 5).await;
        let p2 = seed_ledger(&store, 5).await;
        let a = seed_order(&store, "OCT_A01", p1).await;
        let b = seed_order(&store, "OCT_A02", p2).await;

        let controller = controller(store.clone());
        controller
            .update_orders_status(&[a.key, b.key], OrderStatus::Confirmed)
            .await
            .unwrap();

        for key in [a.key, b.key] {
            assert_eq!(
                store.read_status(key).await.unwrap().status,
                OrderStatus::Confirmed
            );
        }
        assert_eq!(store.get_ledger(p1).await.unwrap().unwrap().total_stock, 4);
        assert_eq!(store.get_ledger(p2).await.unwrap().unwrap().total_stock, 4);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_noop() {
        let store = InMemoryStore::new();
        controller(store)
            .update_orders_status(&[], OrderStatus::Shipped)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_order_in_batch_is_fatal() {
        let store = InMemoryStore::new();
        let p = seed_ledger(&store, 5).await;
        let a = seed_order(&store, "OCT_A01", p).await;
        let ghost = OrderKey::new();

        let result = controller(store)
            .update_orders_status(&[a.key, ghost], OrderStatus::Processing)
            .await;

        match result {
            Err(EngineError::BulkWriteMismatch { expected, actual }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("expected bulk write mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_one_failing_ledger_does_not_poison_the_batch() {
        let store = InMemoryStore::new();
        let mut products = Vec::new();
        let mut keys = Vec::new();
        for i in 1..=5 {
            let product = seed_ledger(&store, 5).await;
            let order = seed_order(&store, &format!("OCT_A0{i}"), product).await;
            products.push(product);
            keys.push(order.key);
        }
        // Third of five fails; the two before and the two after must still
        // be adjusted.
        store.set_fail_ledger_for(products[2]).await;

        let controller = controller(store.clone());
        controller
            .update_orders_status(&keys, OrderStatus::Confirmed)
            .await
            .unwrap();

        // All statuses moved.
        for key in &keys {
            assert_eq!(
                store.read_status(*key).await.unwrap().status,
                OrderStatus::Confirmed
            );
        }
        // The healthy ledgers were adjusted; the failing one was skipped.
        for (i, product) in products.iter().enumerate() {
            let expected = if i == 2 { 5 } else { 4 };
            assert_eq!(
                store.get_ledger(*product).await.unwrap().unwrap().total_stock,
                expected,
                "ledger {i}"
            );
        }
    }

    #[tokio::test]
    async fn test_reverted_bulk_write_is_repaired() {
        let store = InMemoryStore::new();
        let p = seed_ledger(&store, 5).await;
        let a = seed_order(&store, "OCT_A01", p).await;
        let b = seed_order(&store, "OCT_A02", p).await;
        store.set_revert_status_writes(1).await;

        let controller = controller(store.clone());
        controller
            .update_orders_status(&[a.key, b.key], OrderStatus::Shipped)
            .await
            .unwrap();

        for key in [a.key, b.key] {
            assert_eq!(
                store.read_status(key).await.unwrap().status,
                OrderStatus::Shipped
            );
        }
    }

    #[tokio::test]
    async fn test_always_reverting_store_reports_the_stragglers() {
        let store = InMemoryStore::new();
        let p = seed_ledger(&store, 5).await;
        let a = seed_order(&store, "OCT_A01", p).await;
        let b = seed_order(&store, "OCT_A02", p).await;
        store.set_revert_status_writes(usize::MAX).await;

        let result = controller(store)
            .update_orders_status(&[a.key, b.key], OrderStatus::Delivered)
            .await;

        match result {
            Err(EngineError::BulkVerificationFailed { orders }) => {
                assert_eq!(orders.len(), 2);
                assert!(orders.contains(&a.key));
                assert!(orders.contains(&b.key));
            }
            other => panic!("expected bulk verification failure, got {other:?}"),
        }
    }
}

//! Order intake.
//!
//! Placing an order means generating a public identifier and inserting the
//! row. The identifier carries no uniqueness guarantee at generation time,
//! so the insert retries a bounded number of times, regenerating the
//! identifier on every collision.

use chrono::Utc;
use common::PublicOrderId;
use domain::{NewOrder, Order};
use order_store::{LedgerStore, OrderStore, StoreError};

use crate::controller::TransitionController;
use crate::error::Result;

impl<S> TransitionController<S>
where
    S: OrderStore + LedgerStore,
{
    /// Places a new order, assigning a fresh public identifier.
    ///
    /// Vendor orders get `[MONTH]_[INITIAL][SEQ]` from the current month's
    /// order count; guest orders get a timestamp identifier. Collisions
    /// regenerate the identifier with a linearly growing delay between
    /// attempts.
    #[tracing::instrument(skip(self, new_order), fields(product = ?new_order.product))]
    pub async fn place_order(&self, new_order: NewOrder) -> Result<Order> {
        let store = self.store();
        let config = self.config();
        let attempts = config.intake_attempts.max(1);

        let mut attempt = 1;
        let mut last_collision: Option<PublicOrderId> = None;
        loop {
            let now = Utc::now();
            let mut public_id = match new_order.vendor_initial {
                Some(initial) => {
                    let sequence = config.retry.run(|| store.next_public_sequence()).await?;
                    PublicOrderId::generate(now, initial, sequence)
                }
                None => PublicOrderId::guest(now),
            };
            // A failed insert does not advance the sequence, so regeneration
            // can reproduce the exact id that just collided. Fall back to
            // the timestamp identifier in that case.
            if last_collision.as_ref() == Some(&public_id) {
                public_id = PublicOrderId::guest(now);
            }

            let order = new_order.clone().into_order(public_id, now);
            match config
                .retry
                .run(|| {
                    let order = order.clone();
                    store.insert_order(order)
                })
                .await
            {
                Ok(order) => {
                    metrics::counter!("orders_placed_total").increment(1);
                    tracing::info!(key = %order.key, public_id = %order.public_id, "order placed");
                    return Ok(order);
                }
                Err(StoreError::DuplicatePublicId(id)) if attempt < attempts => {
                    tracing::warn!(public_id = %id, attempt, "public id collision, regenerating");
                    last_collision = Some(PublicOrderId::new(id));
                    tokio::time::sleep(config.intake_delay * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

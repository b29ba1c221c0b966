//! The order record.

use chrono::{DateTime, Utc};
use common::{OrderKey, ProductKey, PublicOrderId};
use serde::{Deserialize, Serialize};

use super::{OrderStatus, PaymentStatus};

/// A stored order row.
///
/// `status` and `payment_status` are independent axes: ordinary status
/// transitions never touch the payment status, and the payment-gateway
/// callback is the only path that writes both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Internal key, immutable.
    pub key: OrderKey,
    /// Public-facing display identifier, unique.
    pub public_id: PublicOrderId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Payment axis.
    pub payment_status: PaymentStatus,
    /// Product reference. Legacy orders may reference by name only.
    pub product: Option<ProductKey>,
    /// Product display name, kept for legacy name-only orders.
    pub product_name: String,
    /// Units purchased.
    pub quantity: u32,
    /// Selected color names, ordered, at most `quantity` entries.
    pub colors: Vec<String>,
    /// Order total in cents.
    pub amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Quantity clamped to at least one unit.
    ///
    /// Legacy rows have been observed with a zero quantity; the adjuster
    /// always works with at least one unit, matching cart behavior.
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.max(1)
    }
}

/// Input for placing a new order.
///
/// The engine assigns the key, the public identifier, the timestamps, and
/// the initial `pending`/`pending` status pair.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub product: Option<ProductKey>,
    pub product_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub colors: Vec<String>,
    pub amount: i64,
    /// First letter of the vendor code, used for public id generation.
    #[serde(default)]
    pub vendor_initial: Option<char>,
}

impl NewOrder {
    /// Materializes the order row with a freshly generated key and public id.
    pub fn into_order(self, public_id: PublicOrderId, now: DateTime<Utc>) -> Order {
        Order {
            key: OrderKey::new(),
            public_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            product: self.product,
            product_name: self.product_name,
            quantity: self.quantity.max(1),
            colors: self.colors,
            amount: self.amount,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new_order() -> NewOrder {
        NewOrder {
            product: Some(ProductKey::new()),
            product_name: "Kanchipuram Silk".to_string(),
            quantity: 2,
            colors: vec!["red".to_string()],
            amount: 459_900,
            vendor_initial: Some('A'),
        }
    }

    #[test]
    fn test_new_order_starts_pending_on_both_axes() {
        let now = Utc::now();
        let order = sample_new_order().into_order(PublicOrderId::new("OCT_A01"), now);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.created_at, now);
        assert_eq!(order.updated_at, now);
    }

    #[test]
    fn test_zero_quantity_is_clamped() {
        let mut new_order = sample_new_order();
        new_order.quantity = 0;
        let order = new_order.into_order(PublicOrderId::new("OCT_A02"), Utc::now());
        assert_eq!(order.quantity, 1);
        assert_eq!(order.effective_quantity(), 1);
    }

    #[test]
    fn test_order_serialization_roundtrip() {
        let order = sample_new_order().into_order(PublicOrderId::new("OCT_A03"), Utc::now());
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key, order.key);
        assert_eq!(back.public_id, order.public_id);
        assert_eq!(back.status, order.status);
        assert_eq!(back.colors, order.colors);
    }
}

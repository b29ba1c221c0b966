//! Order record and related types.

mod record;
mod status;

pub use record::{NewOrder, Order};
pub use status::{InventoryEffect, OrderStatus, PaymentStatus};

//! Domain layer for the order-status / inventory-reconciliation engine.
//!
//! This crate provides the pure domain types and logic:
//! - Order record with its status and payment-status axes
//! - Order status lifecycle and the inventory side-effect rule
//! - Stock ledger with per-color (and per-color-per-size) breakdowns
//! - Pure inventory adjuster (decrement/increment) with no I/O

pub mod ledger;
pub mod order;

pub use ledger::{
    ColorSizeStock, ColorStock, SizeStock, StockLedger, StockStatus, decrement, increment,
};
pub use order::{InventoryEffect, NewOrder, Order, OrderStatus, PaymentStatus};

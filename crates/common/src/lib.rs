//! Shared identifier types for the order engine.

mod types;

pub use types::{OrderKey, ProductKey, PublicOrderId};

//! Order status transition engine.
//!
//! Coordinates status transitions, inventory reconciliation, payment
//! updates, and order intake against a backing store with weak write
//! guarantees. Every status write is verified by re-read and re-issued
//! when the store silently reverts it.

pub mod bulk;
pub mod config;
pub mod controller;
pub mod error;
pub mod intake;
pub mod payment;

pub use config::EngineConfig;
pub use controller::TransitionController;
pub use error::{EngineError, Result};
pub use payment::{
    GatewayCallback, PaymentConfig, PaymentConfigCache, PaymentConfigSource, StaticConfigSource,
};

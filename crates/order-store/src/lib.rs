//! Backing-store abstraction for the order engine.
//!
//! The hosted store behind the storefront exposes row-level reads and
//! partial writes with no transactions and no row locks, and has been
//! observed to silently revert writes under load. This crate wraps that
//! contract in traits, provides an in-memory implementation with fault
//! injection for tests, a PostgreSQL implementation, and the generic
//! retry/backoff harness used around every mutation.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod retry;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use retry::RetryPolicy;
pub use store::{LedgerStore, OrderStore, PaymentUpdate, StatusRow};

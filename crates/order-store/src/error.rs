use common::ProductKey;
use thiserror::Error;

/// Errors that can occur when interacting with the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The target row does not exist. Non-retryable.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller lacks permission. Non-retryable, surfaced immediately.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A transient failure (network blip, timeout). Retryable.
    #[error("Transient store failure: {0}")]
    Transient(String),

    /// The store rejected a field the code expects to exist.
    ///
    /// Seen intermittently on composite/optional columns; the write may
    /// have partially succeeded. Non-retryable as-is — callers fall back
    /// to a reduced payload and verify by re-read.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A conditional ledger write lost the optimistic-concurrency race.
    #[error("Ledger version conflict for product {product}: expected {expected}, found {actual}")]
    VersionConflict {
        product: ProductKey,
        expected: i64,
        actual: i64,
    },

    /// An insert collided on the public order id unique constraint.
    #[error("Duplicate public order id: {0}")]
    DuplicatePublicId(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the retry harness may re-execute the failed operation.
    ///
    /// Authorization and not-found failures never retry; version conflicts
    /// and id collisions have their own bounded re-read/regenerate loops at
    /// the call site; schema mismatches get a reduced-payload fallback
    /// instead of a blind retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::Database(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

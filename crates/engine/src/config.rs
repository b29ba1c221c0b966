//! Engine tunables.

use std::time::Duration;

use order_store::RetryPolicy;

/// Retry and verification tunables for the transition engine.
///
/// The defaults mirror the production timings this engine was reconciled
/// against: three verification re-reads 300ms apart for single transitions,
/// 200ms apart for bulk, and four intake attempts with a linearly growing
/// delay.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retry policy applied to every store mutation.
    pub retry: RetryPolicy,
    /// Verification re-reads per transition, including the first.
    pub verify_attempts: u32,
    /// Delay before each verification re-read of a single transition.
    pub verify_delay: Duration,
    /// Delay before each verification re-read of a bulk transition.
    pub bulk_verify_delay: Duration,
    /// Bounded re-read attempts when a conditional ledger write conflicts.
    pub ledger_attempts: u32,
    /// Insert attempts for order intake, regenerating the public id on
    /// collision.
    pub intake_attempts: u32,
    /// Base delay between intake attempts; attempt `n` waits `n` times this.
    pub intake_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            verify_attempts: 3,
            verify_delay: Duration::from_millis(300),
            bulk_verify_delay: Duration::from_millis(200),
            ledger_attempts: 3,
            intake_attempts: 4,
            intake_delay: Duration::from_millis(500),
        }
    }
}

impl EngineConfig {
    /// Configuration with all delays collapsed, for tests.
    pub fn fast() -> Self {
        Self {
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
            verify_delay: Duration::from_millis(1),
            bulk_verify_delay: Duration::from_millis(1),
            intake_delay: Duration::from_millis(1),
            ..Self::default()
        }
    }
}

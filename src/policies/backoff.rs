//! # Reconnect backoff.
//!
//! The delay before reconnect attempt `n` (0-indexed, counting consecutive
//! failures) is `first × factor^n`, clamped to `max`, then jittered. The base
//! is derived from `n` alone, so jitter never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use camvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_secs(1),
//!     max: Duration::from_secs(8),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_secs(1));
//! assert_eq!(backoff.next(2), Duration::from_secs(4));
//! assert_eq!(backoff.next(10), Duration::from_secs(8));
//! ```

use std::time::Duration;

use super::jitter::JitterPolicy;

/// Exponential backoff between reconnect attempts.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub first: Duration,
    /// Upper bound for any delay.
    pub max: Duration,
    /// Multiplicative growth per consecutive failure.
    pub factor: f64,
    /// Randomization applied to the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 1s`, `factor = 2.0`, `max = 60s`, `jitter = Equal`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay, no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            first: delay,
            max: delay,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay to sleep after `failures` consecutive failed connect attempts.
    ///
    /// A product that is not a valid `Duration` falls back to `max`.
    pub fn next(&self, failures: u32) -> Duration {
        let growth = self.factor.powi(i32::try_from(failures).unwrap_or(i32::MAX));
        let base = Duration::try_from_secs_f64(self.first.as_secs_f64() * growth)
            .map_or(self.max, |delay| delay.min(self.max));
        self.jitter.apply(base)
    }
}

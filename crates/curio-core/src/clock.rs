//! Injectable time source.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Everything that makes an expiry decision takes a `Clock` instead of
/// calling `Utc::now()` directly, so tests can pin time exactly at a
/// boundary.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. The production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

//! Time sources
//!
//! Every expiry decision goes through a [`Clock`] so that tests can pin "now" to
//! an exact second instead of sleeping.

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, Duration, Utc};

pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant, so a test can keep one handle and hand
/// another to the service under test.
///
/// ```
/// use chrono::Duration;
/// use loginflow_core::{Clock, ManualClock};
///
/// let clock = ManualClock::at_timestamp(0);
/// clock.advance(Duration::seconds(1199));
/// assert_eq!(clock.now().timestamp(), 1199);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn at_timestamp(seconds: i64) -> Self {
        Self {
            seconds: Arc::new(AtomicI64::new(seconds)),
        }
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::at_timestamp(instant.timestamp())
    }

    pub fn set_timestamp(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.set_timestamp(instant.timestamp());
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0).unwrap_or_default()
    }
}

//! Host-supplied observation time.
//!
//! Components never read wall time themselves. Every time-sensitive
//! operation takes the observation instant (and, where rate limits are
//! involved, the period key) as explicit parameters, and the host derives
//! both from a [`Clock`]. This keeps expiry, delay, and rate-window
//! behavior fully deterministic under test.

use chrono::{DateTime, Utc};

use crate::PeriodKey;

/// Source of observation time for the host loop.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// The rate-limit period containing [`Clock::now`].
    fn current_period(&self) -> PeriodKey;
}

/// Wall-clock time bucketed into fixed-length periods.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    period_secs: u64,
}

impl SystemClock {
    /// A zero period length collapses to one second.
    #[must_use]
    pub fn new(period_secs: u64) -> Self {
        Self {
            period_secs: period_secs.max(1),
        }
    }

    /// The period containing an arbitrary instant.
    #[must_use]
    pub fn period_of(&self, at: DateTime<Utc>) -> PeriodKey {
        let secs = u64::try_from(at.timestamp()).unwrap_or(0);
        PeriodKey(secs / self.period_secs)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_PERIOD_SECS)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn current_period(&self) -> PeriodKey {
        self.period_of(Utc::now())
    }
}

/// Hand-advanced clock for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    now: DateTime<Utc>,
    period: PeriodKey,
}

#[cfg(any(test, feature = "test-helpers"))]
impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: start,
            period: PeriodKey(0),
        }
    }

    pub fn advance(&mut self, duration: chrono::Duration) {
        self.now += duration;
    }

    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    pub fn advance_period(&mut self) {
        self.period = self.period.next();
    }

    pub fn set_period(&mut self, period: PeriodKey) {
        self.period = period;
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn current_period(&self) -> PeriodKey {
        self.period
    }
}

//! Per-period cumulative volume caps.
//!
//! A window tracks how much volume settled in the current period and
//! refuses any charge that would push the total past capacity. The reset
//! is implicit: the first charge observed under a later period key starts
//! a fresh window. Check-then-commit, so a refused charge consumes
//! nothing.

use openmint_types::{OpenmintError, PeriodKey, Result};
use rust_decimal::Decimal;

/// One direction's volume cap (the gateway keeps one for mint, one for redeem).
pub struct RateLimitWindow {
    /// Maximum cumulative volume per period.
    capacity: Decimal,
    /// The period this window currently covers.
    period: PeriodKey,
    /// Volume already settled in the covered period.
    cumulative: Decimal,
}

impl RateLimitWindow {
    /// Create a window with the given capacity, starting at period zero.
    #[must_use]
    pub fn new(capacity: Decimal) -> Self {
        Self {
            capacity,
            period: PeriodKey(0),
            cumulative: Decimal::ZERO,
        }
    }

    /// Rebuild a window from persisted parts.
    #[must_use]
    pub fn from_parts(capacity: Decimal, period: PeriodKey, cumulative: Decimal) -> Self {
        Self {
            capacity,
            period,
            cumulative,
        }
    }

    /// Charge volume against the window for the observed period.
    ///
    /// A later period key resets the window first. An earlier key (host
    /// replay) charges the current window rather than resurrecting an
    /// old one.
    ///
    /// # Errors
    /// Returns [`OpenmintError::PeriodLimitExceeded`] if the charge would
    /// push the cumulative volume past capacity. The window is unchanged.
    pub fn charge(&mut self, period: PeriodKey, amount: Decimal) -> Result<()> {
        if period > self.period {
            self.period = period;
            self.cumulative = Decimal::ZERO;
        }
        let attempted = self.cumulative + amount;
        if attempted > self.capacity {
            return Err(OpenmintError::PeriodLimitExceeded {
                attempted,
                capacity: self.capacity,
            });
        }
        self.cumulative = attempted;
        Ok(())
    }

    /// Volume still available in the window for the observed period.
    #[must_use]
    pub fn remaining(&self, period: PeriodKey) -> Decimal {
        if period > self.period {
            self.capacity
        } else {
            self.capacity - self.cumulative
        }
    }

    /// Replace the capacity. Takes effect on the next charge; an already
    /// over-capacity window simply refuses further charges this period.
    pub fn set_capacity(&mut self, capacity: Decimal) {
        self.capacity = capacity;
    }

    #[must_use]
    pub fn capacity(&self) -> Decimal {
        self.capacity
    }

    #[must_use]
    pub fn period(&self) -> PeriodKey {
        self.period
    }

    #[must_use]
    pub fn cumulative(&self) -> Decimal {
        self.cumulative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_accumulate_within_period() {
        let mut window = RateLimitWindow::new(Decimal::new(1_000_000, 0));
        window
            .charge(PeriodKey(1), Decimal::new(500_000, 0))
            .unwrap();
        window
            .charge(PeriodKey(1), Decimal::new(400_000, 0))
            .unwrap();
        assert_eq!(window.cumulative(), Decimal::new(900_000, 0));
        assert_eq!(window.remaining(PeriodKey(1)), Decimal::new(100_000, 0));
    }

    #[test]
    fn over_capacity_charge_refused_without_commit() {
        let mut window = RateLimitWindow::new(Decimal::new(1_000_000, 0));
        window
            .charge(PeriodKey(1), Decimal::new(500_000, 0))
            .unwrap();

        let err = window
            .charge(PeriodKey(1), Decimal::new(600_000, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            OpenmintError::PeriodLimitExceeded { attempted, capacity }
                if attempted == Decimal::new(1_100_000, 0)
                    && capacity == Decimal::new(1_000_000, 0)
        ));
        // Nothing committed
        assert_eq!(window.cumulative(), Decimal::new(500_000, 0));
    }

    #[test]
    fn exact_capacity_fits() {
        let mut window = RateLimitWindow::new(Decimal::new(1_000_000, 0));
        window
            .charge(PeriodKey(1), Decimal::new(1_000_000, 0))
            .unwrap();
        assert_eq!(window.remaining(PeriodKey(1)), Decimal::ZERO);
    }

    #[test]
    fn later_period_resets_window() {
        let mut window = RateLimitWindow::new(Decimal::new(1_000_000, 0));
        window
            .charge(PeriodKey(1), Decimal::new(1_000_000, 0))
            .unwrap();
        assert_eq!(window.remaining(PeriodKey(2)), Decimal::new(1_000_000, 0));

        window
            .charge(PeriodKey(2), Decimal::new(500_000, 0))
            .unwrap();
        assert_eq!(window.period(), PeriodKey(2));
        assert_eq!(window.cumulative(), Decimal::new(500_000, 0));
    }

    #[test]
    fn earlier_period_charges_current_window() {
        let mut window = RateLimitWindow::new(Decimal::new(1_000, 0));
        window.charge(PeriodKey(5), Decimal::new(900, 0)).unwrap();

        // A stale key neither resets nor opens a second window.
        let err = window.charge(PeriodKey(4), Decimal::new(200, 0)).unwrap_err();
        assert!(matches!(err, OpenmintError::PeriodLimitExceeded { .. }));
        assert_eq!(window.period(), PeriodKey(5));
    }

    #[test]
    fn lowered_capacity_applies_to_next_charge() {
        let mut window = RateLimitWindow::new(Decimal::new(1_000, 0));
        window.charge(PeriodKey(1), Decimal::new(800, 0)).unwrap();
        window.set_capacity(Decimal::new(500, 0));

        let err = window.charge(PeriodKey(1), Decimal::ONE).unwrap_err();
        assert!(matches!(err, OpenmintError::PeriodLimitExceeded { .. }));

        // Next period honors the new capacity.
        window.charge(PeriodKey(2), Decimal::new(500, 0)).unwrap();
        assert_eq!(window.remaining(PeriodKey(2)), Decimal::ZERO);
    }
}

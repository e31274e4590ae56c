use std::time::Duration;

use crate::{DEFAULT_POLL_PERIOD, MAX_RECONNECT_PERIOD, MIN_RECONNECT_PERIOD};

/// Poll period policy for reconnecting to the hub. A failed client setup
/// drops the poll rate to `min_period` and then keeps doubling it up to
/// `max_period`; a successful one puts it straight back to `default_period`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    default_period: Duration,
    min_period: Duration,
    max_period: Duration,
    current_period: Duration,
}

impl ReconnectPolicy {
    pub fn new(default_period: Duration, min_period: Duration, max_period: Duration) -> Self {
        let max_period = if max_period < min_period {
            log::warn!("Backoff limit {max_period:?} below first backoff {min_period:?}, raising it");
            min_period
        } else {
            max_period
        };

        Self {
            default_period,
            min_period,
            max_period,
            current_period: default_period,
        }
    }

    pub fn current(&self) -> Duration {
        self.current_period
    }

    pub fn default_period(&self) -> Duration {
        self.default_period
    }

    pub fn is_backing_off(&self) -> bool {
        self.current_period != self.default_period
    }

    /// Advance the backoff after a failed setup, returning the new period
    pub fn on_failure(&mut self) -> Duration {
        self.current_period = if self.current_period == self.default_period {
            self.min_period
        } else {
            self.current_period.saturating_mul(2).min(self.max_period)
        };
        self.current_period
    }

    /// Back to the default cadence, returning it
    pub fn on_success(&mut self) -> Duration {
        self.current_period = self.default_period;
        self.current_period
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_PERIOD, MIN_RECONNECT_PERIOD, MAX_RECONNECT_PERIOD)
    }
}

//! Completion time estimation.

use serde::{Deserialize, Serialize};
use tally_core::Time;

use crate::error::{ProgressError, Result};

/// Default smoothing window, in seconds.
pub const DEFAULT_HISTORY_TIME_CONSTANT: f64 = 2.5;

/// Rate and time-remaining estimation over a series of steps.
///
/// A traversal reports each step index exactly once, in increasing order,
/// and reads `estimate` and `rate` whenever a record materializes.
pub trait Estimator {
    /// Record that step `current` was reached at `at`.
    fn report(&mut self, current: usize, at: Time);

    /// Seconds until the last step, as seen from `at`.
    ///
    /// Returns `f64::INFINITY` while no estimate is possible.
    fn estimate(&self, at: Time) -> f64;

    /// Steps per second, `0.0` until known.
    fn rate(&self) -> f64;
}

/// Configuration for [`SmoothedEta`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EtaConfig {
    /// Step value that means "done"
    pub max: f64,

    /// Seconds over which older rate observations fade out
    pub history_time_constant: f64,
}

impl EtaConfig {
    /// Configuration for a sequence of `total` steps.
    ///
    /// An empty sequence gets `max = 1`; it never reports a step anyway.
    pub fn for_total(total: usize) -> Self {
        let max = if total == 0 { 1.0 } else { total as f64 };
        Self {
            max,
            ..Self::default()
        }
    }

    /// Set the smoothing window.
    pub fn with_history_time_constant(mut self, seconds: f64) -> Self {
        self.history_time_constant = seconds;
        self
    }

    /// Check that the configuration can drive an estimator.
    pub fn validate(&self) -> Result<()> {
        if !self.max.is_finite() || self.max <= 0.0 {
            return Err(ProgressError::InvalidMax(self.max));
        }
        if !self.history_time_constant.is_finite() || self.history_time_constant <= 0.0 {
            return Err(ProgressError::InvalidTimeConstant(self.history_time_constant));
        }
        Ok(())
    }
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            max: 1.0,
            history_time_constant: DEFAULT_HISTORY_TIME_CONSTANT,
        }
    }
}

/// Estimator with an exponentially smoothed rate.
///
/// The first report only sets the baseline. Every later report measures the
/// instantaneous rate since the previous one and blends it into the running
/// rate with weight `1 - exp(-dt / history_time_constant)`, so a long gap
/// between reports counts for more than a short one.
#[derive(Debug, Clone)]
pub struct SmoothedEta {
    config: EtaConfig,
    last: Option<(f64, Time)>,
    rate: Option<f64>,
}

impl SmoothedEta {
    /// Estimator for `total` steps with the default smoothing window.
    pub fn new(total: usize) -> Self {
        Self {
            config: EtaConfig::for_total(total),
            last: None,
            rate: None,
        }
    }

    /// Estimator from an explicit configuration.
    pub fn with_config(config: EtaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            last: None,
            rate: None,
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &EtaConfig {
        &self.config
    }
}

impl Estimator for SmoothedEta {
    fn report(&mut self, current: usize, at: Time) {
        let value = current as f64;
        let Some((last_value, last_at)) = self.last else {
            self.last = Some((value, at));
            return;
        };

        // Same (or earlier) timestamp: no rate can be measured.
        let dt = seconds_between(last_at, at);
        if dt <= 0.0 {
            return;
        }

        let instant = (value - last_value) / dt;
        self.rate = Some(match self.rate {
            None => instant,
            Some(previous) => {
                let weight = 1.0 - (-dt / self.config.history_time_constant).exp();
                weight * instant + (1.0 - weight) * previous
            }
        });
        self.last = Some((value, at));
    }

    fn estimate(&self, at: Time) -> f64 {
        let Some((last_value, last_at)) = self.last else {
            return f64::INFINITY;
        };
        if last_value >= self.config.max {
            return 0.0;
        }
        let rate = match self.rate {
            Some(rate) if rate > 0.0 => rate,
            _ => return f64::INFINITY,
        };

        let remaining = (self.config.max - last_value) / rate;
        (remaining - seconds_between(last_at, at)).max(0.0)
    }

    fn rate(&self) -> f64 {
        self.rate.unwrap_or(0.0)
    }
}

fn seconds_between(from: Time, to: Time) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

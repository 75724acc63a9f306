//! Per-step progress records.
//!
//! A [`Progress`] carries four eager fields fixed when it is yielded and a
//! set of derived fields that stay unmaterialized until one of them is read.
//! The first read computes every derived field in one pass and caches the
//! result; later reads return the cached values.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use tally_core::{ProgressSnapshot, Time};

use crate::format::{DurationFormatter, INFINITY_SYMBOL};

/// Fields fixed when a record is yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Eager {
    pub current: usize,
    pub total: usize,
    pub start: Time,
    pub now: Time,
}

/// Fields computed together on first read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Derived {
    pub ratio: f64,
    pub percent_value: f64,
    pub percent: String,
    pub rate: f64,
    pub eta_value: f64,
    pub eta: String,
    pub elapsed_value: i64,
    pub elapsed: String,
    pub message: String,
}

impl Derived {
    /// Derive every lazy field from one `(at, estimate, rate)` observation.
    pub(crate) fn compute<F>(
        eager: &Eager,
        at: Time,
        estimate: f64,
        rate: f64,
        formatter: &F,
    ) -> Self
    where
        F: DurationFormatter + ?Sized,
    {
        let eta_value = estimate * 1000.0;
        let eta = if estimate.is_finite() {
            formatter.format(eta_value)
        } else {
            INFINITY_SYMBOL.to_string()
        };

        let elapsed_value = (at - eager.start).num_milliseconds();
        let elapsed = formatter.format(elapsed_value as f64);

        let ratio = eager.current as f64 / eager.total as f64;
        let percent_value = ratio * 100.0;
        let percent = format!("{}%", percent_value.floor() as u64);

        let message = format!(
            "{percent} [{}/{}] ETA: {eta} Elapsed: {elapsed}",
            eager.current, eager.total
        );

        Self {
            ratio,
            percent_value,
            percent,
            rate,
            eta_value,
            eta,
            elapsed_value,
            elapsed,
            message,
        }
    }
}

/// Produces the derived fields for a record on demand.
pub(crate) trait Materialize {
    fn materialize(&self, eager: &Eager) -> Derived;
}

/// Progress of one step of a traversal.
///
/// Eager accessors (`current`, `total`, `start`, `now`) are fixed at yield
/// time. Every other accessor triggers materialization on first use.
pub struct Progress {
    eager: Eager,
    source: Rc<dyn Materialize>,
    derived: OnceCell<Derived>,
}

impl Progress {
    pub(crate) fn new(eager: Eager, source: Rc<dyn Materialize>) -> Self {
        Self {
            eager,
            source,
            derived: OnceCell::new(),
        }
    }

    fn derived(&self) -> &Derived {
        self.derived.get_or_init(|| self.source.materialize(&self.eager))
    }

    /// Zero-based step index.
    pub fn current(&self) -> usize {
        self.eager.current
    }

    /// Sequence size.
    pub fn total(&self) -> usize {
        self.eager.total
    }

    /// When the traversal started.
    pub fn start(&self) -> Time {
        self.eager.start
    }

    /// When this step was yielded.
    pub fn now(&self) -> Time {
        self.eager.now
    }

    /// Whether the derived fields have been computed yet.
    pub fn is_materialized(&self) -> bool {
        self.derived.get().is_some()
    }

    /// Fraction of items done, `current / total`.
    pub fn ratio(&self) -> f64 {
        self.derived().ratio
    }

    /// Percentage done, between 0 and 100.
    pub fn percent_value(&self) -> f64 {
        self.derived().percent_value
    }

    /// Floored percentage, e.g. `9%` for 9.9.
    pub fn percent(&self) -> &str {
        &self.derived().percent
    }

    /// Steps per second as reported by the estimator.
    pub fn rate(&self) -> f64 {
        self.derived().rate
    }

    /// Milliseconds until completion; infinite when unknown.
    pub fn eta_value(&self) -> f64 {
        self.derived().eta_value
    }

    /// Human readable ETA, or `∞` when unknown.
    pub fn eta(&self) -> &str {
        &self.derived().eta
    }

    /// Milliseconds since the traversal started.
    pub fn elapsed_value(&self) -> i64 {
        self.derived().elapsed_value
    }

    /// Human readable elapsed time.
    pub fn elapsed(&self) -> &str {
        &self.derived().elapsed
    }

    /// Status line, like `10% [1/10] ETA: 1m Elapsed: 10s`.
    pub fn message(&self) -> &str {
        &self.derived().message
    }

    /// Owned copy of every field, materializing first if needed.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let derived = self.derived();
        ProgressSnapshot {
            current: self.eager.current,
            total: self.eager.total,
            start: self.eager.start,
            now: self.eager.now,
            ratio: derived.ratio,
            percent_value: derived.percent_value,
            percent: derived.percent.clone(),
            rate: derived.rate,
            eta_value: derived.eta_value.is_finite().then_some(derived.eta_value),
            eta: derived.eta.clone(),
            elapsed_value: derived.elapsed_value,
            elapsed: derived.elapsed.clone(),
            message: derived.message.clone(),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress")
            .field("current", &self.eager.current)
            .field("total", &self.eager.total)
            .field("start", &self.eager.start)
            .field("now", &self.eager.now)
            .field("derived", &self.derived.get())
            .finish()
    }
}

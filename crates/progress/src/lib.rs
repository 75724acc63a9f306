//! Progress telemetry for loops over sized sequences.
//!
//! Wraps a [`Sequence`] so that every element comes paired with a
//! [`Progress`] record: elapsed time, estimated time remaining, completion
//! ratio and a status line. Derived fields cost nothing until read.

#![warn(missing_docs)]

pub mod error;
pub mod estimator;
pub mod format;
pub mod record;
pub mod traversal;

pub use error::{ProgressError, Result};
pub use estimator::{Estimator, EtaConfig, SmoothedEta, DEFAULT_HISTORY_TIME_CONSTANT};
pub use format::{DurationFormatter, PrettyDuration, INFINITY_SYMBOL};
pub use record::Progress;
pub use traversal::{progress_of, ProgressExt, ProgressOf, TraversalConfig};

pub use tally_core::{
    from_fn, unsized_fn, Clock, FromFn, ManualClock, ProgressSnapshot, Sequence, SnapshotAnchor,
    SystemClock, Time,
};

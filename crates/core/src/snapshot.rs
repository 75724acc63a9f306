//! Plain progress data.

use serde::{Deserialize, Serialize};

use crate::Time;

/// Which timestamp the lazily derived fields of a record are computed at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotAnchor {
    /// Time of the first read of any derived field
    #[default]
    ReadTime,
    /// Time the record was yielded (its `now`)
    YieldTime,
}

/// An owned copy of every field of one progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Zero-based step index
    pub current: usize,

    /// Sequence size
    pub total: usize,

    /// When the traversal started
    pub start: Time,

    /// When this step was yielded
    pub now: Time,

    /// Fraction of items done (0-1)
    pub ratio: f64,

    /// Percentage done (0-100)
    pub percent_value: f64,

    /// Floored percentage, e.g. `42%`
    pub percent: String,

    /// Steps per second
    pub rate: f64,

    /// Milliseconds until completion (None when unknown)
    pub eta_value: Option<f64>,

    /// Human readable ETA
    pub eta: String,

    /// Milliseconds since start
    pub elapsed_value: i64,

    /// Human readable elapsed time
    pub elapsed: String,

    /// Status line, like `10% [1/10] ETA: 1m Elapsed: 10s`
    pub message: String,
}

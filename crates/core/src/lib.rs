//! Tally core data models.
//!
//! This crate defines the capabilities a progress traversal is built on
//! (sized sequences and clocks) and the plain data it reports.

#![warn(missing_docs)]

// Inputs
mod sequence;
mod clock;

// Reported data
mod snapshot;

// Re-exports
pub use sequence::{from_fn, unsized_fn, FromFn, Sequence};
pub use clock::{Clock, ManualClock, SystemClock};
pub use snapshot::{ProgressSnapshot, SnapshotAnchor};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

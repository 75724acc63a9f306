//! Progress-reporting traversal over a sized sequence.

use std::cell::RefCell;
use std::iter::FusedIterator;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tally_core::{Clock, Sequence, SnapshotAnchor, SystemClock, Time};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::estimator::{Estimator, EtaConfig, SmoothedEta, DEFAULT_HISTORY_TIME_CONSTANT};
use crate::format::{DurationFormatter, PrettyDuration};
use crate::record::{Derived, Eager, Materialize, Progress};

/// Traversal configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Timestamp the derived fields of a record are computed at
    pub anchor: SnapshotAnchor,
    /// Smoothing window of the default estimator, in seconds
    pub history_time_constant: f64,
    /// Whether the default formatter keeps only the largest unit
    pub compact_durations: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            anchor: SnapshotAnchor::ReadTime,
            history_time_constant: DEFAULT_HISTORY_TIME_CONSTANT,
            compact_durations: true,
        }
    }
}

/// State shared by a traversal and the records it has yielded.
struct Shared<E, C, F> {
    estimator: RefCell<E>,
    clock: C,
    formatter: F,
    anchor: SnapshotAnchor,
}

impl<E, C, F> Materialize for Shared<E, C, F>
where
    E: Estimator,
    C: Clock,
    F: DurationFormatter,
{
    fn materialize(&self, eager: &Eager) -> Derived {
        let at = match self.anchor {
            SnapshotAnchor::ReadTime => self.clock.now(),
            SnapshotAnchor::YieldTime => eager.now,
        };
        let (estimate, rate) = {
            let estimator = self.estimator.borrow();
            (estimator.estimate(at), estimator.rate())
        };
        Derived::compute(eager, at, estimate, rate, &self.formatter)
    }
}

/// Iterator pairing each element of a [`Sequence`] with its [`Progress`].
///
/// Each call to `next` reports the step to the estimator, captures the
/// step's timestamp and yields `(element, progress)`. Nothing is computed
/// ahead of demand. Derived fields of a record are computed when first read,
/// from the estimator state and clock at that moment (or at the step's `now`
/// with [`SnapshotAnchor::YieldTime`]), and then stay fixed.
///
/// A traversal runs once; build a new one to iterate again.
///
/// ```rust,ignore
/// for (item, progress) in progress_of(&items) {
///     process(item);
///     println!("{progress}"); // 10% [1/10] ETA: 1m Elapsed: 10s
/// }
/// ```
pub struct ProgressOf<S, E = SmoothedEta, C = SystemClock, F = PrettyDuration> {
    sequence: S,
    total: usize,
    current: usize,
    start: Option<Time>,
    shared: Rc<Shared<E, C, F>>,
}

impl<S: Sequence> ProgressOf<S> {
    /// Traversal with the default estimator, wall clock and compact durations.
    pub fn new(sequence: S) -> Self {
        let estimator = SmoothedEta::new(sequence.total().unwrap_or(0));
        Self::from_parts(
            sequence,
            estimator,
            SystemClock,
            PrettyDuration::compact(),
            TraversalConfig::default(),
        )
    }

    /// Traversal with the default collaborators, tuned by `config`.
    pub fn with_config(sequence: S, config: TraversalConfig) -> Result<Self> {
        let eta_config = EtaConfig::for_total(sequence.total().unwrap_or(0))
            .with_history_time_constant(config.history_time_constant);
        let estimator = SmoothedEta::with_config(eta_config)?;
        let formatter = PrettyDuration {
            compact: config.compact_durations,
        };
        Ok(Self::from_parts(sequence, estimator, SystemClock, formatter, config))
    }
}

impl<S, E, C, F> ProgressOf<S, E, C, F>
where
    S: Sequence,
    E: Estimator,
    C: Clock,
    F: DurationFormatter,
{
    /// Traversal with explicit collaborators.
    ///
    /// `config.anchor` is honoured; the estimator and formatter settings in
    /// `config` only apply to the defaults built by [`ProgressOf::with_config`].
    pub fn from_parts(
        sequence: S,
        estimator: E,
        clock: C,
        formatter: F,
        config: TraversalConfig,
    ) -> Self {
        let total = match sequence.total() {
            Some(total) => total,
            None => {
                warn!("Sequence has no usable size, nothing to iterate");
                0
            }
        };
        debug!(total, anchor = ?config.anchor, "Created progress traversal");

        Self {
            sequence,
            total,
            current: 0,
            start: None,
            shared: Rc::new(Shared {
                estimator: RefCell::new(estimator),
                clock,
                formatter,
                anchor: config.anchor,
            }),
        }
    }

    /// Sequence size captured when the traversal was created.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<S, E, C, F> Iterator for ProgressOf<S, E, C, F>
where
    S: Sequence,
    E: Estimator + 'static,
    C: Clock + 'static,
    F: DurationFormatter + 'static,
{
    type Item = (S::Item, Progress);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.total {
            return None;
        }

        let current = self.current;
        let Some(element) = self.sequence.get(current) else {
            warn!(current, total = self.total, "Sequence ended before its reported size");
            self.current = self.total;
            return None;
        };
        self.current += 1;

        let shared = &self.shared;
        let start = *self.start.get_or_insert_with(|| shared.clock.now());
        shared.estimator.borrow_mut().report(current, shared.clock.now());
        let now = shared.clock.now();
        trace!(current, total = self.total, "Progress step");
        if self.current == self.total {
            debug!(total = self.total, "Progress traversal finished");
        }

        let eager = Eager {
            current,
            total: self.total,
            start,
            now,
        };
        let source: Rc<dyn Materialize> = self.shared.clone();
        Some((element, Progress::new(eager, source)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.current;
        (remaining, Some(remaining))
    }
}

impl<S, E, C, F> ExactSizeIterator for ProgressOf<S, E, C, F>
where
    S: Sequence,
    E: Estimator + 'static,
    C: Clock + 'static,
    F: DurationFormatter + 'static,
{
}

impl<S, E, C, F> FusedIterator for ProgressOf<S, E, C, F>
where
    S: Sequence,
    E: Estimator + 'static,
    C: Clock + 'static,
    F: DurationFormatter + 'static,
{
}

/// Traverse `sequence`, pairing every element with its progress.
pub fn progress_of<S: Sequence>(sequence: S) -> ProgressOf<S> {
    ProgressOf::new(sequence)
}

/// Adds [`progress`](ProgressExt::progress) to every [`Sequence`].
pub trait ProgressExt: Sequence + Sized {
    /// Traverse with the default progress collaborators.
    fn progress(self) -> ProgressOf<Self> {
        ProgressOf::new(self)
    }
}

impl<S: Sequence> ProgressExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::INFINITY_SYMBOL;
    use chrono::Duration;
    use regex::Regex;
    use tally_core::{from_fn, unsized_fn, ManualClock};

    /// Estimator reporting `total - last step` seconds remaining.
    struct Scripted {
        reports: Rc<RefCell<Vec<usize>>>,
        total: usize,
        unknown: bool,
    }

    impl Estimator for Scripted {
        fn report(&mut self, current: usize, _at: Time) {
            self.reports.borrow_mut().push(current);
        }

        fn estimate(&self, _at: Time) -> f64 {
            if self.unknown {
                return f64::INFINITY;
            }
            let last = self.reports.borrow().last().copied().unwrap_or(0);
            (self.total - last) as f64
        }

        fn rate(&self) -> f64 {
            self.reports.borrow().len() as f64
        }
    }

    fn scripted<S: Sequence>(
        sequence: S,
        anchor: SnapshotAnchor,
    ) -> (
        ProgressOf<S, Scripted, ManualClock>,
        ManualClock,
        Rc<RefCell<Vec<usize>>>,
    ) {
        let clock = ManualClock::default();
        let reports = Rc::new(RefCell::new(Vec::new()));
        let estimator = Scripted {
            reports: reports.clone(),
            total: sequence.total().unwrap_or(0),
            unknown: false,
        };
        let config = TraversalConfig {
            anchor,
            ..TraversalConfig::default()
        };
        let traversal = ProgressOf::from_parts(
            sequence,
            estimator,
            clock.clone(),
            PrettyDuration::compact(),
            config,
        );
        (traversal, clock, reports)
    }

    #[test]
    fn test_yields_every_element_in_order() {
        let items = vec!["a", "b", "c", "d"];
        let steps: Vec<(&str, usize, usize)> = progress_of(&items)
            .map(|(item, progress)| (*item, progress.current(), progress.total()))
            .collect();

        assert_eq!(
            steps,
            vec![("a", 0, 4), ("b", 1, 4), ("c", 2, 4), ("d", 3, 4)]
        );
    }

    #[test]
    fn test_empty_sequence_yields_nothing() {
        let items: Vec<u32> = Vec::new();
        assert_eq!(progress_of(&items).count(), 0);
        assert_eq!((0..0usize).progress().count(), 0);
    }

    #[test]
    fn test_unsized_sequence_yields_nothing() {
        let traversal = progress_of(unsized_fn(|i| i));
        assert_eq!(traversal.total(), 0);
        assert_eq!(traversal.count(), 0);
    }

    #[test]
    fn test_single_element() {
        let mut traversal = progress_of(&["only"]);
        let (item, progress) = traversal.next().unwrap();

        assert_eq!(*item, "only");
        assert_eq!(progress.current(), 0);
        assert_eq!(progress.ratio(), 0.0);
        assert_eq!(progress.percent(), "0%");
        assert!(traversal.next().is_none());
    }

    #[test]
    fn test_ratio_and_percent() {
        for (_, progress) in (0..7usize).progress() {
            let ratio = progress.current() as f64 / progress.total() as f64;
            assert_eq!(progress.ratio(), ratio);
            assert_eq!(progress.percent_value(), ratio * 100.0);
            assert_eq!(
                progress.percent(),
                format!("{}%", (ratio * 100.0).floor() as u64)
            );
        }
    }

    #[test]
    fn test_message_layout() {
        let pattern = Regex::new(r"^(\d+)% \[3/10\] ETA: \S+ Elapsed: \S+$").unwrap();
        let (_, progress) = progress_of(0..10usize).nth(3).unwrap();

        let message = progress.message();
        let captures = pattern.captures(message).unwrap();
        let percent: u32 = captures[1].parse().unwrap();
        assert!(percent <= 100);
        assert_eq!(percent, 30);
    }

    #[test]
    fn test_reports_once_per_step_in_order() {
        let (traversal, _, reports) = scripted(0..5usize, SnapshotAnchor::ReadTime);

        // Records are dropped unread; reporting must not depend on reads.
        for _ in traversal {}
        assert_eq!(*reports.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_no_work_ahead_of_demand() {
        let (mut traversal, _, reports) = scripted(0..5usize, SnapshotAnchor::ReadTime);
        assert!(reports.borrow().is_empty());

        traversal.next();
        traversal.next();
        assert_eq!(*reports.borrow(), vec![0, 1]);
        assert_eq!(traversal.len(), 3);
    }

    #[test]
    fn test_record_is_lazy_and_cached() {
        let (mut traversal, clock, _) = scripted(0..10usize, SnapshotAnchor::ReadTime);
        clock.advance(Duration::seconds(1));
        let (_, progress) = traversal.next().unwrap();
        assert!(!progress.is_materialized());

        clock.advance(Duration::seconds(4));
        assert_eq!(progress.elapsed_value(), 4_000);
        assert!(progress.is_materialized());

        clock.advance(Duration::seconds(30));
        assert_eq!(progress.elapsed_value(), 4_000);
        assert_eq!(progress.elapsed(), "4s");
        assert_eq!(progress.message(), "0% [0/10] ETA: 10s Elapsed: 4s");
    }

    #[test]
    fn test_read_time_anchor_uses_live_estimator() {
        let (mut traversal, clock, _) = scripted(0..10usize, SnapshotAnchor::ReadTime);
        let (_, first) = traversal.next().unwrap();
        clock.advance(Duration::seconds(2));
        let (_, second) = traversal.next().unwrap();

        // `first` solidifies now, after the estimator has seen step 1.
        assert_eq!(first.eta_value(), 9_000.0);
        assert_eq!(first.elapsed_value(), 2_000);
        assert_eq!(second.eta_value(), 9_000.0);
        assert_eq!(first.now(), Time::default());
        assert_eq!(second.now(), Time::default() + Duration::seconds(2));
    }

    #[test]
    fn test_yield_time_anchor_pins_timestamps() {
        let (mut traversal, clock, _) = scripted(0..10usize, SnapshotAnchor::YieldTime);
        clock.advance(Duration::seconds(3));
        let (_, first) = traversal.next().unwrap();
        clock.advance(Duration::seconds(3));
        let (_, second) = traversal.next().unwrap();
        clock.advance(Duration::minutes(5));

        assert_eq!(first.elapsed_value(), 0);
        assert_eq!(second.elapsed_value(), 3_000);
        assert_eq!(second.elapsed(), "3s");
    }

    #[test]
    fn test_unknown_estimate_is_infinity() {
        let clock = ManualClock::default();
        let estimator = Scripted {
            reports: Rc::new(RefCell::new(Vec::new())),
            total: 3,
            unknown: true,
        };
        let mut traversal = ProgressOf::from_parts(
            0..3usize,
            estimator,
            clock,
            PrettyDuration::compact(),
            TraversalConfig::default(),
        );

        let (_, progress) = traversal.next().unwrap();
        assert!(!progress.eta_value().is_finite());
        assert_eq!(progress.eta(), INFINITY_SYMBOL);
        assert!(progress.message().contains("ETA: ∞ "));
    }

    #[test]
    fn test_fields_agree_within_record() {
        let (mut traversal, clock, _) = scripted(0..4usize, SnapshotAnchor::ReadTime);
        traversal.next();
        let (_, progress) = traversal.next().unwrap();

        clock.advance(Duration::milliseconds(1500));
        let elapsed = progress.elapsed().to_string();
        clock.advance(Duration::seconds(10));
        let snapshot = progress.snapshot();

        assert_eq!(snapshot.elapsed, elapsed);
        assert_eq!(snapshot.elapsed_value, 1_500);
        assert_eq!(snapshot.eta_value, Some(3_000.0));
        assert_eq!(snapshot.eta, "3s");
        assert_eq!(snapshot.message, "25% [1/4] ETA: 3s Elapsed: 1s");
    }

    #[test]
    fn test_elapsed_non_decreasing_across_reads() {
        let (traversal, clock, _) = scripted(0..5usize, SnapshotAnchor::ReadTime);
        let mut last = 0;
        for (_, progress) in traversal {
            clock.advance(Duration::milliseconds(250));
            let elapsed = progress.elapsed_value();
            assert!(elapsed >= last);
            last = elapsed;
        }
        assert_eq!(last, 1_250);
    }

    #[test]
    fn test_start_fixed_for_traversal() {
        let (mut traversal, clock, _) = scripted(0..3usize, SnapshotAnchor::ReadTime);
        clock.advance(Duration::seconds(7));
        let (_, first) = traversal.next().unwrap();
        clock.advance(Duration::seconds(1));
        let (_, second) = traversal.next().unwrap();

        let expected = Time::default() + Duration::seconds(7);
        assert_eq!(first.start(), expected);
        assert_eq!(second.start(), expected);
    }

    #[test]
    fn test_short_sequence_stops_early() {
        // Claims five elements but only produces two.
        struct Liar;
        impl Sequence for Liar {
            type Item = u8;
            fn total(&self) -> Option<usize> {
                Some(5)
            }
            fn get(&self, index: usize) -> Option<u8> {
                (index < 2).then_some(index as u8)
            }
        }

        let (mut traversal, _, reports) = scripted(Liar, SnapshotAnchor::ReadTime);
        assert_eq!(traversal.by_ref().count(), 2);
        assert!(traversal.next().is_none());
        assert_eq!(*reports.borrow(), vec![0, 1]);
        assert_eq!(traversal.size_hint(), (0, Some(0)));
    }

    #[test]
    fn test_from_fn_elements() {
        let labels: Vec<String> = progress_of(from_fn(3, |i| format!("item-{i}")))
            .map(|(label, _)| label)
            .collect();
        assert_eq!(labels, vec!["item-0", "item-1", "item-2"]);
    }

    #[test]
    fn test_with_config() {
        let config = TraversalConfig {
            compact_durations: false,
            ..TraversalConfig::default()
        };
        let traversal = ProgressOf::with_config(0..3usize, config).unwrap();
        assert_eq!(traversal.total(), 3);

        let invalid = TraversalConfig {
            history_time_constant: 0.0,
            ..TraversalConfig::default()
        };
        assert!(ProgressOf::with_config(0..3usize, invalid).is_err());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: TraversalConfig = serde_json::from_str(r#"{"anchor":"yield_time"}"#).unwrap();
        assert_eq!(config.anchor, SnapshotAnchor::YieldTime);
        assert_eq!(config.history_time_constant, DEFAULT_HISTORY_TIME_CONSTANT);
        assert!(config.compact_durations);
    }

    #[test]
    fn test_size_hint_is_exact() {
        let mut traversal = (0..3usize).progress();
        assert_eq!(traversal.size_hint(), (3, Some(3)));
        traversal.next();
        assert_eq!(traversal.len(), 2);
    }

    fn steps<S>(traversal: ProgressOf<S>) -> Vec<(S::Item, usize)>
    where
        S: Sequence,
    {
        traversal
            .map(|(item, progress)| (item, progress.current()))
            .collect()
    }

    #[test]
    fn test_slice_adapter() {
        let items = [7u8, 8, 9];
        let slice: &[u8] = &items;
        assert_eq!(steps(progress_of(slice)), vec![(&7, 0), (&8, 1), (&9, 2)]);
    }

    #[test]
    fn test_array_adapter() {
        let items = ['x', 'y'];
        assert_eq!(steps(progress_of(&items)), vec![(&'x', 0), (&'y', 1)]);
    }

    #[test]
    fn test_vec_adapter() {
        let items = vec![1, 2, 3];
        assert_eq!(steps(progress_of(&items)), vec![(&1, 0), (&2, 1), (&3, 2)]);
    }

    #[test]
    fn test_vec_deque_adapter() {
        let mut items = std::collections::VecDeque::new();
        items.push_back("b");
        items.push_front("a");
        assert_eq!(steps(progress_of(&items)), vec![(&"a", 0), (&"b", 1)]);
    }

    #[test]
    fn test_default_estimator_counts_down() {
        let clock = ManualClock::default();
        let traversal = ProgressOf::from_parts(
            0..10usize,
            SmoothedEta::new(10),
            clock.clone(),
            PrettyDuration::compact(),
            TraversalConfig::default(),
        );

        let mut messages = Vec::new();
        for (_, progress) in traversal.take(4) {
            messages.push(progress.message().to_string());
            clock.advance(Duration::seconds(1));
        }

        assert_eq!(
            messages,
            vec![
                "0% [0/10] ETA: ∞ Elapsed: 0ms",
                "10% [1/10] ETA: 9s Elapsed: 1s",
                "20% [2/10] ETA: 8s Elapsed: 2s",
                "30% [3/10] ETA: 7s Elapsed: 3s",
            ]
        );
    }
}

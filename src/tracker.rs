//! Passive per-phase observation of a sort.

use std::time::{Duration, Instant};

/// The phases of one sort, in pipeline order.
///
/// The names returned by [`Phase::name`] are stable identifiers: they appear in fatal
/// diagnostics and tracing events, and instrumentation may key on them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Single-rank group: local sort only.
    BaseCase,
    /// Folding surplus ranks into the largest power-of-two subgroup.
    MoveToPowOfTwo,
    /// Optional ownership randomization.
    Shuffle,
    /// The local string sort (and duplicate tie-breaking).
    SortLocally,
    /// Distributed pivot selection.
    MedianSelect,
    /// Locating the split and building the outgoing half.
    Partition,
    /// The pairwise exchange with the hypercube partner.
    Exchange,
    /// Merging the kept and received runs.
    Merge,
    /// Bisecting the group for the next level.
    Split,
}

impl Phase {
    /// Every phase, in pipeline order.
    pub const ALL: [Phase; 9] = [
        Phase::BaseCase,
        Phase::MoveToPowOfTwo,
        Phase::Shuffle,
        Phase::SortLocally,
        Phase::MedianSelect,
        Phase::Partition,
        Phase::Exchange,
        Phase::Merge,
        Phase::Split,
    ];

    /// The stable identifier of this phase.
    pub fn name(self) -> &'static str {
        match self {
            Phase::BaseCase => "Splitter_baseCase",
            Phase::MoveToPowOfTwo => "Splitter_move_to_pow_of_two",
            Phase::Shuffle => "Splitter_shuffle",
            Phase::SortLocally => "Splitter_sortLocally",
            Phase::MedianSelect => "Splitter_median_select",
            Phase::Partition => "Splitter_partition",
            Phase::Exchange => "Splitter_exchange",
            Phase::Merge => "Splitter_merge",
            Phase::Split => "Splitter_split",
        }
    }
}

/// An observer of phase boundaries.
///
/// Implementations must tolerate repeated start/stop pairs for the same phase (one pair
/// per recursion level) and must not influence the sort: the engine behaves identically
/// under any tracker.
pub trait Tracker {
    /// Called when `phase` begins on this rank.
    fn start(&mut self, phase: Phase) {
        let _ = phase;
    }

    /// Called when `phase` ends on this rank.
    fn stop(&mut self, phase: Phase) {
        let _ = phase;
    }
}

/// The do-nothing tracker.
#[derive(Clone, Copy, Debug, Default)]
pub struct DummyTracker;

impl Tracker for DummyTracker {}

/// Accumulates wall-clock time per phase across all recursion levels.
#[derive(Debug, Default)]
pub struct TimingTracker {
    started: [Option<Instant>; 9],
    elapsed: [Duration; 9],
}

impl TimingTracker {
    /// A tracker with all counters at zero.
    pub fn new() -> Self {
        TimingTracker::default()
    }

    /// Total time spent in `phase` so far.
    pub fn elapsed(&self, phase: Phase) -> Duration {
        self.elapsed[phase as usize]
    }
}

impl Tracker for TimingTracker {
    fn start(&mut self, phase: Phase) {
        self.started[phase as usize] = Some(Instant::now());
    }

    fn stop(&mut self, phase: Phase) {
        if let Some(begin) = self.started[phase as usize].take() {
            self.elapsed[phase as usize] += begin.elapsed();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_are_stable() {
        assert_eq!(Phase::MedianSelect.name(), "Splitter_median_select");
        assert_eq!(Phase::MoveToPowOfTwo.name(), "Splitter_move_to_pow_of_two");
        let mut names: Vec<_> = Phase::ALL.iter().map(|phase| phase.name()).collect();
        names.dedup();
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn timing_accumulates_across_levels() {
        let mut tracker = TimingTracker::new();
        for _ in 0..3 {
            tracker.start(Phase::Merge);
            tracker.stop(Phase::Merge);
        }
        assert!(tracker.elapsed(Phase::Merge) >= Duration::ZERO);
        assert_eq!(tracker.elapsed(Phase::Split), Duration::ZERO);
    }
}

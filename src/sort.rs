//! The sort driver and the recursive hypercube engine.
//!
//! The driver runs the pipeline every rank must walk in lockstep: base case, fold-in to a
//! power-of-two group, optional shuffle, the local sort, and then the recursion. Each
//! recursion level agrees on a pivot, splits the sorted local buffer around it, swaps the
//! far half with the partner across the current hypercube dimension, merges, and bisects
//! the group, so strings only ever move toward the half of the machine they belong to.
//!
//! Everything here is collectively fatal: a rank that cannot complete its part panics with
//! the phase name rather than attempting recovery, because its partners are already
//! blocked on it.

use std::cmp::Ordering;

use rand::RngCore;
use tracing::debug;

use cubesort_communication::{Communicator, Tag};

use crate::buffer::StringBuffer;
use crate::compare::{Compare, Origin};
use crate::duplicates;
use crate::exchange::Payload;
use crate::median;
use crate::merge;
use crate::radix;
use crate::random::RandomBitStore;
use crate::shuffle;
use crate::splitter;
use crate::tracker::{DummyTracker, Phase, Tracker};

/// Knobs of one sort invocation.
#[derive(Clone, Copy, Debug)]
pub struct SortOptions {
    /// Spread pivot-equal strings across both halves so that degenerate inputs cannot
    /// starve one side.
    pub robust: bool,
    /// Randomize string ownership before sorting, making the run time independent of the
    /// initial distribution. Final placement then depends on the drawn coins.
    pub shuffle: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions { robust: true, shuffle: false }
    }
}

/// Sorts the distributed string multiset; every rank of `comm` must call this.
///
/// `data` is this rank's share. On return the local buffer is sorted, every string held
/// here orders at or before every string on higher ranks, and ranks folded away by a
/// non-power-of-two group hold the empty buffer. `tag` and `tag + 1` and their per-level
/// offsets must not be used by any concurrent exchange on this communicator.
pub fn sort<O, R, C, G>(
    rng: &mut R,
    data: Payload<O>,
    tag: Tag,
    comm: G,
    comp: C,
    is_robust: bool,
) -> StringBuffer<O>
where
    O: Origin,
    R: RngCore,
    C: Compare<O> + Send,
    G: Communicator,
{
    let mut tracker = DummyTracker;
    sort_tracked(
        rng,
        data,
        tag,
        comm,
        &mut tracker,
        comp,
        SortOptions { robust: is_robust, shuffle: false },
    )
}

/// Like [`sort`], with an observer and the full option set.
pub fn sort_tracked<O, R, C, T, G>(
    rng: &mut R,
    data: Payload<O>,
    tag: Tag,
    mut comm: G,
    tracker: &mut T,
    comp: C,
    options: SortOptions,
) -> StringBuffer<O>
where
    O: Origin,
    R: RngCore,
    C: Compare<O> + Send,
    T: Tracker,
    G: Communicator,
{
    debug!(rank = comm.rank(), size = comm.size(), chars = data.bytes.len(), "sort begins");
    comm.barrier();
    tracker.start(Phase::BaseCase);
    if comm.size() == 1 {
        let mut buffer = data.into_buffer();
        sort_locally(&mut buffer);
        tracker.stop(Phase::BaseCase);
        return buffer;
    }
    tracker.stop(Phase::BaseCase);

    comm.barrier();
    tracker.start(Phase::MoveToPowOfTwo);
    let folded = fold_to_pow2(data, tag, &mut comm);
    tracker.stop(Phase::MoveToPowOfTwo);
    let (mut buffer, mut active) = match folded {
        Some(pair) => pair,
        // An exile's strings now live on its receiver; it is done.
        None => return StringBuffer::new(),
    };

    if options.shuffle {
        active.barrier();
        tracker.start(Phase::Shuffle);
        shuffle::shuffle(rng, &mut buffer, tag, &mut active);
        tracker.stop(Phase::Shuffle);
    }

    active.barrier();
    tracker.start(Phase::SortLocally);
    sort_locally(&mut buffer);
    tracker.stop(Phase::SortLocally);

    let mut bits = RandomBitStore::new();
    sort_recursive(rng, &mut bits, buffer, comp, options.robust, tracker, tag, 0, active)
}

/// The local sort: byte-wise radix sort, then origin tie-breaking of equal runs so the
/// tracked variant's order is total before any pivot is ever chosen.
fn sort_locally<O: Origin>(buffer: &mut StringBuffer<O>) {
    let (views, bytes) = buffer.parts_mut();
    radix::sort_views(views, bytes);
    if O::TRACKED {
        let lcp = radix::lcp_array(views, bytes);
        let ranges = duplicates::duplicate_ranges(views, &lcp);
        duplicates::break_ties(views, &ranges);
    }
}

/// Reduces the active group to the largest power of two Q ≤ P.
///
/// Surplus ranks `[Q..P)` each ship their strings to rank `self - Q` and return `None`;
/// everyone else ends up in the `[0..Q)` subgroup with capacity reserved for the merges
/// ahead (threefold after a fold, twofold when the group was already a power of two).
fn fold_to_pow2<O, G>(mut data: Payload<O>, tag: Tag, comm: &mut G) -> Option<(StringBuffer<O>, G)>
where
    O: Origin,
    G: Communicator,
{
    let size = comm.size();
    let rank = comm.rank();
    let pow = prev_power_of_two(size);

    if rank >= pow {
        data.send(comm, rank - pow, tag);
        return None;
    }
    if rank < size - pow {
        data.recv_append(comm, pow + rank, tag);
    }
    data.reserve_scaled(if pow == size { 2 } else { 3 });
    let active = comm.subgroup(0, pow - 1);
    Some((data.into_buffer(), active))
}

/// One recursion level of the hypercube engine; see the module docs for the shape.
///
/// On entry the group size is a power of two ≥ 2 and the local buffer is sorted.
#[allow(clippy::too_many_arguments)]
fn sort_recursive<O, R, C, T, G>(
    rng: &mut R,
    bits: &mut RandomBitStore,
    buffer: StringBuffer<O>,
    comp: C,
    is_robust: bool,
    tracker: &mut T,
    base_tag: Tag,
    level: u32,
    mut comm: G,
) -> StringBuffer<O>
where
    O: Origin,
    R: RngCore,
    C: Compare<O> + Send,
    T: Tracker,
    G: Communicator,
{
    let size = comm.size();
    let rank = comm.rank();
    assert!(
        size >= 2 && size.is_power_of_two(),
        "{}: group of {} ranks is not a power of two",
        Phase::MedianSelect.name(),
        size,
    );
    debug_assert!(is_locally_sorted(&buffer, comp));

    let tag = base_tag + 2 * level;
    let is_left = rank < size / 2;

    comm.barrier();
    tracker.start(Phase::MedianSelect);
    let pivot = median::select_pivot(rng, bits, &buffer, comp, tag, &mut comm);
    // An empty pivot means no rank of the group holds any string; the level is then a
    // round of empty exchanges that every rank still walks through in lockstep.
    assert!(
        pivot.size() == 1 || (pivot.is_empty() && buffer.is_empty()),
        "{}: selection returned {} strings",
        Phase::MedianSelect.name(),
        pivot.size(),
    );
    tracker.stop(Phase::MedianSelect);

    comm.barrier();
    tracker.start(Phase::Partition);
    let separator = if pivot.is_empty() {
        0
    } else {
        let entry = pivot.entry(&pivot.strings()[0]);
        splitter::locate_splitter(&buffer, comp, &entry, rng, bits, is_robust)
    };
    let views = buffer.strings();
    let outgoing_views = if is_left { &views[separator..] } else { &views[..separator] };
    let outgoing = Payload::from_views(&buffer, outgoing_views);
    debug!(
        rank,
        size,
        level,
        keep = views.len() - outgoing_views.len(),
        send = outgoing_views.len(),
        "partitioned"
    );
    tracker.stop(Phase::Partition);

    comm.barrier();
    tracker.start(Phase::Exchange);
    let partner = rank ^ (size / 2);
    let received = outgoing.exchange(&mut comm, partner, tag).into_buffer();
    drop(outgoing);
    tracker.stop(Phase::Exchange);

    comm.barrier();
    tracker.start(Phase::Merge);
    let merged = {
        let views = buffer.strings();
        let kept = if is_left { &views[..separator] } else { &views[separator..] };
        let own: Vec<_> = kept.iter().map(|view| buffer.entry(view)).collect();
        let theirs: Vec<_> = received.entries().collect();
        StringBuffer::from_entries(&merge::merge_entries(&own, &theirs, comp))
    };
    debug_assert!(
        merged.is_consistent(),
        "{}: merged storage is inconsistent",
        Phase::Merge.name(),
    );
    tracker.stop(Phase::Merge);

    if size >= 4 {
        comm.barrier();
        tracker.start(Phase::Split);
        let half = comm.split_at(size / 2);
        tracker.stop(Phase::Split);
        return sort_recursive(rng, bits, merged, comp, is_robust, tracker, base_tag, level + 1, half);
    }
    merged
}

fn is_locally_sorted<O: Origin, C: Compare<O>>(buffer: &StringBuffer<O>, comp: C) -> bool {
    let entries: Vec<_> = buffer.entries().collect();
    entries.windows(2).all(|pair| comp.compare(&pair[1], &pair[0]) != Ordering::Less)
}

fn prev_power_of_two(value: usize) -> usize {
    debug_assert!(value > 0);
    if value.is_power_of_two() {
        value
    } else {
        value.next_power_of_two() >> 1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn powers_round_down() {
        assert_eq!(prev_power_of_two(1), 1);
        assert_eq!(prev_power_of_two(2), 2);
        assert_eq!(prev_power_of_two(3), 2);
        assert_eq!(prev_power_of_two(12), 8);
        assert_eq!(prev_power_of_two(16), 16);
    }

    #[test]
    fn single_rank_sorts_locally() {
        use crate::compare::StableOrder;
        use crate::test_support::ZeroRng;
        use cubesort_communication::{initialize, Configuration};

        let guards = initialize(Configuration::Thread, |comm| {
            let mut payload = Payload::<u64>::new();
            for (index, word) in ["pear", "apple", "pear", "apple"].iter().enumerate() {
                payload.push_str(word.as_bytes(), index as u64);
            }
            let sorted = sort(&mut ZeroRng, payload, 1, comm, StableOrder, true);
            sorted
                .entries()
                .map(|entry| (entry.content().to_vec(), entry.origin))
                .collect::<Vec<_>>()
        })
        .unwrap();
        let result = guards.join().remove(0).unwrap();
        assert_eq!(
            result,
            [
                (b"apple".to_vec(), 1),
                (b"apple".to_vec(), 3),
                (b"pear".to_vec(), 0),
                (b"pear".to_vec(), 2),
            ],
        );
    }
}

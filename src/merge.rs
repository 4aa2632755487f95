//! Merging two sorted runs, serially or with a scoped worker pool.
//!
//! The parallel path slices the output into contiguous ranges of equal size and lets each
//! worker compute its own input bounds with [`two_sequence_selection`], so workers share
//! nothing and need no locks: each merges straight into its disjoint output range and the
//! scope's join is the only synchronization.

use std::thread;

use crate::buffer::Entry;
use crate::compare::{Compare, Origin};

/// Below this many output elements the serial merge wins outright.
const PARALLEL_CUTOFF: usize = 1 << 13;

/// The least number of output elements worth giving to one worker.
const MIN_PER_WORKER: usize = 1 << 12;

/// Partitions two sorted sequences according to a rank.
///
/// Returns `(a, b)` with `a + b == rank` such that `first[..a]` and `second[..b]` together
/// are the `rank` smallest elements of both sequences. Ties are broken so that an element
/// of `first` orders before an equal element of `second`, which makes the partition unique.
///
/// The search halves `first` at every step, placing its middle element into `second` with a
/// tie-breaking lower bound and comparing the implied rank against the requested one; on an
/// exact hit it returns immediately, and once `first` is exhausted the remainder comes from
/// the front of `second`. This terminates within `O(log |first|)` rounds of one binary
/// search each.
pub fn two_sequence_selection<O, C>(
    first: &[Entry<'_, O>],
    second: &[Entry<'_, O>],
    mut rank: usize,
    comp: C,
) -> (usize, usize)
where
    O: Origin,
    C: Compare<O>,
{
    debug_assert!(rank <= first.len() + second.len());
    debug_assert!(is_sorted(first, comp) && is_sorted(second, comp));

    let (mut a_lo, mut a_hi) = (0, first.len());
    let (mut b_lo, mut b_hi) = (0, second.len());

    while a_lo != a_hi {
        let a_mid = a_lo + (a_hi - a_lo) / 2;
        // An element of `first` outranks its equal in `second`, so the plain lower bound
        // breaks the tie implicitly.
        let b_mid = b_lo
            + second[b_lo..b_hi].partition_point(|entry| comp.less(entry, &first[a_mid]));

        let candidate = (a_mid - a_lo) + (b_mid - b_lo);
        if rank < candidate {
            a_hi = a_mid;
            b_hi = b_mid;
        } else if rank > candidate {
            // The middle element itself is among the `rank` smallest; account for it and
            // continue right of it.
            rank -= candidate + 1;
            a_lo = a_mid + 1;
            b_lo = b_mid;
        } else {
            return (a_mid, b_mid);
        }
    }

    (a_lo, b_lo + rank)
}

/// Merges two sorted runs of entries into a fresh, sorted output.
///
/// Large merges are spread over a scoped worker pool bounded by the machine's available
/// parallelism; each worker selects its input bounds for one output stripe and merges it
/// independently. Ties take the element of `first`, matching the selection's tie-breaking.
pub fn merge_entries<'a, O, C>(
    first: &[Entry<'a, O>],
    second: &[Entry<'a, O>],
    comp: C,
) -> Vec<Entry<'a, O>>
where
    O: Origin,
    C: Compare<O> + Send,
{
    let total = first.len() + second.len();
    let workers = worker_count(total);
    let mut output = vec![Entry::default(); total];

    if workers <= 1 {
        serial_merge(first, second, &mut output, comp);
        return output;
    }

    let stripe = (total + workers - 1) / workers;
    thread::scope(|scope| {
        for (index, chunk) in output.chunks_mut(stripe).enumerate() {
            let begin = index * stripe;
            let end = begin + chunk.len();
            scope.spawn(move || {
                let (a_lo, b_lo) = two_sequence_selection(first, second, begin, comp);
                let (a_len, b_len) =
                    two_sequence_selection(&first[a_lo..], &second[b_lo..], end - begin, comp);
                serial_merge(
                    &first[a_lo..a_lo + a_len],
                    &second[b_lo..b_lo + b_len],
                    chunk,
                    comp,
                );
            });
        }
    });
    output
}

/// Plain two-pointer merge into an exactly sized output slice.
fn serial_merge<'a, O, C>(
    first: &[Entry<'a, O>],
    second: &[Entry<'a, O>],
    output: &mut [Entry<'a, O>],
    comp: C,
) where
    O: Origin,
    C: Compare<O>,
{
    debug_assert!(output.len() == first.len() + second.len());
    let (mut a, mut b) = (0, 0);
    for slot in output.iter_mut() {
        *slot = if a < first.len()
            && (b >= second.len() || !comp.less(&second[b], &first[a]))
        {
            a += 1;
            first[a - 1]
        } else {
            b += 1;
            second[b - 1]
        };
    }
}

fn worker_count(total: usize) -> usize {
    if total < PARALLEL_CUTOFF {
        return 1;
    }
    let available = thread::available_parallelism().map_or(1, |count| count.get());
    available.min(total / MIN_PER_WORKER).max(1)
}

fn is_sorted<O: Origin, C: Compare<O>>(entries: &[Entry<'_, O>], comp: C) -> bool {
    entries.windows(2).all(|pair| !comp.less(&pair[1], &pair[0]))
}

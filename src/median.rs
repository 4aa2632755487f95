//! Distributed pivot selection over a binary reduction tree.
//!
//! Each rank contributes its middle-most candidate strings. Pairs of ranks meet along a
//! binary tree: the right partner ships its candidates to the left, which merges both
//! sorted sets and keeps the central `k`, halving the number of carriers per level. The
//! surviving rank applies the picker once more with `k = 1`, and the single middle-most
//! string flows back down a binomial broadcast, so every rank ends holding a byte-identical
//! pivot.

use rand::RngCore;

use cubesort_communication::{Communicator, Tag};

use crate::buffer::StringBuffer;
use crate::compare::{Compare, Origin};
use crate::exchange::Payload;
use crate::merge;
use crate::random::RandomBitStore;

/// Copies the `k` middle-most strings of a sorted buffer.
///
/// Returns the whole buffer when it holds at most `k` strings. When the buffer size and
/// `k` differ in parity there is no exact center; one random bit decides between the two
/// candidate windows, so repeated picks do not drift toward either half.
pub fn middle_most<O, R>(
    buffer: &StringBuffer<O>,
    k: usize,
    rng: &mut R,
    bits: &mut RandomBitStore,
) -> Payload<O>
where
    O: Origin,
    R: RngCore,
{
    if buffer.size() <= k {
        return Payload::from_buffer(buffer);
    }
    let offset = (buffer.size() - k) / 2;
    let shift = if buffer.size() % 2 == k % 2 { 0 } else { bits.next_bit(rng) as usize };
    let begin = offset + shift;
    Payload::from_views(buffer, &buffer.strings()[begin..begin + k])
}

/// Selects the pivot for one partitioning round: two middle-most candidates per rank fed
/// through the reduction tree. Every rank of the group returns the same one-string buffer,
/// or an empty buffer when no rank holds any string.
pub fn select_pivot<O, R, C, G>(
    rng: &mut R,
    bits: &mut RandomBitStore,
    buffer: &StringBuffer<O>,
    comp: C,
    tag: Tag,
    comm: &mut G,
) -> StringBuffer<O>
where
    O: Origin,
    R: RngCore,
    C: Compare<O> + Send,
    G: Communicator,
{
    let candidates = middle_most(buffer, 2, rng, bits);
    select(candidates, 2, comp, rng, bits, tag, comm)
}

/// Runs the reduction tree over the group's candidate payloads.
///
/// `k` bounds the candidates kept per merge. The result is identical on every rank.
pub fn select<O, R, C, G>(
    local: Payload<O>,
    k: usize,
    comp: C,
    rng: &mut R,
    bits: &mut RandomBitStore,
    tag: Tag,
    comm: &mut G,
) -> StringBuffer<O>
where
    O: Origin,
    R: RngCore,
    C: Compare<O> + Send,
    G: Communicator,
{
    let rank = comm.rank();
    let size = comm.size();
    let mut current = local.into_buffer();

    // Reduce: at each level the upper partner of every surviving pair ships its
    // candidates downward and drops out of the reduction.
    let mut step = 1;
    while step < size {
        if rank & step != 0 {
            Payload::from_buffer(&current).send(comm, rank - step, tag);
            current = StringBuffer::new();
            break;
        }
        if rank + step < size {
            let received = Payload::<O>::recv(comm, rank + step, tag).into_buffer();
            let merged = {
                let own: Vec<_> = current.entries().collect();
                let theirs: Vec<_> = received.entries().collect();
                StringBuffer::from_entries(&merge::merge_entries(&own, &theirs, comp))
            };
            current = middle_most(&merged, k, rng, bits).into_buffer();
        }
        step <<= 1;
    }

    if rank == 0 {
        current = middle_most(&current, 1, rng, bits).into_buffer();
    }

    // Broadcast the survivor down the same tree, top level first.
    let mut level = 0;
    while (1 << level) < size {
        level += 1;
    }
    for shift in (0..level).rev() {
        let step = 1 << shift;
        if rank % (step * 2) == 0 {
            if rank + step < size {
                Payload::from_buffer(&current).send(comm, rank + step, tag);
            }
        } else if rank % (step * 2) == step {
            current = Payload::<O>::recv(comm, rank - step, tag).into_buffer();
        }
    }

    current
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compare::LexicalOrder;
    use crate::test_support::{words, OnesRng, ZeroRng};

    #[test]
    fn small_buffers_are_taken_whole() {
        let buffer = words::<()>(&["p", "q"]);
        let mut rng = ZeroRng;
        let mut bits = RandomBitStore::new();
        let picked = middle_most(&buffer, 2, &mut rng, &mut bits);
        assert_eq!(picked.bytes, b"p\0q\0");
    }

    #[test]
    fn matching_parity_needs_no_randomness() {
        let buffer = words::<()>(&["a", "b", "c", "d"]);
        let mut rng = ZeroRng;
        let mut bits = RandomBitStore::new();
        let picked = middle_most(&buffer, 2, &mut rng, &mut bits);
        assert_eq!(picked.bytes, b"b\0c\0");
    }

    #[test]
    fn parity_mismatch_shifts_by_the_drawn_bit() {
        let buffer = words::<()>(&["a", "b", "c", "d", "e"]);

        let mut bits = RandomBitStore::new();
        let low = middle_most(&buffer, 2, &mut ZeroRng, &mut bits);
        assert_eq!(low.bytes, b"b\0c\0");

        let mut bits = RandomBitStore::new();
        let high = middle_most(&buffer, 2, &mut OnesRng, &mut bits);
        assert_eq!(high.bytes, b"c\0d\0");
    }

    #[test]
    fn lone_rank_selects_its_own_middle() {
        use cubesort_communication::{initialize, Configuration};
        let guards = initialize(Configuration::Thread, |mut comm| {
            let buffer = words::<()>(&["ant", "bee", "cow"]);
            let mut rng = ZeroRng;
            let mut bits = RandomBitStore::new();
            let pivot = select_pivot(&mut rng, &mut bits, &buffer, LexicalOrder, 3, &mut comm);
            pivot.raw_strings().to_vec()
        })
        .unwrap();
        assert_eq!(guards.join().remove(0).unwrap(), b"bee\0");
    }
}

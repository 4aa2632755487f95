//! Locating the split position for a pivot within a sorted buffer.

use rand::RngCore;

use crate::buffer::{Entry, StringBuffer};
use crate::compare::{Compare, Origin};
use crate::random::RandomBitStore;

/// Finds the offset splitting a sorted buffer around `pivot`.
///
/// Without tie-breaking the result is the first view ordering greater than or equal to the
/// pivot. With tie-breaking, runs of strings equal to the pivot are split so that the
/// offset lands as close to the middle of the buffer as the run permits, the middle being
/// rounded down or up by one random bit when the size is odd. That keeps the per-level
/// imbalance bounded even when the input is dominated by copies of the pivot.
pub fn locate_splitter<O, C, R>(
    buffer: &StringBuffer<O>,
    comp: C,
    pivot: &Entry<O>,
    rng: &mut R,
    bits: &mut RandomBitStore,
    is_robust: bool,
) -> usize
where
    O: Origin,
    C: Compare<O>,
    R: RngCore,
{
    let views = buffer.strings();
    let lower = views.partition_point(|view| comp.less(&buffer.entry(view), pivot));
    if !is_robust {
        return lower;
    }

    let upper = lower
        + views[lower..].partition_point(|view| !comp.less(pivot, &buffer.entry(view)));

    // Round the optimum down or up randomly.
    let odd = views.len() % 2 == 1;
    let optimum = views.len() / 2 + (odd && bits.next_bit(rng) == 1) as usize;

    if lower < optimum {
        optimum.min(upper)
    } else {
        lower
    }
}

//! Hypercube redistribution of string ownership.
//!
//! One phase per hypercube dimension: every rank flips a fair coin for each of its strings,
//! keeps half and ships the other half to its partner across that dimension. After all
//! ⌊log P⌋ phases the assignment of strings to ranks is close to uniform whatever the input
//! distribution was, while the global multiset is untouched. Coins are taken 64 at a time
//! from one generator word.

use rand::RngCore;

use cubesort_communication::{Communicator, Tag};

use crate::buffer::StringBuffer;
use crate::compare::Origin;
use crate::exchange::Payload;

/// Randomizes string ownership across a power-of-two group.
pub fn shuffle<O, R, G>(rng: &mut R, buffer: &mut StringBuffer<O>, tag: Tag, comm: &mut G)
where
    O: Origin,
    R: RngCore,
    G: Communicator,
{
    let size = comm.size();
    let rank = comm.rank();
    debug_assert!(size.is_power_of_two());

    let phases = size.trailing_zeros();
    for phase in 0..phases {
        let partner = rank ^ (1 << phase);

        let rebuilt = {
            let views = buffer.strings();
            let mut kept = Vec::with_capacity(views.len());
            let mut outgoing = Vec::with_capacity(views.len());
            let mut position = 0;
            while position < views.len() {
                let mut word = rng.next_u64();
                let batch = 64.min(views.len() - position);
                for _ in 0..batch {
                    if word & 1 == 1 {
                        outgoing.push(views[position]);
                    } else {
                        kept.push(views[position]);
                    }
                    word >>= 1;
                    position += 1;
                }
            }

            let sent = Payload::from_views(buffer, &outgoing);
            let received = sent.exchange(comm, partner, tag);
            let mut rebuilt = Payload::from_views(buffer, &kept);
            rebuilt.append(received);
            rebuilt
        };
        *buffer = rebuilt.into_buffer();
    }
}

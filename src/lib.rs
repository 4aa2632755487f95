//! Distributed sorting of byte strings over a hypercube of cooperating ranks.
//!
//! Each of P ranks holds a local multiset of variable-length, zero-terminated byte
//! strings. A sort leaves every local buffer internally ordered and the buffers globally
//! ordered by rank: all strings on rank i order at or before all strings on rank i + 1.
//! The engine is a recursive hypercube quicksort: the group agrees on a pivot through a
//! binary reduction tree of middle-most candidates, every rank splits its sorted buffer at
//! the pivot with optional tie-breaking toward the middle, swaps the far half with its
//! partner across the leading hypercube dimension, merges, and recurses on the bisected
//! group until pairs remain.
//!
//! Groups of non-power-of-two size first fold their surplus ranks into the lower ranks;
//! folded ranks finish immediately with an empty buffer. In tracked mode every string
//! carries a 64-bit origin that breaks ties among equal contents, making the sort stable
//! end to end.
//!
//! The engine speaks to its peers only through the
//! [`Communicator`](cubesort_communication::Communicator) trait; the bundled in-process
//! fabric makes a complete sort runnable (and testable) inside one process:
//!
//! ```
//! use cubesort::{sort, LexicalOrder, Payload};
//! use cubesort_communication::{initialize, Communicator, Configuration};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let guards = initialize(Configuration::Process(2), |comm| {
//!     let mut rng = StdRng::seed_from_u64(17 + comm.rank() as u64);
//!
//!     let shares = [["walnut", "fig"], ["date", "almond"]];
//!     let mut data = Payload::<()>::new();
//!     for word in shares[comm.rank()] {
//!         data.push_str(word.as_bytes(), ());
//!     }
//!
//!     let sorted = sort(&mut rng, data, 2, comm, LexicalOrder, true);
//!     sorted
//!         .entries()
//!         .map(|entry| String::from_utf8(entry.content().to_vec()).unwrap())
//!         .collect::<Vec<_>>()
//! })
//! .unwrap();
//!
//! // Concatenating the per-rank results in rank order yields the global order.
//! let mut all = Vec::new();
//! for worker in guards.join() {
//!     all.extend(worker.unwrap());
//! }
//! assert_eq!(all, ["almond", "date", "fig", "walnut"]);
//! ```

pub mod buffer;
pub mod compare;
pub mod duplicates;
pub mod exchange;
pub mod median;
pub mod merge;
pub mod radix;
pub mod random;
pub mod shuffle;
pub mod sort;
pub mod splitter;
pub mod tracker;

pub use buffer::{Entry, StringBuffer, View};
pub use compare::{Compare, LexicalOrder, Origin, StableOrder};
pub use exchange::Payload;
pub use random::RandomBitStore;
pub use sort::{sort, sort_tracked, SortOptions};
pub use tracker::{DummyTracker, Phase, TimingTracker, Tracker};

#[cfg(test)]
pub(crate) mod test_support {
    //! Deterministic generators and small fixtures for unit tests.

    use rand::RngCore;

    use crate::buffer::StringBuffer;
    use crate::compare::Origin;
    use crate::exchange::Payload;

    /// A generator whose every word is zero; random bits drawn from it are all 0.
    pub struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    /// A generator whose every word is all ones; random bits drawn from it are all 1.
    pub struct OnesRng;

    impl RngCore for OnesRng {
        fn next_u32(&mut self) -> u32 {
            !0
        }
        fn next_u64(&mut self) -> u64 {
            !0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0xFF);
        }
        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    /// A buffer over the given words, with defaulted origins.
    pub fn words<O: Origin>(list: &[&str]) -> StringBuffer<O> {
        let mut payload = Payload::<O>::new();
        for word in list {
            payload.push_str(word.as_bytes(), O::default());
        }
        payload.into_buffer()
    }
}

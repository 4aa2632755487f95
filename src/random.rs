//! A lazy bit oracle over a 64-bit generator.

use rand::RngCore;

/// Caches one generator word and hands out its bits one at a time.
///
/// Fair coin flips are consumed in great numbers by the tie-breaking code paths, and each
/// costs one shift here instead of one generator invocation. The store holds between 0 and
/// 63 valid bits and refills from the injected generator on exhaustion, so the bit sequence
/// is deterministic given the generator state.
pub struct RandomBitStore {
    word: u64,
    remaining: u32,
}

impl Default for RandomBitStore {
    fn default() -> Self {
        RandomBitStore::new()
    }
}

impl RandomBitStore {
    /// A store with no cached bits; the first draw refills it.
    pub fn new() -> Self {
        RandomBitStore { word: 0, remaining: 0 }
    }

    /// Returns 0 or 1 uniformly, consuming one cached bit.
    #[inline]
    pub fn next_bit<R: RngCore>(&mut self, rng: &mut R) -> u64 {
        if self.remaining == 0 {
            self.word = rng.next_u64();
            self.remaining = 64;
        }
        let bit = self.word & 1;
        self.word >>= 1;
        self.remaining -= 1;
        bit
    }
}

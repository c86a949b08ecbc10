//! Shared-randomness generators seeded by a one-time seed exchange.
//!
//! Input gates avoid a message for the secret-share distribution: the input
//! owner masks with a stream derived from its own seed, the peer derives the
//! same stream from the seed it received. Streams are addressed by input id,
//! so gates constructed in the same order on both parties read the same
//! randomness.

use crate::common::{rand_bitvec, BitVec};
use crate::ring::Ring;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

pub(crate) struct SharedRandomness {
    seed: [u8; 32],
}

impl SharedRandomness {
    pub(crate) fn new(seed: [u8; 32]) -> Self {
        Self { seed }
    }

    fn stream(&self, stream_id: u64) -> ChaChaRng {
        let mut rng = ChaChaRng::from_seed(self.seed);
        rng.set_stream(stream_id);
        rng
    }

    pub(crate) fn bits(&self, stream_id: u64, len: usize) -> BitVec {
        rand_bitvec(len, &mut self.stream(stream_id))
    }

    pub(crate) fn ring_vec<T: Ring>(&self, stream_id: u64, len: usize) -> Vec<T> {
        let mut rng = self.stream(stream_id);
        (0..len).map(|_| T::random(&mut rng)).collect()
    }
}

/// Both parties' generators, built after the seed exchange.
pub(crate) struct BaseProvider {
    /// Streams derived from our own seed; the peer can derive them too.
    my_randomness: SharedRandomness,
    /// Streams derived from the peer's seed.
    their_randomness: SharedRandomness,
}

impl BaseProvider {
    pub(crate) fn new(my_seed: [u8; 32], their_seed: [u8; 32]) -> Self {
        Self {
            my_randomness: SharedRandomness::new(my_seed),
            their_randomness: SharedRandomness::new(their_seed),
        }
    }

    pub(crate) fn my_randomness(&self) -> &SharedRandomness {
        &self.my_randomness
    }

    pub(crate) fn their_randomness(&self) -> &SharedRandomness {
        &self.their_randomness
    }

    pub(crate) fn random_seed<R: Rng>(rng: &mut R) -> [u8; 32] {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_agree_and_differ() {
        let gen_a = SharedRandomness::new([7; 32]);
        let gen_b = SharedRandomness::new([7; 32]);
        assert_eq!(gen_a.bits(0, 100), gen_b.bits(0, 100));
        assert_eq!(gen_a.ring_vec::<u32>(3, 10), gen_b.ring_vec::<u32>(3, 10));
        assert_ne!(gen_a.bits(0, 100), gen_a.bits(1, 100));
    }
}

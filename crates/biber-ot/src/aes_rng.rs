//! AES-128-CTR pseudorandom generator.
//!
//! Used to expand the base-OT keys into the rows of the extension matrix and
//! to stretch compressed seeds for OTs longer than 128 bit. Seeded from a
//! [`Block`], so both parties expanding the same key produce the same
//! stream.

use crate::Block;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use rand::{CryptoRng, Error, RngCore, SeedableRng};

pub struct AesRng {
    cipher: Aes128,
    counter: u128,
    buffer: [u8; 16],
    /// bytes of `buffer` already handed out
    used: usize,
}

impl AesRng {
    pub fn from_block(seed: Block) -> Self {
        Self::from_seed(seed.to_le_bytes())
    }

    fn refill(&mut self) {
        let mut block = GenericArray::from(self.counter.to_le_bytes());
        self.cipher.encrypt_block(&mut block);
        self.buffer = block.into();
        self.counter = self.counter.wrapping_add(1);
        self.used = 0;
    }
}

impl SeedableRng for AesRng {
    type Seed = [u8; 16];

    fn from_seed(seed: Self::Seed) -> Self {
        let key = GenericArray::from(seed);
        Self {
            cipher: Aes128::new(&key),
            counter: 0,
            buffer: [0; 16],
            used: 16,
        }
    }
}

impl RngCore for AesRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            if self.used == 16 {
                self.refill();
            }
            let n = (dest.len() - offset).min(16 - self.used);
            dest[offset..offset + n].copy_from_slice(&self.buffer[self.used..self.used + n]);
            self.used += n;
            offset += n;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for AesRng {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let seed = Block::new(123);
        let mut a = AesRng::from_block(seed);
        let mut b = AesRng::from_block(seed);
        let mut buf_a = [0u8; 100];
        let mut buf_b = [0u8; 100];
        a.fill_bytes(&mut buf_a);
        b.fill_bytes(&mut buf_b);
        assert_eq!(buf_a, buf_b);
    }

    #[test]
    fn chunked_reads_match_one_shot() {
        let seed = Block::new(7);
        let mut a = AesRng::from_block(seed);
        let mut b = AesRng::from_block(seed);
        let mut whole = [0u8; 48];
        a.fill_bytes(&mut whole);
        let mut parts = [0u8; 48];
        b.fill_bytes(&mut parts[..5]);
        b.fill_bytes(&mut parts[5..31]);
        b.fill_bytes(&mut parts[31..]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn different_seeds_differ() {
        let mut a = AesRng::from_block(Block::new(1));
        let mut b = AesRng::from_block(Block::new(2));
        assert_ne!(a.next_u64(), b.next_u64());
    }
}

//! 128-bit blocks, the unit the AES primitives and base OTs operate on.

use crate::BitVector;
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitXor, BitXorAssign};

#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
pub struct Block(u128);

impl Block {
    pub const BYTES: usize = 16;
    pub const ZERO: Self = Self(0);
    pub const ONES: Self = Self(u128::MAX);

    #[inline]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(self) -> u128 {
        self.0
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_le_bytes(bytes))
    }

    /// Packs the first 128 bits of `bits` into a block.
    ///
    /// # Panics
    /// Panics if `bits` holds fewer than 128 bits.
    pub fn from_bits(bits: &BitVector) -> Self {
        assert!(bits.len() >= 128, "need 128 bits for a block");
        let bytes: [u8; 16] = bits.as_raw_slice()[..16].try_into().expect("16 bytes");
        Self::from_le_bytes(bytes)
    }

    pub fn to_bits(self) -> BitVector {
        BitVector::from_vec(self.to_le_bytes().to_vec())
    }

    #[inline]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen())
    }
}

impl BitXor for Block {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for Block {
    #[inline]
    fn bitxor_assign(&mut self, rhs: Self) {
        self.0 ^= rhs.0;
    }
}

impl BitAnd for Block {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl From<u128> for Block {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<Block> for u128 {
    fn from(value: Block) -> Self {
        value.0
    }
}

impl Distribution<Block> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        Block(rng.gen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip() {
        let b = Block::new(0x0123_4567_89ab_cdef_0011_2233_4455_6677);
        assert_eq!(b, Block::from_bits(&b.to_bits()));
    }

    #[test]
    fn xor() {
        let a = Block::new(0b1100);
        let b = Block::new(0b1010);
        assert_eq!(Block::new(0b0110), a ^ b);
    }
}

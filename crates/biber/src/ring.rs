//! The ring Z/2^W Z the arithmetic gates compute in.

use num_traits::{WrappingAdd, WrappingMul, WrappingNeg, WrappingSub};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{BitAnd, BitXor, Not, Shl, Shr};

// This doesn't capture a ring in the mathematical sense, just what the
// engine needs: wrapping arithmetic, bit access and a byte encoding.
pub trait Ring:
    biber_ot::OtRing
    + WrappingAdd
    + WrappingSub
    + WrappingMul
    + WrappingNeg
    + Not<Output = Self>
    + BitAnd<Output = Self>
    + BitXor<Output = Self>
    + Shl<usize, Output = Self>
    + Shr<usize, Output = Self>
    + Ord
    + Hash
    + Debug
    + Serialize
    + DeserializeOwned
{
    const ZERO: Self;
    const ONE: Self;
    const MAX: Self;

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self;

    fn from_bool(bit: bool) -> Self {
        if bit {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    fn get_bit(&self, idx: usize) -> bool {
        (*self >> idx) & Self::ONE != Self::ZERO
    }

    fn as_usize(&self) -> usize;
}

macro_rules! impl_ring {
    ($($t:ty),+) => {$(
        impl Ring for $t {
            const ZERO: Self = 0;
            const ONE: Self = 1;
            const MAX: Self = <$t>::MAX;

            fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.gen()
            }

            fn as_usize(&self) -> usize {
                *self as usize
            }
        }
    )+};
}

impl_ring!(u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_access() {
        let x: u16 = 0b1010;
        assert!(!x.get_bit(0));
        assert!(x.get_bit(1));
        assert!(!x.get_bit(2));
        assert!(x.get_bit(3));
        assert!(!x.get_bit(15));
    }

    #[test]
    fn from_bool() {
        assert_eq!(1u8, u8::from_bool(true));
        assert_eq!(0u8, u8::from_bool(false));
    }
}

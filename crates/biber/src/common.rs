//! Shared container types and small helpers.

use crate::ring::Ring;
use rand::{CryptoRng, Rng};

/// Packed bit vector carrying `num_simd` Boolean values.
pub type BitVec = bitvec::vec::BitVec<u8, bitvec::order::Lsb0>;
pub type BitSlice = bitvec::slice::BitSlice<u8, bitvec::order::Lsb0>;

/// Samples a random bit vector of length `len`.
pub fn rand_bitvec<R: Rng + CryptoRng>(len: usize, rng: &mut R) -> BitVec {
    let mut bytes = vec![0u8; len.div_ceil(8)];
    rng.fill_bytes(&mut bytes);
    let mut bits = BitVec::from_vec(bytes);
    bits.truncate(len);
    bits
}

pub fn xor(mut a: BitVec, b: &BitVec) -> BitVec {
    xor_assign(&mut a, b);
    a
}

pub fn xor_assign(a: &mut BitVec, b: &BitVec) {
    debug_assert_eq!(a.len(), b.len(), "xor on bit vectors of unequal length");
    *a ^= b.as_bitslice();
}

pub fn and(mut a: BitVec, b: &BitVec) -> BitVec {
    debug_assert_eq!(a.len(), b.len(), "and on bit vectors of unequal length");
    a &= b.as_bitslice();
    a
}

pub fn add_vec<T: Ring>(a: &[T], b: &[T]) -> Vec<T> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(a, b)| a.wrapping_add(b)).collect()
}

pub fn sub_vec<T: Ring>(a: &[T], b: &[T]) -> Vec<T> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(a, b)| a.wrapping_sub(b)).collect()
}

pub fn mul_vec<T: Ring>(a: &[T], b: &[T]) -> Vec<T> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(a, b)| a.wrapping_mul(b)).collect()
}

pub fn neg_vec<T: Ring>(a: &[T]) -> Vec<T> {
    a.iter().map(|a| a.wrapping_neg()).collect()
}

pub fn add_assign_vec<T: Ring>(a: &mut [T], b: &[T]) {
    debug_assert_eq!(a.len(), b.len());
    a.iter_mut().zip(b).for_each(|(a, b)| *a = a.wrapping_add(b));
}

pub fn sub_assign_vec<T: Ring>(a: &mut [T], b: &[T]) {
    debug_assert_eq!(a.len(), b.len());
    a.iter_mut().zip(b).for_each(|(a, b)| *a = a.wrapping_sub(b));
}

/// Little-endian encoding of a ring vector, the wire format of all
/// arithmetic messages.
pub fn ring_to_bytes<T: Ring>(values: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// Decodes `len` ring elements; `None` if the length does not match.
pub fn ring_from_bytes<T: Ring>(bytes: &[u8], len: usize) -> Option<Vec<T>> {
    if bytes.len() != len * T::BYTES {
        return None;
    }
    Some(
        (0..len)
            .map(|i| bytemuck::pod_read_unaligned(&bytes[i * T::BYTES..(i + 1) * T::BYTES]))
            .collect(),
    )
}

/// Interprets a ring vector as its concatenated little-endian bits, e.g. as
/// OT choice bits.
pub fn ring_to_bits<T: Ring>(values: &[T]) -> BitVec {
    let mut bits = BitVec::from_vec(ring_to_bytes(values));
    bits.truncate(values.len() * T::BITS);
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_bytes_round_trip() {
        let values: Vec<u32> = vec![1, 0xdead_beef, 42];
        let bytes = ring_to_bytes(&values);
        assert_eq!(Some(values), ring_from_bytes::<u32>(&bytes, 3));
        assert_eq!(None, ring_from_bytes::<u32>(&bytes, 2));
    }

    #[test]
    fn ring_bits_little_endian() {
        let bits = ring_to_bits::<u8>(&[0b0000_0101]);
        assert!(bits[0]);
        assert!(!bits[1]);
        assert!(bits[2]);
        assert_eq!(8, bits.len());
    }
}

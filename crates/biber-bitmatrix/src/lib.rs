//! Packed bit-matrices with a portable blockwise transpose.
//!
//! OT extension works on a κ×N bit matrix (κ = 128) which has to be
//! transposed once per setup. The matrix is stored row-major in unsigned
//! integer elements with Lsb0 bit order, matching `bitvec`'s layout, so a
//! row of a byte-backed matrix can be reinterpreted as a `BitSlice` without
//! copying.

use bitvec::order::Lsb0;
use bitvec::slice::BitSlice;
use bitvec::vec::BitVec;
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::{BitAnd, BitXor};

mod portable;

/// Storage element of a [`BitMatrix`].
pub trait Storage:
    bytemuck::Pod + BitXor<Output = Self> + BitAnd<Output = Self> + Eq + Debug + Send + Sync
{
    const BITS: usize;

    fn zero() -> Self;
    fn get_bit(&self, idx: usize) -> bool;
    fn set_bit(&mut self, idx: usize, bit: bool);
}

macro_rules! impl_storage {
    ($($t:ty),+) => {$(
        impl Storage for $t {
            const BITS: usize = <$t>::BITS as usize;

            fn zero() -> Self {
                0
            }

            fn get_bit(&self, idx: usize) -> bool {
                self & (1 << idx) != 0
            }

            fn set_bit(&mut self, idx: usize, bit: bool) {
                if bit {
                    *self |= 1 << idx;
                } else {
                    *self &= !(1 << idx);
                }
            }
        }
    )+};
}

impl_storage!(u8, u16, u32, u64, u128);

#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitMatrix<T: Storage> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

#[derive(Clone, Copy, Debug)]
pub struct BitMatrixView<'a, T> {
    rows: usize,
    cols: usize,
    data: &'a [T],
}

impl<T: Storage> BitMatrix<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        check_dim::<T>(rows, cols);
        Self {
            rows,
            cols,
            data: vec![T::zero(); rows * cols / T::BITS],
        }
    }

    /// Builds a matrix from its row-major storage elements.
    ///
    /// # Panics
    /// Panics if `data` does not hold exactly `rows * cols` bits.
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Self {
        check_dim::<T>(rows, cols);
        assert_eq!(
            data.len() * T::BITS,
            rows * cols,
            "data length does not match dimensions"
        );
        Self { rows, cols, data }
    }

    pub fn random<R: Rng>(mut rng: R, rows: usize, cols: usize) -> Self
    where
        Standard: Distribution<T>,
    {
        check_dim::<T>(rows, cols);
        let data = (&mut rng)
            .sample_iter(Standard)
            .take(rows * cols / T::BITS)
            .collect();
        Self { rows, cols, data }
    }

    /// Dimensions as (rows, columns).
    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn view(&self) -> BitMatrixView<'_, T> {
        BitMatrixView {
            rows: self.rows,
            cols: self.cols,
            data: &self.data,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn transpose(&self) -> BitMatrix<T> {
        self.view().transpose()
    }
}

impl<T: Storage> BitMatrix<T>
where
    T: bitvec::store::BitStore<Unalias = T>,
{
    pub fn from_bits(bits: &BitSlice<T, Lsb0>, rows: usize, cols: usize) -> Self {
        assert_eq!(bits.len(), rows * cols, "bits.len() != rows * cols");
        let data = bits.to_bitvec().into_vec();
        Self { rows, cols, data }
    }

    pub fn into_bitvec(self) -> BitVec<T, Lsb0> {
        BitVec::from_vec(self.data)
    }

    /// Row as a bit slice. `None` past the last row.
    pub fn row(&self, row: usize) -> Option<&BitSlice<T, Lsb0>> {
        let bits: &BitSlice<T, Lsb0> = BitSlice::from_slice(&self.data);
        bits.get(row * self.cols..(row + 1) * self.cols)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &BitSlice<T, Lsb0>> {
        (0..self.rows).map(|r| self.row(r).expect("row in range"))
    }
}

impl<'a, T: Storage> BitMatrixView<'a, T> {
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len() * T::BITS,
            rows * cols,
            "data length does not match dimensions"
        );
        Self { rows, cols, data }
    }

    pub fn transpose(&self) -> BitMatrix<T> {
        let transposed = portable::transpose(self.data, self.rows, self.cols);
        BitMatrix {
            rows: self.cols,
            cols: self.rows,
            data: transposed,
        }
    }
}

impl<T: Storage> BitXor for BitMatrix<T> {
    type Output = BitMatrix<T>;

    fn bitxor(mut self, rhs: Self) -> Self::Output {
        assert_eq!(self.dim(), rhs.dim(), "BitXor on mismatched dimensions");
        self.data
            .iter_mut()
            .zip(rhs.data)
            .for_each(|(a, b)| *a = *a ^ b);
        self
    }
}

fn check_dim<T: Storage>(rows: usize, cols: usize) {
    assert_eq!(
        (rows * cols) % T::BITS,
        0,
        "rows * cols must be divisible by T::BITS"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaChaRng;

    fn naive_transpose<T: Storage>(m: &BitMatrix<T>) -> BitMatrix<T> {
        let (rows, cols) = m.dim();
        let mut out: BitMatrix<T> = BitMatrix::zeros(cols, rows);
        for r in 0..rows {
            for c in 0..cols {
                let bit_idx = r * cols + c;
                let bit = m.data[bit_idx / T::BITS].get_bit(bit_idx % T::BITS);
                let t_idx = c * rows + r;
                out.data[t_idx / T::BITS].set_bit(t_idx % T::BITS, bit);
            }
        }
        out
    }

    #[test]
    fn transpose_involution() {
        let rng = ChaChaRng::seed_from_u64(42);
        let mat: BitMatrix<u8> = BitMatrix::random(rng, 128, 256);
        assert_eq!(mat, mat.transpose().transpose());
    }

    #[test]
    fn transpose_matches_naive() {
        let rng = ChaChaRng::seed_from_u64(7);
        let mat: BitMatrix<u8> = BitMatrix::random(rng, 128, 384);
        assert_eq!(naive_transpose(&mat), mat.transpose());
    }

    #[test]
    fn transpose_u64_storage() {
        let rng = ChaChaRng::seed_from_u64(3);
        let mat: BitMatrix<u64> = BitMatrix::random(rng, 64, 128);
        assert_eq!(naive_transpose(&mat), mat.transpose());
    }

    #[test]
    fn xor() {
        let rng = ChaChaRng::seed_from_u64(1);
        let a: BitMatrix<u8> = BitMatrix::random(rng, 16, 16);
        let zero = BitMatrix::zeros(16, 16);
        assert_eq!(a.clone(), a.clone() ^ zero);
        let self_xor = a.clone() ^ a;
        assert!(self_xor.as_slice().iter().all(|&b| b == 0));
    }
}

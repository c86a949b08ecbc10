//! Oblivious transfer for the two-party engine.
//!
//! [`base_ot`] implements the Chou-Orlandi protocol which seeds the
//! IKNP-style extension in [`extension`]: from κ = 128 base OTs, a batch of
//! millions of correlated or chosen OTs is derived with one bit-matrix
//! expansion, a transpose and a fixed-key AES compression per OT.
//!
//! The extension provider hands out per-batch `Sender`/`Receiver` handles of
//! different flavors (fixed-correlation 128-bit, per-bit XOR correlation,
//! additive correlation over a ring, chosen-message, random) which are
//! consumed by the gates of the engine during their setup phase.

pub mod aes_hash;
pub mod aes_rng;
pub mod base_ot;
pub mod block;
pub mod extension;

pub use block::Block;

use thiserror::Error;

/// Packed bit vector used throughout the OT layer.
pub type BitVector = bitvec::vec::BitVec<u8, bitvec::order::Lsb0>;

#[derive(Error, Debug)]
pub enum OtError {
    #[error("channel to the peer is closed")]
    ChannelClosed,
    #[error("peer sent an out-of-order message")]
    WrongOrder,
    #[error("peer terminated the protocol early")]
    UnexpectedTermination,
    #[error("peer deviated from the protocol")]
    ProtocolDeviation,
    #[error("ot extension setup was dropped before completing")]
    SetupInterrupted,
}

impl From<biber_channel::CommunicationError> for OtError {
    fn from(_: biber_channel::CommunicationError) -> Self {
        OtError::ChannelClosed
    }
}

/// Ring element usable as ACOT correlation type.
pub trait OtRing:
    Copy
    + Default
    + std::fmt::Debug
    + Eq
    + Send
    + Sync
    + bytemuck::Pod
    + num_traits::WrappingAdd
    + num_traits::WrappingSub
    + num_traits::WrappingNeg
    + 'static
{
    const BITS: usize;
    const BYTES: usize;
}

macro_rules! impl_ot_ring {
    ($($t:ty),+) => {$(
        impl OtRing for $t {
            const BITS: usize = <$t>::BITS as usize;
            const BYTES: usize = std::mem::size_of::<$t>();
        }
    )+};
}

impl_ot_ring!(u8, u16, u32, u64, u128);

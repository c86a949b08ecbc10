//! Multiplication-triple provider.
//!
//! Boolean triples come from one pair of XCOTBit batches, arithmetic
//! triples from two Gilboa sessions (one per direction). Generation runs in
//! the preprocessing pass after the OT extension setup.

use super::{ArithMulTriples, BoolMulTriples};
use crate::arith::{
    ArithmeticProvider, IntegerMultiplicationReceiver, IntegerMultiplicationSender,
};
use crate::common::{and, rand_bitvec, xor};
use crate::ring::Ring;
use biber_ot::extension::{OtExtension, XcotBitReceiver, XcotBitSender};
use biber_ot::OtError;
use itertools::izip;
use rand::{CryptoRng, Rng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

#[doc(hidden)]
pub struct RingMtState<T: Ring> {
    requested: AtomicUsize,
    handles: Mutex<Option<RingMtHandles<T>>>,
    pool: Mutex<Option<ArithMulTriples<T>>>,
}

struct RingMtHandles<T: Ring> {
    send_session: IntegerMultiplicationSender<T>,
    recv_session: IntegerMultiplicationReceiver<T>,
}

impl<T: Ring> Default for RingMtState<T> {
    fn default() -> Self {
        Self {
            requested: AtomicUsize::new(0),
            handles: Mutex::new(None),
            pool: Mutex::new(None),
        }
    }
}

#[derive(Default)]
pub struct MtProvider {
    bool_requested: AtomicUsize,
    bool_handles: Mutex<Option<(XcotBitSender, XcotBitReceiver)>>,
    bool_pool: Mutex<Option<BoolMulTriples>>,
    mts_u8: RingMtState<u8>,
    mts_u16: RingMtState<u16>,
    mts_u32: RingMtState<u32>,
    mts_u64: RingMtState<u64>,
}

/// Width dispatch into the per-ring pools of the provider.
pub trait HasRingMts<T: Ring> {
    #[doc(hidden)]
    fn state(&self) -> &RingMtState<T>;
}

macro_rules! impl_has_ring_mts {
    ($($t:ty => $field:ident),+) => {$(
        impl HasRingMts<$t> for MtProvider {
            fn state(&self) -> &RingMtState<$t> {
                &self.$field
            }
        }
    )+};
}

impl_has_ring_mts!(u8 => mts_u8, u16 => mts_u16, u32 => mts_u32, u64 => mts_u64);

impl MtProvider {
    /// Reserves `count` Boolean triples; returns the pool offset.
    pub fn request_bool_mts(&self, count: usize) -> usize {
        self.bool_requested.fetch_add(count, Ordering::Relaxed)
    }

    /// Reserves `count` arithmetic triples; returns the pool offset.
    pub fn request_ring_mts<T: Ring>(&self, count: usize) -> usize
    where
        Self: HasRingMts<T>,
    {
        self.state().requested.fetch_add(count, Ordering::Relaxed)
    }

    /// Registers the OT batches backing the requested pools. Must run on
    /// both parties before the OT extension setup.
    pub(crate) fn register_ots(&self, ot: &OtExtension, arith: &ArithmeticProvider) {
        let bool_count = self.bool_requested.load(Ordering::Relaxed);
        if bool_count > 0 {
            *self.bool_handles.lock().expect("mt provider poisoned") = Some((
                ot.register_send_xcot_bit(bool_count),
                ot.register_receive_xcot_bit(bool_count),
            ));
        }
        self.register_ring_ots::<u8>(arith);
        self.register_ring_ots::<u16>(arith);
        self.register_ring_ots::<u32>(arith);
        self.register_ring_ots::<u64>(arith);
    }

    fn register_ring_ots<T: Ring>(&self, arith: &ArithmeticProvider)
    where
        Self: HasRingMts<T>,
    {
        let state = self.state();
        let count = state.requested.load(Ordering::Relaxed);
        if count > 0 {
            *state.handles.lock().expect("mt provider poisoned") = Some(RingMtHandles {
                send_session: arith.register_integer_multiplication_send::<T>(count, 1),
                recv_session: arith.register_integer_multiplication_receive::<T>(count, 1),
            });
        }
    }

    /// Generates all requested pools. Runs once during preprocessing.
    pub(crate) async fn generate<R: Rng + CryptoRng>(&self, rng: &mut R) -> Result<(), OtError> {
        self.generate_bool(rng).await?;
        self.generate_ring::<u8, _>(rng).await?;
        self.generate_ring::<u16, _>(rng).await?;
        self.generate_ring::<u32, _>(rng).await?;
        self.generate_ring::<u64, _>(rng).await?;
        Ok(())
    }

    async fn generate_bool<R: Rng + CryptoRng>(&self, rng: &mut R) -> Result<(), OtError> {
        let handles = self.bool_handles.lock().expect("mt provider poisoned").take();
        let Some((mut sender, mut receiver)) = handles else {
            return Ok(());
        };
        let count = sender.num_ots();
        debug!(count, "generating boolean multiplication triples");
        let a = rand_bitvec(count, rng);
        let b = rand_bitvec(count, rng);
        receiver.set_choices(a.clone());
        receiver.send_corrections().await?;
        sender.set_correlations(b.clone());
        sender.send_messages().await?;
        receiver.compute_outputs().await?;
        sender.compute_outputs().await?;
        let c = xor(
            xor(and(a.clone(), &b), sender.outputs()),
            receiver.outputs(),
        );
        *self.bool_pool.lock().expect("mt provider poisoned") = Some(BoolMulTriples { a, b, c });
        Ok(())
    }

    async fn generate_ring<T, R>(&self, rng: &mut R) -> Result<(), OtError>
    where
        T: Ring,
        Self: HasRingMts<T>,
        R: Rng + CryptoRng,
    {
        let state = self.state();
        let handles = state.handles.lock().expect("mt provider poisoned").take();
        let Some(mut handles) = handles else {
            return Ok(());
        };
        let count = state.requested.load(Ordering::Relaxed);
        debug!(
            count,
            bits = T::BITS,
            "generating arithmetic multiplication triples"
        );
        let a: Vec<T> = (0..count).map(|_| T::random(rng)).collect();
        let b: Vec<T> = (0..count).map(|_| T::random(rng)).collect();
        handles.recv_session.set_inputs(&a).await?;
        handles.send_session.set_inputs(&b).await?;
        handles.recv_session.compute_outputs().await?;
        handles.send_session.compute_outputs().await?;
        let u = handles.send_session.get_outputs();
        let v = handles.recv_session.get_outputs();
        let c = izip!(&a, &b, u, v)
            .map(|(a, b, u, v)| a.wrapping_mul(b).wrapping_add(&u).wrapping_add(&v))
            .collect();
        *state.pool.lock().expect("mt provider poisoned") = Some(ArithMulTriples { a, b, c });
        Ok(())
    }

    /// Returns the Boolean triples `[offset, offset + count)`.
    pub fn bool_mts(&self, offset: usize, count: usize) -> BoolMulTriples {
        let pool = self.bool_pool.lock().expect("mt provider poisoned");
        let pool = pool
            .as_ref()
            .expect("preprocessing must run before triples are consumed");
        BoolMulTriples {
            a: pool.a[offset..offset + count].to_bitvec(),
            b: pool.b[offset..offset + count].to_bitvec(),
            c: pool.c[offset..offset + count].to_bitvec(),
        }
    }

    /// Returns the arithmetic triples `[offset, offset + count)`.
    pub fn ring_mts<T: Ring>(&self, offset: usize, count: usize) -> ArithMulTriples<T>
    where
        Self: HasRingMts<T>,
    {
        let pool = self.state().pool.lock().expect("mt provider poisoned");
        let pool = pool
            .as_ref()
            .expect("preprocessing must run before triples are consumed");
        ArithMulTriples {
            a: pool.a[offset..offset + count].to_vec(),
            b: pool.b[offset..offset + count].to_vec(),
            c: pool.c[offset..offset + count].to_vec(),
        }
    }

    pub(crate) fn reset(&self) {
        self.bool_requested.store(0, Ordering::Relaxed);
        *self.bool_handles.lock().expect("mt provider poisoned") = None;
        *self.bool_pool.lock().expect("mt provider poisoned") = None;
        macro_rules! reset_ring {
            ($($field:ident),+) => {$(
                self.$field.requested.store(0, Ordering::Relaxed);
                *self.$field.handles.lock().expect("mt provider poisoned") = None;
                *self.$field.pool.lock().expect("mt provider poisoned") = None;
            )+};
        }
        reset_ring!(mts_u8, mts_u16, mts_u32, mts_u64);
    }
}

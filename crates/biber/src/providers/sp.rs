//! Square-pair provider: sharings of random `(a, a²)`.
//!
//! The cross term `2·a⁰·a¹` comes from a single-direction Gilboa session;
//! party 0 acts as the sender with input `2·a⁰`.

use super::SquarePairs;
use crate::arith::{
    ArithmeticProvider, IntegerMultiplicationReceiver, IntegerMultiplicationSender,
};
use crate::ring::Ring;
use biber_ot::OtError;
use rand::{CryptoRng, Rng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

enum SpSession<T: Ring> {
    Sender(IntegerMultiplicationSender<T>),
    Receiver(IntegerMultiplicationReceiver<T>),
}

#[doc(hidden)]
pub struct RingSpState<T: Ring> {
    requested: AtomicUsize,
    session: Mutex<Option<SpSession<T>>>,
    pool: Mutex<Option<SquarePairs<T>>>,
}

impl<T: Ring> Default for RingSpState<T> {
    fn default() -> Self {
        Self {
            requested: AtomicUsize::new(0),
            session: Mutex::new(None),
            pool: Mutex::new(None),
        }
    }
}

pub struct SpProvider {
    my_id: usize,
    sps_u8: RingSpState<u8>,
    sps_u16: RingSpState<u16>,
    sps_u32: RingSpState<u32>,
    sps_u64: RingSpState<u64>,
}

pub trait HasRingSps<T: Ring> {
    #[doc(hidden)]
    fn state(&self) -> &RingSpState<T>;
}

macro_rules! impl_has_ring_sps {
    ($($t:ty => $field:ident),+) => {$(
        impl HasRingSps<$t> for SpProvider {
            fn state(&self) -> &RingSpState<$t> {
                &self.$field
            }
        }
    )+};
}

impl_has_ring_sps!(u8 => sps_u8, u16 => sps_u16, u32 => sps_u32, u64 => sps_u64);

impl SpProvider {
    pub(crate) fn new(my_id: usize) -> Self {
        Self {
            my_id,
            sps_u8: Default::default(),
            sps_u16: Default::default(),
            sps_u32: Default::default(),
            sps_u64: Default::default(),
        }
    }

    /// Reserves `count` square pairs; returns the pool offset.
    pub fn request_sps<T: Ring>(&self, count: usize) -> usize
    where
        Self: HasRingSps<T>,
    {
        self.state().requested.fetch_add(count, Ordering::Relaxed)
    }

    pub(crate) fn register_ots(&self, arith: &ArithmeticProvider) {
        self.register_ring_ots::<u8>(arith);
        self.register_ring_ots::<u16>(arith);
        self.register_ring_ots::<u32>(arith);
        self.register_ring_ots::<u64>(arith);
    }

    fn register_ring_ots<T: Ring>(&self, arith: &ArithmeticProvider)
    where
        Self: HasRingSps<T>,
    {
        let state = self.state();
        let count = state.requested.load(Ordering::Relaxed);
        if count > 0 {
            let session = if self.my_id == 0 {
                SpSession::Sender(arith.register_integer_multiplication_send::<T>(count, 1))
            } else {
                SpSession::Receiver(arith.register_integer_multiplication_receive::<T>(count, 1))
            };
            *state.session.lock().expect("sp provider poisoned") = Some(session);
        }
    }

    pub(crate) async fn generate<R: Rng + CryptoRng>(&self, rng: &mut R) -> Result<(), OtError> {
        self.generate_ring::<u8, _>(rng).await?;
        self.generate_ring::<u16, _>(rng).await?;
        self.generate_ring::<u32, _>(rng).await?;
        self.generate_ring::<u64, _>(rng).await?;
        Ok(())
    }

    async fn generate_ring<T, R>(&self, rng: &mut R) -> Result<(), OtError>
    where
        T: Ring,
        Self: HasRingSps<T>,
        R: Rng + CryptoRng,
    {
        let state = self.state();
        let session = state.session.lock().expect("sp provider poisoned").take();
        let Some(session) = session else {
            return Ok(());
        };
        let count = state.requested.load(Ordering::Relaxed);
        debug!(count, bits = T::BITS, "generating square pairs");
        let a: Vec<T> = (0..count).map(|_| T::random(rng)).collect();
        let cross = match session {
            SpSession::Sender(mut sender) => {
                // sender inputs 2·a so the session directly yields 2·a⁰·a¹
                let doubled: Vec<T> = a.iter().map(|a| a.wrapping_add(a)).collect();
                sender.set_inputs(&doubled).await?;
                sender.compute_outputs().await?;
                sender.get_outputs()
            }
            SpSession::Receiver(mut receiver) => {
                receiver.set_inputs(&a).await?;
                receiver.compute_outputs().await?;
                receiver.get_outputs()
            }
        };
        let c = a
            .iter()
            .zip(cross)
            .map(|(a, cross)| a.wrapping_mul(a).wrapping_add(&cross))
            .collect();
        *state.pool.lock().expect("sp provider poisoned") = Some(SquarePairs { a, c });
        Ok(())
    }

    /// Returns the square pairs `[offset, offset + count)`.
    pub fn sps<T: Ring>(&self, offset: usize, count: usize) -> SquarePairs<T>
    where
        Self: HasRingSps<T>,
    {
        let pool = self.state().pool.lock().expect("sp provider poisoned");
        let pool = pool
            .as_ref()
            .expect("preprocessing must run before square pairs are consumed");
        SquarePairs {
            a: pool.a[offset..offset + count].to_vec(),
            c: pool.c[offset..offset + count].to_vec(),
        }
    }

    pub(crate) fn reset(&self) {
        macro_rules! reset_ring {
            ($($field:ident),+) => {$(
                self.$field.requested.store(0, Ordering::Relaxed);
                *self.$field.session.lock().expect("sp provider poisoned") = None;
                *self.$field.pool.lock().expect("sp provider poisoned") = None;
            )+};
        }
        reset_ring!(sps_u8, sps_u16, sps_u32, sps_u64);
    }
}

//! Shared-bit provider: random bits with an XOR sharing and a matching
//! additive sharing over the ring.
//!
//! One ACOT per bit arithmetizes the XOR sharing: with party 0 as sender
//! (correlation = its bit r⁰) and party 1 as receiver (choice = its bit r¹),
//! the shares `r⁰ + 2·s` and `r¹ − 2·r` sum to `r⁰ ⊕ r¹`.

use super::SharedBits;
use crate::common::rand_bitvec;
use crate::ring::Ring;
use biber_ot::extension::{AcotReceiver, AcotSender, OtExtension};
use biber_ot::OtError;
use rand::{CryptoRng, Rng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

enum SbSession<T: Ring> {
    Sender(AcotSender<T>),
    Receiver(AcotReceiver<T>),
}

#[doc(hidden)]
pub struct RingSbState<T: Ring> {
    requested: AtomicUsize,
    session: Mutex<Option<SbSession<T>>>,
    pool: Mutex<Option<SharedBits<T>>>,
}

impl<T: Ring> Default for RingSbState<T> {
    fn default() -> Self {
        Self {
            requested: AtomicUsize::new(0),
            session: Mutex::new(None),
            pool: Mutex::new(None),
        }
    }
}

pub struct SbProvider {
    my_id: usize,
    sbs_u8: RingSbState<u8>,
    sbs_u16: RingSbState<u16>,
    sbs_u32: RingSbState<u32>,
    sbs_u64: RingSbState<u64>,
}

pub trait HasRingSbs<T: Ring> {
    #[doc(hidden)]
    fn state(&self) -> &RingSbState<T>;
}

macro_rules! impl_has_ring_sbs {
    ($($t:ty => $field:ident),+) => {$(
        impl HasRingSbs<$t> for SbProvider {
            fn state(&self) -> &RingSbState<$t> {
                &self.$field
            }
        }
    )+};
}

impl_has_ring_sbs!(u8 => sbs_u8, u16 => sbs_u16, u32 => sbs_u32, u64 => sbs_u64);

impl SbProvider {
    pub(crate) fn new(my_id: usize) -> Self {
        Self {
            my_id,
            sbs_u8: Default::default(),
            sbs_u16: Default::default(),
            sbs_u32: Default::default(),
            sbs_u64: Default::default(),
        }
    }

    /// Reserves `count` shared bits; returns the pool offset.
    pub fn request_sbs<T: Ring>(&self, count: usize) -> usize
    where
        Self: HasRingSbs<T>,
    {
        self.state().requested.fetch_add(count, Ordering::Relaxed)
    }

    pub(crate) fn register_ots(&self, ot: &OtExtension) {
        self.register_ring_ots::<u8>(ot);
        self.register_ring_ots::<u16>(ot);
        self.register_ring_ots::<u32>(ot);
        self.register_ring_ots::<u64>(ot);
    }

    fn register_ring_ots<T: Ring>(&self, ot: &OtExtension)
    where
        Self: HasRingSbs<T>,
    {
        let state = self.state();
        let count = state.requested.load(Ordering::Relaxed);
        if count > 0 {
            let session = if self.my_id == 0 {
                SbSession::Sender(ot.register_send_acot::<T>(count, 1))
            } else {
                SbSession::Receiver(ot.register_receive_acot::<T>(count, 1))
            };
            *state.session.lock().expect("sb provider poisoned") = Some(session);
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
        Self: HasRingSbs<T>,
        R: Rng + CryptoRng,
    {
        let state = self.state();
        let session = state.session.lock().expect("sb provider poisoned").take();
        let Some(session) = session else {
            return Ok(());
        };
        let count = state.requested.load(Ordering::Relaxed);
        debug!(count, bits = T::BITS, "generating shared bits");
        let bool_share = rand_bitvec(count, rng);
        let arith_share = match session {
            SbSession::Sender(mut sender) => {
                let correlations: Vec<T> = bool_share
                    .iter()
                    .by_vals()
                    .map(T::from_bool)
                    .collect();
                sender.set_correlations(correlations.clone());
                sender.send_messages().await?;
                sender.compute_outputs().await?;
                correlations
                    .iter()
                    .zip(sender.outputs())
                    .map(|(bit, s)| bit.wrapping_add(s).wrapping_add(s))
                    .collect()
            }
            SbSession::Receiver(mut receiver) => {
                receiver.set_choices(bool_share.clone());
                receiver.send_corrections().await?;
                receiver.compute_outputs().await?;
                bool_share
                    .iter()
                    .by_vals()
                    .zip(receiver.outputs())
                    .map(|(bit, r)| T::from_bool(bit).wrapping_sub(r).wrapping_sub(r))
                    .collect()
            }
        };
        *state.pool.lock().expect("sb provider poisoned") = Some(SharedBits {
            bool_share,
            arith_share,
        });
        Ok(())
    }

    /// Returns the shared bits `[offset, offset + count)`.
    pub fn sbs<T: Ring>(&self, offset: usize, count: usize) -> SharedBits<T>
    where
        Self: HasRingSbs<T>,
    {
        let pool = self.state().pool.lock().expect("sb provider poisoned");
        let pool = pool
            .as_ref()
            .expect("preprocessing must run before shared bits are consumed");
        SharedBits {
            bool_share: pool.bool_share[offset..offset + count].to_bitvec(),
            arith_share: pool.arith_share[offset..offset + count].to_vec(),
        }
    }

    pub(crate) fn reset(&self) {
        macro_rules! reset_ring {
            ($($field:ident),+) => {$(
                self.$field.requested.store(0, Ordering::Relaxed);
                *self.$field.session.lock().expect("sb provider poisoned") = None;
                *self.$field.pool.lock().expect("sb provider poisoned") = None;
            )+};
        }
        reset_ring!(sbs_u8, sbs_u16, sbs_u32, sbs_u64);
    }
}

//! Per-backend shared state handed to gates and factories.

use crate::arith::ArithmeticProvider;
use crate::base_provider::BaseProvider;
use crate::comm::{BitsFuture, GateMessage, IntsFuture, MessageRegistry};
use crate::common::{rand_bitvec, ring_to_bytes, BitVec};
use crate::errors::GateError;
use crate::gate::{Gate, GateId};
use crate::providers::{MtProvider, SbProvider, SpProvider};
use crate::ring::Ring;
use crate::wire::WireId;
use biber_channel::Sender as ChanSender;
use biber_ot::extension::OtExtension;
use rand_chacha::ChaChaRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Ordered gate arena and the id counters. Gates and wires are identified
/// by monotone ids allocated at construction; both parties build the same
/// circuit, so the ids agree.
#[derive(Default)]
pub(crate) struct Register {
    gates: Mutex<Vec<Box<dyn Gate>>>,
    next_gate_id: AtomicU64,
    next_wire_id: AtomicU64,
    next_input_id: AtomicU64,
}

impl Register {
    pub(crate) fn next_gate_id(&self) -> GateId {
        GateId(self.next_gate_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn next_wire_id(&self) -> WireId {
        WireId(self.next_wire_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn next_input_id(&self, count: u64) -> u64 {
        self.next_input_id.fetch_add(count, Ordering::Relaxed)
    }

    pub(crate) fn register_gate(&self, gate: Box<dyn Gate>) {
        self.gates.lock().expect("register poisoned").push(gate);
    }

    pub(crate) fn take_gates(&self) -> Vec<Box<dyn Gate>> {
        std::mem::take(&mut *self.gates.lock().expect("register poisoned"))
    }

    pub(crate) fn reset(&self) {
        self.gates.lock().expect("register poisoned").clear();
        self.next_gate_id.store(0, Ordering::Relaxed);
        self.next_wire_id.store(0, Ordering::Relaxed);
        self.next_input_id.store(0, Ordering::Relaxed);
    }
}

/// Shared context of one party: communication, randomness and the
/// correlated-randomness providers. Gates keep an `Arc` to this; the gate
/// arena itself lives in [`Register`] to avoid ownership cycles.
pub(crate) struct Core {
    pub(crate) my_id: usize,
    gate_tx: ChanSender<GateMessage>,
    pub(crate) registry: MessageRegistry,
    rng: Mutex<ChaChaRng>,
    pub(crate) base: BaseProvider,
    pub(crate) ot: Arc<OtExtension>,
    pub(crate) mt: Arc<MtProvider>,
    pub(crate) sp: Arc<SpProvider>,
    pub(crate) sb: Arc<SbProvider>,
}

impl Core {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        my_id: usize,
        gate_tx: ChanSender<GateMessage>,
        rng: ChaChaRng,
        base: BaseProvider,
        ot: Arc<OtExtension>,
        mt: Arc<MtProvider>,
        sp: Arc<SpProvider>,
        sb: Arc<SbProvider>,
    ) -> Self {
        Self {
            my_id,
            gate_tx,
            registry: MessageRegistry::default(),
            rng: Mutex::new(rng),
            base,
            ot,
            mt,
            sp,
            sb,
        }
    }

    /// Deterministic symmetry breaker: exactly one party considers a gate
    /// its job.
    pub(crate) fn is_my_job(&self, gate_id: GateId) -> bool {
        gate_id.0 % 2 == self.my_id as u64
    }

    pub(crate) fn arith(&self) -> ArithmeticProvider {
        ArithmeticProvider::new(Arc::clone(&self.ot))
    }

    pub(crate) fn random_bits(&self, len: usize) -> BitVec {
        let mut rng = self.rng.lock().expect("rng poisoned");
        rand_bitvec(len, &mut *rng)
    }

    pub(crate) fn random_ring_vec<T: Ring>(&self, len: usize) -> Vec<T> {
        let mut rng = self.rng.lock().expect("rng poisoned");
        (0..len).map(|_| T::random(&mut *rng)).collect()
    }

    pub(crate) async fn send_bits_message(
        &self,
        gate_id: GateId,
        seq: u8,
        bits: &BitVec,
    ) -> Result<(), GateError> {
        self.gate_tx
            .send(GateMessage {
                gate_id: gate_id.0,
                seq,
                payload: bits.as_raw_slice().to_vec(),
            })
            .await?;
        Ok(())
    }

    pub(crate) async fn send_ints_message<T: Ring>(
        &self,
        gate_id: GateId,
        seq: u8,
        ints: &[T],
    ) -> Result<(), GateError> {
        self.gate_tx
            .send(GateMessage {
                gate_id: gate_id.0,
                seq,
                payload: ring_to_bytes(ints),
            })
            .await?;
        Ok(())
    }

    pub(crate) fn register_for_bits_message(
        &self,
        gate_id: GateId,
        seq: u8,
        num_bits: usize,
    ) -> BitsFuture {
        BitsFuture::new(self.registry.register(gate_id.0, seq), num_bits)
    }

    pub(crate) fn register_for_ints_message<T: Ring>(
        &self,
        gate_id: GateId,
        seq: u8,
        len: usize,
    ) -> IntsFuture<T> {
        IntsFuture::new(self.registry.register(gate_id.0, seq), len)
    }
}

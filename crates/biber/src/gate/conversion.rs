//! Bit-to-arithmetic conversions and Hamming weight.
//!
//! All three gates share one trick: an ACOT with the receiver's choice bits
//! drawn from its Boolean secret share arithmetizes the XOR sharing, and
//! online the identity `p + (1 − 2p)·s` (p the public bit, s the
//! arithmetized secret share) produces additive shares of the plaintext
//! bit. B2A keeps the per-wire terms shifted by the wire index, the Hamming
//! weight sums them unshifted.

use crate::comm::IntsFuture;
use crate::common::{add_assign_vec, BitVec};
use crate::core::Core;
use crate::errors::GateError;
use crate::gate::{Gate, GateId};
use crate::ring::Ring;
use crate::wire::{ArithmeticBeavyWire, BooleanBeavyWire};
use async_trait::async_trait;
use biber_ot::extension::{AcotReceiver, AcotSender};
use std::sync::Arc;
use tracing::trace;

enum ConversionOt<T: Ring> {
    Sender(AcotSender<T>),
    Receiver(AcotReceiver<T>),
}

impl<T: Ring> ConversionOt<T> {
    fn register(core: &Core, num_ots: usize) -> Self {
        if core.my_id == 0 {
            ConversionOt::Sender(core.ot.register_send_acot::<T>(num_ots, 1))
        } else {
            ConversionOt::Receiver(core.ot.register_receive_acot::<T>(num_ots, 1))
        }
    }

    /// Arithmetizes the XOR sharing given by `secret_bits`: the returned
    /// vectors satisfy `s_0[i] + s_1[i] = bit_0[i] ⊕ bit_1[i]`.
    async fn arithmetize(&mut self, secret_bits: &BitVec) -> Result<Vec<T>, GateError> {
        match self {
            ConversionOt::Sender(sender) => {
                let correlations: Vec<T> =
                    secret_bits.iter().by_vals().map(T::from_bool).collect();
                sender.set_correlations(correlations);
                sender.send_messages().await?;
                sender.compute_outputs().await?;
                Ok(secret_bits
                    .iter()
                    .by_vals()
                    .zip(sender.outputs())
                    .map(|(bit, s)| T::from_bool(bit).wrapping_add(s).wrapping_add(s))
                    .collect())
            }
            ConversionOt::Receiver(receiver) => {
                receiver.set_choices(secret_bits.clone());
                receiver.send_corrections().await?;
                receiver.compute_outputs().await?;
                Ok(secret_bits
                    .iter()
                    .by_vals()
                    .zip(receiver.outputs())
                    .map(|(bit, r)| T::from_bool(bit).wrapping_sub(r).wrapping_sub(r))
                    .collect())
            }
        }
    }
}

/// Online half of the arithmetization: `p + (1 − 2p)·s` at the is-my-job
/// party, `(1 − 2p)·s` at the other.
fn combine<T: Ring>(public_bit: bool, arithmetized_secret: T, my_job: bool) -> T {
    let signed = if public_bit {
        arithmetized_secret.wrapping_neg()
    } else {
        arithmetized_secret
    };
    if my_job && public_bit {
        signed.wrapping_add(&T::ONE)
    } else {
        signed
    }
}

/// Converts a single Boolean wire into an arithmetic wire carrying the bit.
pub struct BooleanBitToArithmeticBeavyGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<BooleanBeavyWire>,
    output: Arc<ArithmeticBeavyWire<T>>,
    ot: ConversionOt<T>,
    share_future: Option<IntsFuture<T>>,
    arithmetized_secret_share: Vec<T>,
    output_secret: Vec<T>,
}

impl<T: Ring> BooleanBitToArithmeticBeavyGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<BooleanBeavyWire>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        let num_simd = input.num_simd();
        let ot = ConversionOt::register(&core, num_simd);
        let share_future = Some(core.register_for_ints_message(gate_id, 0, num_simd));
        Self {
            gate_id,
            core,
            input,
            output,
            ot,
            share_future,
            arithmetized_secret_share: Vec::new(),
            output_secret: Vec::new(),
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for BooleanBitToArithmeticBeavyGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "bit-to-arithmetic setup");
        let num_simd = self.input.num_simd();
        self.output_secret = self.core.random_ring_vec::<T>(num_simd);
        self.output.set_setup_ready(self.output_secret.clone());

        let secret_share = self.input.wait_setup().await;
        self.arithmetized_secret_share = self.ot.arithmetize(&secret_share).await?;
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let my_job = self.core.is_my_job(self.gate_id);
        let public_share = self.input.wait_online().await;
        let mut tmp: Vec<T> = public_share
            .iter()
            .by_vals()
            .zip(&self.arithmetized_secret_share)
            .zip(&self.output_secret)
            .map(|((p, s), lambda)| combine(p, *s, my_job).wrapping_add(lambda))
            .collect();
        self.core.send_ints_message(self.gate_id, 0, &tmp).await?;
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut tmp, &other_share);
        self.output.set_online_ready(tmp);
        Ok(())
    }
}

/// Converts `T::BITS` Boolean wires (little-endian) into one arithmetic
/// wire carrying the composed value.
pub struct BooleanToArithmeticBeavyGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    inputs: Vec<Arc<BooleanBeavyWire>>,
    output: Arc<ArithmeticBeavyWire<T>>,
    ot: ConversionOt<T>,
    share_future: Option<IntsFuture<T>>,
    arithmetized_secret_share: Vec<T>,
    output_secret: Vec<T>,
}

impl<T: Ring> BooleanToArithmeticBeavyGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs: Vec<Arc<BooleanBeavyWire>>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Result<Self, GateError> {
        if inputs.len() != T::BITS {
            return Err(GateError::Construction(
                "number of wires must equal the ring bit width",
            ));
        }
        let num_simd = output.num_simd();
        let ot = ConversionOt::register(&core, T::BITS * num_simd);
        let share_future = Some(core.register_for_ints_message(gate_id, 0, num_simd));
        Ok(Self {
            gate_id,
            core,
            inputs,
            output,
            ot,
            share_future,
            arithmetized_secret_share: Vec::new(),
            output_secret: Vec::new(),
        })
    }
}

#[async_trait]
impl<T: Ring> Gate for BooleanToArithmeticBeavyGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        let num_simd = self.output.num_simd();
        self.output_secret = self.core.random_ring_vec::<T>(num_simd);
        self.output.set_setup_ready(self.output_secret.clone());

        let mut secret_bits = BitVec::with_capacity(self.inputs.len() * num_simd);
        for wire in &self.inputs {
            secret_bits.extend_from_bitslice(&wire.wait_setup().await);
        }
        self.arithmetized_secret_share = self.ot.arithmetize(&secret_bits).await?;
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.output.num_simd();
        let my_job = self.core.is_my_job(self.gate_id);
        let mut tmp = self.output_secret.clone();
        for (wire_i, wire) in self.inputs.iter().enumerate() {
            let public_share = wire.wait_online().await;
            for (simd_j, p) in public_share.iter().by_vals().enumerate() {
                let s = self.arithmetized_secret_share[wire_i * num_simd + simd_j];
                let term = combine(p, s, my_job) << wire_i;
                tmp[simd_j] = tmp[simd_j].wrapping_add(&term);
            }
        }
        self.core.send_ints_message(self.gate_id, 0, &tmp).await?;
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut tmp, &other_share);
        self.output.set_online_ready(tmp);
        Ok(())
    }
}

/// Hamming weight: sums the plaintext bits of `w` Boolean wires into one
/// arithmetic wire. Also backs the COUNT operation.
pub struct BooleanBeavyHamGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    inputs: Vec<Arc<BooleanBeavyWire>>,
    output: Arc<ArithmeticBeavyWire<T>>,
    ot: ConversionOt<T>,
    share_future: Option<IntsFuture<T>>,
    arithmetized_secret_share: Vec<T>,
    output_secret: Vec<T>,
}

impl<T: Ring> BooleanBeavyHamGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs: Vec<Arc<BooleanBeavyWire>>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        let num_simd = output.num_simd();
        let ot = ConversionOt::register(&core, inputs.len() * num_simd);
        let share_future = Some(core.register_for_ints_message(gate_id, 0, num_simd));
        Self {
            gate_id,
            core,
            inputs,
            output,
            ot,
            share_future,
            arithmetized_secret_share: Vec::new(),
            output_secret: Vec::new(),
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for BooleanBeavyHamGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "hamming weight setup");
        let num_simd = self.output.num_simd();
        self.output_secret = self.core.random_ring_vec::<T>(num_simd);
        self.output.set_setup_ready(self.output_secret.clone());

        let mut secret_bits = BitVec::with_capacity(self.inputs.len() * num_simd);
        for wire in &self.inputs {
            secret_bits.extend_from_bitslice(&wire.wait_setup().await);
        }
        self.arithmetized_secret_share = self.ot.arithmetize(&secret_bits).await?;
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.output.num_simd();
        let my_job = self.core.is_my_job(self.gate_id);
        let mut tmp = self.output_secret.clone();
        for (wire_i, wire) in self.inputs.iter().enumerate() {
            let public_share = wire.wait_online().await;
            for (simd_j, p) in public_share.iter().by_vals().enumerate() {
                let s = self.arithmetized_secret_share[wire_i * num_simd + simd_j];
                tmp[simd_j] = tmp[simd_j].wrapping_add(&combine(p, s, my_job));
            }
        }
        self.core.send_ints_message(self.gate_id, 0, &tmp).await?;
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut tmp, &other_share);
        self.output.set_online_ready(tmp);
        Ok(())
    }
}

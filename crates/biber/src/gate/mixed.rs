//! Mixed-domain gates: bit × integer multiplication and the
//! equality-expansion gate.

use crate::arith::{BitIntegerMultiplicationBitSide, BitIntegerMultiplicationIntSide};
use crate::comm::{BitsFuture, IntsFuture};
use crate::common::{add_assign_vec, and, xor_assign, BitVec};
use crate::core::Core;
use crate::errors::GateError;
use crate::gate::{Gate, GateId};
use crate::ring::Ring;
use crate::wire::{ArithmeticBeavyWire, BooleanBeavyWire};
use async_trait::async_trait;
use biber_ot::extension::{XcotBitReceiver, XcotBitSender};
use std::sync::Arc;
use tracing::trace;

/// Multiplies a Boolean wire (b ∈ {0,1}) with an arithmetic wire.
///
/// Setup uses the two-OT variant: the is-my-job party packs two inputs per
/// slot into its int-side session, producing arithmetic shares of both
/// `λ_b` and `λ_b · λ_n` from just two vector multiplications.
pub struct BooleanXArithmeticBeavyMulGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input_bool: Arc<BooleanBeavyWire>,
    input_arith: Arc<ArithmeticBeavyWire<T>>,
    output: Arc<ArithmeticBeavyWire<T>>,
    mult_bit_side: BitIntegerMultiplicationBitSide<T>,
    mult_int_side: BitIntegerMultiplicationIntSide<T>,
    share_future: Option<IntsFuture<T>>,
    int_secret_share: Vec<T>,
    delta_b_share: Vec<T>,
    delta_b_x_delta_n_share: Vec<T>,
    output_secret: Vec<T>,
}

impl<T: Ring> BooleanXArithmeticBeavyMulGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_bool: Arc<BooleanBeavyWire>,
        input_arith: Arc<ArithmeticBeavyWire<T>>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        let num_simd = input_arith.num_simd();
        let arith = core.arith();
        let (mult_int_side, mult_bit_side) = if core.is_my_job(gate_id) {
            (
                arith.register_bit_integer_multiplication_int_side::<T>(num_simd, 2),
                arith.register_bit_integer_multiplication_bit_side::<T>(num_simd, 1),
            )
        } else {
            (
                arith.register_bit_integer_multiplication_int_side::<T>(num_simd, 1),
                arith.register_bit_integer_multiplication_bit_side::<T>(num_simd, 2),
            )
        };
        let share_future = Some(core.register_for_ints_message(gate_id, 0, num_simd));
        Self {
            gate_id,
            core,
            input_bool,
            input_arith,
            output,
            mult_bit_side,
            mult_int_side,
            share_future,
            int_secret_share: Vec::new(),
            delta_b_share: Vec::new(),
            delta_b_x_delta_n_share: Vec::new(),
            output_secret: Vec::new(),
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for BooleanXArithmeticBeavyMulGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "bit x arithmetic MUL setup");
        let num_simd = self.input_arith.num_simd();
        let my_job = self.core.is_my_job(self.gate_id);

        self.output_secret = self.core.random_ring_vec::<T>(num_simd);
        self.output.set_setup_ready(self.output_secret.clone());

        self.int_secret_share = self.input_arith.wait_setup().await;
        let bit_secret_share = self.input_bool.wait_setup().await;
        let bit_share_as_ints: Vec<T> = bit_secret_share
            .iter()
            .by_vals()
            .map(T::from_bool)
            .collect();

        self.mult_bit_side.set_inputs(&bit_secret_share).await?;

        // n − 2·b·n for the packed int-side inputs
        let folded: Vec<T> = self
            .int_secret_share
            .iter()
            .zip(&bit_share_as_ints)
            .map(|(n, b)| {
                let bn = b.wrapping_mul(n);
                n.wrapping_sub(&bn).wrapping_sub(&bn)
            })
            .collect();
        if my_job {
            let mut mult_inputs = Vec::with_capacity(2 * num_simd);
            for (b, f) in bit_share_as_ints.iter().zip(&folded) {
                mult_inputs.push(*b);
                mult_inputs.push(*f);
            }
            self.mult_int_side.set_inputs(mult_inputs).await?;
        } else {
            self.mult_int_side.set_inputs(folded).await?;
        }

        self.mult_bit_side.compute_outputs().await?;
        self.mult_int_side.compute_outputs().await?;
        let bit_side_out = self.mult_bit_side.get_outputs();
        let int_side_out = self.mult_int_side.get_outputs();

        // compute [λ_b]^A and [λ_b · λ_n]^A
        self.delta_b_share = Vec::with_capacity(num_simd);
        self.delta_b_x_delta_n_share = Vec::with_capacity(num_simd);
        for simd_j in 0..num_simd {
            let b = bit_share_as_ints[simd_j];
            let n = self.int_secret_share[simd_j];
            // the packed session carries two components per slot, the
            // other one component
            let (singles, packed) = if my_job {
                (&bit_side_out, &int_side_out)
            } else {
                (&int_side_out, &bit_side_out)
            };
            let b_cross = packed[2 * simd_j];
            self.delta_b_share
                .push(b.wrapping_sub(&b_cross).wrapping_sub(&b_cross));
            self.delta_b_x_delta_n_share.push(
                b.wrapping_mul(&n)
                    .wrapping_add(&packed[2 * simd_j + 1])
                    .wrapping_add(&singles[simd_j]),
            );
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.input_arith.num_simd();
        let my_job = self.core.is_my_job(self.gate_id);
        let bit_public = self.input_bool.wait_online().await;
        let int_public = self.input_arith.wait_online().await;

        let mut pshare = Vec::with_capacity(num_simd);
        for simd_j in 0..num_simd {
            let delta_b = T::from_bool(bit_public[simd_j]);
            let delta_n = int_public[simd_j];
            // Δ_n − 2·Δ_b·Δ_n
            let dbn = delta_b.wrapping_mul(&delta_n);
            let folded_public = delta_n.wrapping_sub(&dbn).wrapping_sub(&dbn);
            // (1 − 2·Δ_b)·[λ_b λ_n]^A
            let signed_bn = if bit_public[simd_j] {
                self.delta_b_x_delta_n_share[simd_j].wrapping_neg()
            } else {
                self.delta_b_x_delta_n_share[simd_j]
            };
            let mut share = self.delta_b_share[simd_j]
                .wrapping_mul(&folded_public)
                .wrapping_sub(&delta_b.wrapping_mul(&self.int_secret_share[simd_j]))
                .wrapping_sub(&signed_bn)
                .wrapping_add(&self.output_secret[simd_j]);
            if my_job {
                share = share.wrapping_add(&dbn);
            }
            pshare.push(share);
        }

        self.core.send_ints_message(self.gate_id, 0, &pshare).await?;
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut pshare, &other_share);
        self.output.set_online_ready(pshare);
        Ok(())
    }
}

/// Equality by indicator expansion: each party expands its value on the
/// input wire into a one-hot vector modulo `vec_size`, the vectors are
/// exchanged and their dot product (one XCOT round prepared in setup)
/// yields a Boolean sharing of the equality bit.
///
/// The input wire is expected to carry per-party values in its public-share
/// field (e.g. the output of a MULNI gate); the indicator vectors
/// themselves are exchanged in the clear.
pub struct ArithmeticBeavyEqExpGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<ArithmeticBeavyWire<T>>,
    output: Arc<BooleanBeavyWire>,
    vec_size: usize,
    ot_sender: XcotBitSender,
    ot_receiver: XcotBitReceiver,
    indicator_future: Option<BitsFuture>,
    share_future: Option<BitsFuture>,
    delta_ab_share: BitVec,
    output_secret: BitVec,
}

impl<T: Ring> ArithmeticBeavyEqExpGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticBeavyWire<T>>,
        output: Arc<BooleanBeavyWire>,
        vec_size: usize,
    ) -> Result<Self, GateError> {
        if vec_size == 0 {
            return Err(GateError::Construction("expansion size must be positive"));
        }
        let num_simd = input.num_simd();
        let num_bits = vec_size * num_simd;
        let indicator_future = Some(core.register_for_bits_message(gate_id, 0, num_bits));
        let share_future = Some(core.register_for_bits_message(gate_id, 1, num_simd));
        let ot_sender = core.ot.register_send_xcot_bit(num_bits);
        let ot_receiver = core.ot.register_receive_xcot_bit(num_bits);
        Ok(Self {
            gate_id,
            core,
            input,
            output,
            vec_size,
            ot_sender,
            ot_receiver,
            indicator_future,
            share_future,
            delta_ab_share: BitVec::new(),
            output_secret: BitVec::new(),
        })
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavyEqExpGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "equality expansion setup");
        let num_simd = self.input.num_simd();
        let num_bits = self.vec_size * num_simd;

        // the expansion carries no secret mask; derandomize the OTs with
        // all-zero choices so the batch is consumed exactly once
        let zeros = BitVec::repeat(false, num_bits);
        let mut delta_ab_share = BitVec::repeat(false, num_bits);
        self.ot_receiver.set_choices(zeros.clone());
        self.ot_receiver.send_corrections().await?;
        self.ot_sender.set_correlations(zeros);
        self.ot_sender.send_messages().await?;
        self.ot_receiver.compute_outputs().await?;
        self.ot_sender.compute_outputs().await?;
        xor_assign(&mut delta_ab_share, self.ot_sender.outputs());
        xor_assign(&mut delta_ab_share, self.ot_receiver.outputs());
        self.delta_ab_share = delta_ab_share;

        self.output_secret = self.core.random_bits(num_simd);
        self.output.set_setup_ready(self.output_secret.clone());
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.input.num_simd();
        let values = self.input.wait_online().await;

        let mut indicator = BitVec::repeat(false, self.vec_size * num_simd);
        for (simd_i, value) in values.iter().enumerate() {
            let pos = value.as_usize() % self.vec_size;
            indicator.set(pos * num_simd + simd_i, true);
        }
        self.core
            .send_bits_message(self.gate_id, 0, &indicator)
            .await?;
        let other_indicator = self
            .indicator_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        let (delta_a, delta_b) = if self.core.my_id == 0 {
            (indicator, other_indicator)
        } else {
            (other_indicator, indicator)
        };

        let mut terms = self.delta_ab_share.clone();
        if self.core.my_id == 0 {
            xor_assign(&mut terms, &and(delta_a.clone(), &delta_b));
        }

        // fold the positionwise products into one bit per SIMD slot
        let mut delta_y_share = self.output_secret.clone();
        for pos in 0..self.vec_size {
            let chunk = terms[pos * num_simd..(pos + 1) * num_simd].to_bitvec();
            xor_assign(&mut delta_y_share, &chunk);
        }

        self.core
            .send_bits_message(self.gate_id, 1, &delta_y_share)
            .await?;
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        xor_assign(&mut delta_y_share, &other_share);
        self.output.set_online_ready(delta_y_share);
        Ok(())
    }
}

//! Boolean BEAVY gates.
//!
//! XOR and INV are entirely local; AND consumes one XCOTBit batch per
//! direction during setup and exchanges a single public-share message
//! online. DOT folds the per-wire AND terms into one output wire.

use crate::comm::BitsFuture;
use crate::common::{and, xor, xor_assign, BitVec};
use crate::core::Core;
use crate::errors::GateError;
use crate::gate::{Gate, GateId, OutputFuture};
use crate::wire::BooleanBeavyWire;
use crate::ALL_PARTIES;
use async_trait::async_trait;
use biber_ot::extension::{XcotBitReceiver, XcotBitSender};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::trace;

fn count_bits(wires: &[Arc<BooleanBeavyWire>]) -> usize {
    wires.iter().map(|w| w.num_simd()).sum()
}

/// Checks the invariants shared by all multi-wire gates: at least one wire
/// and a uniform SIMD width.
pub(crate) fn check_wire_vector(
    wires: &[Arc<BooleanBeavyWire>],
) -> Result<usize, GateError> {
    let first = wires
        .first()
        .ok_or(GateError::Construction("number of wires must be positive"))?;
    let num_simd = first.num_simd();
    if wires.iter().any(|w| w.num_simd() != num_simd) {
        return Err(GateError::Construction(
            "number of SIMD values must be the same for all wires",
        ));
    }
    Ok(num_simd)
}

pub struct BooleanBeavyInputGateSender {
    gate_id: GateId,
    core: Arc<Core>,
    num_wires: usize,
    num_simd: usize,
    input_id: u64,
    input_rx: Option<oneshot::Receiver<Vec<BitVec>>>,
    outputs: Vec<Arc<BooleanBeavyWire>>,
    public_shares: Vec<BitVec>,
}

impl BooleanBeavyInputGateSender {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_id: u64,
        num_wires: usize,
        num_simd: usize,
        outputs: Vec<Arc<BooleanBeavyWire>>,
        input_rx: oneshot::Receiver<Vec<BitVec>>,
    ) -> Self {
        Self {
            gate_id,
            core,
            num_wires,
            num_simd,
            input_id,
            input_rx: Some(input_rx),
            outputs,
            public_shares: Vec::new(),
        }
    }
}

#[async_trait]
impl Gate for BooleanBeavyInputGateSender {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "boolean input sender setup");
        for wire_i in 0..self.num_wires {
            let secret = self.core.random_bits(self.num_simd);
            let mut public = secret.clone();
            let mask = self
                .core
                .base
                .my_randomness()
                .bits(self.input_id + wire_i as u64, self.num_simd);
            xor_assign(&mut public, &mask);
            self.outputs[wire_i].set_setup_ready(secret);
            self.public_shares.push(public);
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let inputs = self
            .input_rx
            .take()
            .expect("online evaluated twice")
            .await
            .map_err(|_| GateError::MissingInput)?;
        if inputs.len() != self.num_wires
            || inputs.iter().any(|bits| bits.len() != self.num_simd)
        {
            return Err(GateError::InvalidInput);
        }
        let mut all_shares = BitVec::with_capacity(self.num_wires * self.num_simd);
        for (wire_i, input_bits) in inputs.iter().enumerate() {
            let mut public = std::mem::take(&mut self.public_shares[wire_i]);
            xor_assign(&mut public, input_bits);
            self.outputs[wire_i].set_online_ready(public.clone());
            all_shares.extend_from_bitslice(&public);
        }
        self.core
            .send_bits_message(self.gate_id, 0, &all_shares)
            .await
    }
}

pub struct BooleanBeavyInputGateReceiver {
    gate_id: GateId,
    core: Arc<Core>,
    num_wires: usize,
    num_simd: usize,
    input_id: u64,
    outputs: Vec<Arc<BooleanBeavyWire>>,
    public_share_future: Option<BitsFuture>,
}

impl BooleanBeavyInputGateReceiver {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_id: u64,
        num_wires: usize,
        num_simd: usize,
        outputs: Vec<Arc<BooleanBeavyWire>>,
    ) -> Self {
        let public_share_future =
            Some(core.register_for_bits_message(gate_id, 0, num_wires * num_simd));
        Self {
            gate_id,
            core,
            num_wires,
            num_simd,
            input_id,
            outputs,
            public_share_future,
        }
    }
}

#[async_trait]
impl Gate for BooleanBeavyInputGateReceiver {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "boolean input receiver setup");
        for wire_i in 0..self.num_wires {
            let secret = self
                .core
                .base
                .their_randomness()
                .bits(self.input_id + wire_i as u64, self.num_simd);
            self.outputs[wire_i].set_setup_ready(secret);
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let public_shares = self
            .public_share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        for (wire_i, wire) in self.outputs.iter().enumerate() {
            let share = public_shares[wire_i * self.num_simd..(wire_i + 1) * self.num_simd]
                .to_bitvec();
            wire.set_online_ready(share);
        }
        Ok(())
    }
}

pub struct BooleanBeavyOutputGate {
    gate_id: GateId,
    core: Arc<Core>,
    inputs: Vec<Arc<BooleanBeavyWire>>,
    output_owner: usize,
    share_future: Option<BitsFuture>,
    promise: Option<oneshot::Sender<Vec<BitVec>>>,
    my_secret_share: BitVec,
}

impl BooleanBeavyOutputGate {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs: Vec<Arc<BooleanBeavyWire>>,
        output_owner: usize,
    ) -> (Self, Option<OutputFuture<Vec<BitVec>>>) {
        let num_bits = count_bits(&inputs);
        let mine = output_owner == ALL_PARTIES || output_owner == core.my_id;
        let share_future = mine.then(|| core.register_for_bits_message(gate_id, 0, num_bits));
        let (promise, future) = if mine {
            let (tx, fut) = OutputFuture::new();
            (Some(tx), Some(fut))
        } else {
            (None, None)
        };
        (
            Self {
                gate_id,
                core,
                inputs,
                output_owner,
                share_future,
                promise,
                my_secret_share: BitVec::new(),
            },
            future,
        )
    }
}

#[async_trait]
impl Gate for BooleanBeavyOutputGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        for wire in &self.inputs {
            let secret = wire.wait_setup().await;
            self.my_secret_share.extend_from_bitslice(&secret);
        }
        if self.output_owner != self.core.my_id {
            self.core
                .send_bits_message(self.gate_id, 0, &self.my_secret_share)
                .await?;
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let mine = self.output_owner == ALL_PARTIES || self.output_owner == self.core.my_id;
        if !mine {
            return Ok(());
        }
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        xor_assign(&mut self.my_secret_share, &other_share);
        let mut outputs = Vec::with_capacity(self.inputs.len());
        let mut bit_offset = 0;
        for wire in &self.inputs {
            let num_simd = wire.num_simd();
            let mut plain = self.my_secret_share[bit_offset..bit_offset + num_simd].to_bitvec();
            let public = wire.wait_online().await;
            xor_assign(&mut plain, &public);
            outputs.push(plain);
            bit_offset += num_simd;
        }
        if let Some(promise) = self.promise.take() {
            // receiver may have been dropped if the caller lost interest
            let _ = promise.send(outputs);
        }
        Ok(())
    }
}

pub struct BooleanBeavyXorGate {
    gate_id: GateId,
    inputs_a: Vec<Arc<BooleanBeavyWire>>,
    inputs_b: Vec<Arc<BooleanBeavyWire>>,
    outputs: Vec<Arc<BooleanBeavyWire>>,
}

impl BooleanBeavyXorGate {
    pub(crate) fn new(
        gate_id: GateId,
        inputs_a: Vec<Arc<BooleanBeavyWire>>,
        inputs_b: Vec<Arc<BooleanBeavyWire>>,
        outputs: Vec<Arc<BooleanBeavyWire>>,
    ) -> Self {
        Self {
            gate_id,
            inputs_a,
            inputs_b,
            outputs,
        }
    }
}

#[async_trait]
impl Gate for BooleanBeavyXorGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        for ((wire_a, wire_b), wire_o) in self
            .inputs_a
            .iter()
            .zip(&self.inputs_b)
            .zip(&self.outputs)
        {
            let secret = xor(wire_a.wait_setup().await, &wire_b.wait_setup().await);
            wire_o.set_setup_ready(secret);
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        for ((wire_a, wire_b), wire_o) in self
            .inputs_a
            .iter()
            .zip(&self.inputs_b)
            .zip(&self.outputs)
        {
            let public = xor(wire_a.wait_online().await, &wire_b.wait_online().await);
            wire_o.set_online_ready(public);
        }
        Ok(())
    }
}

/// Inverts the plaintext by flipping the secret share at exactly one party;
/// the other party forwards the input wires unchanged.
pub struct BooleanBeavyInvGate {
    gate_id: GateId,
    inputs: Vec<Arc<BooleanBeavyWire>>,
    outputs: Vec<Arc<BooleanBeavyWire>>,
    is_my_job: bool,
}

impl BooleanBeavyInvGate {
    pub(crate) fn new(
        gate_id: GateId,
        inputs: Vec<Arc<BooleanBeavyWire>>,
        outputs: Vec<Arc<BooleanBeavyWire>>,
        is_my_job: bool,
    ) -> Self {
        Self {
            gate_id,
            inputs,
            outputs,
            is_my_job,
        }
    }
}

#[async_trait]
impl Gate for BooleanBeavyInvGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        self.is_my_job
    }

    fn need_online(&self) -> bool {
        self.is_my_job
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        for (wire_in, wire_o) in self.inputs.iter().zip(&self.outputs) {
            let mut secret = !wire_in.wait_setup().await;
            secret.truncate(wire_in.num_simd());
            wire_o.set_setup_ready(secret);
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        for (wire_in, wire_o) in self.inputs.iter().zip(&self.outputs) {
            wire_o.set_online_ready(wire_in.wait_online().await);
        }
        Ok(())
    }
}

pub struct BooleanBeavyAndGate {
    gate_id: GateId,
    core: Arc<Core>,
    inputs_a: Vec<Arc<BooleanBeavyWire>>,
    inputs_b: Vec<Arc<BooleanBeavyWire>>,
    outputs: Vec<Arc<BooleanBeavyWire>>,
    ot_sender: XcotBitSender,
    ot_receiver: XcotBitReceiver,
    share_future: Option<BitsFuture>,
    delta_a_share: BitVec,
    delta_b_share: BitVec,
    delta_y_share: BitVec,
}

impl BooleanBeavyAndGate {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs_a: Vec<Arc<BooleanBeavyWire>>,
        inputs_b: Vec<Arc<BooleanBeavyWire>>,
        outputs: Vec<Arc<BooleanBeavyWire>>,
    ) -> Self {
        let num_bits = count_bits(&inputs_a);
        let share_future = Some(core.register_for_bits_message(gate_id, 0, num_bits));
        let ot_sender = core.ot.register_send_xcot_bit(num_bits);
        let ot_receiver = core.ot.register_receive_xcot_bit(num_bits);
        Self {
            gate_id,
            core,
            inputs_a,
            inputs_b,
            outputs,
            ot_sender,
            ot_receiver,
            share_future,
            delta_a_share: BitVec::new(),
            delta_b_share: BitVec::new(),
            delta_y_share: BitVec::new(),
        }
    }
}

#[async_trait]
impl Gate for BooleanBeavyAndGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "boolean AND setup");
        for wire_o in &self.outputs {
            wire_o.set_setup_ready(self.core.random_bits(wire_o.num_simd()));
        }

        for ((wire_a, wire_b), wire_o) in self
            .inputs_a
            .iter()
            .zip(&self.inputs_b)
            .zip(&self.outputs)
        {
            self.delta_a_share
                .extend_from_bitslice(&wire_a.wait_setup().await);
            self.delta_b_share
                .extend_from_bitslice(&wire_b.wait_setup().await);
            self.delta_y_share
                .extend_from_bitslice(&wire_o.wait_setup().await);
        }

        let mut delta_ab_share = and(self.delta_a_share.clone(), &self.delta_b_share);

        self.ot_receiver.set_choices(self.delta_a_share.clone());
        self.ot_receiver.send_corrections().await?;
        self.ot_sender.set_correlations(self.delta_b_share.clone());
        self.ot_sender.send_messages().await?;
        self.ot_receiver.compute_outputs().await?;
        self.ot_sender.compute_outputs().await?;
        xor_assign(&mut delta_ab_share, self.ot_sender.outputs());
        xor_assign(&mut delta_ab_share, self.ot_receiver.outputs());
        xor_assign(&mut self.delta_y_share, &delta_ab_share);
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.inputs_a[0].num_simd();
        let mut delta_a = BitVec::with_capacity(self.delta_a_share.len());
        let mut delta_b = BitVec::with_capacity(self.delta_b_share.len());
        for (wire_a, wire_b) in self.inputs_a.iter().zip(&self.inputs_b) {
            delta_a.extend_from_bitslice(&wire_a.wait_online().await);
            delta_b.extend_from_bitslice(&wire_b.wait_online().await);
        }

        xor_assign(
            &mut self.delta_y_share,
            &and(delta_a.clone(), &self.delta_b_share),
        );
        xor_assign(
            &mut self.delta_y_share,
            &and(delta_b.clone(), &self.delta_a_share),
        );
        if self.core.is_my_job(self.gate_id) {
            xor_assign(&mut self.delta_y_share, &and(delta_a, &delta_b));
        }

        self.core
            .send_bits_message(self.gate_id, 0, &self.delta_y_share)
            .await?;
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        xor_assign(&mut self.delta_y_share, &other_share);

        for (wire_i, wire_o) in self.outputs.iter().enumerate() {
            let share = self.delta_y_share[wire_i * num_simd..(wire_i + 1) * num_simd]
                .to_bitvec();
            wire_o.set_online_ready(share);
        }
        Ok(())
    }
}

/// Dot product of two wire vectors: one Boolean output wire carrying
/// `⊕_i a_i ∧ b_i` per SIMD slot.
pub struct BooleanBeavyDotGate {
    gate_id: GateId,
    core: Arc<Core>,
    inputs_a: Vec<Arc<BooleanBeavyWire>>,
    inputs_b: Vec<Arc<BooleanBeavyWire>>,
    output: Arc<BooleanBeavyWire>,
    ot_sender: XcotBitSender,
    ot_receiver: XcotBitReceiver,
    share_future: Option<BitsFuture>,
    delta_a_share: BitVec,
    delta_b_share: BitVec,
    delta_ab_share: BitVec,
    output_secret: BitVec,
}

impl BooleanBeavyDotGate {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs_a: Vec<Arc<BooleanBeavyWire>>,
        inputs_b: Vec<Arc<BooleanBeavyWire>>,
        output: Arc<BooleanBeavyWire>,
    ) -> Self {
        let num_bits = count_bits(&inputs_a);
        let num_simd = output.num_simd();
        let share_future = Some(core.register_for_bits_message(gate_id, 0, num_simd));
        let ot_sender = core.ot.register_send_xcot_bit(num_bits);
        let ot_receiver = core.ot.register_receive_xcot_bit(num_bits);
        Self {
            gate_id,
            core,
            inputs_a,
            inputs_b,
            output,
            ot_sender,
            ot_receiver,
            share_future,
            delta_a_share: BitVec::new(),
            delta_b_share: BitVec::new(),
            delta_ab_share: BitVec::new(),
            output_secret: BitVec::new(),
        }
    }
}

#[async_trait]
impl Gate for BooleanBeavyDotGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        self.output_secret = self.core.random_bits(self.output.num_simd());
        self.output.set_setup_ready(self.output_secret.clone());

        for (wire_a, wire_b) in self.inputs_a.iter().zip(&self.inputs_b) {
            self.delta_a_share
                .extend_from_bitslice(&wire_a.wait_setup().await);
            self.delta_b_share
                .extend_from_bitslice(&wire_b.wait_setup().await);
        }

        let mut delta_ab_share = and(self.delta_a_share.clone(), &self.delta_b_share);
        self.ot_receiver.set_choices(self.delta_a_share.clone());
        self.ot_receiver.send_corrections().await?;
        self.ot_sender.set_correlations(self.delta_b_share.clone());
        self.ot_sender.send_messages().await?;
        self.ot_receiver.compute_outputs().await?;
        self.ot_sender.compute_outputs().await?;
        xor_assign(&mut delta_ab_share, self.ot_sender.outputs());
        xor_assign(&mut delta_ab_share, self.ot_receiver.outputs());
        self.delta_ab_share = delta_ab_share;
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.output.num_simd();
        let mut delta_a = BitVec::with_capacity(self.delta_a_share.len());
        let mut delta_b = BitVec::with_capacity(self.delta_b_share.len());
        for (wire_a, wire_b) in self.inputs_a.iter().zip(&self.inputs_b) {
            delta_a.extend_from_bitslice(&wire_a.wait_online().await);
            delta_b.extend_from_bitslice(&wire_b.wait_online().await);
        }

        let mut terms = self.delta_ab_share.clone();
        xor_assign(&mut terms, &and(delta_a.clone(), &self.delta_b_share));
        xor_assign(&mut terms, &and(delta_b.clone(), &self.delta_a_share));
        if self.core.is_my_job(self.gate_id) {
            xor_assign(&mut terms, &and(delta_a, &delta_b));
        }

        let mut delta_y_share = self.output_secret.clone();
        for wire_i in 0..self.inputs_a.len() {
            let chunk = terms[wire_i * num_simd..(wire_i + 1) * num_simd].to_bitvec();
            xor_assign(&mut delta_y_share, &chunk);
        }

        self.core
            .send_bits_message(self.gate_id, 0, &delta_y_share)
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

//! GMW-style gates: plain additive/XOR sharing with a single online phase.
//!
//! Nonlinear gates consume pre-generated correlated randomness (Beaver
//! triples, square pairs, shared bits) reserved at construction time from
//! the pool providers. Conversions to and from the BEAVY sharing bridge the
//! two wire families: towards GMW they are local, towards BEAVY they cost
//! one resharing round.

use crate::comm::{BitsFuture, IntsFuture};
use crate::common::{
    add_assign_vec, add_vec, and, mul_vec, neg_vec, sub_vec, xor, xor_assign, BitVec,
};
use crate::core::Core;
use crate::errors::GateError;
use crate::gate::{Gate, GateId, OutputFuture};
use crate::providers::{HasRingMts, HasRingSbs, HasRingSps, MtProvider, SbProvider, SpProvider};
use crate::ring::Ring;
use crate::wire::{ArithmeticBeavyWire, ArithmeticGmwWire, BooleanBeavyWire, BooleanGmwWire};
use crate::ALL_PARTIES;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::trace;

// ---------- Boolean GMW ----------

pub struct BooleanGmwInputGateSender {
    gate_id: GateId,
    core: Arc<Core>,
    num_wires: usize,
    num_simd: usize,
    input_id: u64,
    input_rx: Option<oneshot::Receiver<Vec<BitVec>>>,
    outputs: Vec<Arc<BooleanGmwWire>>,
}

impl BooleanGmwInputGateSender {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_id: u64,
        num_wires: usize,
        num_simd: usize,
        outputs: Vec<Arc<BooleanGmwWire>>,
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
        }
    }
}

#[async_trait]
impl Gate for BooleanGmwInputGateSender {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "gmw boolean input sender online");
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
        for (wire_i, input_bits) in inputs.iter().enumerate() {
            let mask = self
                .core
                .base
                .my_randomness()
                .bits(self.input_id + wire_i as u64, self.num_simd);
            self.outputs[wire_i].set_online_ready(xor(mask, input_bits));
        }
        Ok(())
    }
}

pub struct BooleanGmwInputGateReceiver {
    gate_id: GateId,
    core: Arc<Core>,
    num_wires: usize,
    num_simd: usize,
    input_id: u64,
    outputs: Vec<Arc<BooleanGmwWire>>,
}

impl BooleanGmwInputGateReceiver {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_id: u64,
        num_wires: usize,
        num_simd: usize,
        outputs: Vec<Arc<BooleanGmwWire>>,
    ) -> Self {
        Self {
            gate_id,
            core,
            num_wires,
            num_simd,
            input_id,
            outputs,
        }
    }
}

#[async_trait]
impl Gate for BooleanGmwInputGateReceiver {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        for wire_i in 0..self.num_wires {
            let share = self
                .core
                .base
                .their_randomness()
                .bits(self.input_id + wire_i as u64, self.num_simd);
            self.outputs[wire_i].set_online_ready(share);
        }
        Ok(())
    }
}

pub struct BooleanGmwOutputGate {
    gate_id: GateId,
    core: Arc<Core>,
    inputs: Vec<Arc<BooleanGmwWire>>,
    output_owner: usize,
    share_future: Option<BitsFuture>,
    promise: Option<oneshot::Sender<Vec<BitVec>>>,
}

impl BooleanGmwOutputGate {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs: Vec<Arc<BooleanGmwWire>>,
        output_owner: usize,
    ) -> (Self, Option<OutputFuture<Vec<BitVec>>>) {
        let num_bits: usize = inputs.iter().map(|w| w.num_simd()).sum();
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
            },
            future,
        )
    }
}

#[async_trait]
impl Gate for BooleanGmwOutputGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let mut my_share = BitVec::new();
        for wire in &self.inputs {
            my_share.extend_from_bitslice(&wire.wait_online().await);
        }
        if self.output_owner != self.core.my_id {
            self.core
                .send_bits_message(self.gate_id, 0, &my_share)
                .await?;
        }
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
        xor_assign(&mut my_share, &other_share);
        let mut outputs = Vec::with_capacity(self.inputs.len());
        let mut offset = 0;
        for wire in &self.inputs {
            outputs.push(my_share[offset..offset + wire.num_simd()].to_bitvec());
            offset += wire.num_simd();
        }
        if let Some(promise) = self.promise.take() {
            let _ = promise.send(outputs);
        }
        Ok(())
    }
}

pub struct BooleanGmwXorGate {
    gate_id: GateId,
    inputs_a: Vec<Arc<BooleanGmwWire>>,
    inputs_b: Vec<Arc<BooleanGmwWire>>,
    outputs: Vec<Arc<BooleanGmwWire>>,
}

impl BooleanGmwXorGate {
    pub(crate) fn new(
        gate_id: GateId,
        inputs_a: Vec<Arc<BooleanGmwWire>>,
        inputs_b: Vec<Arc<BooleanGmwWire>>,
        outputs: Vec<Arc<BooleanGmwWire>>,
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
impl Gate for BooleanGmwXorGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        for ((wire_a, wire_b), wire_o) in self
            .inputs_a
            .iter()
            .zip(&self.inputs_b)
            .zip(&self.outputs)
        {
            let share = xor(wire_a.wait_online().await, &wire_b.wait_online().await);
            wire_o.set_online_ready(share);
        }
        Ok(())
    }
}

pub struct BooleanGmwInvGate {
    gate_id: GateId,
    inputs: Vec<Arc<BooleanGmwWire>>,
    outputs: Vec<Arc<BooleanGmwWire>>,
    is_my_job: bool,
}

impl BooleanGmwInvGate {
    pub(crate) fn new(
        gate_id: GateId,
        inputs: Vec<Arc<BooleanGmwWire>>,
        outputs: Vec<Arc<BooleanGmwWire>>,
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
impl Gate for BooleanGmwInvGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    fn need_online(&self) -> bool {
        self.is_my_job
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        for (wire_in, wire_o) in self.inputs.iter().zip(&self.outputs) {
            let mut share = !wire_in.wait_online().await;
            share.truncate(wire_in.num_simd());
            wire_o.set_online_ready(share);
        }
        Ok(())
    }
}

pub struct BooleanGmwAndGate {
    gate_id: GateId,
    core: Arc<Core>,
    inputs_a: Vec<Arc<BooleanGmwWire>>,
    inputs_b: Vec<Arc<BooleanGmwWire>>,
    outputs: Vec<Arc<BooleanGmwWire>>,
    mt_offset: usize,
    num_bits: usize,
    de_future: Option<BitsFuture>,
}

impl BooleanGmwAndGate {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs_a: Vec<Arc<BooleanGmwWire>>,
        inputs_b: Vec<Arc<BooleanGmwWire>>,
        outputs: Vec<Arc<BooleanGmwWire>>,
    ) -> Self {
        let num_bits: usize = inputs_a.iter().map(|w| w.num_simd()).sum();
        let mt_offset = core.mt.request_bool_mts(num_bits);
        let de_future = Some(core.register_for_bits_message(gate_id, 0, 2 * num_bits));
        Self {
            gate_id,
            core,
            inputs_a,
            inputs_b,
            outputs,
            mt_offset,
            num_bits,
            de_future,
        }
    }
}

#[async_trait]
impl Gate for BooleanGmwAndGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "gmw AND online");
        let mut x = BitVec::with_capacity(self.num_bits);
        let mut y = BitVec::with_capacity(self.num_bits);
        for (wire_a, wire_b) in self.inputs_a.iter().zip(&self.inputs_b) {
            x.extend_from_bitslice(&wire_a.wait_online().await);
            y.extend_from_bitslice(&wire_b.wait_online().await);
        }

        let mts = self.core.mt.bool_mts(self.mt_offset, self.num_bits);
        let mut d = xor(x, &mts.a);
        let mut e = xor(y, &mts.b);
        let mut de_message = d.clone();
        de_message.extend_from_bitslice(&e);
        self.core
            .send_bits_message(self.gate_id, 0, &de_message)
            .await?;
        let other = self
            .de_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        xor_assign(&mut d, &other[..self.num_bits].to_bitvec());
        xor_assign(&mut e, &other[self.num_bits..].to_bitvec());

        let mut z = mts.c;
        xor_assign(&mut z, &and(d.clone(), &mts.b));
        xor_assign(&mut z, &and(e.clone(), &mts.a));
        if self.core.is_my_job(self.gate_id) {
            xor_assign(&mut z, &and(d, &e));
        }

        let mut offset = 0;
        for wire_o in &self.outputs {
            let share = z[offset..offset + wire_o.num_simd()].to_bitvec();
            wire_o.set_online_ready(share);
            offset += wire_o.num_simd();
        }
        Ok(())
    }
}

// ---------- Arithmetic GMW ----------

pub struct ArithmeticGmwInputGateSender<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    num_simd: usize,
    input_id: u64,
    input_rx: Option<oneshot::Receiver<Vec<T>>>,
    output: Arc<ArithmeticGmwWire<T>>,
}

impl<T: Ring> ArithmeticGmwInputGateSender<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_id: u64,
        num_simd: usize,
        output: Arc<ArithmeticGmwWire<T>>,
        input_rx: oneshot::Receiver<Vec<T>>,
    ) -> Self {
        Self {
            gate_id,
            core,
            num_simd,
            input_id,
            input_rx: Some(input_rx),
            output,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwInputGateSender<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let input = self
            .input_rx
            .take()
            .expect("online evaluated twice")
            .await
            .map_err(|_| GateError::MissingInput)?;
        if input.len() != self.num_simd {
            return Err(GateError::InvalidInput);
        }
        let mask = self
            .core
            .base
            .my_randomness()
            .ring_vec::<T>(self.input_id, self.num_simd);
        self.output.set_online_ready(sub_vec(&input, &mask));
        Ok(())
    }
}

pub struct ArithmeticGmwInputGateReceiver<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    num_simd: usize,
    input_id: u64,
    output: Arc<ArithmeticGmwWire<T>>,
}

impl<T: Ring> ArithmeticGmwInputGateReceiver<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_id: u64,
        num_simd: usize,
        output: Arc<ArithmeticGmwWire<T>>,
    ) -> Self {
        Self {
            gate_id,
            core,
            num_simd,
            input_id,
            output,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwInputGateReceiver<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let share = self
            .core
            .base
            .their_randomness()
            .ring_vec::<T>(self.input_id, self.num_simd);
        self.output.set_online_ready(share);
        Ok(())
    }
}

pub struct ArithmeticGmwOutputGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<ArithmeticGmwWire<T>>,
    output_owner: usize,
    share_future: Option<IntsFuture<T>>,
    promise: Option<oneshot::Sender<Vec<T>>>,
}

impl<T: Ring> ArithmeticGmwOutputGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticGmwWire<T>>,
        output_owner: usize,
    ) -> (Self, Option<OutputFuture<Vec<T>>>) {
        let mine = output_owner == ALL_PARTIES || output_owner == core.my_id;
        let share_future =
            mine.then(|| core.register_for_ints_message(gate_id, 0, input.num_simd()));
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
                input,
                output_owner,
                share_future,
                promise,
            },
            future,
        )
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwOutputGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let mut my_share = self.input.wait_online().await;
        if self.output_owner != self.core.my_id {
            self.core
                .send_ints_message(self.gate_id, 0, &my_share)
                .await?;
        }
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
        add_assign_vec(&mut my_share, &other_share);
        if let Some(promise) = self.promise.take() {
            let _ = promise.send(my_share);
        }
        Ok(())
    }
}

pub struct ArithmeticGmwAddGate<T: Ring> {
    gate_id: GateId,
    input_a: Arc<ArithmeticGmwWire<T>>,
    input_b: Arc<ArithmeticGmwWire<T>>,
    output: Arc<ArithmeticGmwWire<T>>,
}

impl<T: Ring> ArithmeticGmwAddGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        input_a: Arc<ArithmeticGmwWire<T>>,
        input_b: Arc<ArithmeticGmwWire<T>>,
        output: Arc<ArithmeticGmwWire<T>>,
    ) -> Self {
        Self {
            gate_id,
            input_a,
            input_b,
            output,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwAddGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let share = add_vec(
            &self.input_a.wait_online().await,
            &self.input_b.wait_online().await,
        );
        self.output.set_online_ready(share);
        Ok(())
    }
}

pub struct ArithmeticGmwNegGate<T: Ring> {
    gate_id: GateId,
    input: Arc<ArithmeticGmwWire<T>>,
    output: Arc<ArithmeticGmwWire<T>>,
}

impl<T: Ring> ArithmeticGmwNegGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        input: Arc<ArithmeticGmwWire<T>>,
        output: Arc<ArithmeticGmwWire<T>>,
    ) -> Self {
        Self {
            gate_id,
            input,
            output,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwNegGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let share = neg_vec(&self.input.wait_online().await);
        self.output.set_online_ready(share);
        Ok(())
    }
}

pub struct ArithmeticGmwMulGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input_a: Arc<ArithmeticGmwWire<T>>,
    input_b: Arc<ArithmeticGmwWire<T>>,
    output: Arc<ArithmeticGmwWire<T>>,
    mt_offset: usize,
    de_future: Option<IntsFuture<T>>,
}

impl<T: Ring> ArithmeticGmwMulGate<T>
where
    MtProvider: HasRingMts<T>,
{
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_a: Arc<ArithmeticGmwWire<T>>,
        input_b: Arc<ArithmeticGmwWire<T>>,
        output: Arc<ArithmeticGmwWire<T>>,
    ) -> Self {
        let num_simd = input_a.num_simd();
        let mt_offset = core.mt.request_ring_mts::<T>(num_simd);
        let de_future = Some(core.register_for_ints_message(gate_id, 0, 2 * num_simd));
        Self {
            gate_id,
            core,
            input_a,
            input_b,
            output,
            mt_offset,
            de_future,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwMulGate<T>
where
    MtProvider: HasRingMts<T>,
{
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.input_a.num_simd();
        let x = self.input_a.wait_online().await;
        let y = self.input_b.wait_online().await;
        let mts = self.core.mt.ring_mts::<T>(self.mt_offset, num_simd);

        let mut d = sub_vec(&x, &mts.a);
        let mut e = sub_vec(&y, &mts.b);
        let mut de_message = d.clone();
        de_message.extend_from_slice(&e);
        self.core
            .send_ints_message(self.gate_id, 0, &de_message)
            .await?;
        let other = self
            .de_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut d, &other[..num_simd]);
        add_assign_vec(&mut e, &other[num_simd..]);

        let mut z = mts.c;
        add_assign_vec(&mut z, &mul_vec(&d, &mts.b));
        add_assign_vec(&mut z, &mul_vec(&e, &mts.a));
        if self.core.is_my_job(self.gate_id) {
            add_assign_vec(&mut z, &mul_vec(&d, &e));
        }
        self.output.set_online_ready(z);
        Ok(())
    }
}

pub struct ArithmeticGmwSqrGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<ArithmeticGmwWire<T>>,
    output: Arc<ArithmeticGmwWire<T>>,
    sp_offset: usize,
    d_future: Option<IntsFuture<T>>,
}

impl<T: Ring> ArithmeticGmwSqrGate<T>
where
    SpProvider: HasRingSps<T>,
{
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticGmwWire<T>>,
        output: Arc<ArithmeticGmwWire<T>>,
    ) -> Self {
        let num_simd = input.num_simd();
        let sp_offset = core.sp.request_sps::<T>(num_simd);
        let d_future = Some(core.register_for_ints_message(gate_id, 0, num_simd));
        Self {
            gate_id,
            core,
            input,
            output,
            sp_offset,
            d_future,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwSqrGate<T>
where
    SpProvider: HasRingSps<T>,
{
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.input.num_simd();
        let x = self.input.wait_online().await;
        let sps = self.core.sp.sps::<T>(self.sp_offset, num_simd);

        let mut d = sub_vec(&x, &sps.a);
        self.core.send_ints_message(self.gate_id, 0, &d).await?;
        let other = self
            .d_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut d, &other);

        // x² = d² + 2·d·a + a²
        let mut z = sps.c;
        for (simd_j, z_j) in z.iter_mut().enumerate() {
            let da = d[simd_j].wrapping_mul(&sps.a[simd_j]);
            *z_j = z_j.wrapping_add(&da).wrapping_add(&da);
            if self.core.is_my_job(self.gate_id) {
                *z_j = z_j.wrapping_add(&d[simd_j].wrapping_mul(&d[simd_j]));
            }
        }
        self.output.set_online_ready(z);
        Ok(())
    }
}

/// Converts a single Boolean GMW wire into an arithmetic GMW wire carrying
/// the bit, using one shared bit per SIMD slot.
pub struct BooleanGmwBitToArithmeticGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<BooleanGmwWire>,
    output: Arc<ArithmeticGmwWire<T>>,
    sb_offset: usize,
    masked_future: Option<BitsFuture>,
}

impl<T: Ring> BooleanGmwBitToArithmeticGate<T>
where
    SbProvider: HasRingSbs<T>,
{
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<BooleanGmwWire>,
        output: Arc<ArithmeticGmwWire<T>>,
    ) -> Self {
        let num_simd = input.num_simd();
        let sb_offset = core.sb.request_sbs::<T>(num_simd);
        let masked_future = Some(core.register_for_bits_message(gate_id, 0, num_simd));
        Self {
            gate_id,
            core,
            input,
            output,
            sb_offset,
            masked_future,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for BooleanGmwBitToArithmeticGate<T>
where
    SbProvider: HasRingSbs<T>,
{
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let num_simd = self.input.num_simd();
        let x = self.input.wait_online().await;
        let sbs = self.core.sb.sbs::<T>(self.sb_offset, num_simd);

        // open z = x ⊕ r
        let mut z = xor(x, &sbs.bool_share);
        self.core.send_bits_message(self.gate_id, 0, &z).await?;
        let other = self
            .masked_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        xor_assign(&mut z, &other);

        // x = z ⊕ r, so [x]^A = z + (1 − 2z)·[r]^A
        let my_job = self.core.is_my_job(self.gate_id);
        let share = z
            .iter()
            .by_vals()
            .zip(&sbs.arith_share)
            .map(|(z_bit, r)| {
                let signed = if z_bit { r.wrapping_neg() } else { *r };
                if my_job && z_bit {
                    signed.wrapping_add(&T::ONE)
                } else {
                    signed
                }
            })
            .collect();
        self.output.set_online_ready(share);
        Ok(())
    }
}

// ---------- BEAVY <-> GMW conversions ----------

/// BEAVY → GMW, Boolean: local resharing `x_i = λ_i ⊕ (my job ? Δ : 0)`.
pub struct BooleanBeavyToGmwGate {
    gate_id: GateId,
    core: Arc<Core>,
    inputs: Vec<Arc<BooleanBeavyWire>>,
    outputs: Vec<Arc<BooleanGmwWire>>,
}

impl BooleanBeavyToGmwGate {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs: Vec<Arc<BooleanBeavyWire>>,
        outputs: Vec<Arc<BooleanGmwWire>>,
    ) -> Self {
        Self {
            gate_id,
            core,
            inputs,
            outputs,
        }
    }
}

#[async_trait]
impl Gate for BooleanBeavyToGmwGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let my_job = self.core.is_my_job(self.gate_id);
        for (wire_in, wire_o) in self.inputs.iter().zip(&self.outputs) {
            let mut share = wire_in.wait_setup().await;
            if my_job {
                xor_assign(&mut share, &wire_in.wait_online().await);
            }
            wire_o.set_online_ready(share);
        }
        Ok(())
    }
}

/// GMW → BEAVY, Boolean: pick a fresh λ in setup, reshare Δ = x ⊕ λ with a
/// single exchange round.
pub struct BooleanGmwToBeavyGate {
    gate_id: GateId,
    core: Arc<Core>,
    inputs: Vec<Arc<BooleanGmwWire>>,
    outputs: Vec<Arc<BooleanBeavyWire>>,
    share_future: Option<BitsFuture>,
}

impl BooleanGmwToBeavyGate {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        inputs: Vec<Arc<BooleanGmwWire>>,
        outputs: Vec<Arc<BooleanBeavyWire>>,
    ) -> Self {
        let num_bits: usize = inputs.iter().map(|w| w.num_simd()).sum();
        let share_future = Some(core.register_for_bits_message(gate_id, 0, num_bits));
        Self {
            gate_id,
            core,
            inputs,
            outputs,
            share_future,
        }
    }
}

#[async_trait]
impl Gate for BooleanGmwToBeavyGate {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        for wire_o in &self.outputs {
            wire_o.set_setup_ready(self.core.random_bits(wire_o.num_simd()));
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let mut masked = BitVec::new();
        for (wire_in, wire_o) in self.inputs.iter().zip(&self.outputs) {
            let mut share = wire_in.wait_online().await;
            xor_assign(&mut share, &wire_o.wait_setup().await);
            masked.extend_from_bitslice(&share);
        }
        self.core
            .send_bits_message(self.gate_id, 0, &masked)
            .await?;
        let other = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        xor_assign(&mut masked, &other);
        let mut offset = 0;
        for wire_o in &self.outputs {
            let public = masked[offset..offset + wire_o.num_simd()].to_bitvec();
            wire_o.set_online_ready(public);
            offset += wire_o.num_simd();
        }
        Ok(())
    }
}

/// BEAVY → GMW, arithmetic: local resharing `x_i = (my job ? Δ : 0) − λ_i`.
pub struct ArithmeticBeavyToGmwGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<ArithmeticBeavyWire<T>>,
    output: Arc<ArithmeticGmwWire<T>>,
}

impl<T: Ring> ArithmeticBeavyToGmwGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticBeavyWire<T>>,
        output: Arc<ArithmeticGmwWire<T>>,
    ) -> Self {
        Self {
            gate_id,
            core,
            input,
            output,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavyToGmwGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let lambda = self.input.wait_setup().await;
        let mut share = neg_vec(&lambda);
        if self.core.is_my_job(self.gate_id) {
            let delta = self.input.wait_online().await;
            add_assign_vec(&mut share, &delta);
        }
        self.output.set_online_ready(share);
        Ok(())
    }
}

/// GMW → BEAVY, arithmetic: fresh λ in setup, one exchange to open
/// Δ = x + λ.
pub struct ArithmeticGmwToBeavyGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<ArithmeticGmwWire<T>>,
    output: Arc<ArithmeticBeavyWire<T>>,
    share_future: Option<IntsFuture<T>>,
}

impl<T: Ring> ArithmeticGmwToBeavyGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticGmwWire<T>>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        let share_future = Some(core.register_for_ints_message(gate_id, 0, input.num_simd()));
        Self {
            gate_id,
            core,
            input,
            output,
            share_future,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwToBeavyGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        let lambda = self.core.random_ring_vec::<T>(self.output.num_simd());
        self.output.set_setup_ready(lambda);
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let x_share = self.input.wait_online().await;
        let lambda = self.output.wait_setup().await;
        let mut masked = add_vec(&x_share, &lambda);
        self.core
            .send_ints_message(self.gate_id, 0, &masked)
            .await?;
        let other = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut masked, &other);
        self.output.set_online_ready(masked);
        Ok(())
    }
}

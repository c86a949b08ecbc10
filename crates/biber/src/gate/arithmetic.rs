//! Arithmetic BEAVY gates over Z/2^W Z.
//!
//! ADD and NEG are local; MUL runs two Gilboa multiplication sessions in
//! setup (one per direction) and one exchange round online, SQR gets away
//! with a single session because the diagonal term is held by both parties.
//! MULNI skips the online resharing and leaves additive halves on the
//! output wire's public-share field.

use crate::arith::{IntegerMultiplicationReceiver, IntegerMultiplicationSender};
use crate::comm::IntsFuture;
use crate::common::{add_assign_vec, add_vec, mul_vec, neg_vec, sub_assign_vec};
use crate::core::Core;
use crate::errors::GateError;
use crate::gate::{Gate, GateId, OutputFuture};
use crate::ring::Ring;
use crate::wire::ArithmeticBeavyWire;
use crate::ALL_PARTIES;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::trace;

pub struct ArithmeticBeavyInputGateSender<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    num_simd: usize,
    input_id: u64,
    input_rx: Option<oneshot::Receiver<Vec<T>>>,
    output: Arc<ArithmeticBeavyWire<T>>,
    public_share: Vec<T>,
}

impl<T: Ring> ArithmeticBeavyInputGateSender<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_id: u64,
        num_simd: usize,
        output: Arc<ArithmeticBeavyWire<T>>,
        input_rx: oneshot::Receiver<Vec<T>>,
    ) -> Self {
        Self {
            gate_id,
            core,
            num_simd,
            input_id,
            input_rx: Some(input_rx),
            output,
            public_share: Vec::new(),
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavyInputGateSender<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "arithmetic input sender setup");
        let secret = self.core.random_ring_vec::<T>(self.num_simd);
        let mask = self
            .core
            .base
            .my_randomness()
            .ring_vec::<T>(self.input_id, self.num_simd);
        self.public_share = add_vec(&secret, &mask);
        self.output.set_setup_ready(secret);
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
        add_assign_vec(&mut self.public_share, &input);
        self.output.set_online_ready(self.public_share.clone());
        self.core
            .send_ints_message(self.gate_id, 0, &self.public_share)
            .await
    }
}

pub struct ArithmeticBeavyInputGateReceiver<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    num_simd: usize,
    input_id: u64,
    output: Arc<ArithmeticBeavyWire<T>>,
    public_share_future: Option<IntsFuture<T>>,
}

impl<T: Ring> ArithmeticBeavyInputGateReceiver<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_id: u64,
        num_simd: usize,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        let public_share_future = Some(core.register_for_ints_message(gate_id, 0, num_simd));
        Self {
            gate_id,
            core,
            num_simd,
            input_id,
            output,
            public_share_future,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavyInputGateReceiver<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "arithmetic input receiver setup");
        let secret = self
            .core
            .base
            .their_randomness()
            .ring_vec::<T>(self.input_id, self.num_simd);
        self.output.set_setup_ready(secret);
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let public_share = self
            .public_share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        self.output.set_online_ready(public_share);
        Ok(())
    }
}

pub struct ArithmeticBeavyOutputGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<ArithmeticBeavyWire<T>>,
    output_owner: usize,
    share_future: Option<IntsFuture<T>>,
    promise: Option<oneshot::Sender<Vec<T>>>,
}

impl<T: Ring> ArithmeticBeavyOutputGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticBeavyWire<T>>,
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
impl<T: Ring> Gate for ArithmeticBeavyOutputGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        if self.output_owner != self.core.my_id {
            let my_secret_share = self.input.wait_setup().await;
            self.core
                .send_ints_message(self.gate_id, 0, &my_secret_share)
                .await?;
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let mine = self.output_owner == ALL_PARTIES || self.output_owner == self.core.my_id;
        if !mine {
            return Ok(());
        }
        let mut lambda = self.input.wait_setup().await;
        let other_secret_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut lambda, &other_secret_share);
        let public_share = self.input.wait_online().await;
        let plain = crate::common::sub_vec(&public_share, &lambda);
        if let Some(promise) = self.promise.take() {
            let _ = promise.send(plain);
        }
        Ok(())
    }
}

/// Exposes both shares of a wire to a non-MPC downstream consumer.
pub struct ArithmeticBeavyOutputShareGate<T: Ring> {
    gate_id: GateId,
    input: Arc<ArithmeticBeavyWire<T>>,
    secret_promise: Option<oneshot::Sender<Vec<T>>>,
    public_promise: Option<oneshot::Sender<Vec<T>>>,
}

impl<T: Ring> ArithmeticBeavyOutputShareGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        input: Arc<ArithmeticBeavyWire<T>>,
    ) -> (Self, OutputFuture<Vec<T>>, OutputFuture<Vec<T>>) {
        let (secret_tx, secret_future) = OutputFuture::new();
        let (public_tx, public_future) = OutputFuture::new();
        (
            Self {
                gate_id,
                input,
                secret_promise: Some(secret_tx),
                public_promise: Some(public_tx),
            },
            secret_future,
            public_future,
        )
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavyOutputShareGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        let secret = self.input.wait_setup().await;
        if let Some(promise) = self.secret_promise.take() {
            let _ = promise.send(secret);
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let public = self.input.wait_online().await;
        if let Some(promise) = self.public_promise.take() {
            let _ = promise.send(public);
        }
        Ok(())
    }
}

pub struct ArithmeticBeavyNegGate<T: Ring> {
    gate_id: GateId,
    input: Arc<ArithmeticBeavyWire<T>>,
    output: Arc<ArithmeticBeavyWire<T>>,
}

impl<T: Ring> ArithmeticBeavyNegGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        input: Arc<ArithmeticBeavyWire<T>>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        Self {
            gate_id,
            input,
            output,
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavyNegGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        let secret = neg_vec(&self.input.wait_setup().await);
        self.output.set_setup_ready(secret);
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let public = neg_vec(&self.input.wait_online().await);
        self.output.set_online_ready(public);
        Ok(())
    }
}

pub struct ArithmeticBeavyAddGate<T: Ring> {
    gate_id: GateId,
    input_a: Arc<ArithmeticBeavyWire<T>>,
    input_b: Arc<ArithmeticBeavyWire<T>>,
    output: Arc<ArithmeticBeavyWire<T>>,
}

impl<T: Ring> ArithmeticBeavyAddGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        input_a: Arc<ArithmeticBeavyWire<T>>,
        input_b: Arc<ArithmeticBeavyWire<T>>,
        output: Arc<ArithmeticBeavyWire<T>>,
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
impl<T: Ring> Gate for ArithmeticBeavyAddGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        let secret = add_vec(
            &self.input_a.wait_setup().await,
            &self.input_b.wait_setup().await,
        );
        self.output.set_setup_ready(secret);
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let public = add_vec(
            &self.input_a.wait_online().await,
            &self.input_b.wait_online().await,
        );
        self.output.set_online_ready(public);
        Ok(())
    }
}

pub struct ArithmeticBeavyMulGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input_a: Arc<ArithmeticBeavyWire<T>>,
    input_b: Arc<ArithmeticBeavyWire<T>>,
    output: Arc<ArithmeticBeavyWire<T>>,
    mult_sender: IntegerMultiplicationSender<T>,
    mult_receiver: IntegerMultiplicationReceiver<T>,
    share_future: Option<IntsFuture<T>>,
    delta_a_share: Vec<T>,
    delta_b_share: Vec<T>,
    delta_y_share: Vec<T>,
}

impl<T: Ring> ArithmeticBeavyMulGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_a: Arc<ArithmeticBeavyWire<T>>,
        input_b: Arc<ArithmeticBeavyWire<T>>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        let num_simd = input_a.num_simd();
        let share_future = Some(core.register_for_ints_message(gate_id, 0, num_simd));
        let arith = core.arith();
        let mult_sender = arith.register_integer_multiplication_send::<T>(num_simd, 1);
        let mult_receiver = arith.register_integer_multiplication_receive::<T>(num_simd, 1);
        Self {
            gate_id,
            core,
            input_a,
            input_b,
            output,
            mult_sender,
            mult_receiver,
            share_future,
            delta_a_share: Vec::new(),
            delta_b_share: Vec::new(),
            delta_y_share: Vec::new(),
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavyMulGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        trace!(gate_id = %self.gate_id, "arithmetic MUL setup");
        let num_simd = self.input_a.num_simd();
        let delta_y = self.core.random_ring_vec::<T>(num_simd);
        self.output.set_setup_ready(delta_y.clone());

        self.delta_a_share = self.input_a.wait_setup().await;
        self.delta_b_share = self.input_b.wait_setup().await;

        self.mult_receiver.set_inputs(&self.delta_a_share).await?;
        self.mult_sender.set_inputs(&self.delta_b_share).await?;

        // [Δ_y]_i = [λ_a]_i · [λ_b]_i + [λ_y]_i
        self.delta_y_share = add_vec(
            &mul_vec(&self.delta_a_share, &self.delta_b_share),
            &delta_y,
        );

        self.mult_receiver.compute_outputs().await?;
        self.mult_sender.compute_outputs().await?;
        // [[λ_a]_i · [λ_b]_(1-i)]_i and [[λ_b]_i · [λ_a]_(1-i)]_i
        add_assign_vec(&mut self.delta_y_share, &self.mult_receiver.get_outputs());
        add_assign_vec(&mut self.delta_y_share, &self.mult_sender.get_outputs());
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let delta_a = self.input_a.wait_online().await;
        let delta_b = self.input_b.wait_online().await;

        // after setup, delta_y_share holds [λ_y]_i + [λ_a λ_b]_i
        sub_assign_vec(&mut self.delta_y_share, &mul_vec(&delta_a, &self.delta_b_share));
        sub_assign_vec(&mut self.delta_y_share, &mul_vec(&delta_b, &self.delta_a_share));
        if self.core.is_my_job(self.gate_id) {
            add_assign_vec(&mut self.delta_y_share, &mul_vec(&delta_a, &delta_b));
        }

        self.core
            .send_ints_message(self.gate_id, 0, &self.delta_y_share)
            .await?;
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut self.delta_y_share, &other_share);
        self.output
            .set_online_ready(std::mem::take(&mut self.delta_y_share));
        Ok(())
    }
}

/// Multiplication without the online resharing round: after the online
/// phase the output wire's public-share field holds each party's additive
/// half of `Δ_y`, not a common public share.
pub struct ArithmeticBeavyMulNiGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input_a: Arc<ArithmeticBeavyWire<T>>,
    input_b: Arc<ArithmeticBeavyWire<T>>,
    output: Arc<ArithmeticBeavyWire<T>>,
    mult_sender: IntegerMultiplicationSender<T>,
    mult_receiver: IntegerMultiplicationReceiver<T>,
    delta_a_share: Vec<T>,
    delta_b_share: Vec<T>,
    delta_y_share: Vec<T>,
}

impl<T: Ring> ArithmeticBeavyMulNiGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input_a: Arc<ArithmeticBeavyWire<T>>,
        input_b: Arc<ArithmeticBeavyWire<T>>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        let num_simd = input_a.num_simd();
        let arith = core.arith();
        let mult_sender = arith.register_integer_multiplication_send::<T>(num_simd, 1);
        let mult_receiver = arith.register_integer_multiplication_receive::<T>(num_simd, 1);
        Self {
            gate_id,
            core,
            input_a,
            input_b,
            output,
            mult_sender,
            mult_receiver,
            delta_a_share: Vec::new(),
            delta_b_share: Vec::new(),
            delta_y_share: Vec::new(),
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavyMulNiGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        let num_simd = self.input_a.num_simd();
        let delta_y = self.core.random_ring_vec::<T>(num_simd);
        self.output.set_setup_ready(delta_y);

        self.delta_a_share = self.input_a.wait_setup().await;
        self.delta_b_share = self.input_b.wait_setup().await;

        self.mult_receiver.set_inputs(&self.delta_a_share).await?;
        self.mult_sender.set_inputs(&self.delta_b_share).await?;

        self.delta_y_share = mul_vec(&self.delta_a_share, &self.delta_b_share);
        self.mult_receiver.compute_outputs().await?;
        self.mult_sender.compute_outputs().await?;
        add_assign_vec(&mut self.delta_y_share, &self.mult_receiver.get_outputs());
        add_assign_vec(&mut self.delta_y_share, &self.mult_sender.get_outputs());
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let delta_a = self.input_a.wait_online().await;
        let delta_b = self.input_b.wait_online().await;

        sub_assign_vec(&mut self.delta_y_share, &mul_vec(&delta_a, &self.delta_b_share));
        sub_assign_vec(&mut self.delta_y_share, &mul_vec(&delta_b, &self.delta_a_share));
        if self.core.is_my_job(self.gate_id) {
            add_assign_vec(&mut self.delta_y_share, &mul_vec(&delta_a, &delta_b));
        }
        // parties keep different halves here
        self.output
            .set_online_ready(std::mem::take(&mut self.delta_y_share));
        Ok(())
    }
}

pub struct ArithmeticBeavySqrGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<ArithmeticBeavyWire<T>>,
    output: Arc<ArithmeticBeavyWire<T>>,
    mult_sender: Option<IntegerMultiplicationSender<T>>,
    mult_receiver: Option<IntegerMultiplicationReceiver<T>>,
    share_future: Option<IntsFuture<T>>,
    delta_a_share: Vec<T>,
    delta_y_share: Vec<T>,
}

impl<T: Ring> ArithmeticBeavySqrGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticBeavyWire<T>>,
        output: Arc<ArithmeticBeavyWire<T>>,
    ) -> Self {
        let num_simd = input.num_simd();
        let share_future = Some(core.register_for_ints_message(gate_id, 0, num_simd));
        let arith = core.arith();
        let (mult_sender, mult_receiver) = if core.my_id == 0 {
            (
                Some(arith.register_integer_multiplication_send::<T>(num_simd, 1)),
                None,
            )
        } else {
            (
                None,
                Some(arith.register_integer_multiplication_receive::<T>(num_simd, 1)),
            )
        };
        Self {
            gate_id,
            core,
            input,
            output,
            mult_sender,
            mult_receiver,
            share_future,
            delta_a_share: Vec::new(),
            delta_y_share: Vec::new(),
        }
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticBeavySqrGate<T> {
    fn gate_id(&self) -> GateId {
        self.gate_id
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        let num_simd = self.input.num_simd();
        let delta_y = self.core.random_ring_vec::<T>(num_simd);
        self.output.set_setup_ready(delta_y.clone());

        self.delta_a_share = self.input.wait_setup().await;

        // [Δ_y]_i = [λ_a]_i² + [λ_y]_i + 2·[[λ_a]_0 · [λ_a]_1]_i
        self.delta_y_share = add_vec(
            &mul_vec(&self.delta_a_share, &self.delta_a_share),
            &delta_y,
        );
        let cross = if let Some(sender) = &mut self.mult_sender {
            sender.set_inputs(&self.delta_a_share).await?;
            sender.compute_outputs().await?;
            sender.get_outputs()
        } else {
            let receiver = self
                .mult_receiver
                .as_mut()
                .expect("one session side is present");
            receiver.set_inputs(&self.delta_a_share).await?;
            receiver.compute_outputs().await?;
            receiver.get_outputs()
        };
        for (acc, cross) in self.delta_y_share.iter_mut().zip(cross) {
            *acc = acc.wrapping_add(&cross).wrapping_add(&cross);
        }
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        let delta_a = self.input.wait_online().await;

        // [Δ_y]_i -= 2·Δ_a·[λ_a]_i
        let twice = mul_vec(&delta_a, &self.delta_a_share);
        sub_assign_vec(&mut self.delta_y_share, &twice);
        sub_assign_vec(&mut self.delta_y_share, &twice);
        if self.core.is_my_job(self.gate_id) {
            add_assign_vec(&mut self.delta_y_share, &mul_vec(&delta_a, &delta_a));
        }

        self.core
            .send_ints_message(self.gate_id, 0, &self.delta_y_share)
            .await?;
        let other_share = self
            .share_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut self.delta_y_share, &other_share);
        self.output
            .set_online_ready(std::mem::take(&mut self.delta_y_share));
        Ok(())
    }
}

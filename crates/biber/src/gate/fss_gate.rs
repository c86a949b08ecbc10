//! FSS-backed gates: point-function (equality) and interval containment.
//!
//! The keys are dealer-style correlated randomness: [`deal_ic_keys`] (or
//! [`deal_dpf_keys`]) produces, per SIMD slot, an IC key pair together with
//! additive shares of the input mask r_in. During online the parties open
//! the masked value x̂ = x + r_in with a single exchange and evaluate their
//! key share locally; the result is an additive (GMW) sharing of
//! `[p ≤ x ≤ q]` (β = 1).

use crate::comm::IntsFuture;
use crate::common::{add_assign_vec, add_vec};
use crate::core::Core;
use crate::errors::GateError;
use crate::fss::{ic_eval, ic_gen, IcKey};
use crate::gate::{Gate, GateId};
use crate::ring::Ring;
use crate::wire::ArithmeticGmwWire;
use async_trait::async_trait;
use rand::{CryptoRng, Rng};
use std::sync::Arc;
use tracing::trace;

/// One party's correlated randomness for an FSS gate.
#[derive(Clone, Debug)]
pub struct FssGateKeys<T> {
    pub keys: Vec<IcKey<T>>,
    pub r_in_share: Vec<T>,
}

/// Dealer step: interval-containment keys for `num_simd` independent slots.
pub fn deal_ic_keys<T: Ring, R: Rng + CryptoRng>(
    num_simd: usize,
    p: T,
    q: T,
    rng: &mut R,
) -> (FssGateKeys<T>, FssGateKeys<T>) {
    let mut keys0 = Vec::with_capacity(num_simd);
    let mut keys1 = Vec::with_capacity(num_simd);
    let mut shares0 = Vec::with_capacity(num_simd);
    let mut shares1 = Vec::with_capacity(num_simd);
    for _ in 0..num_simd {
        let r_in = T::random(rng);
        let share0 = T::random(rng);
        shares0.push(share0);
        shares1.push(r_in.wrapping_sub(&share0));
        let (k0, k1) = ic_gen(r_in, T::ZERO, p, q, rng);
        keys0.push(k0);
        keys1.push(k1);
    }
    (
        FssGateKeys {
            keys: keys0,
            r_in_share: shares0,
        },
        FssGateKeys {
            keys: keys1,
            r_in_share: shares1,
        },
    )
}

/// Dealer step for the equality gate: the degenerate interval `[α, α]`.
pub fn deal_dpf_keys<T: Ring, R: Rng + CryptoRng>(
    num_simd: usize,
    alpha: T,
    rng: &mut R,
) -> (FssGateKeys<T>, FssGateKeys<T>) {
    deal_ic_keys(num_simd, alpha, alpha, rng)
}

/// Evaluates `[p ≤ x ≤ q]` on an additively shared input; output shares are
/// additive. One exchange round to open the masked input, evaluation itself
/// is local and non-interactive.
pub struct ArithmeticGmwIcGate<T: Ring> {
    gate_id: GateId,
    core: Arc<Core>,
    input: Arc<ArithmeticGmwWire<T>>,
    output: Arc<ArithmeticGmwWire<T>>,
    p: T,
    q: T,
    keys: FssGateKeys<T>,
    masked_future: Option<IntsFuture<T>>,
}

impl<T: Ring> ArithmeticGmwIcGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticGmwWire<T>>,
        output: Arc<ArithmeticGmwWire<T>>,
        p: T,
        q: T,
        keys: FssGateKeys<T>,
    ) -> Result<Self, GateError> {
        if keys.keys.len() != input.num_simd() || keys.r_in_share.len() != input.num_simd() {
            return Err(GateError::Construction(
                "one FSS key per SIMD slot is required",
            ));
        }
        let masked_future = Some(core.register_for_ints_message(gate_id, 0, input.num_simd()));
        Ok(Self {
            gate_id,
            core,
            input,
            output,
            p,
            q,
            keys,
            masked_future,
        })
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwIcGate<T> {
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
        trace!(gate_id = %self.gate_id, "interval containment online");
        let party = self.core.my_id == 1;
        let x_share = self.input.wait_online().await;
        // open x̂ = x + r_in
        let mut masked = add_vec(&x_share, &self.keys.r_in_share);
        self.core.send_ints_message(self.gate_id, 0, &masked).await?;
        let other_masked = self
            .masked_future
            .take()
            .expect("online evaluated twice")
            .get()
            .await?;
        add_assign_vec(&mut masked, &other_masked);

        let output_share = masked
            .iter()
            .zip(&self.keys.keys)
            .map(|(x_hat, key)| ic_eval(party, self.p, self.q, key, *x_hat))
            .collect();
        self.output.set_online_ready(output_share);
        Ok(())
    }
}

/// Equality gate `[x = α]` as the degenerate interval `[α, α]`.
pub struct ArithmeticGmwDpfGate<T: Ring> {
    inner: ArithmeticGmwIcGate<T>,
}

impl<T: Ring> ArithmeticGmwDpfGate<T> {
    pub(crate) fn new(
        gate_id: GateId,
        core: Arc<Core>,
        input: Arc<ArithmeticGmwWire<T>>,
        output: Arc<ArithmeticGmwWire<T>>,
        alpha: T,
        keys: FssGateKeys<T>,
    ) -> Result<Self, GateError> {
        Ok(Self {
            inner: ArithmeticGmwIcGate::new(gate_id, core, input, output, alpha, alpha, keys)?,
        })
    }
}

#[async_trait]
impl<T: Ring> Gate for ArithmeticGmwDpfGate<T> {
    fn gate_id(&self) -> GateId {
        self.inner.gate_id()
    }

    fn need_setup(&self) -> bool {
        false
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError> {
        Ok(())
    }

    async fn evaluate_online(&mut self) -> Result<(), GateError> {
        self.inner.evaluate_online().await
    }
}

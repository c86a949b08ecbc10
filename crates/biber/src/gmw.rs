//! Gate factory for the GMW sharing, including the FSS-backed gates which
//! evaluate on additively shared inputs.

use crate::common::BitVec;
use crate::core::{Core, Register};
use crate::errors::GateError;
use crate::gate::fss_gate::{ArithmeticGmwDpfGate, ArithmeticGmwIcGate, FssGateKeys};
use crate::gate::gmw::*;
use crate::gate::{InputSetter, OutputFuture};
use crate::providers::{HasRingMts, HasRingSbs, HasRingSps, MtProvider, SbProvider, SpProvider};
use crate::ring::Ring;
use crate::wire::{ArithmeticGmwWire, BooleanGmwWire};
use crate::ALL_PARTIES;
use std::sync::Arc;

#[derive(Clone)]
pub struct GmwProvider {
    core: Arc<Core>,
    register: Arc<Register>,
}

impl GmwProvider {
    pub(crate) fn new(core: Arc<Core>, register: Arc<Register>) -> Self {
        Self { core, register }
    }

    pub fn my_id(&self) -> usize {
        self.core.my_id
    }

    fn new_bool_wires(&self, num_wires: usize, num_simd: usize) -> Vec<Arc<BooleanGmwWire>> {
        (0..num_wires)
            .map(|_| BooleanGmwWire::new(self.register.next_wire_id(), num_simd))
            .collect()
    }

    fn new_arith_wire<T: Ring>(&self, num_simd: usize) -> Arc<ArithmeticGmwWire<T>> {
        ArithmeticGmwWire::new(self.register.next_wire_id(), num_simd)
    }

    // ---------- Boolean ----------

    pub fn make_boolean_input_gate_my(
        &self,
        input_owner: usize,
        num_wires: usize,
        num_simd: usize,
    ) -> Result<(InputSetter<Vec<BitVec>>, Vec<Arc<BooleanGmwWire>>), GateError> {
        if input_owner != self.core.my_id {
            return Err(GateError::Construction(
                "trying to create an input gate for the wrong party",
            ));
        }
        if num_wires == 0 || num_simd == 0 {
            return Err(GateError::Construction("number of wires must be positive"));
        }
        let gate_id = self.register.next_gate_id();
        let input_id = self.register.next_input_id(num_wires as u64);
        let outputs = self.new_bool_wires(num_wires, num_simd);
        let (setter, input_rx) = InputSetter::new();
        let gate = BooleanGmwInputGateSender::new(
            gate_id,
            Arc::clone(&self.core),
            input_id,
            num_wires,
            num_simd,
            outputs.clone(),
            input_rx,
        );
        self.register.register_gate(Box::new(gate));
        Ok((setter, outputs))
    }

    pub fn make_boolean_input_gate_other(
        &self,
        input_owner: usize,
        num_wires: usize,
        num_simd: usize,
    ) -> Result<Vec<Arc<BooleanGmwWire>>, GateError> {
        if input_owner == self.core.my_id {
            return Err(GateError::Construction(
                "trying to create an input gate for the wrong party",
            ));
        }
        if num_wires == 0 || num_simd == 0 {
            return Err(GateError::Construction("number of wires must be positive"));
        }
        let gate_id = self.register.next_gate_id();
        let input_id = self.register.next_input_id(num_wires as u64);
        let outputs = self.new_bool_wires(num_wires, num_simd);
        let gate = BooleanGmwInputGateReceiver::new(
            gate_id,
            Arc::clone(&self.core),
            input_id,
            num_wires,
            num_simd,
            outputs.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(outputs)
    }

    pub fn make_boolean_output_gate_my(
        &self,
        output_owner: usize,
        wires: &[Arc<BooleanGmwWire>],
    ) -> Result<OutputFuture<Vec<BitVec>>, GateError> {
        if output_owner != ALL_PARTIES && output_owner != self.core.my_id {
            return Err(GateError::Construction("not this party's output"));
        }
        let gate_id = self.register.next_gate_id();
        let (gate, future) = BooleanGmwOutputGate::new(
            gate_id,
            Arc::clone(&self.core),
            wires.to_vec(),
            output_owner,
        );
        self.register.register_gate(Box::new(gate));
        Ok(future.expect("owner requested the output"))
    }

    pub fn make_boolean_output_gate_other(
        &self,
        output_owner: usize,
        wires: &[Arc<BooleanGmwWire>],
    ) -> Result<(), GateError> {
        if output_owner == ALL_PARTIES || output_owner == self.core.my_id {
            return Err(GateError::Construction(
                "output gate for another party expected",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let (gate, _none) = BooleanGmwOutputGate::new(
            gate_id,
            Arc::clone(&self.core),
            wires.to_vec(),
            output_owner,
        );
        self.register.register_gate(Box::new(gate));
        Ok(())
    }

    pub fn make_xor_gate(
        &self,
        inputs_a: &[Arc<BooleanGmwWire>],
        inputs_b: &[Arc<BooleanGmwWire>],
    ) -> Result<Vec<Arc<BooleanGmwWire>>, GateError> {
        if inputs_a.is_empty() || inputs_a.len() != inputs_b.len() {
            return Err(GateError::Construction(
                "number of wires must be the same for both inputs",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let outputs = self.new_bool_wires(inputs_a.len(), inputs_a[0].num_simd());
        let gate = BooleanGmwXorGate::new(
            gate_id,
            inputs_a.to_vec(),
            inputs_b.to_vec(),
            outputs.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(outputs)
    }

    pub fn make_inv_gate(
        &self,
        inputs: &[Arc<BooleanGmwWire>],
    ) -> Result<Vec<Arc<BooleanGmwWire>>, GateError> {
        if inputs.is_empty() {
            return Err(GateError::Construction("number of wires must be positive"));
        }
        let gate_id = self.register.next_gate_id();
        let is_my_job = self.core.is_my_job(gate_id);
        let outputs = if is_my_job {
            self.new_bool_wires(inputs.len(), inputs[0].num_simd())
        } else {
            inputs.to_vec()
        };
        let gate = BooleanGmwInvGate::new(gate_id, inputs.to_vec(), outputs.clone(), is_my_job);
        self.register.register_gate(Box::new(gate));
        Ok(outputs)
    }

    pub fn make_and_gate(
        &self,
        inputs_a: &[Arc<BooleanGmwWire>],
        inputs_b: &[Arc<BooleanGmwWire>],
    ) -> Result<Vec<Arc<BooleanGmwWire>>, GateError> {
        if inputs_a.is_empty() || inputs_a.len() != inputs_b.len() {
            return Err(GateError::Construction(
                "number of wires must be the same for both inputs",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let outputs = self.new_bool_wires(inputs_a.len(), inputs_a[0].num_simd());
        let gate = BooleanGmwAndGate::new(
            gate_id,
            Arc::clone(&self.core),
            inputs_a.to_vec(),
            inputs_b.to_vec(),
            outputs.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(outputs)
    }

    // ---------- Arithmetic ----------

    pub fn make_arithmetic_input_gate_my<T: Ring>(
        &self,
        input_owner: usize,
        num_simd: usize,
    ) -> Result<(InputSetter<Vec<T>>, Arc<ArithmeticGmwWire<T>>), GateError> {
        if input_owner != self.core.my_id {
            return Err(GateError::Construction(
                "trying to create an input gate for the wrong party",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let input_id = self.register.next_input_id(1);
        let output = self.new_arith_wire::<T>(num_simd);
        let (setter, input_rx) = InputSetter::new();
        let gate = ArithmeticGmwInputGateSender::new(
            gate_id,
            Arc::clone(&self.core),
            input_id,
            num_simd,
            output.clone(),
            input_rx,
        );
        self.register.register_gate(Box::new(gate));
        Ok((setter, output))
    }

    pub fn make_arithmetic_input_gate_other<T: Ring>(
        &self,
        input_owner: usize,
        num_simd: usize,
    ) -> Result<Arc<ArithmeticGmwWire<T>>, GateError> {
        if input_owner == self.core.my_id {
            return Err(GateError::Construction(
                "trying to create an input gate for the wrong party",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let input_id = self.register.next_input_id(1);
        let output = self.new_arith_wire::<T>(num_simd);
        let gate = ArithmeticGmwInputGateReceiver::new(
            gate_id,
            Arc::clone(&self.core),
            input_id,
            num_simd,
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    pub fn make_arithmetic_output_gate<T: Ring>(
        &self,
        wire: &Arc<ArithmeticGmwWire<T>>,
        output_owner: usize,
    ) -> Result<OutputFuture<Vec<T>>, GateError> {
        if output_owner != ALL_PARTIES && output_owner != self.core.my_id {
            return Err(GateError::Construction("not this party's output"));
        }
        let gate_id = self.register.next_gate_id();
        let (gate, future) = ArithmeticGmwOutputGate::new(
            gate_id,
            Arc::clone(&self.core),
            wire.clone(),
            output_owner,
        );
        self.register.register_gate(Box::new(gate));
        Ok(future.expect("owner requested the output"))
    }

    pub fn make_arithmetic_output_gate_other<T: Ring>(
        &self,
        wire: &Arc<ArithmeticGmwWire<T>>,
        output_owner: usize,
    ) -> Result<(), GateError> {
        if output_owner == ALL_PARTIES || output_owner == self.core.my_id {
            return Err(GateError::Construction(
                "output gate for another party expected",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let (gate, _none) = ArithmeticGmwOutputGate::new(
            gate_id,
            Arc::clone(&self.core),
            wire.clone(),
            output_owner,
        );
        self.register.register_gate(Box::new(gate));
        Ok(())
    }

    pub fn make_add_gate<T: Ring>(
        &self,
        input_a: &Arc<ArithmeticGmwWire<T>>,
        input_b: &Arc<ArithmeticGmwWire<T>>,
    ) -> Arc<ArithmeticGmwWire<T>> {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input_a.num_simd());
        let gate =
            ArithmeticGmwAddGate::new(gate_id, input_a.clone(), input_b.clone(), output.clone());
        self.register.register_gate(Box::new(gate));
        output
    }

    pub fn make_neg_gate<T: Ring>(
        &self,
        input: &Arc<ArithmeticGmwWire<T>>,
    ) -> Arc<ArithmeticGmwWire<T>> {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input.num_simd());
        let gate = ArithmeticGmwNegGate::new(gate_id, input.clone(), output.clone());
        self.register.register_gate(Box::new(gate));
        output
    }

    pub fn make_mul_gate<T: Ring>(
        &self,
        input_a: &Arc<ArithmeticGmwWire<T>>,
        input_b: &Arc<ArithmeticGmwWire<T>>,
    ) -> Arc<ArithmeticGmwWire<T>>
    where
        MtProvider: HasRingMts<T>,
    {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input_a.num_simd());
        let gate = ArithmeticGmwMulGate::new(
            gate_id,
            Arc::clone(&self.core),
            input_a.clone(),
            input_b.clone(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        output
    }

    pub fn make_sqr_gate<T: Ring>(
        &self,
        input: &Arc<ArithmeticGmwWire<T>>,
    ) -> Arc<ArithmeticGmwWire<T>>
    where
        SpProvider: HasRingSps<T>,
    {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input.num_simd());
        let gate = ArithmeticGmwSqrGate::new(
            gate_id,
            Arc::clone(&self.core),
            input.clone(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        output
    }

    /// Single-bit Boolean → arithmetic conversion via a shared bit.
    pub fn make_bit_to_arithmetic_gate<T: Ring>(
        &self,
        input: &Arc<BooleanGmwWire>,
    ) -> Arc<ArithmeticGmwWire<T>>
    where
        SbProvider: HasRingSbs<T>,
    {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input.num_simd());
        let gate = BooleanGmwBitToArithmeticGate::new(
            gate_id,
            Arc::clone(&self.core),
            input.clone(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        output
    }

    // ---------- FSS gates ----------

    /// Equality with a fixed α: arithmetic share of `[x = α]`, evaluated
    /// locally from dealer keys after one masked-opening round.
    pub fn make_dpf_gate<T: Ring>(
        &self,
        input: &Arc<ArithmeticGmwWire<T>>,
        alpha: T,
        keys: FssGateKeys<T>,
    ) -> Result<Arc<ArithmeticGmwWire<T>>, GateError> {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input.num_simd());
        let gate = ArithmeticGmwDpfGate::new(
            gate_id,
            Arc::clone(&self.core),
            input.clone(),
            output.clone(),
            alpha,
            keys,
        )?;
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    /// Interval containment: arithmetic share of `[p ≤ x ≤ q]`.
    pub fn make_ic_gate<T: Ring>(
        &self,
        input: &Arc<ArithmeticGmwWire<T>>,
        p: T,
        q: T,
        keys: FssGateKeys<T>,
    ) -> Result<Arc<ArithmeticGmwWire<T>>, GateError> {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input.num_simd());
        let gate = ArithmeticGmwIcGate::new(
            gate_id,
            Arc::clone(&self.core),
            input.clone(),
            output.clone(),
            p,
            q,
            keys,
        )?;
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }
}

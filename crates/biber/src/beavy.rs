//! Gate factory for the BEAVY sharing.
//!
//! The typed methods (`make_*_gate::<T>`) build wires, allocate gate and
//! input ids and register the gate with the backend; the dynamic layer
//! ([`BeavyProvider::make_unary_gate`], [`BeavyProvider::make_binary_gate`],
//! [`BeavyProvider::make_convert`]) dispatches over [`WireRef`] for callers
//! that assemble circuits from operation tags. Parameterized operations
//! (DPF/IC keys, EQEXP expansion size) have dedicated factory methods.

use crate::common::BitVec;
use crate::core::{Core, Register};
use crate::errors::GateError;
use crate::gate::arithmetic::*;
use crate::gate::boolean::*;
use crate::gate::conversion::*;
use crate::gate::gmw::{
    ArithmeticBeavyToGmwGate, ArithmeticGmwToBeavyGate, BooleanBeavyToGmwGate,
    BooleanGmwToBeavyGate,
};
use crate::gate::mixed::*;
use crate::gate::{InputSetter, OutputFuture};
use crate::ring::Ring;
use crate::wire::{ArithmeticBeavyWire, BooleanBeavyWire, WireRef};
use crate::ALL_PARTIES;
use std::sync::Arc;

/// Operation tags accepted by the dynamic unary factory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Inv,
    Neg,
    Sqr,
    /// Hamming weight over the input wires; output is a u64 wire.
    Ham,
    /// Alias of [`UnaryOp::Ham`].
    Count,
}

/// Operation tags accepted by the dynamic binary factory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Xor,
    And,
    /// Four-input AND batches evaluate with the same protocol as AND.
    And4,
    Add,
    Mul,
    MulNi,
    Dot,
}

/// Target protocols of [`BeavyProvider::make_convert`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProtocolKind {
    BooleanBeavy,
    ArithmeticBeavy,
    BooleanGmw,
    ArithmeticGmw,
}

#[derive(Clone)]
pub struct BeavyProvider {
    core: Arc<Core>,
    register: Arc<Register>,
}

impl BeavyProvider {
    pub(crate) fn new(core: Arc<Core>, register: Arc<Register>) -> Self {
        Self { core, register }
    }

    pub fn my_id(&self) -> usize {
        self.core.my_id
    }

    fn new_bool_wires(&self, num_wires: usize, num_simd: usize) -> Vec<Arc<BooleanBeavyWire>> {
        (0..num_wires)
            .map(|_| BooleanBeavyWire::new(self.register.next_wire_id(), num_simd))
            .collect()
    }

    fn new_arith_wire<T: Ring>(&self, num_simd: usize) -> Arc<ArithmeticBeavyWire<T>> {
        ArithmeticBeavyWire::new(self.register.next_wire_id(), num_simd)
    }

    fn check_positive(num_wires: usize, num_simd: usize) -> Result<(), GateError> {
        if num_wires == 0 {
            return Err(GateError::Construction("number of wires must be positive"));
        }
        if num_simd == 0 {
            return Err(GateError::Construction("SIMD width must be positive"));
        }
        Ok(())
    }

    // ---------- Boolean inputs/outputs ----------

    pub fn make_boolean_input_gate_my(
        &self,
        input_owner: usize,
        num_wires: usize,
        num_simd: usize,
    ) -> Result<(InputSetter<Vec<BitVec>>, Vec<Arc<BooleanBeavyWire>>), GateError> {
        Self::check_positive(num_wires, num_simd)?;
        if input_owner != self.core.my_id {
            return Err(GateError::Construction(
                "trying to create an input gate for the wrong party",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let input_id = self.register.next_input_id(num_wires as u64);
        let outputs = self.new_bool_wires(num_wires, num_simd);
        let (setter, input_rx) = InputSetter::new();
        let gate = BooleanBeavyInputGateSender::new(
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
    ) -> Result<Vec<Arc<BooleanBeavyWire>>, GateError> {
        Self::check_positive(num_wires, num_simd)?;
        if input_owner == self.core.my_id {
            return Err(GateError::Construction(
                "trying to create an input gate for the wrong party",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let input_id = self.register.next_input_id(num_wires as u64);
        let outputs = self.new_bool_wires(num_wires, num_simd);
        let gate = BooleanBeavyInputGateReceiver::new(
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
        wires: &[Arc<BooleanBeavyWire>],
    ) -> Result<OutputFuture<Vec<BitVec>>, GateError> {
        if output_owner != ALL_PARTIES && output_owner != self.core.my_id {
            return Err(GateError::Construction("not this party's output"));
        }
        check_wire_vector(wires)?;
        let gate_id = self.register.next_gate_id();
        let (gate, future) = BooleanBeavyOutputGate::new(
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
        wires: &[Arc<BooleanBeavyWire>],
    ) -> Result<(), GateError> {
        if output_owner == ALL_PARTIES || output_owner == self.core.my_id {
            return Err(GateError::Construction(
                "output gate for another party expected",
            ));
        }
        check_wire_vector(wires)?;
        let gate_id = self.register.next_gate_id();
        let (gate, _none) = BooleanBeavyOutputGate::new(
            gate_id,
            Arc::clone(&self.core),
            wires.to_vec(),
            output_owner,
        );
        self.register.register_gate(Box::new(gate));
        Ok(())
    }

    // ---------- Boolean gates ----------

    pub fn make_xor_gate(
        &self,
        inputs_a: &[Arc<BooleanBeavyWire>],
        inputs_b: &[Arc<BooleanBeavyWire>],
    ) -> Result<Vec<Arc<BooleanBeavyWire>>, GateError> {
        let num_simd = check_binary_wires(inputs_a, inputs_b)?;
        let gate_id = self.register.next_gate_id();
        let outputs = self.new_bool_wires(inputs_a.len(), num_simd);
        let gate = BooleanBeavyXorGate::new(
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
        inputs: &[Arc<BooleanBeavyWire>],
    ) -> Result<Vec<Arc<BooleanBeavyWire>>, GateError> {
        let num_simd = check_wire_vector(inputs)?;
        let gate_id = self.register.next_gate_id();
        let is_my_job = self.core.is_my_job(gate_id);
        // the non-inverting party forwards the input wires unchanged
        let outputs = if is_my_job {
            self.new_bool_wires(inputs.len(), num_simd)
        } else {
            inputs.to_vec()
        };
        let gate = BooleanBeavyInvGate::new(gate_id, inputs.to_vec(), outputs.clone(), is_my_job);
        self.register.register_gate(Box::new(gate));
        Ok(outputs)
    }

    pub fn make_and_gate(
        &self,
        inputs_a: &[Arc<BooleanBeavyWire>],
        inputs_b: &[Arc<BooleanBeavyWire>],
    ) -> Result<Vec<Arc<BooleanBeavyWire>>, GateError> {
        let num_simd = check_binary_wires(inputs_a, inputs_b)?;
        let gate_id = self.register.next_gate_id();
        let outputs = self.new_bool_wires(inputs_a.len(), num_simd);
        let gate = BooleanBeavyAndGate::new(
            gate_id,
            Arc::clone(&self.core),
            inputs_a.to_vec(),
            inputs_b.to_vec(),
            outputs.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(outputs)
    }

    pub fn make_dot_gate(
        &self,
        inputs_a: &[Arc<BooleanBeavyWire>],
        inputs_b: &[Arc<BooleanBeavyWire>],
    ) -> Result<Arc<BooleanBeavyWire>, GateError> {
        let num_simd = check_binary_wires(inputs_a, inputs_b)?;
        let gate_id = self.register.next_gate_id();
        let output = BooleanBeavyWire::new(self.register.next_wire_id(), num_simd);
        let gate = BooleanBeavyDotGate::new(
            gate_id,
            Arc::clone(&self.core),
            inputs_a.to_vec(),
            inputs_b.to_vec(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    // ---------- Arithmetic inputs/outputs ----------

    pub fn make_arithmetic_input_gate_my<T: Ring>(
        &self,
        input_owner: usize,
        num_simd: usize,
    ) -> Result<(InputSetter<Vec<T>>, Arc<ArithmeticBeavyWire<T>>), GateError> {
        Self::check_positive(1, num_simd)?;
        if input_owner != self.core.my_id {
            return Err(GateError::Construction(
                "trying to create an input gate for the wrong party",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let input_id = self.register.next_input_id(1);
        let output = self.new_arith_wire::<T>(num_simd);
        let (setter, input_rx) = InputSetter::new();
        let gate = ArithmeticBeavyInputGateSender::new(
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
    ) -> Result<Arc<ArithmeticBeavyWire<T>>, GateError> {
        Self::check_positive(1, num_simd)?;
        if input_owner == self.core.my_id {
            return Err(GateError::Construction(
                "trying to create an input gate for the wrong party",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let input_id = self.register.next_input_id(1);
        let output = self.new_arith_wire::<T>(num_simd);
        let gate = ArithmeticBeavyInputGateReceiver::new(
            gate_id,
            Arc::clone(&self.core),
            input_id,
            num_simd,
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    /// Registers the output gate at both parties; returns the plaintext
    /// future when this party (or everyone) owns the output.
    pub fn make_arithmetic_output_gate<T: Ring>(
        &self,
        wire: &Arc<ArithmeticBeavyWire<T>>,
        output_owner: usize,
    ) -> Result<OutputFuture<Vec<T>>, GateError> {
        if output_owner != ALL_PARTIES && output_owner != self.core.my_id {
            return Err(GateError::Construction("not this party's output"));
        }
        let gate_id = self.register.next_gate_id();
        let (gate, future) = ArithmeticBeavyOutputGate::new(
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
        wire: &Arc<ArithmeticBeavyWire<T>>,
        output_owner: usize,
    ) -> Result<(), GateError> {
        if output_owner == ALL_PARTIES || output_owner == self.core.my_id {
            return Err(GateError::Construction(
                "output gate for another party expected",
            ));
        }
        let gate_id = self.register.next_gate_id();
        let (gate, _none) = ArithmeticBeavyOutputGate::new(
            gate_id,
            Arc::clone(&self.core),
            wire.clone(),
            output_owner,
        );
        self.register.register_gate(Box::new(gate));
        Ok(())
    }

    pub fn make_arithmetic_output_share_gate<T: Ring>(
        &self,
        wire: &Arc<ArithmeticBeavyWire<T>>,
    ) -> (OutputFuture<Vec<T>>, OutputFuture<Vec<T>>) {
        let gate_id = self.register.next_gate_id();
        let (gate, secret_future, public_future) =
            ArithmeticBeavyOutputShareGate::new(gate_id, wire.clone());
        self.register.register_gate(Box::new(gate));
        (secret_future, public_future)
    }

    // ---------- Arithmetic gates ----------

    pub fn make_neg_gate<T: Ring>(
        &self,
        input: &Arc<ArithmeticBeavyWire<T>>,
    ) -> Arc<ArithmeticBeavyWire<T>> {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input.num_simd());
        let gate = ArithmeticBeavyNegGate::new(gate_id, input.clone(), output.clone());
        self.register.register_gate(Box::new(gate));
        output
    }

    pub fn make_add_gate<T: Ring>(
        &self,
        input_a: &Arc<ArithmeticBeavyWire<T>>,
        input_b: &Arc<ArithmeticBeavyWire<T>>,
    ) -> Result<Arc<ArithmeticBeavyWire<T>>, GateError> {
        check_simd_match(input_a.num_simd(), input_b.num_simd())?;
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input_a.num_simd());
        let gate =
            ArithmeticBeavyAddGate::new(gate_id, input_a.clone(), input_b.clone(), output.clone());
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    pub fn make_mul_gate<T: Ring>(
        &self,
        input_a: &Arc<ArithmeticBeavyWire<T>>,
        input_b: &Arc<ArithmeticBeavyWire<T>>,
    ) -> Result<Arc<ArithmeticBeavyWire<T>>, GateError> {
        check_simd_match(input_a.num_simd(), input_b.num_simd())?;
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input_a.num_simd());
        let gate = ArithmeticBeavyMulGate::new(
            gate_id,
            Arc::clone(&self.core),
            input_a.clone(),
            input_b.clone(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    pub fn make_mulni_gate<T: Ring>(
        &self,
        input_a: &Arc<ArithmeticBeavyWire<T>>,
        input_b: &Arc<ArithmeticBeavyWire<T>>,
    ) -> Result<Arc<ArithmeticBeavyWire<T>>, GateError> {
        check_simd_match(input_a.num_simd(), input_b.num_simd())?;
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input_a.num_simd());
        let gate = ArithmeticBeavyMulNiGate::new(
            gate_id,
            Arc::clone(&self.core),
            input_a.clone(),
            input_b.clone(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    pub fn make_sqr_gate<T: Ring>(
        &self,
        input: &Arc<ArithmeticBeavyWire<T>>,
    ) -> Arc<ArithmeticBeavyWire<T>> {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input.num_simd());
        let gate = ArithmeticBeavySqrGate::new(
            gate_id,
            Arc::clone(&self.core),
            input.clone(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        output
    }

    // ---------- Conversions and mixed gates ----------

    /// Single-bit Boolean → arithmetic conversion.
    pub fn make_convert_bit_to_arithmetic_gate<T: Ring>(
        &self,
        input: &Arc<BooleanBeavyWire>,
    ) -> Arc<ArithmeticBeavyWire<T>> {
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input.num_simd());
        let gate = BooleanBitToArithmeticBeavyGate::new(
            gate_id,
            Arc::clone(&self.core),
            input.clone(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        output
    }

    /// Full-width Boolean → arithmetic conversion; `inputs` are the bits of
    /// the value, little-endian, one wire per bit.
    pub fn make_convert_to_arithmetic_gate<T: Ring>(
        &self,
        inputs: &[Arc<BooleanBeavyWire>],
    ) -> Result<Arc<ArithmeticBeavyWire<T>>, GateError> {
        let num_simd = check_wire_vector(inputs)?;
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(num_simd);
        let gate = BooleanToArithmeticBeavyGate::new(
            gate_id,
            Arc::clone(&self.core),
            inputs.to_vec(),
            output.clone(),
        )?;
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    /// Hamming weight of the input wires; also the COUNT operation.
    pub fn make_ham_gate<T: Ring>(
        &self,
        inputs: &[Arc<BooleanBeavyWire>],
    ) -> Result<Arc<ArithmeticBeavyWire<T>>, GateError> {
        let num_simd = check_wire_vector(inputs)?;
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(num_simd);
        let gate = BooleanBeavyHamGate::new(
            gate_id,
            Arc::clone(&self.core),
            inputs.to_vec(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    pub fn make_boolean_x_arithmetic_mul_gate<T: Ring>(
        &self,
        input_bool: &Arc<BooleanBeavyWire>,
        input_arith: &Arc<ArithmeticBeavyWire<T>>,
    ) -> Result<Arc<ArithmeticBeavyWire<T>>, GateError> {
        check_simd_match(input_bool.num_simd(), input_arith.num_simd())?;
        let gate_id = self.register.next_gate_id();
        let output = self.new_arith_wire::<T>(input_arith.num_simd());
        let gate = BooleanXArithmeticBeavyMulGate::new(
            gate_id,
            Arc::clone(&self.core),
            input_bool.clone(),
            input_arith.clone(),
            output.clone(),
        );
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    pub fn make_eqexp_gate<T: Ring>(
        &self,
        input: &Arc<ArithmeticBeavyWire<T>>,
        vec_size: usize,
    ) -> Result<Arc<BooleanBeavyWire>, GateError> {
        let gate_id = self.register.next_gate_id();
        let output = BooleanBeavyWire::new(self.register.next_wire_id(), input.num_simd());
        let gate = ArithmeticBeavyEqExpGate::new(
            gate_id,
            Arc::clone(&self.core),
            input.clone(),
            output.clone(),
            vec_size,
        )?;
        self.register.register_gate(Box::new(gate));
        Ok(output)
    }

    // ---------- dynamic layer ----------

    pub fn make_unary_gate(
        &self,
        op: UnaryOp,
        inputs: &[WireRef],
    ) -> Result<Vec<WireRef>, GateError> {
        macro_rules! arith_unary {
            ($method:ident) => {
                match inputs {
                    [WireRef::ArithmeticBeavy8(w)] => Ok(vec![self.$method(w).into()]),
                    [WireRef::ArithmeticBeavy16(w)] => Ok(vec![self.$method(w).into()]),
                    [WireRef::ArithmeticBeavy32(w)] => Ok(vec![self.$method(w).into()]),
                    [WireRef::ArithmeticBeavy64(w)] => Ok(vec![self.$method(w).into()]),
                    _ => Err(GateError::Construction(
                        "operation expects one arithmetic BEAVY wire",
                    )),
                }
            };
        }
        match op {
            UnaryOp::Inv => {
                let wires = cast_bool_beavy(inputs)?;
                Ok(wrap_bool(self.make_inv_gate(&wires)?))
            }
            UnaryOp::Neg => arith_unary!(make_neg_gate),
            UnaryOp::Sqr => arith_unary!(make_sqr_gate),
            UnaryOp::Ham | UnaryOp::Count => {
                let wires = cast_bool_beavy(inputs)?;
                let out = self.make_ham_gate::<u64>(&wires)?;
                Ok(vec![out.into()])
            }
        }
    }

    pub fn make_binary_gate(
        &self,
        op: BinaryOp,
        inputs_a: &[WireRef],
        inputs_b: &[WireRef],
    ) -> Result<Vec<WireRef>, GateError> {
        macro_rules! arith_binary {
            ($method:ident) => {
                match (inputs_a, inputs_b) {
                    ([WireRef::ArithmeticBeavy8(a)], [WireRef::ArithmeticBeavy8(b)]) => {
                        Ok(vec![self.$method(a, b)?.into()])
                    }
                    ([WireRef::ArithmeticBeavy16(a)], [WireRef::ArithmeticBeavy16(b)]) => {
                        Ok(vec![self.$method(a, b)?.into()])
                    }
                    ([WireRef::ArithmeticBeavy32(a)], [WireRef::ArithmeticBeavy32(b)]) => {
                        Ok(vec![self.$method(a, b)?.into()])
                    }
                    ([WireRef::ArithmeticBeavy64(a)], [WireRef::ArithmeticBeavy64(b)]) => {
                        Ok(vec![self.$method(a, b)?.into()])
                    }
                    _ => Err(GateError::Construction(
                        "operation expects matching arithmetic BEAVY wires",
                    )),
                }
            };
        }
        match op {
            BinaryOp::Xor => {
                let a = cast_bool_beavy(inputs_a)?;
                let b = cast_bool_beavy(inputs_b)?;
                Ok(wrap_bool(self.make_xor_gate(&a, &b)?))
            }
            BinaryOp::And | BinaryOp::And4 => {
                let a = cast_bool_beavy(inputs_a)?;
                let b = cast_bool_beavy(inputs_b)?;
                Ok(wrap_bool(self.make_and_gate(&a, &b)?))
            }
            BinaryOp::Dot => {
                let a = cast_bool_beavy(inputs_a)?;
                let b = cast_bool_beavy(inputs_b)?;
                Ok(vec![self.make_dot_gate(&a, &b)?.into()])
            }
            BinaryOp::Add => arith_binary!(make_add_gate),
            BinaryOp::Mul => arith_binary!(make_mul_gate),
            BinaryOp::MulNi => arith_binary!(make_mulni_gate),
        }
    }

    /// Converts wires between the protocol families. Boolean BEAVY →
    /// arithmetic BEAVY composes the input wires little-endian into one
    /// value whose width is the number of wires.
    pub fn make_convert(
        &self,
        dst: ProtocolKind,
        inputs: &[WireRef],
    ) -> Result<Vec<WireRef>, GateError> {
        match (inputs.first(), dst) {
            (Some(WireRef::BooleanBeavy(_)), ProtocolKind::ArithmeticBeavy) => {
                let wires = cast_bool_beavy(inputs)?;
                match wires.len() {
                    8 => Ok(vec![self.make_convert_to_arithmetic_gate::<u8>(&wires)?.into()]),
                    16 => Ok(vec![self.make_convert_to_arithmetic_gate::<u16>(&wires)?.into()]),
                    32 => Ok(vec![self.make_convert_to_arithmetic_gate::<u32>(&wires)?.into()]),
                    64 => Ok(vec![self.make_convert_to_arithmetic_gate::<u64>(&wires)?.into()]),
                    _ => Err(GateError::Construction(
                        "bit width must be one of 8, 16, 32, 64",
                    )),
                }
            }
            (Some(WireRef::BooleanBeavy(_)), ProtocolKind::BooleanGmw) => {
                let wires = cast_bool_beavy(inputs)?;
                let num_simd = check_wire_vector(&wires)?;
                let gate_id = self.register.next_gate_id();
                let outputs: Vec<_> = (0..wires.len())
                    .map(|_| {
                        crate::wire::BooleanGmwWire::new(self.register.next_wire_id(), num_simd)
                    })
                    .collect();
                let gate = BooleanBeavyToGmwGate::new(
                    gate_id,
                    Arc::clone(&self.core),
                    wires,
                    outputs.clone(),
                );
                self.register.register_gate(Box::new(gate));
                Ok(outputs.into_iter().map(WireRef::from).collect())
            }
            (Some(WireRef::BooleanGmw(_)), ProtocolKind::BooleanBeavy) => {
                let wires = cast_bool_gmw(inputs)?;
                let gate_id = self.register.next_gate_id();
                let outputs: Vec<_> = wires
                    .iter()
                    .map(|w| BooleanBeavyWire::new(self.register.next_wire_id(), w.num_simd()))
                    .collect();
                let gate = BooleanGmwToBeavyGate::new(
                    gate_id,
                    Arc::clone(&self.core),
                    wires,
                    outputs.clone(),
                );
                self.register.register_gate(Box::new(gate));
                Ok(outputs.into_iter().map(WireRef::from).collect())
            }
            (Some(_), ProtocolKind::ArithmeticGmw) => self.convert_arith_to_gmw(inputs),
            (Some(_), ProtocolKind::ArithmeticBeavy) => self.convert_arith_from_gmw(inputs),
            _ => Err(GateError::Construction("unsupported conversion")),
        }
    }

    fn convert_arith_to_gmw(&self, inputs: &[WireRef]) -> Result<Vec<WireRef>, GateError> {
        macro_rules! convert {
            ($wire:expr, $t:ty) => {{
                let gate_id = self.register.next_gate_id();
                let output =
                    crate::wire::ArithmeticGmwWire::<$t>::new(self.register.next_wire_id(), $wire.num_simd());
                let gate = ArithmeticBeavyToGmwGate::new(
                    gate_id,
                    Arc::clone(&self.core),
                    $wire.clone(),
                    output.clone(),
                );
                self.register.register_gate(Box::new(gate));
                Ok(vec![output.into()])
            }};
        }
        match inputs {
            [WireRef::ArithmeticBeavy8(w)] => convert!(w, u8),
            [WireRef::ArithmeticBeavy16(w)] => convert!(w, u16),
            [WireRef::ArithmeticBeavy32(w)] => convert!(w, u32),
            [WireRef::ArithmeticBeavy64(w)] => convert!(w, u64),
            _ => Err(GateError::Construction("unsupported conversion")),
        }
    }

    fn convert_arith_from_gmw(&self, inputs: &[WireRef]) -> Result<Vec<WireRef>, GateError> {
        macro_rules! convert {
            ($wire:expr, $t:ty) => {{
                let gate_id = self.register.next_gate_id();
                let output = ArithmeticBeavyWire::<$t>::new(
                    self.register.next_wire_id(),
                    $wire.num_simd(),
                );
                let gate = ArithmeticGmwToBeavyGate::new(
                    gate_id,
                    Arc::clone(&self.core),
                    $wire.clone(),
                    output.clone(),
                );
                self.register.register_gate(Box::new(gate));
                Ok(vec![output.into()])
            }};
        }
        match inputs {
            [WireRef::ArithmeticGmw8(w)] => convert!(w, u8),
            [WireRef::ArithmeticGmw16(w)] => convert!(w, u16),
            [WireRef::ArithmeticGmw32(w)] => convert!(w, u32),
            [WireRef::ArithmeticGmw64(w)] => convert!(w, u64),
            _ => Err(GateError::Construction("unsupported conversion")),
        }
    }

}

fn check_binary_wires(
    a: &[Arc<BooleanBeavyWire>],
    b: &[Arc<BooleanBeavyWire>],
) -> Result<usize, GateError> {
    let num_simd = check_wire_vector(a)?;
    if a.len() != b.len() {
        return Err(GateError::Construction(
            "number of wires must be the same for both inputs",
        ));
    }
    if b.iter().any(|w| w.num_simd() != num_simd) {
        return Err(GateError::Construction(
            "number of SIMD values must be the same for all wires",
        ));
    }
    Ok(num_simd)
}

fn check_simd_match(a: usize, b: usize) -> Result<(), GateError> {
    if a != b {
        return Err(GateError::Construction(
            "number of SIMD values must be the same for all wires",
        ));
    }
    Ok(())
}

fn cast_bool_beavy(wires: &[WireRef]) -> Result<Vec<Arc<BooleanBeavyWire>>, GateError> {
    wires
        .iter()
        .map(|w| match w {
            WireRef::BooleanBeavy(w) => Ok(w.clone()),
            _ => Err(GateError::Construction("Boolean BEAVY wires expected")),
        })
        .collect()
}

fn cast_bool_gmw(wires: &[WireRef]) -> Result<Vec<Arc<crate::wire::BooleanGmwWire>>, GateError> {
    wires
        .iter()
        .map(|w| match w {
            WireRef::BooleanGmw(w) => Ok(w.clone()),
            _ => Err(GateError::Construction("Boolean GMW wires expected")),
        })
        .collect()
}

fn wrap_bool(wires: Vec<Arc<BooleanBeavyWire>>) -> Vec<WireRef> {
    wires.into_iter().map(WireRef::from).collect()
}

//! Gilboa-style two-party integer multiplication on top of OT extension.
//!
//! A multiplication session shares `x · y` between the party inputting `x`
//! (the OT sender, correlations `x << j`) and the party inputting `y` (the
//! OT receiver, choice bits = bits of `y`). One session costs `W` ACOTs per
//! multiplication. The bit-integer variant multiplies a bit with a small
//! vector of ring elements using a single vector-ACOT per multiplication.
//!
//! Session outputs are additive shares: `sender_out + receiver_out = x · y`
//! (componentwise for the vectorized variants).

use crate::common::{ring_to_bits, BitVec};
use crate::ring::Ring;
use biber_ot::extension::{AcotReceiver, AcotSender, OtExtension};
use biber_ot::OtError;
use std::sync::Arc;

/// Registers multiplication sessions with the OT provider of a party pair.
pub struct ArithmeticProvider {
    ot: Arc<OtExtension>,
}

impl ArithmeticProvider {
    pub(crate) fn new(ot: Arc<OtExtension>) -> Self {
        Self { ot }
    }

    pub fn register_integer_multiplication_send<T: Ring>(
        &self,
        batch_size: usize,
        vector_size: usize,
    ) -> IntegerMultiplicationSender<T> {
        IntegerMultiplicationSender {
            batch_size,
            vector_size,
            ot_sender: self
                .ot
                .register_send_acot::<T>(batch_size * T::BITS, vector_size),
            outputs: None,
        }
    }

    pub fn register_integer_multiplication_receive<T: Ring>(
        &self,
        batch_size: usize,
        vector_size: usize,
    ) -> IntegerMultiplicationReceiver<T> {
        IntegerMultiplicationReceiver {
            batch_size,
            vector_size,
            ot_receiver: self
                .ot
                .register_receive_acot::<T>(batch_size * T::BITS, vector_size),
            outputs: None,
        }
    }

    /// Side holding the integer inputs of a bit × integer multiplication.
    pub fn register_bit_integer_multiplication_int_side<T: Ring>(
        &self,
        batch_size: usize,
        vector_size: usize,
    ) -> BitIntegerMultiplicationIntSide<T> {
        BitIntegerMultiplicationIntSide {
            batch_size,
            vector_size,
            ot_sender: self.ot.register_send_acot::<T>(batch_size, vector_size),
            outputs: None,
        }
    }

    /// Side holding the bit inputs of a bit × integer multiplication.
    pub fn register_bit_integer_multiplication_bit_side<T: Ring>(
        &self,
        batch_size: usize,
        vector_size: usize,
    ) -> BitIntegerMultiplicationBitSide<T> {
        BitIntegerMultiplicationBitSide {
            batch_size,
            vector_size,
            ot_receiver: self.ot.register_receive_acot::<T>(batch_size, vector_size),
            outputs: None,
        }
    }
}

pub struct IntegerMultiplicationSender<T: Ring> {
    batch_size: usize,
    vector_size: usize,
    ot_sender: AcotSender<T>,
    outputs: Option<Vec<T>>,
}

impl<T: Ring> IntegerMultiplicationSender<T> {
    /// Sets the sender's factors (`batch_size * vector_size` values) and
    /// sends the correction messages.
    pub async fn set_inputs(&mut self, inputs: &[T]) -> Result<(), OtError> {
        assert_eq!(
            inputs.len(),
            self.batch_size * self.vector_size,
            "input has unexpected size"
        );
        let bits = T::BITS;
        let v = self.vector_size;
        let mut correlations = vec![T::ZERO; self.batch_size * bits * v];
        for (i, chunk) in inputs.chunks_exact(v).enumerate() {
            for (k, value) in chunk.iter().enumerate() {
                for j in 0..bits {
                    correlations[(i * bits + j) * v + k] = *value << j;
                }
            }
        }
        self.ot_sender.set_correlations(correlations);
        self.ot_sender.send_messages().await
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        self.ot_sender.compute_outputs().await?;
        let bits = T::BITS;
        let v = self.vector_size;
        let ot_outputs = self.ot_sender.outputs();
        let outputs = (0..self.batch_size)
            .flat_map(|i| {
                (0..v).map(move |k| {
                    (0..bits).fold(T::ZERO, |acc, j| {
                        acc.wrapping_sub(&ot_outputs[(i * bits + j) * v + k])
                    })
                })
            })
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn get_outputs(&mut self) -> Vec<T> {
        self.outputs.take().expect("outputs not computed")
    }
}

pub struct IntegerMultiplicationReceiver<T: Ring> {
    batch_size: usize,
    vector_size: usize,
    ot_receiver: AcotReceiver<T>,
    outputs: Option<Vec<T>>,
}

impl<T: Ring> IntegerMultiplicationReceiver<T> {
    /// Sets the receiver's factors (`batch_size` values) and sends the
    /// derandomization corrections.
    pub async fn set_inputs(&mut self, inputs: &[T]) -> Result<(), OtError> {
        assert_eq!(inputs.len(), self.batch_size, "input has unexpected size");
        self.ot_receiver.set_choices(ring_to_bits(inputs));
        self.ot_receiver.send_corrections().await
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        self.ot_receiver.compute_outputs().await?;
        let bits = T::BITS;
        let v = self.vector_size;
        let ot_outputs = self.ot_receiver.outputs();
        let outputs = (0..self.batch_size)
            .flat_map(|i| {
                (0..v).map(move |k| {
                    (0..bits).fold(T::ZERO, |acc, j| {
                        acc.wrapping_add(&ot_outputs[(i * bits + j) * v + k])
                    })
                })
            })
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn get_outputs(&mut self) -> Vec<T> {
        self.outputs.take().expect("outputs not computed")
    }
}

pub struct BitIntegerMultiplicationIntSide<T: Ring> {
    batch_size: usize,
    vector_size: usize,
    ot_sender: AcotSender<T>,
    outputs: Option<Vec<T>>,
}

impl<T: Ring> BitIntegerMultiplicationIntSide<T> {
    pub async fn set_inputs(&mut self, inputs: Vec<T>) -> Result<(), OtError> {
        assert_eq!(
            inputs.len(),
            self.batch_size * self.vector_size,
            "input has unexpected size"
        );
        self.ot_sender.set_correlations(inputs);
        self.ot_sender.send_messages().await
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        self.ot_sender.compute_outputs().await?;
        let outputs = self
            .ot_sender
            .outputs()
            .iter()
            .map(|out| out.wrapping_neg())
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn get_outputs(&mut self) -> Vec<T> {
        self.outputs.take().expect("outputs not computed")
    }
}

pub struct BitIntegerMultiplicationBitSide<T: Ring> {
    batch_size: usize,
    #[allow(dead_code)]
    vector_size: usize,
    ot_receiver: AcotReceiver<T>,
    outputs: Option<Vec<T>>,
}

impl<T: Ring> BitIntegerMultiplicationBitSide<T> {
    pub async fn set_inputs(&mut self, bits: &BitVec) -> Result<(), OtError> {
        assert_eq!(bits.len(), self.batch_size, "input has unexpected size");
        self.ot_receiver.set_choices(bits.clone());
        self.ot_receiver.send_corrections().await
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        self.ot_receiver.compute_outputs().await?;
        self.outputs = Some(self.ot_receiver.outputs().to_vec());
        Ok(())
    }

    pub fn get_outputs(&mut self) -> Vec<T> {
        self.outputs.take().expect("outputs not computed")
    }
}

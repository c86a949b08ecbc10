//! Batch handles for the different OT flavors.
//!
//! A handle is created at registration time and owned by the gate that
//! consumes the batch. Sender handles: set the correlation/inputs, send the
//! (flavor-specific) message, compute the outputs once the receiver's
//! corrections arrived. Receiver handles: set the real choices, send the
//! corrections, reconstruct the outputs from the stored pads and the
//! sender's message. Random OTs have neither inputs nor choices; the absence
//! of the setters makes misuse unrepresentable.

use super::{ReceiverBatch, SenderBatch, SenderPayload};
use crate::{BitVector, Block, OtError, OtRing};
use itertools::izip;

fn pad_to_block(pad: &BitVector) -> Block {
    Block::from_bits(pad)
}

fn pad_to_ring_vec<T: OtRing>(pad: &BitVector, vector_size: usize) -> Vec<T> {
    let bytes = pad.as_raw_slice();
    assert!(bytes.len() >= vector_size * T::BYTES, "pad too short");
    (0..vector_size)
        .map(|k| bytemuck::pod_read_unaligned(&bytes[k * T::BYTES..(k + 1) * T::BYTES]))
        .collect()
}

fn ring_vec_from_bytes<T: OtRing>(bytes: &[u8], len: usize) -> Vec<T> {
    assert_eq!(bytes.len(), len * T::BYTES, "sender message length mismatch");
    (0..len)
        .map(|k| bytemuck::pod_read_unaligned(&bytes[k * T::BYTES..(k + 1) * T::BYTES]))
        .collect()
}

// ---------- FixedXCOT128 ----------

/// Sender of XOR-correlated 128-bit OTs with one correlation for the whole
/// batch.
pub struct FixedXcot128Sender {
    batch: SenderBatch,
    correlation: Option<Block>,
    outputs: Option<Vec<Block>>,
}

impl FixedXcot128Sender {
    pub(crate) fn new(batch: SenderBatch) -> Self {
        Self {
            batch,
            correlation: None,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_correlation(&mut self, correlation: Block) {
        self.correlation = Some(correlation);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_messages(&mut self) -> Result<(), OtError> {
        let correlation = self
            .correlation
            .expect("correlation must be set before send_messages");
        let setup = self.batch.setup().await?;
        let buffer: Vec<Block> = izip!(&setup.y0, &setup.y1)
            .map(|(y0, y1)| correlation ^ pad_to_block(y0) ^ pad_to_block(y1))
            .collect();
        self.batch.send(SenderPayload::Blocks(buffer)).await
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        let (setup, corrections) = self.batch.setup_and_corrections().await?;
        let outputs = izip!(corrections.iter().by_vals(), &setup.y0, &setup.y1)
            .map(|(swap, y0, y1)| pad_to_block(if swap { y1 } else { y0 }))
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &[Block] {
        self.outputs.as_deref().expect("outputs not computed")
    }
}

/// Receiver of XOR-correlated 128-bit OTs.
pub struct FixedXcot128Receiver {
    batch: ReceiverBatch,
    choices: Option<BitVector>,
    corrections_sent: bool,
    outputs: Option<Vec<Block>>,
}

impl FixedXcot128Receiver {
    pub(crate) fn new(batch: ReceiverBatch) -> Self {
        Self {
            batch,
            choices: None,
            corrections_sent: false,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_choices(&mut self, choices: BitVector) {
        assert_eq!(choices.len(), self.batch.num_ots(), "wrong number of choices");
        self.choices = Some(choices);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_corrections(&mut self) -> Result<(), OtError> {
        let choices = self
            .choices
            .as_ref()
            .expect("choices must be set before send_corrections");
        self.batch.send_corrections(choices).await?;
        self.corrections_sent = true;
        Ok(())
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        assert!(
            self.corrections_sent,
            "corrections must be sent before compute_outputs"
        );
        let choices = self.choices.as_ref().expect("choices set");
        let (setup, payload) = self.batch.setup_and_message().await?;
        let SenderPayload::Blocks(msg) = payload else {
            panic!("unexpected payload flavor for FixedXCOT128");
        };
        assert_eq!(msg.len(), setup.outputs.len(), "sender message length mismatch");
        let outputs = izip!(choices.iter().by_vals(), &setup.outputs, msg)
            .map(|(choice, t, m)| {
                let t = pad_to_block(t);
                if choice {
                    t ^ *m
                } else {
                    t
                }
            })
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &[Block] {
        self.outputs.as_deref().expect("outputs not computed")
    }
}

// ---------- XCOTBit ----------

/// Sender of bit OTs with a per-OT XOR correlation.
pub struct XcotBitSender {
    batch: SenderBatch,
    correlations: Option<BitVector>,
    outputs: Option<BitVector>,
}

impl XcotBitSender {
    pub(crate) fn new(batch: SenderBatch) -> Self {
        Self {
            batch,
            correlations: None,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_correlations(&mut self, correlations: BitVector) {
        assert_eq!(
            correlations.len(),
            self.batch.num_ots(),
            "wrong number of correlations"
        );
        self.correlations = Some(correlations);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_messages(&mut self) -> Result<(), OtError> {
        let correlations = self
            .correlations
            .as_ref()
            .expect("correlations must be set before send_messages");
        let setup = self.batch.setup().await?;
        let buffer: BitVector = izip!(correlations.iter().by_vals(), &setup.y0, &setup.y1)
            .map(|(c, y0, y1)| c ^ y0[0] ^ y1[0])
            .collect();
        self.batch.send(SenderPayload::Bits(buffer)).await
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        let (setup, corrections) = self.batch.setup_and_corrections().await?;
        let outputs = izip!(corrections.iter().by_vals(), &setup.y0, &setup.y1)
            .map(|(swap, y0, y1)| if swap { y1[0] } else { y0[0] })
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &BitVector {
        self.outputs.as_ref().expect("outputs not computed")
    }
}

/// Receiver of bit OTs with a per-OT XOR correlation.
pub struct XcotBitReceiver {
    batch: ReceiverBatch,
    choices: Option<BitVector>,
    corrections_sent: bool,
    outputs: Option<BitVector>,
}

impl XcotBitReceiver {
    pub(crate) fn new(batch: ReceiverBatch) -> Self {
        Self {
            batch,
            choices: None,
            corrections_sent: false,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_choices(&mut self, choices: BitVector) {
        assert_eq!(choices.len(), self.batch.num_ots(), "wrong number of choices");
        self.choices = Some(choices);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_corrections(&mut self) -> Result<(), OtError> {
        let choices = self
            .choices
            .as_ref()
            .expect("choices must be set before send_corrections");
        self.batch.send_corrections(choices).await?;
        self.corrections_sent = true;
        Ok(())
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        assert!(
            self.corrections_sent,
            "corrections must be sent before compute_outputs"
        );
        let choices = self.choices.as_ref().expect("choices set");
        let (setup, payload) = self.batch.setup_and_message().await?;
        let SenderPayload::Bits(msg) = payload else {
            panic!("unexpected payload flavor for XCOTBit");
        };
        assert_eq!(msg.len(), setup.outputs.len(), "sender message length mismatch");
        let outputs = izip!(choices.iter().by_vals(), &setup.outputs, msg.iter().by_vals())
            .map(|(choice, t, m)| t[0] ^ (choice & m))
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &BitVector {
        self.outputs.as_ref().expect("outputs not computed")
    }
}

// ---------- ACOT ----------

/// Sender of additively correlated OTs over a ring; each OT carries
/// `vector_size` elements.
pub struct AcotSender<T: OtRing> {
    batch: SenderBatch,
    vector_size: usize,
    correlations: Option<Vec<T>>,
    outputs: Option<Vec<T>>,
}

impl<T: OtRing> AcotSender<T> {
    pub(crate) fn new(batch: SenderBatch, vector_size: usize) -> Self {
        Self {
            batch,
            vector_size,
            correlations: None,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_correlations(&mut self, correlations: Vec<T>) {
        assert_eq!(
            correlations.len(),
            self.batch.num_ots() * self.vector_size,
            "wrong number of correlations"
        );
        self.correlations = Some(correlations);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_messages(&mut self) -> Result<(), OtError> {
        let correlations = self
            .correlations
            .as_ref()
            .expect("correlations must be set before send_messages");
        let setup = self.batch.setup().await?;
        let mut buffer = correlations.clone();
        for (i, (y0, y1)) in izip!(&setup.y0, &setup.y1).enumerate() {
            let y0 = pad_to_ring_vec::<T>(y0, self.vector_size);
            let y1 = pad_to_ring_vec::<T>(y1, self.vector_size);
            for k in 0..self.vector_size {
                let b = &mut buffer[i * self.vector_size + k];
                *b = b.wrapping_add(&y0[k]).wrapping_add(&y1[k]);
            }
        }
        self.batch
            .send(SenderPayload::Bytes(bytemuck::cast_slice(&buffer).to_vec()))
            .await
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        let vector_size = self.vector_size;
        let (setup, corrections) = self.batch.setup_and_corrections().await?;
        let mut outputs = Vec::with_capacity(setup.y0.len() * vector_size);
        for (swap, y0, y1) in izip!(corrections.iter().by_vals(), &setup.y0, &setup.y1) {
            let pad = if swap { y1 } else { y0 };
            outputs.extend(pad_to_ring_vec::<T>(pad, vector_size));
        }
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &[T] {
        self.outputs.as_deref().expect("outputs not computed")
    }
}

/// Receiver of additively correlated OTs over a ring.
pub struct AcotReceiver<T: OtRing> {
    batch: ReceiverBatch,
    vector_size: usize,
    choices: Option<BitVector>,
    corrections_sent: bool,
    outputs: Option<Vec<T>>,
}

impl<T: OtRing> AcotReceiver<T> {
    pub(crate) fn new(batch: ReceiverBatch, vector_size: usize) -> Self {
        Self {
            batch,
            vector_size,
            choices: None,
            corrections_sent: false,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_choices(&mut self, choices: BitVector) {
        assert_eq!(choices.len(), self.batch.num_ots(), "wrong number of choices");
        self.choices = Some(choices);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_corrections(&mut self) -> Result<(), OtError> {
        let choices = self
            .choices
            .as_ref()
            .expect("choices must be set before send_corrections");
        self.batch.send_corrections(choices).await?;
        self.corrections_sent = true;
        Ok(())
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        assert!(
            self.corrections_sent,
            "corrections must be sent before compute_outputs"
        );
        let vector_size = self.vector_size;
        let choices = self.choices.as_ref().expect("choices set");
        let (setup, payload) = self.batch.setup_and_message().await?;
        let SenderPayload::Bytes(bytes) = payload else {
            panic!("unexpected payload flavor for ACOT");
        };
        let msg = ring_vec_from_bytes::<T>(bytes, setup.outputs.len() * vector_size);
        let mut outputs = Vec::with_capacity(setup.outputs.len() * vector_size);
        for (i, (choice, t)) in izip!(choices.iter().by_vals(), &setup.outputs).enumerate() {
            let t = pad_to_ring_vec::<T>(t, vector_size);
            for (k, t_k) in t.into_iter().enumerate() {
                if choice {
                    outputs.push(msg[i * vector_size + k].wrapping_sub(&t_k));
                } else {
                    outputs.push(t_k);
                }
            }
        }
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &[T] {
        self.outputs.as_deref().expect("outputs not computed")
    }
}

// ---------- GOT (chosen-message) ----------

/// Sender of general 128-bit OTs with two chosen messages per OT.
pub struct Got128Sender {
    batch: SenderBatch,
    inputs: Option<Vec<Block>>,
}

impl Got128Sender {
    pub(crate) fn new(batch: SenderBatch) -> Self {
        Self {
            batch,
            inputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    /// `inputs` holds the message pairs `(m0, m1)` interleaved.
    pub fn set_inputs(&mut self, inputs: Vec<Block>) {
        assert_eq!(
            inputs.len(),
            2 * self.batch.num_ots(),
            "wrong number of inputs"
        );
        self.inputs = Some(inputs);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    /// Masks the message pairs, swapped per OT by the correction bit, and
    /// sends them. Blocks until the receiver's corrections arrived.
    pub async fn send_messages(&mut self) -> Result<(), OtError> {
        let inputs = self
            .inputs
            .as_ref()
            .expect("inputs must be set before send_messages");
        let (setup, corrections) = self.batch.setup_and_corrections().await?;
        let mut buffer = Vec::with_capacity(inputs.len());
        for (i, (swap, y0, y1)) in izip!(corrections.iter().by_vals(), &setup.y0, &setup.y1)
            .enumerate()
        {
            let (m0, m1) = if swap {
                (inputs[2 * i + 1], inputs[2 * i])
            } else {
                (inputs[2 * i], inputs[2 * i + 1])
            };
            buffer.push(m0 ^ pad_to_block(y0));
            buffer.push(m1 ^ pad_to_block(y1));
        }
        self.batch.send(SenderPayload::Blocks(buffer)).await
    }
}

/// Receiver of general 128-bit OTs.
pub struct Got128Receiver {
    batch: ReceiverBatch,
    choices: Option<BitVector>,
    corrections_sent: bool,
    outputs: Option<Vec<Block>>,
}

impl Got128Receiver {
    pub(crate) fn new(batch: ReceiverBatch) -> Self {
        Self {
            batch,
            choices: None,
            corrections_sent: false,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_choices(&mut self, choices: BitVector) {
        assert_eq!(choices.len(), self.batch.num_ots(), "wrong number of choices");
        self.choices = Some(choices);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_corrections(&mut self) -> Result<(), OtError> {
        let choices = self
            .choices
            .as_ref()
            .expect("choices must be set before send_corrections");
        self.batch.send_corrections(choices).await?;
        self.corrections_sent = true;
        Ok(())
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        assert!(
            self.corrections_sent,
            "corrections must be sent before compute_outputs"
        );
        let (setup, payload) = self.batch.setup_and_message().await?;
        let SenderPayload::Blocks(msg) = payload else {
            panic!("unexpected payload flavor for GOT128");
        };
        assert_eq!(msg.len(), 2 * setup.outputs.len(), "sender message length mismatch");
        let outputs = izip!(setup.random_choices.iter().by_vals(), &setup.outputs)
            .enumerate()
            .map(|(i, (rho, t))| msg[2 * i + rho as usize] ^ pad_to_block(t))
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &[Block] {
        self.outputs.as_deref().expect("outputs not computed")
    }
}

/// Sender of general bit OTs.
pub struct GotBitSender {
    batch: SenderBatch,
    inputs: Option<BitVector>,
}

impl GotBitSender {
    pub(crate) fn new(batch: SenderBatch) -> Self {
        Self {
            batch,
            inputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_inputs(&mut self, inputs: BitVector) {
        assert_eq!(
            inputs.len(),
            2 * self.batch.num_ots(),
            "wrong number of inputs"
        );
        self.inputs = Some(inputs);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_messages(&mut self) -> Result<(), OtError> {
        let inputs = self
            .inputs
            .as_ref()
            .expect("inputs must be set before send_messages");
        let (setup, corrections) = self.batch.setup_and_corrections().await?;
        let mut buffer = BitVector::repeat(false, inputs.len());
        for (i, (swap, y0, y1)) in izip!(corrections.iter().by_vals(), &setup.y0, &setup.y1)
            .enumerate()
        {
            let (b0, b1) = if swap {
                (inputs[2 * i + 1], inputs[2 * i])
            } else {
                (inputs[2 * i], inputs[2 * i + 1])
            };
            buffer.set(2 * i, b0 ^ y0[0]);
            buffer.set(2 * i + 1, b1 ^ y1[0]);
        }
        self.batch.send(SenderPayload::Bits(buffer)).await
    }
}

/// Receiver of general bit OTs.
pub struct GotBitReceiver {
    batch: ReceiverBatch,
    choices: Option<BitVector>,
    corrections_sent: bool,
    outputs: Option<BitVector>,
}

impl GotBitReceiver {
    pub(crate) fn new(batch: ReceiverBatch) -> Self {
        Self {
            batch,
            choices: None,
            corrections_sent: false,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub fn set_choices(&mut self, choices: BitVector) {
        assert_eq!(choices.len(), self.batch.num_ots(), "wrong number of choices");
        self.choices = Some(choices);
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn send_corrections(&mut self) -> Result<(), OtError> {
        let choices = self
            .choices
            .as_ref()
            .expect("choices must be set before send_corrections");
        self.batch.send_corrections(choices).await?;
        self.corrections_sent = true;
        Ok(())
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        assert!(
            self.corrections_sent,
            "corrections must be sent before compute_outputs"
        );
        let (setup, payload) = self.batch.setup_and_message().await?;
        let SenderPayload::Bits(msg) = payload else {
            panic!("unexpected payload flavor for GOTBit");
        };
        assert_eq!(msg.len(), 2 * setup.outputs.len(), "sender message length mismatch");
        let outputs = izip!(setup.random_choices.iter().by_vals(), &setup.outputs)
            .enumerate()
            .map(|(i, (rho, t))| msg[2 * i + rho as usize] ^ t[0])
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &BitVector {
        self.outputs.as_ref().expect("outputs not computed")
    }
}

// ---------- ROT ----------

/// Sender of random OTs: both pads become the outputs, no message is
/// exchanged.
pub struct RotSender {
    batch: SenderBatch,
    outputs: Option<Vec<[BitVector; 2]>>,
}

impl RotSender {
    pub(crate) fn new(batch: SenderBatch) -> Self {
        Self {
            batch,
            outputs: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        let setup = self.batch.setup().await?;
        let outputs = izip!(&setup.y0, &setup.y1)
            .map(|(y0, y1)| [y0.clone(), y1.clone()])
            .collect();
        self.outputs = Some(outputs);
        Ok(())
    }

    pub fn outputs(&self) -> &[[BitVector; 2]] {
        self.outputs.as_deref().expect("outputs not computed")
    }
}

/// Receiver of random OTs: the choice bits are the random ones drawn during
/// setup. There is deliberately no way to set choices on this handle.
pub struct RotReceiver {
    batch: ReceiverBatch,
    outputs: Option<Vec<BitVector>>,
    choices: Option<BitVector>,
}

impl RotReceiver {
    pub(crate) fn new(batch: ReceiverBatch) -> Self {
        Self {
            batch,
            outputs: None,
            choices: None,
        }
    }

    pub fn num_ots(&self) -> usize {
        self.batch.num_ots()
    }

    pub async fn wait_setup(&mut self) -> Result<(), OtError> {
        self.batch.setup().await.map(|_| ())
    }

    pub async fn compute_outputs(&mut self) -> Result<(), OtError> {
        if self.outputs.is_some() {
            return Ok(());
        }
        let setup = self.batch.setup().await?;
        self.choices = Some(setup.random_choices.clone());
        self.outputs = Some(setup.outputs.clone());
        Ok(())
    }

    pub fn outputs(&self) -> &[BitVector] {
        self.outputs.as_deref().expect("outputs not computed")
    }

    pub fn choices(&self) -> &BitVector {
        self.choices.as_ref().expect("outputs not computed")
    }
}

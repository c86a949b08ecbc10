//! IKNP-style OT extension.
//!
//! One provider instance per party pair holds both directions: the party
//! acts as extension sender for the batches it registered with
//! `register_send_*` and as extension receiver for `register_receive_*`.
//! Batches are reserved at circuit-construction time (single-threaded);
//! `send_setup`/`receive_setup` run once during preprocessing, derive the
//! per-OT pads from κ base OTs and deliver them to the batch handles through
//! one-shot channels. The online per-batch coordination (corrections,
//! sender messages) is routed by [`OtExtension::handle_message`] into
//! per-batch slots, so batches may complete out of order.
//!
//! The size of a batch is fixed at registration and never grows;
//! registering after setup has started is a programming error.

use crate::aes_hash::fixed_key_hash;
use crate::aes_rng::AesRng;
use crate::base_ot::{self, BaseOtMsg};
use crate::{BitVector, Block, OtError, OtRing};
use biber_bitmatrix::BitMatrixView;
use biber_channel::{channel, Receiver as ChanReceiver, Sender as ChanSender};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{oneshot, Mutex as TokioMutex};
use tracing::{debug, trace};

pub mod flavors;

pub use flavors::{
    AcotReceiver, AcotSender, FixedXcot128Receiver, FixedXcot128Sender, Got128Receiver,
    Got128Sender, GotBitReceiver, GotBitSender, RotReceiver, RotSender, XcotBitReceiver,
    XcotBitSender,
};

/// Security parameter: number of base OTs, height of the extension matrix.
pub const BASE_OT_COUNT: usize = 128;

pub type BatchId = u32;

/// Inter-party messages of the OT extension, routed by batch id.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OtMsg {
    /// Base-OT ceremony message; `from_ext_sender` tags which extension
    /// direction it belongs to.
    BaseSetup { from_ext_sender: bool, msg: BaseOtMsg },
    /// One row of the receiver's expanded mask matrix.
    ReceiverMasks { row: u32, mask: Vec<u8> },
    /// `real_choices ^ random_choices` for one batch.
    ReceiverCorrections {
        batch: BatchId,
        corrections: BitVector,
    },
    /// The flavor-specific sender message for one batch.
    SenderMessage {
        batch: BatchId,
        payload: SenderPayload,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum SenderPayload {
    Blocks(Vec<Block>),
    Bits(BitVector),
    /// Little-endian encoded ring elements.
    Bytes(Vec<u8>),
}

/// Per-OT sender pads, `y1` being `y0` under the batch correlation.
#[derive(Debug)]
pub struct SenderBatchSetup {
    pub y0: Vec<BitVector>,
    pub y1: Vec<BitVector>,
}

#[derive(Debug)]
pub struct ReceiverBatchSetup {
    /// Per-OT pad selected by the random choice bit.
    pub outputs: Vec<BitVector>,
    /// The random choices drawn for this batch during setup.
    pub random_choices: BitVector,
}

enum Slot<T> {
    Waiting(oneshot::Sender<T>),
    Arrived(T),
}

struct Routing {
    corrections: StdMutex<HashMap<BatchId, Slot<BitVector>>>,
    sender_msgs: StdMutex<HashMap<BatchId, Slot<SenderPayload>>>,
    masks_tx: ChanSender<(u32, Vec<u8>)>,
    base_to_send_tx: ChanSender<BaseOtMsg>,
    base_to_recv_tx: ChanSender<BaseOtMsg>,
}

struct SendBatchInfo {
    offset: usize,
    num_ots: usize,
    bitlen: usize,
    pads_tx: oneshot::Sender<SenderBatchSetup>,
}

struct RecvBatchInfo {
    offset: usize,
    num_ots: usize,
    bitlen: usize,
    outputs_tx: oneshot::Sender<ReceiverBatchSetup>,
}

struct Registration<B> {
    total_ots: usize,
    batches: Vec<B>,
    sealed: bool,
}

impl<B> Default for Registration<B> {
    fn default() -> Self {
        Self {
            total_ots: 0,
            batches: Vec::new(),
            sealed: false,
        }
    }
}

/// OT-extension provider for one party pair, holding both roles.
pub struct OtExtension {
    out: ChanSender<OtMsg>,
    routing: Arc<Routing>,
    send_reg: StdMutex<Registration<SendBatchInfo>>,
    recv_reg: StdMutex<Registration<RecvBatchInfo>>,
    masks_rx: TokioMutex<Option<ChanReceiver<(u32, Vec<u8>)>>>,
    base_send_rx: TokioMutex<Option<ChanReceiver<BaseOtMsg>>>,
    base_recv_rx: TokioMutex<Option<ChanReceiver<BaseOtMsg>>>,
}

impl OtExtension {
    pub fn new(out: ChanSender<OtMsg>) -> Self {
        let (masks_tx, masks_rx) = channel(BASE_OT_COUNT);
        let (base_to_send_tx, base_send_rx) = channel(8);
        let (base_to_recv_tx, base_recv_rx) = channel(8);
        Self {
            out,
            routing: Arc::new(Routing {
                corrections: StdMutex::new(HashMap::new()),
                sender_msgs: StdMutex::new(HashMap::new()),
                masks_tx,
                base_to_send_tx,
                base_to_recv_tx,
            }),
            send_reg: StdMutex::new(Registration::default()),
            recv_reg: StdMutex::new(Registration::default()),
            masks_rx: TokioMutex::new(Some(masks_rx)),
            base_send_rx: TokioMutex::new(Some(base_send_rx)),
            base_recv_rx: TokioMutex::new(Some(base_recv_rx)),
        }
    }

    /// Routes an incoming message into the matching per-batch slot or setup
    /// queue. Called from the transport's receive loop; safe with respect to
    /// out-of-order batch completion.
    pub async fn handle_message(&self, msg: OtMsg) -> Result<(), OtError> {
        match msg {
            OtMsg::BaseSetup {
                from_ext_sender,
                msg,
            } => {
                // the peer's sender role talks to our receiver role
                let queue = if from_ext_sender {
                    &self.routing.base_to_recv_tx
                } else {
                    &self.routing.base_to_send_tx
                };
                queue.send(msg).await?;
            }
            OtMsg::ReceiverMasks { row, mask } => {
                self.routing.masks_tx.send((row, mask)).await?;
            }
            OtMsg::ReceiverCorrections { batch, corrections } => {
                trace!(batch, "received corrections");
                fulfill(&self.routing.corrections, batch, corrections);
            }
            OtMsg::SenderMessage { batch, payload } => {
                trace!(batch, "received sender message");
                fulfill(&self.routing.sender_msgs, batch, payload);
            }
        }
        Ok(())
    }

    fn register_send(&self, num_ots: usize, bitlen: usize) -> SenderBatch {
        assert!(num_ots > 0, "batch must contain at least one OT");
        assert!(bitlen > 0, "OT bit length must be positive");
        let mut reg = self.send_reg.lock().expect("send registration poisoned");
        assert!(!reg.sealed, "OT batch registered after setup started");
        let batch_id = reg.batches.len() as BatchId;
        let offset = reg.total_ots;
        reg.total_ots += num_ots;
        let (pads_tx, pads_rx) = oneshot::channel();
        reg.batches.push(SendBatchInfo {
            offset,
            num_ots,
            bitlen,
            pads_tx,
        });
        let corrections_rx = register_slot(&self.routing.corrections, batch_id);
        SenderBatch {
            batch_id,
            num_ots,
            bitlen,
            out: self.out.clone(),
            setup: Cached::new(pads_rx),
            corrections: Cached::new(corrections_rx),
        }
    }

    fn register_recv(&self, num_ots: usize, bitlen: usize) -> ReceiverBatch {
        assert!(num_ots > 0, "batch must contain at least one OT");
        assert!(bitlen > 0, "OT bit length must be positive");
        let mut reg = self.recv_reg.lock().expect("recv registration poisoned");
        assert!(!reg.sealed, "OT batch registered after setup started");
        let batch_id = reg.batches.len() as BatchId;
        let offset = reg.total_ots;
        reg.total_ots += num_ots;
        let (outputs_tx, outputs_rx) = oneshot::channel();
        reg.batches.push(RecvBatchInfo {
            offset,
            num_ots,
            bitlen,
            outputs_tx,
        });
        let msg_rx = register_slot(&self.routing.sender_msgs, batch_id);
        ReceiverBatch {
            batch_id,
            num_ots,
            bitlen,
            out: self.out.clone(),
            setup: Cached::new(outputs_rx),
            sender_msg: Cached::new(msg_rx),
        }
    }

    /// Resets the registration counters and pending-message slots so a new
    /// circuit can register fresh batches. Per-batch state lives in the
    /// handles and dies with them.
    pub fn clear(&self) {
        *self.send_reg.lock().expect("send registration poisoned") = Registration::default();
        *self.recv_reg.lock().expect("recv registration poisoned") = Registration::default();
        self.routing
            .corrections
            .lock()
            .expect("routing map poisoned")
            .clear();
        self.routing
            .sender_msgs
            .lock()
            .expect("routing map poisoned")
            .clear();
    }

    /// Runs the extension-sender setup: base OTs in the receiver role,
    /// matrix expansion, mask application, transpose and compression into
    /// the per-OT pads (y0, y1).
    pub async fn send_setup<RNG>(&self, rng: &mut RNG) -> Result<(), OtError>
    where
        RNG: RngCore + CryptoRng + Send,
    {
        let (total_ots, batches) = {
            let mut reg = self.send_reg.lock().expect("send registration poisoned");
            reg.sealed = true;
            (reg.total_ots, std::mem::take(&mut reg.batches))
        };
        if total_ots == 0 {
            return Ok(());
        }
        debug!(total_ots, "starting OT extension send setup");

        let base_choices = base_ot::random_choices(BASE_OT_COUNT, rng);
        let base_keys = {
            let mut base_rx = self
                .base_send_rx
                .lock()
                .await
                .take()
                .expect("send_setup may only run once");
            let (fwd_tx, fwd_rx) = channel(8);
            let forwarder = tokio::spawn(forward_base_msgs(self.out.clone(), fwd_rx, true));
            let keys = base_ot::Receiver
                .receive_random(&base_choices, rng, &fwd_tx, &mut base_rx)
                .await?;
            drop(fwd_tx);
            let _ = forwarder.await;
            keys
        };

        let padded_bits = total_ots.next_multiple_of(BASE_OT_COUNT);
        let padded_bytes = padded_bits / 8;

        // expand the base keys into the matrix rows
        let mut matrix = vec![0u8; BASE_OT_COUNT * padded_bytes];
        for (row, key) in matrix.chunks_exact_mut(padded_bytes).zip(&base_keys) {
            AesRng::from_block(*key).fill_bytes(row);
        }

        // apply the receiver's masks where our base choice bit is set
        let mut masks_rx = self
            .masks_rx
            .lock()
            .await
            .take()
            .expect("send_setup may only run once");
        let mut received = 0usize;
        while received < BASE_OT_COUNT {
            let (row, mask) = masks_rx.recv().await.ok_or(OtError::ChannelClosed)?;
            let row = row as usize;
            assert!(row < BASE_OT_COUNT, "mask row out of range");
            assert_eq!(mask.len(), padded_bytes, "mask length mismatch");
            if base_choices[row] {
                let row_bytes = &mut matrix[row * padded_bytes..(row + 1) * padded_bytes];
                row_bytes.iter_mut().zip(&mask).for_each(|(v, u)| *v ^= u);
            }
            received += 1;
        }

        let transposed = BitMatrixView::from_slice(&matrix, BASE_OT_COUNT, padded_bits)
            .transpose()
            .into_vec();
        let delta = Block::from_bits(&base_choices);
        let hash = fixed_key_hash();

        for batch in batches {
            let mut y0 = Vec::with_capacity(batch.num_ots);
            let mut y1 = Vec::with_capacity(batch.num_ots);
            for j in 0..batch.num_ots {
                let i = batch.offset + j;
                let q = Block::from_le_bytes(
                    transposed[i * Block::BYTES..(i + 1) * Block::BYTES]
                        .try_into()
                        .expect("16 byte row"),
                );
                y0.push(expand_pad(
                    hash.tccr_hash_block(q, i as u128),
                    batch.bitlen,
                ));
                y1.push(expand_pad(
                    hash.tccr_hash_block(q ^ delta, i as u128),
                    batch.bitlen,
                ));
            }
            // a dropped handle just discards its pads
            let _ = batch.pads_tx.send(SenderBatchSetup { y0, y1 });
        }
        debug!("OT extension send setup finished");
        Ok(())
    }

    /// Runs the extension-receiver setup: base OTs in the sender role,
    /// random choices, mask rows to the peer, transpose and compression into
    /// the per-OT outputs.
    pub async fn receive_setup<RNG>(&self, rng: &mut RNG) -> Result<(), OtError>
    where
        RNG: RngCore + CryptoRng + Send,
    {
        let (total_ots, batches) = {
            let mut reg = self.recv_reg.lock().expect("recv registration poisoned");
            reg.sealed = true;
            (reg.total_ots, std::mem::take(&mut reg.batches))
        };
        if total_ots == 0 {
            return Ok(());
        }
        debug!(total_ots, "starting OT extension receive setup");

        let base_keys = {
            let mut base_rx = self
                .base_recv_rx
                .lock()
                .await
                .take()
                .expect("receive_setup may only run once");
            let (fwd_tx, fwd_rx) = channel(8);
            let forwarder = tokio::spawn(forward_base_msgs(self.out.clone(), fwd_rx, false));
            let keys = base_ot::Sender
                .send_random(BASE_OT_COUNT, rng, &fwd_tx, &mut base_rx)
                .await?;
            drop(fwd_tx);
            let _ = forwarder.await;
            keys
        };

        let padded_bits = total_ots.next_multiple_of(BASE_OT_COUNT);
        let padded_bytes = padded_bits / 8;

        // random choices are fixed now; the real choices are derandomized
        // later by the correction bits
        let random_choices = {
            let mut bits = base_ot::random_choices(total_ots, rng);
            bits.resize(padded_bits, false);
            bits
        };
        let choice_bytes = random_choices.as_raw_slice();

        let mut matrix = vec![0u8; BASE_OT_COUNT * padded_bytes];
        for (i, ([key0, key1], row)) in base_keys
            .iter()
            .zip(matrix.chunks_exact_mut(padded_bytes))
            .enumerate()
        {
            AesRng::from_block(*key0).fill_bytes(row);
            let mut mask = vec![0u8; padded_bytes];
            AesRng::from_block(*key1).fill_bytes(&mut mask);
            mask.iter_mut()
                .zip(row.iter())
                .zip(choice_bytes)
                .for_each(|((u, t), r)| *u ^= t ^ r);
            self.out
                .send(OtMsg::ReceiverMasks {
                    row: i as u32,
                    mask,
                })
                .await?;
        }

        let transposed = BitMatrixView::from_slice(&matrix, BASE_OT_COUNT, padded_bits)
            .transpose()
            .into_vec();
        let hash = fixed_key_hash();

        for batch in batches {
            let mut outputs = Vec::with_capacity(batch.num_ots);
            for j in 0..batch.num_ots {
                let i = batch.offset + j;
                let t = Block::from_le_bytes(
                    transposed[i * Block::BYTES..(i + 1) * Block::BYTES]
                        .try_into()
                        .expect("16 byte row"),
                );
                outputs.push(expand_pad(
                    hash.tccr_hash_block(t, i as u128),
                    batch.bitlen,
                ));
            }
            let batch_choices = random_choices[batch.offset..batch.offset + batch.num_ots]
                .to_bitvec();
            let _ = batch.outputs_tx.send(ReceiverBatchSetup {
                outputs,
                random_choices: batch_choices,
            });
        }
        debug!("OT extension receive setup finished");
        Ok(())
    }

    // ---- flavor registration, sender side ----

    pub fn register_send_fixed_xcot_128(&self, num_ots: usize) -> FixedXcot128Sender {
        FixedXcot128Sender::new(self.register_send(num_ots, 128))
    }

    pub fn register_send_xcot_bit(&self, num_ots: usize) -> XcotBitSender {
        XcotBitSender::new(self.register_send(num_ots, 1))
    }

    pub fn register_send_acot<T: OtRing>(
        &self,
        num_ots: usize,
        vector_size: usize,
    ) -> AcotSender<T> {
        assert!(vector_size > 0, "vector size must be positive");
        AcotSender::new(self.register_send(num_ots, T::BITS * vector_size), vector_size)
    }

    pub fn register_send_got_128(&self, num_ots: usize) -> Got128Sender {
        Got128Sender::new(self.register_send(num_ots, 128))
    }

    pub fn register_send_got_bit(&self, num_ots: usize) -> GotBitSender {
        GotBitSender::new(self.register_send(num_ots, 1))
    }

    pub fn register_send_rot(&self, num_ots: usize, vector_size: usize) -> RotSender {
        assert!(vector_size > 0, "vector size must be positive");
        RotSender::new(self.register_send(num_ots, vector_size))
    }

    // ---- flavor registration, receiver side ----

    pub fn register_receive_fixed_xcot_128(&self, num_ots: usize) -> FixedXcot128Receiver {
        FixedXcot128Receiver::new(self.register_recv(num_ots, 128))
    }

    pub fn register_receive_xcot_bit(&self, num_ots: usize) -> XcotBitReceiver {
        XcotBitReceiver::new(self.register_recv(num_ots, 1))
    }

    pub fn register_receive_acot<T: OtRing>(
        &self,
        num_ots: usize,
        vector_size: usize,
    ) -> AcotReceiver<T> {
        assert!(vector_size > 0, "vector size must be positive");
        AcotReceiver::new(self.register_recv(num_ots, T::BITS * vector_size), vector_size)
    }

    pub fn register_receive_got_128(&self, num_ots: usize) -> Got128Receiver {
        Got128Receiver::new(self.register_recv(num_ots, 128))
    }

    pub fn register_receive_got_bit(&self, num_ots: usize) -> GotBitReceiver {
        GotBitReceiver::new(self.register_recv(num_ots, 1))
    }

    pub fn register_receive_rot(&self, num_ots: usize, vector_size: usize) -> RotReceiver {
        assert!(vector_size > 0, "vector size must be positive");
        RotReceiver::new(self.register_recv(num_ots, vector_size))
    }
}

async fn forward_base_msgs(
    out: ChanSender<OtMsg>,
    mut queue: ChanReceiver<BaseOtMsg>,
    from_ext_sender: bool,
) {
    while let Some(msg) = queue.recv().await {
        if out
            .send(OtMsg::BaseSetup {
                from_ext_sender,
                msg,
            })
            .await
            .is_err()
        {
            return;
        }
    }
}

fn fulfill<T>(map: &StdMutex<HashMap<BatchId, Slot<T>>>, id: BatchId, value: T) {
    let mut map = map.lock().expect("routing map poisoned");
    match map.remove(&id) {
        Some(Slot::Waiting(tx)) => {
            // a dropped handle just discards the message
            let _ = tx.send(value);
        }
        Some(Slot::Arrived(_)) => panic!("duplicate message for OT batch {id}"),
        None => {
            map.insert(id, Slot::Arrived(value));
        }
    }
}

fn register_slot<T>(map: &StdMutex<HashMap<BatchId, Slot<T>>>, id: BatchId) -> oneshot::Receiver<T> {
    let (tx, rx) = oneshot::channel();
    let mut map = map.lock().expect("routing map poisoned");
    match map.remove(&id) {
        Some(Slot::Arrived(value)) => {
            let _ = tx.send(value);
        }
        Some(Slot::Waiting(_)) => panic!("duplicate OT batch id {id}"),
        None => {
            map.insert(id, Slot::Waiting(tx));
        }
    }
    rx
}

/// Truncates or seed-expands a compressed block to `bitlen` bits.
fn expand_pad(seed: Block, bitlen: usize) -> BitVector {
    let mut bits = if bitlen <= 128 {
        BitVector::from_vec(seed.to_le_bytes().to_vec())
    } else {
        let mut bytes = vec![0u8; bitlen.div_ceil(8)];
        AesRng::from_block(seed).fill_bytes(&mut bytes);
        BitVector::from_vec(bytes)
    };
    bits.truncate(bitlen);
    bits
}

/// Value-carrying future that may be awaited through several methods of a
/// batch handle; the first await resolves the one-shot, later ones read the
/// cache.
pub(crate) struct Cached<T> {
    rx: Option<oneshot::Receiver<T>>,
    value: Option<T>,
}

impl<T> Cached<T> {
    fn new(rx: oneshot::Receiver<T>) -> Self {
        Self {
            rx: Some(rx),
            value: None,
        }
    }

    pub(crate) async fn get(&mut self) -> Result<&T, OtError> {
        if self.value.is_none() {
            let rx = self.rx.take().expect("cached value polled after failure");
            let value = rx.await.map_err(|_| OtError::SetupInterrupted)?;
            self.value = Some(value);
        }
        Ok(self.value.as_ref().expect("value set above"))
    }

    /// Shared access after a successful [`Cached::get`].
    pub(crate) fn value_ref(&self) -> &T {
        self.value.as_ref().expect("value not resolved yet")
    }
}

/// Common state of all sender-side batch handles.
pub(crate) struct SenderBatch {
    batch_id: BatchId,
    num_ots: usize,
    #[allow(dead_code)]
    bitlen: usize,
    out: ChanSender<OtMsg>,
    setup: Cached<SenderBatchSetup>,
    corrections: Cached<BitVector>,
}

impl SenderBatch {
    pub(crate) fn num_ots(&self) -> usize {
        self.num_ots
    }

    /// Blocks until the extension setup has produced this batch's pads.
    pub(crate) async fn setup(&mut self) -> Result<&SenderBatchSetup, OtError> {
        self.setup.get().await
    }

    /// Blocks until the receiver's correction bits for this batch arrived.
    pub(crate) async fn corrections(&mut self) -> Result<&BitVector, OtError> {
        self.corrections.get().await
    }

    pub(crate) async fn send(&self, payload: SenderPayload) -> Result<(), OtError> {
        self.out
            .send(OtMsg::SenderMessage {
                batch: self.batch_id,
                payload,
            })
            .await?;
        Ok(())
    }

    /// Resolves both the setup pads and the correction bits so the caller
    /// can borrow them together.
    pub(crate) async fn setup_and_corrections(
        &mut self,
    ) -> Result<(&SenderBatchSetup, &BitVector), OtError> {
        self.setup.get().await?;
        let corrections = self.corrections.get().await?;
        assert_eq!(
            corrections.len(),
            self.num_ots,
            "corrections length mismatch"
        );
        Ok((self.setup.value_ref(), self.corrections.value_ref()))
    }
}

/// Common state of all receiver-side batch handles.
pub(crate) struct ReceiverBatch {
    batch_id: BatchId,
    num_ots: usize,
    #[allow(dead_code)]
    bitlen: usize,
    out: ChanSender<OtMsg>,
    setup: Cached<ReceiverBatchSetup>,
    sender_msg: Cached<SenderPayload>,
}

impl ReceiverBatch {
    pub(crate) fn num_ots(&self) -> usize {
        self.num_ots
    }

    pub(crate) async fn setup(&mut self) -> Result<&ReceiverBatchSetup, OtError> {
        self.setup.get().await
    }

    pub(crate) async fn sender_message(&mut self) -> Result<&SenderPayload, OtError> {
        self.sender_msg.get().await
    }

    /// Resolves both the setup outputs and the sender's message so the
    /// caller can borrow them together.
    pub(crate) async fn setup_and_message(
        &mut self,
    ) -> Result<(&ReceiverBatchSetup, &SenderPayload), OtError> {
        self.setup.get().await?;
        self.sender_msg.get().await?;
        Ok((self.setup.value_ref(), self.sender_msg.value_ref()))
    }

    /// Derandomizes the batch: sends `real ^ random` choices to the sender.
    pub(crate) async fn send_corrections(&mut self, real_choices: &BitVector) -> Result<(), OtError> {
        let random = &self.setup.get().await?.random_choices;
        assert_eq!(real_choices.len(), random.len(), "choice length mismatch");
        let corrections = real_choices.clone() ^ random.as_bitslice();
        self.out
            .send(OtMsg::ReceiverCorrections {
                batch: self.batch_id,
                corrections,
            })
            .await?;
        Ok(())
    }
}

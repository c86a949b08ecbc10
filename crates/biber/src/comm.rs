//! Gate-level messages and their routing.
//!
//! Every online interaction of a gate emits at most one message per
//! sub-message sequence number, typed by gate id. The registry pairs
//! registered futures with incoming messages so batches of gates can
//! complete out of order; payloads are raw little-endian bytes, decoded by
//! the registering gate which knows the expected shape.

use crate::common::{ring_from_bytes, BitVec};
use crate::errors::GateError;
use crate::ring::Ring;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GateMessage {
    pub gate_id: u64,
    /// Sub-message sequence for gates with more than one round.
    pub seq: u8,
    pub payload: Vec<u8>,
}

enum Slot {
    Waiting(oneshot::Sender<Vec<u8>>),
    Arrived(Vec<u8>),
}

/// Routes incoming gate messages into the futures registered at gate
/// construction, keyed by (gate id, seq).
#[derive(Default)]
pub(crate) struct MessageRegistry {
    slots: Mutex<HashMap<(u64, u8), Slot>>,
}

impl MessageRegistry {
    pub(crate) fn register(&self, gate_id: u64, seq: u8) -> MsgFuture {
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots.lock().expect("message registry poisoned");
        match slots.remove(&(gate_id, seq)) {
            Some(Slot::Arrived(payload)) => {
                let _ = tx.send(payload);
            }
            Some(Slot::Waiting(_)) => {
                panic!("second future registered for gate {gate_id} seq {seq}")
            }
            None => {
                slots.insert((gate_id, seq), Slot::Waiting(tx));
            }
        }
        MsgFuture { rx }
    }

    pub(crate) fn deliver(&self, msg: GateMessage) {
        let mut slots = self.slots.lock().expect("message registry poisoned");
        match slots.remove(&(msg.gate_id, msg.seq)) {
            Some(Slot::Waiting(tx)) => {
                // the receiving gate may have been dropped after an abort
                let _ = tx.send(msg.payload);
            }
            Some(Slot::Arrived(_)) => panic!(
                "duplicate message for gate {} seq {}",
                msg.gate_id, msg.seq
            ),
            None => {
                slots.insert((msg.gate_id, msg.seq), Slot::Arrived(msg.payload));
            }
        }
    }

    pub(crate) fn clear(&self) {
        self.slots.lock().expect("message registry poisoned").clear();
    }
}

pub(crate) struct MsgFuture {
    rx: oneshot::Receiver<Vec<u8>>,
}

impl MsgFuture {
    pub(crate) async fn get(self) -> Result<Vec<u8>, GateError> {
        self.rx.await.map_err(|_| GateError::ChannelClosed)
    }
}

/// Future of a packed bit-vector message of known length.
pub(crate) struct BitsFuture {
    inner: MsgFuture,
    num_bits: usize,
}

impl BitsFuture {
    pub(crate) fn new(inner: MsgFuture, num_bits: usize) -> Self {
        Self { inner, num_bits }
    }

    pub(crate) async fn get(self) -> Result<BitVec, GateError> {
        let bytes = self.inner.get().await?;
        if bytes.len() != self.num_bits.div_ceil(8) {
            return Err(GateError::MalformedMessage);
        }
        let mut bits = BitVec::from_vec(bytes);
        bits.truncate(self.num_bits);
        Ok(bits)
    }
}

/// Future of a ring-vector message of known length.
pub(crate) struct IntsFuture<T> {
    inner: MsgFuture,
    len: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Ring> IntsFuture<T> {
    pub(crate) fn new(inner: MsgFuture, len: usize) -> Self {
        Self {
            inner,
            len,
            _marker: std::marker::PhantomData,
        }
    }

    pub(crate) async fn get(self) -> Result<Vec<T>, GateError> {
        let bytes = self.inner.get().await?;
        ring_from_bytes(&bytes, self.len).ok_or(GateError::MalformedMessage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_out_of_order() {
        let registry = MessageRegistry::default();
        // message arrives before the future is registered
        registry.deliver(GateMessage {
            gate_id: 1,
            seq: 0,
            payload: vec![0xff],
        });
        let fut = registry.register(1, 0);
        assert_eq!(vec![0xff], fut.get().await.unwrap());

        // future registered before the message arrives
        let fut = registry.register(2, 1);
        registry.deliver(GateMessage {
            gate_id: 2,
            seq: 1,
            payload: vec![1, 2],
        });
        assert_eq!(vec![1, 2], fut.get().await.unwrap());
    }
}

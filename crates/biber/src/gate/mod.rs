//! The gate contract and the building blocks shared by all gate
//! implementations.
//!
//! A gate declares whether it takes part in the setup and online pass; the
//! scheduler calls [`Gate::evaluate_setup`] before [`Gate::evaluate_online`]
//! and dispatches gates in registration order. Both methods may suspend on
//! wire readiness, OT batches or message futures.

use crate::errors::GateError;
use async_trait::async_trait;
use tokio::sync::oneshot;

pub mod arithmetic;
pub mod boolean;
pub mod conversion;
pub mod fss_gate;
pub mod gmw;
pub mod mixed;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateId(pub u64);

impl std::fmt::Display for GateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[async_trait]
pub trait Gate: Send {
    fn gate_id(&self) -> GateId;

    fn need_setup(&self) -> bool {
        true
    }

    fn need_online(&self) -> bool {
        true
    }

    async fn evaluate_setup(&mut self) -> Result<(), GateError>;

    async fn evaluate_online(&mut self) -> Result<(), GateError>;
}

/// Hands a plaintext input value to an input gate; the gate's online phase
/// blocks until the value is set.
pub struct InputSetter<V> {
    tx: oneshot::Sender<V>,
}

impl<V> InputSetter<V> {
    pub(crate) fn new() -> (Self, oneshot::Receiver<V>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn set(self, value: V) -> Result<(), GateError> {
        self.tx.send(value).map_err(|_| GateError::ChannelClosed)
    }
}

/// Future of a gate's plaintext result, fulfilled during the online pass.
pub struct OutputFuture<V> {
    rx: oneshot::Receiver<V>,
}

impl<V> OutputFuture<V> {
    pub(crate) fn new() -> (oneshot::Sender<V>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    pub async fn get(self) -> Result<V, GateError> {
        self.rx.await.map_err(|_| GateError::ChannelClosed)
    }
}

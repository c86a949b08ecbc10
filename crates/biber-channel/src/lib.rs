//! Channel abstraction for two-party communication.
//!
//! A channel is a typed, ordered, reliable message pipe between the two
//! parties. [`in_memory::new_pair`] connects two parties within one process
//! (used by the tests and benchmarks), [`tcp`] runs the same interface over
//! a length-delimited bincode framing. The engine core only ever sees
//! [`Sender`] and [`Receiver`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod in_memory;
pub mod tcp;

/// Default capacity used for the bounded channel pairs.
pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum CommunicationError {
    #[error("the remote end of the channel is closed")]
    Closed,
    #[error("io error on transport")]
    Io(#[from] std::io::Error),
    #[error("unable to serialize message")]
    Serialize(#[source] bincode::Error),
    #[error("unable to deserialize message")]
    Deserialize(#[source] bincode::Error),
}

/// Sending half of a channel. Cloneable so that several components of one
/// party (gates, OT batches) can write to the same peer.
#[derive(Debug)]
pub struct Sender<T>(mpsc::Sender<T>);

/// Receiving half of a channel.
#[derive(Debug)]
pub struct Receiver<T>(mpsc::Receiver<T>);

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Send> Sender<T> {
    pub async fn send(&self, msg: T) -> Result<(), CommunicationError> {
        self.0.send(msg).await.map_err(|_| CommunicationError::Closed)
    }
}

impl<T: Send> Receiver<T> {
    /// Receives the next message. `None` once the peer hung up.
    pub async fn recv(&mut self) -> Option<T> {
        self.0.recv().await
    }
}

/// Creates an unconnected sender/receiver pair, the building block for the
/// in-memory and TCP transports.
pub fn channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Sender(tx), Receiver(rx))
}

/// Marker bound for everything that can travel between the parties.
pub trait Message: Serialize + DeserializeOwned + Send + 'static {}

impl<T: Serialize + DeserializeOwned + Send + 'static> Message for T {}

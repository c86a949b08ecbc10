//! Transport seam between the engine and the outside world.
//!
//! The engine speaks over three typed sub-channels: gate messages (public
//! shares, output contributions), OT-extension messages and a control
//! channel (seed exchange, sync fences). [`in_memory_pair`] wires two
//! backends together inside one process; [`tcp`] multiplexes the three
//! sub-channels over a single framed TCP connection.

use crate::comm::GateMessage;
use biber_channel::{channel, in_memory, CommunicationError, Receiver, Sender, DEFAULT_CAPACITY};
use biber_ot::extension::OtMsg;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum ControlMsg {
    /// Seed for the shared-randomness generators, exchanged once at backend
    /// construction.
    Seed([u8; 32]),
    /// Sync fence counter.
    Sync(u64),
}

/// Wire envelope when all sub-channels share one connection.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Envelope {
    Gate(GateMessage),
    Ot(OtMsg),
    Control(ControlMsg),
}

pub struct Transport {
    pub(crate) gate_tx: Sender<GateMessage>,
    pub(crate) gate_rx: Receiver<GateMessage>,
    pub(crate) ot_tx: Sender<OtMsg>,
    pub(crate) ot_rx: Receiver<OtMsg>,
    pub(crate) control_tx: Sender<ControlMsg>,
    pub(crate) control_rx: Receiver<ControlMsg>,
}

/// Connects two in-process backends.
pub fn in_memory_pair() -> (Transport, Transport) {
    let ((gate_tx0, gate_rx0), (gate_tx1, gate_rx1)) = in_memory::default_pair();
    let ((ot_tx0, ot_rx0), (ot_tx1, ot_rx1)) = in_memory::new_pair(256);
    let ((control_tx0, control_rx0), (control_tx1, control_rx1)) = in_memory::default_pair();
    (
        Transport {
            gate_tx: gate_tx0,
            gate_rx: gate_rx0,
            ot_tx: ot_tx0,
            ot_rx: ot_rx0,
            control_tx: control_tx0,
            control_rx: control_rx0,
        },
        Transport {
            gate_tx: gate_tx1,
            gate_rx: gate_rx1,
            ot_tx: ot_tx1,
            ot_rx: ot_rx1,
            control_tx: control_tx1,
            control_rx: control_rx1,
        },
    )
}

/// Establishes the transport over TCP. By convention party 0 listens and
/// party 1 connects; message framing is handled by `biber-channel`.
pub async fn tcp(
    my_id: usize,
    listen_addr: SocketAddr,
    peer_addr: SocketAddr,
) -> Result<Transport, CommunicationError> {
    let (env_tx, env_rx) = if my_id == 0 {
        biber_channel::tcp::listen::<Envelope>(listen_addr).await?
    } else {
        biber_channel::tcp::connect::<Envelope>(peer_addr).await?
    };
    Ok(demux(env_tx, env_rx))
}

/// Splits a single envelope connection into the three typed sub-channels.
fn demux(env_tx: Sender<Envelope>, mut env_rx: Receiver<Envelope>) -> Transport {
    let (gate_in_tx, gate_rx) = channel(DEFAULT_CAPACITY);
    let (ot_in_tx, ot_rx) = channel(256);
    let (control_in_tx, control_rx) = channel(DEFAULT_CAPACITY);
    tokio::spawn(async move {
        while let Some(envelope) = env_rx.recv().await {
            let res = match envelope {
                Envelope::Gate(msg) => gate_in_tx.send(msg).await.is_ok(),
                Envelope::Ot(msg) => ot_in_tx.send(msg).await.is_ok(),
                Envelope::Control(msg) => control_in_tx.send(msg).await.is_ok(),
            };
            if !res {
                return;
            }
        }
    });

    let (gate_tx, gate_out_rx) = channel::<GateMessage>(DEFAULT_CAPACITY);
    let (ot_tx, ot_out_rx) = channel::<OtMsg>(256);
    let (control_tx, control_out_rx) = channel::<ControlMsg>(DEFAULT_CAPACITY);
    spawn_mux(env_tx.clone(), gate_out_rx, Envelope::Gate);
    spawn_mux(env_tx.clone(), ot_out_rx, Envelope::Ot);
    spawn_mux(env_tx, control_out_rx, Envelope::Control);

    Transport {
        gate_tx,
        gate_rx,
        ot_tx,
        ot_rx,
        control_tx,
        control_rx,
    }
}

fn spawn_mux<T: Send + 'static>(
    env_tx: Sender<Envelope>,
    mut rx: Receiver<T>,
    wrap: fn(T) -> Envelope,
) {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if env_tx.send(wrap(msg)).await.is_err() {
                return;
            }
        }
    });
}

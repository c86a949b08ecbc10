//! TCP transport: one stream per channel, u32-length-delimited bincode
//! frames. The read and write loops run as background tasks so the engine
//! sees the same [`Sender`]/[`Receiver`] interface as in-memory channels.

use crate::{channel, CommunicationError, Message, Receiver, Sender, DEFAULT_CAPACITY};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

const MAX_FRAME_SIZE: u32 = 1 << 30;
const CONNECT_RETRY: Duration = Duration::from_millis(100);

/// Listens on `addr` for the peer and turns the accepted stream into a
/// channel pair.
pub async fn listen<T: Message>(
    addr: SocketAddr,
) -> Result<(Sender<T>, Receiver<T>), CommunicationError> {
    let listener = TcpListener::bind(addr).await?;
    let (stream, peer) = listener.accept().await?;
    debug!(%peer, "accepted connection");
    Ok(spawn_io(stream))
}

/// Connects to the peer at `addr`, retrying until it listens.
pub async fn connect<T: Message>(
    addr: SocketAddr,
) -> Result<(Sender<T>, Receiver<T>), CommunicationError> {
    let stream = loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => break stream,
            Err(err) => {
                debug!(%addr, %err, "connect failed, retrying");
                tokio::time::sleep(CONNECT_RETRY).await;
            }
        }
    };
    debug!(%addr, "connected");
    Ok(spawn_io(stream))
}

fn spawn_io<T: Message>(stream: TcpStream) -> (Sender<T>, Receiver<T>) {
    stream.set_nodelay(true).ok();
    let (read_half, write_half) = stream.into_split();
    let (out_tx, out_rx) = channel::<T>(DEFAULT_CAPACITY);
    let (in_tx, in_rx) = channel::<T>(DEFAULT_CAPACITY);
    tokio::spawn(write_loop(write_half, out_rx));
    tokio::spawn(read_loop(read_half, in_tx));
    (out_tx, in_rx)
}

async fn write_loop<T: Message>(write_half: OwnedWriteHalf, mut queue: Receiver<T>) {
    let mut writer = BufWriter::new(write_half);
    while let Some(msg) = queue.recv().await {
        let bytes = match bincode::serialize(&msg) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "dropping unserializable message");
                continue;
            }
        };
        let len = bytes.len() as u32;
        if writer.write_all(&len.to_le_bytes()).await.is_err()
            || writer.write_all(&bytes).await.is_err()
            || writer.flush().await.is_err()
        {
            warn!("peer closed the connection while sending");
            return;
        }
    }
}

async fn read_loop<T: Message>(read_half: OwnedReadHalf, queue: Sender<T>) {
    let mut reader = BufReader::new(read_half);
    loop {
        let mut len_bytes = [0u8; 4];
        if reader.read_exact(&mut len_bytes).await.is_err() {
            return;
        }
        let len = u32::from_le_bytes(len_bytes);
        if len > MAX_FRAME_SIZE {
            warn!(len, "oversized frame, closing connection");
            return;
        }
        let mut bytes = vec![0u8; len as usize];
        if reader.read_exact(&mut bytes).await.is_err() {
            return;
        }
        match bincode::deserialize(&bytes) {
            Ok(msg) => {
                if queue.send(msg).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(%err, "undecodable frame, closing connection");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct TestMsg {
        id: u64,
        payload: Vec<u8>,
    }

    #[tokio::test]
    async fn round_trip() {
        let addr: SocketAddr = "127.0.0.1:17735".parse().unwrap();
        let server = tokio::spawn(async move { listen::<TestMsg>(addr).await.unwrap() });
        let (client_tx, mut client_rx) = connect::<TestMsg>(addr).await.unwrap();
        let (server_tx, mut server_rx) = server.await.unwrap();

        let msg = TestMsg {
            id: 3,
            payload: vec![1, 2, 3],
        };
        client_tx.send(msg).await.unwrap();
        assert_eq!(
            Some(TestMsg {
                id: 3,
                payload: vec![1, 2, 3]
            }),
            server_rx.recv().await
        );

        server_tx
            .send(TestMsg {
                id: 4,
                payload: vec![],
            })
            .await
            .unwrap();
        assert_eq!(4, client_rx.recv().await.unwrap().id);
    }
}

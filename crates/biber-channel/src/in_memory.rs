//! In-memory channel pairs for tests and single-process simulations.

use crate::{channel, Receiver, Sender, DEFAULT_CAPACITY};

/// Connects two parties: the first tuple is party 0's view, the second
/// party 1's.
pub fn new_pair<T>(capacity: usize) -> ((Sender<T>, Receiver<T>), (Sender<T>, Receiver<T>)) {
    let (tx0, rx1) = channel(capacity);
    let (tx1, rx0) = channel(capacity);
    ((tx0, rx0), (tx1, rx1))
}

/// [`new_pair`] with the default capacity.
pub fn default_pair<T>() -> ((Sender<T>, Receiver<T>), (Sender<T>, Receiver<T>)) {
    new_pair(DEFAULT_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ping_pong() {
        let ((tx0, mut rx0), (tx1, mut rx1)) = default_pair::<u32>();
        tx0.send(17).await.unwrap();
        assert_eq!(Some(17), rx1.recv().await);
        tx1.send(4).await.unwrap();
        assert_eq!(Some(4), rx0.recv().await);
        drop(tx0);
        assert_eq!(None, rx1.recv().await);
    }
}

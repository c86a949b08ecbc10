//! Write-once readiness cells backing the wire conditions.

use tokio::sync::watch;

/// A one-shot, notify-all condition carrying the value it guards.
///
/// The producing gate calls [`ShareCell::set`] exactly once; every consumer
/// awaiting [`ShareCell::wait`] is woken and receives a clone. Setting twice
/// is a fatal programming error.
pub(crate) struct ShareCell<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> ShareCell<T> {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub(crate) fn set(&self, value: T) {
        self.tx.send_modify(|slot| {
            assert!(slot.is_none(), "wire readiness signalled twice");
            *slot = Some(value);
        });
    }

    pub(crate) fn is_set(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub(crate) async fn wait(&self) -> T {
        let mut rx = self.tx.subscribe();
        let guard = rx
            .wait_for(|slot| slot.is_some())
            .await
            .expect("sender lives as long as the cell");
        guard.as_ref().expect("checked by wait_for").clone()
    }
}

impl<T> std::fmt::Debug for ShareCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.tx.borrow().is_some() {
            "ready"
        } else {
            "pending"
        };
        f.debug_tuple("ShareCell").field(&state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wakes_waiters() {
        let cell = std::sync::Arc::new(ShareCell::<u32>::new());
        let waiter = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.wait().await })
        };
        tokio::task::yield_now().await;
        cell.set(99);
        assert_eq!(99, waiter.await.unwrap());
        // late waiters see the value immediately
        assert_eq!(99, cell.wait().await);
    }

    #[test]
    #[should_panic(expected = "signalled twice")]
    fn double_set_panics() {
        let cell = ShareCell::new();
        cell.set(1);
        cell.set(2);
    }
}

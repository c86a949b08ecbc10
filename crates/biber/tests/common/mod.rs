//! Shared helpers for the two-party integration tests.

use biber::backend::{Backend, BackendConfig};
use biber::transport;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Two backends connected through in-memory channels.
pub async fn connected_backends() -> (Backend, Backend) {
    let (t0, t1) = transport::in_memory_pair();
    let (b0, b1) = tokio::join!(
        Backend::new(BackendConfig::new(0), t0),
        Backend::new(BackendConfig::new(1), t1),
    );
    (b0.unwrap(), b1.unwrap())
}

//! # Biber: a two-party BEAVY-style MPC engine
//!
//! Two mutually distrusting, semi-honest parties hold additive secret shares
//! of values and jointly evaluate a circuit of arithmetic (mod 2^W) and
//! Boolean gates, revealing only designated outputs.
//!
//! Every value `x` on a BEAVY wire is represented by a secret share λ_i per
//! party and a public share Δ = x + λ (Boolean: ⊕) known to both. Evaluation
//! happens in two waves: the *setup* pass consumes correlated randomness
//! from the OT-extension pipeline and fixes the secret shares, the *online*
//! pass exchanges the public shares with a single round per nonlinear gate.
//! Linear gates (XOR, ADD, NEG, INV) are entirely local.
//!
//! The [`backend::Backend`] owns the registered gates and runs both passes;
//! wires signal their per-phase readiness through one-shot conditions, so
//! gates suspend cooperatively instead of being scheduled topologically.
//!
//! ```no_run
//! # use biber::backend::{Backend, BackendConfig};
//! # use biber::transport;
//! # async fn party() -> anyhow::Result<()> {
//! let (t0, _t1) = transport::in_memory_pair();
//! let mut backend = Backend::new(BackendConfig::new(0), t0).await?;
//! let beavy = backend.beavy();
//! let (input, wire) = beavy.make_arithmetic_input_gate_my::<u32>(0, 1)?;
//! let output = beavy.make_arithmetic_output_gate::<u32>(&wire, 0)?;
//! input.set(vec![42])?;
//! backend.run().await?;
//! assert_eq!(vec![42], output.get().await?);
//! # Ok(())
//! # }
//! ```

pub mod arith;
pub mod backend;
pub mod beavy;
pub mod common;
pub mod errors;
pub(crate) mod cell;
pub mod comm;
pub mod fss;
pub mod gate;
pub mod gmw;
pub mod providers;
pub mod ring;
pub mod transport;
pub mod wire;

pub(crate) mod base_provider;
pub(crate) mod core;

pub use backend::{Backend, BackendConfig};
pub use beavy::BeavyProvider;
pub use errors::{ExecutorError, GateError};
pub use gmw::GmwProvider;
pub use ring::Ring;

/// Output owner designating both parties.
pub const ALL_PARTIES: usize = usize::MAX;

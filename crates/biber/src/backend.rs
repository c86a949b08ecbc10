//! The backend: owns the registered gates, the providers and the transport
//! routers, and runs the two evaluation passes.
//!
//! `run` executes preprocessing (seedless base OTs, OT-extension matrix,
//! pool generation), then the setup pass and the online pass. Gates are
//! dispatched in registration order; dependency resolution happens through
//! the per-wire readiness conditions, so the parallel mode simply polls all
//! gate futures of a pass cooperatively.

use crate::base_provider::BaseProvider;
use crate::beavy::BeavyProvider;
use crate::core::{Core, Register};
use crate::errors::ExecutorError;
use crate::gmw::GmwProvider;
use crate::providers::{MtProvider, SbProvider, SpProvider};
use crate::transport::{ControlMsg, Transport};
use biber_channel::{Receiver as ChanReceiver, Sender as ChanSender};
use biber_ot::extension::OtExtension;
use futures::future::try_join_all;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use std::sync::Arc;
use tracing::{debug, info};

pub struct BackendConfig {
    pub my_id: usize,
}

impl BackendConfig {
    pub fn new(my_id: usize) -> Self {
        assert!(matches!(my_id, 0 | 1), "party id must be 0 or 1");
        Self { my_id }
    }
}

pub struct Backend {
    core: Arc<Core>,
    register: Arc<Register>,
    control_tx: ChanSender<ControlMsg>,
    control_rx: ChanReceiver<ControlMsg>,
    sync_counter: u64,
}

impl Backend {
    /// Connects the backend: exchanges the shared-randomness seeds and
    /// spawns the message routers.
    pub async fn new(config: BackendConfig, transport: Transport) -> Result<Self, ExecutorError> {
        let Transport {
            gate_tx,
            mut gate_rx,
            ot_tx,
            mut ot_rx,
            control_tx,
            mut control_rx,
        } = transport;

        let mut rng = ChaChaRng::from_entropy();
        let my_seed = BaseProvider::random_seed(&mut rng);
        control_tx.send(ControlMsg::Seed(my_seed)).await?;
        let their_seed = match control_rx.recv().await {
            Some(ControlMsg::Seed(seed)) => seed,
            _ => return Err(ExecutorError::SyncAborted),
        };
        debug!(my_id = config.my_id, "seed exchange finished");

        let ot = Arc::new(OtExtension::new(ot_tx));
        let mt = Arc::new(MtProvider::default());
        let sp = Arc::new(SpProvider::new(config.my_id));
        let sb = Arc::new(SbProvider::new(config.my_id));
        let core = Arc::new(Core::new(
            config.my_id,
            gate_tx,
            rng,
            BaseProvider::new(my_seed, their_seed),
            Arc::clone(&ot),
            mt,
            sp,
            sb,
        ));
        let register = Arc::new(Register::default());

        // message routers deliver into the per-gate / per-batch slots until
        // the peer hangs up
        let gate_core = Arc::clone(&core);
        tokio::spawn(async move {
            while let Some(msg) = gate_rx.recv().await {
                gate_core.registry.deliver(msg);
            }
        });
        let ot_router = Arc::clone(&ot);
        tokio::spawn(async move {
            while let Some(msg) = ot_rx.recv().await {
                if ot_router.handle_message(msg).await.is_err() {
                    return;
                }
            }
        });

        Ok(Self {
            core,
            register,
            control_tx,
            control_rx,
            sync_counter: 0,
        })
    }

    pub fn my_id(&self) -> usize {
        self.core.my_id
    }

    /// Gate factory for the BEAVY sharing.
    pub fn beavy(&self) -> BeavyProvider {
        BeavyProvider::new(Arc::clone(&self.core), Arc::clone(&self.register))
    }

    /// Gate factory for the GMW sharing.
    pub fn gmw(&self) -> GmwProvider {
        GmwProvider::new(Arc::clone(&self.core), Arc::clone(&self.register))
    }

    /// Multiplication-triple provider of this backend.
    pub fn mt_provider(&self) -> Arc<MtProvider> {
        Arc::clone(&self.core.mt)
    }

    /// Square-pair provider of this backend.
    pub fn sp_provider(&self) -> Arc<SpProvider> {
        Arc::clone(&self.core.sp)
    }

    /// Shared-bit provider of this backend.
    pub fn sb_provider(&self) -> Arc<SbProvider> {
        Arc::clone(&self.core.sb)
    }

    /// Runs the function-independent preprocessing: base OTs, the
    /// OT-extension setups of both roles and the MT/SP/SB pool generation.
    pub async fn run_preprocessing(&mut self) -> Result<(), ExecutorError> {
        info!(my_id = self.core.my_id, "running preprocessing");
        self.core.mt.register_ots(&self.core.ot, &self.core.arith());
        self.core.sp.register_ots(&self.core.arith());
        self.core.sb.register_ots(&self.core.ot);

        let mut send_rng = ChaChaRng::from_entropy();
        let mut recv_rng = ChaChaRng::from_entropy();
        let (send_res, recv_res) = tokio::join!(
            self.core.ot.send_setup(&mut send_rng),
            self.core.ot.receive_setup(&mut recv_rng),
        );
        send_res.map_err(ExecutorError::Preprocessing)?;
        recv_res.map_err(ExecutorError::Preprocessing)?;

        let mut mt_rng = ChaChaRng::from_entropy();
        let mut sp_rng = ChaChaRng::from_entropy();
        let mut sb_rng = ChaChaRng::from_entropy();
        let (mt_res, sp_res, sb_res) = tokio::join!(
            self.core.mt.generate(&mut mt_rng),
            self.core.sp.generate(&mut sp_rng),
            self.core.sb.generate(&mut sb_rng),
        );
        mt_res.map_err(ExecutorError::Preprocessing)?;
        sp_res.map_err(ExecutorError::Preprocessing)?;
        sb_res.map_err(ExecutorError::Preprocessing)?;
        info!(my_id = self.core.my_id, "preprocessing finished");
        Ok(())
    }

    /// Runs the setup pass and then the online pass, polling all gate
    /// futures of a pass cooperatively.
    pub async fn evaluate_parallel(&mut self) -> Result<(), ExecutorError> {
        let mut gates = self.register.take_gates();
        info!(num_gates = gates.len(), "starting setup pass");
        try_join_all(gates.iter_mut().filter(|g| g.need_setup()).map(|gate| {
            let gate_id = gate.gate_id();
            async move {
                gate.evaluate_setup().await.map_err(|source| ExecutorError::Gate {
                    gate_id: gate_id.0,
                    phase: "setup",
                    source,
                })
            }
        }))
        .await?;
        info!("starting online pass");
        try_join_all(gates.iter_mut().filter(|g| g.need_online()).map(|gate| {
            let gate_id = gate.gate_id();
            async move {
                gate.evaluate_online().await.map_err(|source| ExecutorError::Gate {
                    gate_id: gate_id.0,
                    phase: "online",
                    source,
                })
            }
        }))
        .await?;
        info!("evaluation finished");
        Ok(())
    }

    /// Runs both passes strictly in registration order. Gates still suspend
    /// on readiness and message futures, so peers progress each other.
    pub async fn evaluate_sequential(&mut self) -> Result<(), ExecutorError> {
        let mut gates = self.register.take_gates();
        for gate in gates.iter_mut().filter(|g| g.need_setup()) {
            let gate_id = gate.gate_id();
            gate.evaluate_setup().await.map_err(|source| ExecutorError::Gate {
                gate_id: gate_id.0,
                phase: "setup",
                source,
            })?;
        }
        for gate in gates.iter_mut().filter(|g| g.need_online()) {
            let gate_id = gate.gate_id();
            gate.evaluate_online().await.map_err(|source| ExecutorError::Gate {
                gate_id: gate_id.0,
                phase: "online",
                source,
            })?;
        }
        Ok(())
    }

    /// Preprocessing followed by both evaluation passes.
    pub async fn run(&mut self) -> Result<(), ExecutorError> {
        self.run_preprocessing().await?;
        self.evaluate_parallel().await
    }

    /// Fence: both parties exchange a counter and block until the peer
    /// reached the same point.
    pub async fn sync(&mut self) -> Result<(), ExecutorError> {
        self.sync_counter += 1;
        self.control_tx
            .send(ControlMsg::Sync(self.sync_counter))
            .await?;
        match self.control_rx.recv().await {
            Some(ControlMsg::Sync(counter)) if counter == self.sync_counter => Ok(()),
            _ => Err(ExecutorError::SyncAborted),
        }
    }

    /// Resets gates, message slots and provider pools so a fresh circuit
    /// can be registered and evaluated without reconnecting.
    pub fn clear(&mut self) {
        self.register.reset();
        self.core.registry.clear();
        self.core.ot.clear();
        self.core.mt.reset();
        self.core.sp.reset();
        self.core.sb.reset();
        self.sync_counter = 0;
    }
}

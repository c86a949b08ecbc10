use biber_channel::CommunicationError;
use biber_ot::OtError;
use thiserror::Error;

/// Errors surfaced by a gate during either evaluation phase.
///
/// Programming errors (mismatched SIMD sizes, empty wire vectors, wrong wire
/// protocol) are caught at gate construction and reported as
/// [`GateError::Construction`]; once a gate is registered its evaluation
/// only fails when the peer disappears or deviates.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("invalid gate construction: {0}")]
    Construction(&'static str),
    #[error("input value was dropped before the online phase")]
    MissingInput,
    #[error("provided input has the wrong shape")]
    InvalidInput,
    #[error("message from peer has the wrong length")]
    MalformedMessage,
    #[error("channel to the peer is closed")]
    ChannelClosed,
    #[error("ot extension failed")]
    Ot(#[from] OtError),
}

impl From<CommunicationError> for GateError {
    fn from(_: CommunicationError) -> Self {
        GateError::ChannelClosed
    }
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("error during preprocessing")]
    Preprocessing(#[source] OtError),
    #[error("gate {gate_id} failed during the {phase} phase")]
    Gate {
        gate_id: u64,
        phase: &'static str,
        #[source]
        source: GateError,
    },
    #[error("connection to peer lost")]
    Channel(#[from] CommunicationError),
    #[error("peer closed the connection during the sync fence")]
    SyncAborted,
}

use crate::channel::connection_manager::ConnectionState;
use crate::channel::domain::transport::{DisconnectKind, TransportMode};

/// Who initiated a rate change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateSource {
    Manual,
    Server,
}

/// Typed notifications from the pipeline, delivered on an outbound
/// queue so consumers can be swapped without touching the core.
///
/// Recoverable conditions surface here as state changes, never as hard
/// failures.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    ConnectionChanged {
        state: ConnectionState,
        mode: TransportMode,
    },
    /// A classified drop; terminal kinds require explicit user action
    /// to reconnect.
    Disconnected { kind: DisconnectKind },
    SessionReady {
        session_id: Option<String>,
        /// True when the handshake self-resolved on timeout with
        /// assumed defaults rather than a server acknowledgment.
        locally_resolved: bool,
    },
    RateAdjusted {
        fps: f64,
        source: RateSource,
    },
    FallbackActivated,
    FallbackDeactivated,
    BatchReceived {
        face_count: usize,
        processing_ms: f64,
    },
    FrameSent {
        sequence: u64,
    },
    ServerError {
        code: u32,
        message: String,
    },
}

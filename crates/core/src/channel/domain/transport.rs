use thiserror::Error;

use crate::protocol::messages::{ClientMessage, ServerMessage};

/// Bidirectional mode used to reach the inference service.
///
/// WebSocket is preferred; long-polling exists for intermediaries that
/// reject upgrade requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    WebSocket,
    LongPolling,
}

impl TransportMode {
    /// The next, more compatible mode to try after a transport-level
    /// rejection. The most compatible mode has no further fallback.
    pub fn downgrade(self) -> Option<TransportMode> {
        match self {
            TransportMode::WebSocket => Some(TransportMode::LongPolling),
            TransportMode::LongPolling => None,
        }
    }
}

/// Why a channel went away. Drives retry policy and caller-facing UX.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectKind {
    /// The server closed the session on purpose. Terminal: retrying
    /// requires explicit user action.
    ServerInitiated,
    /// The underlying stream dropped. Transient: retried automatically.
    TransportClosed,
    /// No inbound traffic within the liveness window. Transient:
    /// retried automatically.
    LivenessTimeout,
}

impl DisconnectKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, DisconnectKind::ServerInitiated)
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid endpoint {url}: {reason}")]
    Endpoint { url: String, reason: String },
    #[error("connection attempt timed out")]
    ConnectTimedOut,
    /// The mode itself was refused (e.g. an intermediary rejected the
    /// upgrade). Signals the manager to downgrade, not to give up.
    #[error("transport rejected: {0}")]
    Rejected(String),
    #[error("connection closed")]
    Closed(DisconnectKind),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding failure: {0}")]
    Codec(#[from] serde_json::Error),
}

/// One live bidirectional link to the inference service.
///
/// `poll` must return promptly (bounded by a short read timeout) so the
/// cooperative tick loop never stalls on the network.
pub trait Transport: Send {
    fn send(&mut self, message: &ClientMessage) -> Result<(), TransportError>;

    /// The next inbound message, or `None` when nothing is ready.
    fn poll(&mut self) -> Result<Option<ServerMessage>, TransportError>;

    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Opens a transport for the given mode, performing the connection
/// handshake within a bounded wait.
pub trait TransportFactory: Send {
    fn open(&self, mode: TransportMode) -> Result<Box<dyn Transport>, TransportError>;
}

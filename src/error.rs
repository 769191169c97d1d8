//! Error kinds for the client
//!
//! Every failure in this client is terminal for the process. The variants
//! map one-to-one onto the phase that failed so `main` can print a
//! diagnostic naming it.

use thiserror::Error;

use crate::handshake::HandshakeState;
use crate::registry::RequiredGlobal;

/// Fatal client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The compositor could not be reached
    #[error("cannot connect to the Wayland compositor: {0}")]
    Connection(String),

    /// Memory-backed file creation, sizing or mapping failed
    #[error("shared memory {operation} failed: {source}")]
    Resource {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A required global was never advertised before the round-trip returned
    #[error("compositor does not advertise {}", .0.interface())]
    MissingCapability(RequiredGlobal),

    /// The connection broke while dispatching events
    #[error("transport error: {0}")]
    Transport(String),

    /// A lifecycle step was requested from the wrong state
    #[error("invalid handshake transition {from:?} -> {to:?}")]
    Handshake {
        from: HandshakeState,
        to: HandshakeState,
    },
}

impl ClientError {
    /// Name of the phase that failed, for user-visible diagnostics
    pub fn phase(&self) -> &'static str {
        match self {
            ClientError::Connection(_) => "connect",
            ClientError::Resource { .. } => "buffer allocation",
            ClientError::MissingCapability(_) => "global discovery",
            ClientError::Transport(_) => "event dispatch",
            ClientError::Handshake { .. } => "surface handshake",
        }
    }

    pub(crate) fn resource(operation: &'static str, source: std::io::Error) -> Self {
        ClientError::Resource { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

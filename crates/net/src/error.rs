//! Network error types

use std::io;

use counselbook_core::ErrorKind;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server handled the call and refused it
    #[error("{message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("Server setup failed: {0}")]
    Core(#[from] counselbook_core::Error),
}

impl Error {
    /// Error kind reported by the server, if this is a refused call
    pub fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

//! Errors raised while resolving, connecting, or tearing down the IRRd
//! session.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to resolve address")]
    Resolve(#[source] io::Error),

    #[error("no resolved address could be connected")]
    NoAddressConnected,

    #[error("kernel rejected every send-buffer size candidate")]
    SendBufferTooSmall,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("timed out waiting for socket readiness")]
    Timeout,
}

//! Top-level error type. Every crate in the workspace converts into this one
//! at the `irrexpand` boundary via `#[from]`; everything that cannot
//! legitimately abort a run is logged instead of returned here (see §7 of
//! the component design: non-fatal reports use `log::warn!`/`log::error!`).

use thiserror::Error;

use irrexpand_proto::ProtoError;
use irrexpand_radix::RadixError;
use irrexpand_transport::TransportError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Radix(#[from] RadixError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A fatal protocol-level condition that doesn't belong to any one
    /// crate's error enum: EOF mid-response, a source switch that didn't
    /// reply `C`, calling `run` a second time, and similar logic errors.
    #[error("{0}")]
    Fatal(String),

    /// A `!s` source-switch command got a reply other than `C`.
    #[error("source switch rejected: {0}")]
    SourceSwitchRejected(String),
}

//! Connection management for an IRRd session: address resolution,
//! connect-with-linger, send-buffer sizing, the `!!`/`!n` handshake, and
//! teardown. The [`raw`] module exposes the lower-level, non-blocking
//! socket surface the pipelined I/O loop drives directly.

#![cfg_attr(all(feature = "is_sync", feature = "async"), allow(dead_code))]

#[cfg(all(feature = "is_sync", feature = "async"))]
compile_error!(
    "irrexpand-transport: enable exactly one of `is_sync` or `async`, not both. \
    Building both backends into the same binary is not supported."
);
#[cfg(not(any(feature = "is_sync", feature = "async")))]
compile_error!("irrexpand-transport: enable one of `is_sync` or `async`.");

pub mod config;
pub mod connect;
pub mod error;
pub mod raw;

#[cfg(feature = "async")]
pub mod connect_async;

pub use config::ConnectConfig;
pub use connect::Connection;
pub use error::TransportError;
pub use raw::{Ready, RawTransport};

#[cfg(feature = "is_sync")]
pub use raw::MioTransport;

#[cfg(feature = "async")]
pub use connect_async::AsyncConnection;
#[cfg(feature = "async")]
pub use raw::TokioTransport;

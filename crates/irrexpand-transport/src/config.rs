//! Parameters the connection manager needs to establish a session.

use std::time::Duration;

/// How long `SO_LINGER` keeps a socket open after close, once enabled.
pub const LINGER: Duration = Duration::from_secs(5);

/// How long the readiness-wait primitive blocks before treating the peer as
/// unresponsive.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything [`crate::connect`] needs to reach and identify to an IRRd
/// server.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub server: String,
    pub port: u16,
    /// Send an `!n<ident>\n` banner and discard the echoed reply.
    pub identify: bool,
    /// The identifier sent in the `!n` banner, when `identify` is set.
    pub client_ident: String,
    /// Switch the socket to non-blocking once the handshake completes.
    pub pipelining: bool,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: 43,
            identify: true,
            client_ident: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            pipelining: true,
        }
    }
}

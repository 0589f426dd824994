//! Async counterpart of [`crate::connect::Connection`], backed by `tokio`.
//! Mirrors the same resolve/connect/handshake/teardown sequence; kept as a
//! separate module (rather than threaded through `maybe-async`) because the
//! socket2-level send-buffer and linger setup differs enough between a
//! blocking `std::net::TcpStream` and a `tokio::net::TcpStream` that sharing
//! a single body would obscure more than it would save.

use std::io;

use socket2::Socket;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream};

use crate::config::ConnectConfig;
use crate::connect::SEND_BUFFER_CANDIDATES;
use crate::error::TransportError;

pub struct AsyncConnection {
    stream: TcpStream,
    send_buffer_size: usize,
}

impl AsyncConnection {
    pub async fn connect(config: &ConnectConfig) -> Result<Self, TransportError> {
        let addrs: Vec<_> = lookup_host((config.server.as_str(), config.port))
            .await
            .map_err(TransportError::Resolve)?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match connect_one(addr).await {
                Ok((stream, send_buffer_size)) => {
                    let mut conn = Self {
                        stream,
                        send_buffer_size,
                    };
                    conn.handshake(config).await?;
                    return Ok(conn);
                }
                Err(e) => {
                    log::debug!("connect to {addr} failed: {e}");
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(TransportError::SendBufferTooSmall) => Err(TransportError::SendBufferTooSmall),
            _ => Err(TransportError::NoAddressConnected),
        }
    }

    async fn handshake(&mut self, config: &ConnectConfig) -> Result<(), TransportError> {
        self.stream.write_all(b"!!\n").await?;
        if config.identify {
            let line = format!("!n{}\n", config.client_ident);
            self.stream.write_all(line.as_bytes()).await?;
            let mut discard = [0u8; 256];
            self.stream.read(&mut discard).await?;
        }
        Ok(())
    }

    pub fn send_buffer_size(&self) -> usize {
        self.send_buffer_size
    }

    pub fn into_inner(self) -> TcpStream {
        self.stream
    }

    pub async fn teardown(mut self) -> Result<(), TransportError> {
        let _ = self.stream.write_all(b"!q\n").await;
        self.stream.shutdown().await?;
        Ok(())
    }
}

async fn connect_one(addr: std::net::SocketAddr) -> Result<(TcpStream, usize), TransportError> {
    let domain = socket2::Domain::for_address(addr);
    let socket = Socket::new(domain, socket2::Type::STREAM, Some(socket2::Protocol::TCP))?;
    socket.set_linger(Some(crate::config::LINGER))?;
    socket.set_nonblocking(true)?;

    let std_stream: std::net::TcpStream = socket.into();
    match std_stream.connect(addr) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
        Err(e) => return Err(TransportError::Io(e)),
    }
    let stream = TcpStream::from_std(std_stream)?;
    stream.writable().await?;
    if let Some(e) = stream.take_error()? {
        return Err(TransportError::Io(e));
    }

    let socket = socket2::SockRef::from(&stream);
    let mut acquired = None;
    for &candidate in SEND_BUFFER_CANDIDATES {
        if socket.set_send_buffer_size(candidate).is_ok() {
            acquired = Some(candidate);
            break;
        }
    }
    let Some(send_buffer_size) = acquired else {
        return Err(TransportError::SendBufferTooSmall);
    };

    Ok((stream, send_buffer_size))
}

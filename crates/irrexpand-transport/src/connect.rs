//! Connection manager (C8): resolve, connect with linger and a grown send
//! buffer, run the `!!`/`!n` handshake, and tear down with `!q`.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use socket2::Socket;

use crate::config::{ConnectConfig, LINGER};
use crate::error::TransportError;

/// Send-buffer sizes tried, in order, if the kernel rejects the previous
/// candidate. The original tool asked the kernel for its actual maximum;
/// absent that introspection, we probe a descending ladder instead.
pub(crate) const SEND_BUFFER_CANDIDATES: &[usize] = &[1 << 20, 1 << 18, 1 << 16, 1 << 14, 1 << 12];

/// A connected, handshaken session. Still blocking; [`Self::into_nonblocking`]
/// switches it for the pipelined I/O loop.
pub struct Connection {
    stream: TcpStream,
    send_buffer_size: usize,
}

impl Connection {
    /// Wraps an already-connected stream without running resolve/connect or
    /// the `!!`/`!n` handshake. Useful for embedding a pre-established
    /// stream (or, in tests, an in-process loopback pair) instead of
    /// reaching a real IRRd server through [`Self::connect`].
    pub fn from_stream(stream: TcpStream, send_buffer_size: usize) -> Self {
        Self {
            stream,
            send_buffer_size,
        }
    }

    /// Resolves `config.server:config.port`, connects to the first address
    /// that accepts a connection and a grown send buffer, then runs the
    /// handshake.
    pub fn connect(config: &ConnectConfig) -> Result<Self, TransportError> {
        let addrs = (config.server.as_str(), config.port)
            .to_socket_addrs()
            .map_err(TransportError::Resolve)?;

        let mut last_err = None;
        for addr in addrs {
            match connect_one(addr) {
                Ok((stream, send_buffer_size)) => {
                    let mut conn = Self {
                        stream,
                        send_buffer_size,
                    };
                    conn.handshake(config)?;
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

    fn handshake(&mut self, config: &ConnectConfig) -> Result<(), TransportError> {
        self.stream.write_all(b"!!\n")?;
        if config.identify {
            let line = format!("!n{}\n", config.client_ident);
            self.stream.write_all(line.as_bytes())?;
            let mut discard = [0u8; 256];
            self.stream.read(&mut discard)?;
        }
        Ok(())
    }

    pub fn send_buffer_size(&self) -> usize {
        self.send_buffer_size
    }

    /// Reads one line synchronously (used for the source-switch handshake
    /// in §4.7, before pipelining is enabled).
    pub fn read_line(&mut self) -> Result<String, TransportError> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = self.stream.read(&mut byte)?;
            if n == 0 {
                break;
            }
            if byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.stream.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Blocking read of whatever bytes are immediately available, for
    /// callers (like [`crate::raw::RawTransport`]'s synchronous counterpart
    /// in the `irrexpand` crate) that need to feed an arbitrary byte parser
    /// rather than a single line.
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.stream.read(buf)?)
    }

    /// Switches to non-blocking mode for the pipelined I/O loop, handing
    /// back the raw stream.
    pub fn into_nonblocking(self) -> Result<TcpStream, TransportError> {
        self.stream.set_nonblocking(true)?;
        Ok(self.stream)
    }

    /// Writes `!q\n`, restores blocking mode (if it had been switched),
    /// shuts down both directions, and drops the socket.
    pub fn teardown(mut self) -> Result<(), TransportError> {
        self.stream.set_nonblocking(false)?;
        let _ = self.stream.write_all(b"!q\n");
        self.stream.shutdown(Shutdown::Both)?;
        Ok(())
    }
}

fn connect_one(addr: std::net::SocketAddr) -> Result<(TcpStream, usize), TransportError> {
    let domain = socket2::Domain::for_address(addr);
    let socket = Socket::new(domain, socket2::Type::STREAM, Some(socket2::Protocol::TCP))?;
    socket.set_linger(Some(LINGER))?;
    socket.connect(&addr.into())?;

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

    socket.set_read_timeout(Some(Duration::from_secs(30)))?;
    Ok((socket.into(), send_buffer_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn connects_and_runs_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 3];
            stream.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"!!\n");

            let mut ident = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                stream.read_exact(&mut byte).unwrap();
                if byte[0] == b'\n' {
                    break;
                }
                ident.push(byte[0]);
            }
            assert!(String::from_utf8_lossy(&ident).starts_with("!n"));
            stream.write_all(b"hello\n").unwrap();
        });

        let config = ConnectConfig {
            server: addr.ip().to_string(),
            port: addr.port(),
            ..ConnectConfig::default()
        };
        let conn = Connection::connect(&config).expect("connect should succeed");
        assert!(conn.send_buffer_size() > 0);
        server.join().unwrap();
    }
}

//! The minimal socket surface the pipelined I/O loop needs, shared between
//! the `mio`-backed synchronous transport and the `tokio`-backed
//! asynchronous one (selected at compile time by the `is_sync`/`async`
//! feature).

use std::io;
use std::time::Duration;

use maybe_async::maybe_async;

use crate::error::TransportError;

/// Readiness direction to wait for in [`RawTransport::wait_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ready {
    Read,
    ReadWrite,
}

#[maybe_async(AFIT)]
pub trait RawTransport: Send {
    /// Attempts a non-blocking read. `Ok(0)` is EOF; `io::ErrorKind::WouldBlock`
    /// means the caller should wait on [`Self::wait_ready`] and retry.
    async fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Attempts a non-blocking write. `io::ErrorKind::WouldBlock` means the
    /// caller should wait on [`Self::wait_ready`] and retry.
    async fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Blocks up to `timeout` for the requested readiness. Returns
    /// `Err(TransportError::Timeout)` on expiry with nothing ready.
    async fn wait_ready(&mut self, want: Ready, timeout: Duration) -> Result<(), TransportError>;

    /// Shuts down both directions of the underlying socket.
    async fn shutdown(&mut self) -> io::Result<()>;
}

#[cfg(feature = "is_sync")]
mod mio_backend {
    use super::*;
    use mio::net::TcpStream as MioTcpStream;
    use mio::{Events, Interest, Poll, Token};
    use std::io::{Read, Write};
    use std::net::{Shutdown, TcpStream as StdTcpStream};

    const SOCKET: Token = Token(0);

    /// `mio`-backed [`RawTransport`]: one `Poll` instance per connection,
    /// re-registered for read-only or read+write interest as the caller's
    /// write queue empties or fills.
    pub struct MioTransport {
        stream: MioTcpStream,
        poll: Poll,
        events: Events,
        registered_write: bool,
    }

    impl MioTransport {
        /// Takes ownership of an already-connected, already-non-blocking
        /// stream and registers it for readiness polling.
        pub fn new(std_stream: StdTcpStream) -> io::Result<Self> {
            let mut stream = MioTcpStream::from_std(std_stream);
            let poll = Poll::new()?;
            poll.registry()
                .register(&mut stream, SOCKET, Interest::READABLE)?;
            Ok(Self {
                stream,
                poll,
                events: Events::with_capacity(4),
                registered_write: false,
            })
        }
    }

    #[maybe_async(AFIT)]
    impl RawTransport for MioTransport {
        async fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.stream.read(buf)
        }

        async fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.stream.write(buf)
        }

        async fn wait_ready(&mut self, want: Ready, timeout: Duration) -> Result<(), TransportError> {
            let want_write = want == Ready::ReadWrite;
            if want_write != self.registered_write {
                let interest = if want_write {
                    Interest::READABLE | Interest::WRITABLE
                } else {
                    Interest::READABLE
                };
                self.poll
                    .registry()
                    .reregister(&mut self.stream, SOCKET, interest)?;
                self.registered_write = want_write;
            }
            self.poll.poll(&mut self.events, Some(timeout))?;
            if self.events.is_empty() {
                return Err(TransportError::Timeout);
            }
            Ok(())
        }

        async fn shutdown(&mut self) -> io::Result<()> {
            self.stream.shutdown(Shutdown::Both)
        }
    }
}

#[cfg(feature = "is_sync")]
pub use mio_backend::MioTransport;

#[cfg(feature = "async")]
mod tokio_backend {
    use super::*;
    use tokio::io::Interest as TokioInterest;
    use tokio::net::TcpStream as TokioTcpStream;

    /// `tokio`-backed [`RawTransport`]: relies on the runtime's reactor
    /// instead of an owned `Poll`, so readiness waits delegate to
    /// [`TokioTcpStream::ready`] directly.
    pub struct TokioTransport {
        stream: TokioTcpStream,
    }

    impl TokioTransport {
        pub fn new(stream: TokioTcpStream) -> Self {
            Self { stream }
        }
    }

    #[maybe_async(AFIT)]
    impl RawTransport for TokioTransport {
        async fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.stream.try_read(buf)
        }

        async fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.stream.try_write(buf)
        }

        async fn wait_ready(&mut self, want: Ready, timeout: Duration) -> Result<(), TransportError> {
            let interest = match want {
                Ready::Read => TokioInterest::READABLE,
                Ready::ReadWrite => TokioInterest::READABLE | TokioInterest::WRITABLE,
            };
            match tokio::time::timeout(timeout, self.stream.ready(interest)).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(TransportError::Io(e)),
                Err(_) => Err(TransportError::Timeout),
            }
        }

        async fn shutdown(&mut self) -> io::Result<()> {
            use tokio::io::AsyncWriteExt;
            self.stream.shutdown().await
        }
    }
}

#[cfg(feature = "async")]
pub use tokio_backend::TokioTransport;

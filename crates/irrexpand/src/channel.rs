//! RF1: unifies the pipelined and synchronous expansion paths behind one
//! `submit`/`drain` contract, so `expander.rs` does not branch on
//! pipelining except to pick which implementation to construct.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use maybe_async::maybe_async;

use irrexpand_proto::{Frame, FrameReader};
use irrexpand_transport::{Connection, RawTransport, Ready};

use crate::error::Error;
use crate::request::Request;
use crate::source::SourceController;

const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Both channels below expose the same `submit`/`drain` shape (RF1): queue
/// a request, then flush everything queued, dispatching each parsed frame
/// to a callback alongside the request it answers. They are not unified
/// behind a literal `dyn` trait — `Pipeline`'s methods are async under the
/// `async` Cargo feature (to share `RawTransport::wait_ready`), while
/// `Synchronous` always blocks on `std::net` regardless of that feature, so
/// a single object-safe trait would not fit both. `expander.rs` picks
/// between them with a small enum instead of dynamic dispatch.
///
/// Blocking, strictly-sequenced channel: one request written and its single
/// reply read before the next is submitted. Used for the non-pipelined
/// expansion path and for the source-switch fallback retry (§4.7), which
/// needs ordering across a source switch that pipelining cannot give.
pub(crate) struct Synchronous {
    connection: Connection,
    frame_reader: FrameReader,
    pending: VecDeque<Request>,
}

impl Synchronous {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            frame_reader: FrameReader::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn into_connection(self) -> Connection {
        self.connection
    }

    pub fn submit(&mut self, request: Request) -> Result<(), Error> {
        self.pending.push_back(request);
        Ok(())
    }

    /// Writes and reads every pending request in FIFO order, dispatching
    /// each reply as it arrives. `on_frame` may return further requests
    /// (e.g. recursive set expansion); they are appended to the same queue
    /// and drained before this call returns, so the whole recursive
    /// expansion completes in one `drain`.
    pub fn drain(
        &mut self,
        on_frame: &mut dyn FnMut(Request, Frame) -> Result<Vec<Request>, Error>,
    ) -> Result<(), Error> {
        while let Some(request) = self.pending.pop_front() {
            let frame = self.roundtrip(&request)?;
            let more = on_frame(request, frame)?;
            self.pending.extend(more);
        }
        Ok(())
    }

    /// Same as [`Self::drain`], but every round-trip goes through
    /// `source`'s fallback: a request answered `NotFound` under restricted
    /// sources is retried once under defaults (§4.7). This applies to
    /// recursive sub-requests discovered along the way too, not just the
    /// first request drained.
    pub fn drain_with_fallback(
        &mut self,
        source: &SourceController,
        on_frame: &mut dyn FnMut(Request, Frame) -> Result<Vec<Request>, Error>,
    ) -> Result<(), Error> {
        while let Some(request) = self.pending.pop_front() {
            let frame = source.with_fallback(self, |c| c.roundtrip(&request))?;
            let more = on_frame(request, frame)?;
            self.pending.extend(more);
        }
        Ok(())
    }

    /// Writes `request` immediately and blocks for its single reply,
    /// bypassing the pending queue — used by the source-switch handshake,
    /// which must complete strictly between macro expansions.
    pub fn roundtrip(&mut self, request: &Request) -> Result<Frame, Error> {
        self.exchange(&request.line)
    }

    /// Writes a bare command line and blocks for its single reply, for
    /// callers (the source controller) that don't need a [`Request`]'s
    /// bookkeeping.
    pub fn exchange(&mut self, line: &str) -> Result<Frame, Error> {
        self.connection.write_line(line)?;
        self.read_frame()
    }

    fn read_frame(&mut self) -> Result<Frame, Error> {
        loop {
            if let Some(frame) = self.frame_reader.try_parse()? {
                return Ok(frame);
            }
            let mut buf = [0u8; 4096];
            let n = self.connection.read_some(&mut buf)?;
            if n == 0 {
                return Err(Error::Fatal("connection closed mid-response".to_string()));
            }
            self.frame_reader.feed(&buf[..n]);
        }
    }
}

/// Non-blocking, multi-request-in-flight channel (C5). Maintains a write
/// queue of requests not yet fully sent and a read queue of sent-but-not-
/// yet-replied requests, in strict FIFO order (the protocol guarantees
/// in-order replies).
pub(crate) struct Pipeline<T: RawTransport> {
    transport: T,
    frame_reader: FrameReader,
    wq: VecDeque<Request>,
    rq: VecDeque<Request>,
}

impl<T: RawTransport> Pipeline<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            frame_reader: FrameReader::new(),
            wq: VecDeque::new(),
            rq: VecDeque::new(),
        }
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn submit(&mut self, request: Request) -> Result<(), Error> {
        self.wq.push_back(request);
        Ok(())
    }
}

#[maybe_async(AFIT)]
impl<T: RawTransport> Pipeline<T> {

    /// Drains `wq` then `rq` to empty, dispatching each parsed frame to
    /// `on_frame` alongside the request it answers. `on_frame` may return
    /// further requests (recursive set expansion); they are pushed onto
    /// `wq` so the same `drain` call carries them to completion too.
    pub async fn drain(
        &mut self,
        on_frame: &mut dyn FnMut(Request, Frame) -> Result<Vec<Request>, Error>,
    ) -> Result<(), Error> {
        loop {
            self.pump_writes().await?;
            if self.wq.is_empty() && self.rq.is_empty() {
                return Ok(());
            }
            if self.rq.is_empty() {
                self.transport.wait_ready(Ready::ReadWrite, READ_TIMEOUT).await?;
                continue;
            }
            match self.try_read_one_frame().await? {
                Some(frame) => {
                    let request = self.rq.pop_front().expect("rq checked non-empty above");
                    let more = on_frame(request, frame)?;
                    self.wq.extend(more);
                }
                None => {
                    let want = if self.wq.is_empty() {
                        Ready::Read
                    } else {
                        Ready::ReadWrite
                    };
                    self.transport.wait_ready(want, READ_TIMEOUT).await?;
                }
            }
        }
    }

    async fn pump_writes(&mut self) -> Result<(), Error> {
        while let Some(request) = self.wq.front_mut() {
            let bytes = request.line.as_bytes();
            match self.transport.try_write(&bytes[request.offset..]).await {
                Ok(0) => return Err(Error::Fatal("write returned 0 bytes".to_string())),
                Ok(n) => {
                    request.offset += n;
                    if request.offset >= bytes.len() {
                        let request = self.wq.pop_front().expect("front_mut returned Some above");
                        self.rq.push_back(request);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(irrexpand_transport::TransportError::from(e).into()),
            }
        }
        Ok(())
    }

    /// Reads whatever bytes are immediately available and attempts to parse
    /// one frame from them. `Ok(None)` means more bytes (or a wait) are
    /// needed; the caller should not spin without consulting readiness.
    async fn try_read_one_frame(&mut self) -> Result<Option<Frame>, Error> {
        let mut buf = [0u8; 4096];
        match self.transport.try_read(&mut buf).await {
            Ok(0) => Err(Error::Fatal("connection closed mid-response".to_string())),
            Ok(n) => {
                self.frame_reader.feed(&buf[..n]);
                Ok(self.frame_reader.try_parse()?)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                Ok(self.frame_reader.try_parse()?)
            }
            Err(e) => Err(irrexpand_transport::TransportError::from(e).into()),
        }
    }
}

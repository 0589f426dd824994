//! Incremental response-frame parsing.
//!
//! [`FrameReader`] turns a stream of raw bytes (delivered in whatever chunks
//! the transport happens to hand over) into a sequence of [`Frame`] values.
//! It never assumes that a single `read()` lines up with a protocol boundary:
//! bytes are appended via [`FrameReader::feed`] and [`FrameReader::try_parse`]
//! advances as far as the buffered data allows, leaving any leftover for the
//! next response.

use crate::error::ProtoError;

/// A fully decoded IRRd response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `A<n>` response: the exact payload bytes between the header and the
    /// `C` trailer.
    Data(Vec<u8>),
    /// `C` response: success, no data.
    NoData,
    /// `D` response: key not found.
    NotFound,
    /// `E` response: multiple keys matched (non-fatal; caller should report).
    MultipleKeys(String),
    /// `F` response: server-side error (non-fatal; caller should report).
    Error(String),
}

#[derive(Debug)]
enum State {
    /// Waiting for the one-line response header.
    Header,
    /// Waiting for `remaining` more payload bytes.
    Payload(usize),
    /// Waiting for the single `\n` right after the payload.
    TrailerNewline,
    /// Waiting for the `C\n` trailer line.
    TrailerLine,
}

/// Byte-at-a-time-safe parser for the IRRd response grammar.
#[derive(Debug)]
pub struct FrameReader {
    buf: Vec<u8>,
    payload: Vec<u8>,
    state: State,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            payload: Vec::new(),
            state: State::Header,
        }
    }

    /// Appends newly-read bytes to the internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Whether bytes are buffered that have not yet produced a frame.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Attempts to decode the next complete frame from buffered bytes.
    ///
    /// Returns `Ok(None)` when more bytes are needed before progress can be
    /// made; the caller should read more and call [`Self::feed`] again.
    pub fn try_parse(&mut self) -> Result<Option<Frame>, ProtoError> {
        loop {
            match self.state {
                State::Header => match self.take_line()? {
                    Some(line) => {
                        if let Some(frame) = self.dispatch_header(&line)? {
                            return Ok(Some(frame));
                        }
                    }
                    None => return Ok(None),
                },
                State::Payload(remaining) => {
                    if self.buf.len() < remaining {
                        return Ok(None);
                    }
                    self.payload.extend(self.buf.drain(..remaining));
                    self.state = State::TrailerNewline;
                }
                State::TrailerNewline => {
                    if self.buf.is_empty() {
                        return Ok(None);
                    }
                    let b = self.buf.remove(0);
                    if b != b'\n' {
                        return Err(ProtoError::MalformedTrailer(self.payload.len()));
                    }
                    self.state = State::TrailerLine;
                }
                State::TrailerLine => match self.take_line()? {
                    Some(line) => {
                        if line != b"C" {
                            return Err(ProtoError::MalformedTrailer(self.payload.len()));
                        }
                        let data = std::mem::take(&mut self.payload);
                        self.state = State::Header;
                        return Ok(Some(Frame::Data(data)));
                    }
                    None => return Ok(None),
                },
            }
        }
    }

    /// Returns the header line with its trailing `\n` stripped, draining it
    /// (and the newline) from `buf`. `None` if a full line isn't buffered yet.
    fn take_line(&mut self) -> Result<Option<Vec<u8>>, ProtoError> {
        let Some(nl) = self.buf.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.buf.drain(..=nl).collect();
        line.pop(); // drop the '\n'
        Ok(Some(line))
    }

    /// Interprets a header line, advancing `state` and returning a completed
    /// [`Frame`] for single-line responses (`C`/`D`/`E`/`F`), or `None` once
    /// `state` has moved on to await a payload (`A`).
    fn dispatch_header(&mut self, line: &[u8]) -> Result<Option<Frame>, ProtoError> {
        let Some(&code) = line.first() else {
            return Err(ProtoError::MalformedHeader(String::new()));
        };
        match code {
            b'A' => {
                let len_str = std::str::from_utf8(&line[1..])
                    .map_err(|_| ProtoError::MalformedHeader(lossy(line)))?;
                let len: usize = len_str
                    .trim()
                    .parse()
                    .map_err(|_| ProtoError::MalformedHeader(lossy(line)))?;
                self.payload.clear();
                self.state = State::Payload(len);
                Ok(None)
            }
            b'C' => {
                self.state = State::Header;
                Ok(Some(Frame::NoData))
            }
            b'D' => {
                self.state = State::Header;
                Ok(Some(Frame::NotFound))
            }
            b'E' => {
                self.state = State::Header;
                Ok(Some(Frame::MultipleKeys(lossy(&line[1..]))))
            }
            b'F' => {
                self.state = State::Header;
                Ok(Some(Frame::Error(lossy(&line[1..]))))
            }
            other => Err(ProtoError::UnknownResponseCode(other)),
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

//! Errors surfaced while framing or parsing IRRd responses.

use thiserror::Error;

/// Failures the [`crate::frame::FrameReader`] can raise while decoding a response.
///
/// Every variant here is fatal to the response it's decoding: a malformed
/// header, an unrecognized leading response code, or a trailer that doesn't
/// look like `C\n`. Well-formed `C`/`D`/`E`/`F` responses never produce an
/// error — they become [`crate::frame::Frame`] values instead.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("malformed response header: {0:?}")]
    MalformedHeader(String),

    #[error("unrecognized response code {0:#04x}")]
    UnknownResponseCode(u8),

    #[error("malformed trailer after {0}-byte payload")]
    MalformedTrailer(usize),

    /// Raised by [`crate::asn::parse_asn`] for a token that is neither a
    /// plain decimal ASN nor a dotted `high.low` one. Non-fatal: callers
    /// report it and drop the token rather than propagating it as `?`.
    #[error("could not parse {0:?} as an ASN")]
    InvalidAsn(String),
}

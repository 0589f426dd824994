//! Wire codec for the IRRd query protocol: request formatting, response
//! framing, and payload tokenization. This crate knows nothing about
//! sockets, recursion, or ASN/prefix semantics — it only turns commands into
//! bytes and bytes back into [`Frame`] values.

pub mod asn;
pub mod command;
pub mod error;
pub mod frame;
pub mod token;

pub use asn::parse_asn;
pub use error::ProtoError;
pub use frame::{Frame, FrameReader};
pub use token::tokenize;

//! Recursive IRR AS-set/route-set expander speaking the IRRd query protocol
//! over TCP (the historical `bgpq`-style client's core, reworked here as a
//! library crate).
//!
//! [`Expander`] is the entry point: seed it with [`ExpanderConfig`] plus the
//! macro/route-set names to expand, call [`Expander::run`], then read back
//! the accumulated ASNs and prefixes via [`Expander::asns`] and
//! [`Expander::prefixes`]. Formatting that output for a particular router
//! vendor's config syntax is a separate concern this crate doesn't address.
//!
//! Protocol framing lives in `irrexpand-proto`, ASN storage in
//! `irrexpand-asn`, prefix storage in `irrexpand-radix`, and connection
//! management in `irrexpand-transport`; this crate is the driver that ties
//! them together.

pub mod config;
pub mod error;

mod channel;
mod classify;
mod expander;
mod named_set;
mod request;
mod source;

pub use config::{ExpanderConfig, Family, Generation};
pub use error::Error;
pub use expander::Expander;

pub use irrexpand_asn::AsnBitset;
pub use irrexpand_radix::{PrefixSink, PrefixTree, RadixTrie};

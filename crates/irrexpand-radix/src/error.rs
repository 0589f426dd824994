//! Errors raised while parsing prefixes or prefix-length ranges.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RadixError {
    #[error("could not parse {0:?} as a prefix")]
    ParsePrefix(String),

    #[error("could not parse {0:?} as a prefix length range")]
    ParseRange(String),
}

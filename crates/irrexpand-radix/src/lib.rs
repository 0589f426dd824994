//! Prefix storage: the [`PrefixTree`] insertion/iteration trait, a default
//! [`RadixTrie`] implementation, and [`PrefixSink`], which routes parsed
//! IRRd prefix text (including `^`-range expressions) into the right tree.

pub mod error;
pub mod sink;
pub mod trie;

pub use error::RadixError;
pub use sink::{Family, PrefixSink};
pub use trie::{PrefixTree, RadixTrie};

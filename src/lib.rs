//! # Adaptive Huffman entropy coding for symbol streams
//!
//! This library implements an adaptive entropy-coding engine for streams of
//! recurring symbols drawn from an open, unbounded alphabet: structured term
//! values, integer indices, or plain bytes inside a trace/state
//! serialization format. Frequently repeated symbols receive short codes
//! without the alphabet being known in advance, and a decoder reconstructs
//! the identical, evolving code table purely from the bits it has already
//! seen; no table is ever transmitted.
//!
//! ## Core Algorithm
//!
//! 1. **Escape mechanism**: a reserved escape leaf signals "the next symbol
//!    is new; read its literal value from the fallback channel"
//! 2. **One-leaf growth**: every new symbol adds exactly one leaf next to
//!    the escape leaf
//! 3. **Sibling-property restoration**: after every symbol, node weights
//!    advance by one along the leaf-to-root path, with position swaps that
//!    keep the tree a minimum-redundancy code
//! 4. **Implicit synchronization**: encoder and decoder apply the identical
//!    deterministic update, so their trees never diverge
//!
//! ## Usage Example
//!
//! ```
//! use huffstream::{AdaptiveTree, BitBuffer, Decoded};
//!
//! let mut sink = BitBuffer::new();
//! let mut encoder: AdaptiveTree<u64> = AdaptiveTree::new();
//! for value in [7u64, 7, 42, 7] {
//!     encoder.encode(Some(&value), &mut sink).unwrap();
//! }
//! encoder.encode(None, &mut sink).unwrap(); // end marker
//!
//! let mut source = sink.reader();
//! let mut decoder: AdaptiveTree<u64> = AdaptiveTree::new();
//! assert_eq!(decoder.decode(&mut source).unwrap(), Decoded::Symbol(7));
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

// Core modules - each implements a key component of the engine
pub mod bitio;    // Single-bit FIFO channel
pub mod fallback; // Literal channel for first occurrences
pub mod symbol;   // Symbol payload types
pub mod tree;     // Adaptive Huffman tree and updater

// Re-exports for convenience
pub use bitio::{BitBuffer, BitCursor, BitSink, BitSource};
pub use fallback::Literal;
pub use symbol::Term;
pub use tree::{AdaptiveTree, TreeStats};

use thiserror::Error;

/// Errors that can occur while encoding or decoding a stream
///
/// Every variant is terminal for the current stream: coding state is
/// cumulative, so nothing after the failure point can be trusted and the
/// engine never retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Bit channel exhausted in the middle of a code walk
    #[error("bit stream truncated mid-code")]
    TruncatedStream,

    /// Literal channel exhausted after an escape code
    #[error("fallback literal channel truncated")]
    TruncatedFallback,

    /// Fallback payload decoded to an invalid value
    #[error("malformed fallback literal")]
    MalformedLiteral,

    /// Structural invariant violation detected defensively
    #[error("corrupt adaptive tree: {detail}")]
    CorruptTree {
        /// Which structural check failed
        detail: &'static str,
    },
}

/// Configuration parameters for a codec instance
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Run the full structural audit after every tree update
    ///
    /// Expensive (linear in tree size per symbol); intended for tests and
    /// for debugging suspected encoder/decoder divergence.
    pub exhaustive_checks: bool,

    /// Expected number of distinct symbols, used to pre-size the arena
    pub capacity: usize,
}

impl CodecConfig {
    /// Default configuration: no exhaustive checks, modest pre-allocation
    pub fn new() -> Self {
        Self {
            exhaustive_checks: false,
            capacity: 64,
        }
    }

    /// Enable the per-update structural audit
    pub fn with_exhaustive_checks(mut self) -> Self {
        self.exhaustive_checks = true;
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of encoding one symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CodeKind {
    /// The symbol already had a leaf; only its code path was emitted
    Known,
    /// First occurrence; the escape path and a fallback literal were emitted
    New,
}

/// Outcome of decoding one code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<S> {
    /// An ordinary symbol value
    Symbol(S),
    /// The end marker; the stream is complete
    End,
}

impl<S> Decoded<S> {
    /// Return the decoded symbol, or `None` at end-of-stream.
    pub fn into_symbol(self) -> Option<S> {
        match self {
            Decoded::Symbol(s) => Some(s),
            Decoded::End => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CodecConfig::new();
        assert!(!config.exhaustive_checks);
        assert!(config.capacity > 0);
    }

    #[test]
    fn test_decoded_into_symbol() {
        assert_eq!(Decoded::Symbol(3u64).into_symbol(), Some(3));
        assert_eq!(Decoded::<u64>::End.into_symbol(), None);
    }
}

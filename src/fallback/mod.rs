//! Literal channel for first occurrences
//!
//! The first time a symbol appears it has no code yet, so its raw value
//! travels inline on this channel, directly after the escape code that
//! announced it. Each payload starts with one tag bit separating the end
//! marker from ordinary symbols, which keeps both reserved markers outside
//! the caller's value space entirely.
//!
//! Payload encodings are deliberately thin: fixed-width bits for bytes,
//! 7-bit continuation groups for integers. Anything smarter belongs in a
//! layer below the bit channel, not here.

use crate::bitio::{BitSink, BitSource};
use crate::{CodecError, Decoded};
use std::hash::Hash;

/// A symbol value that can travel verbatim on the fallback channel.
///
/// Implementations must be self-delimiting: `read_literal` consumes exactly
/// the bits `write_literal` produced, with no trailing ambiguity, since the
/// next Huffman code follows immediately.
pub trait Literal: Clone + Eq + Hash {
    /// Write this value's bits to the channel.
    fn write_literal<W: BitSink>(&self, sink: &mut W);

    /// Read one value back from the channel.
    ///
    /// Fails with [`CodecError::TruncatedFallback`] if the channel runs out
    /// mid-value.
    fn read_literal<R: BitSource>(source: &mut R) -> Result<Self, CodecError>;
}

/// Maximum number of 7-bit groups a `u64` literal may span.
const MAX_VARINT_GROUPS: u32 = 10;

impl Literal for u8 {
    fn write_literal<W: BitSink>(&self, sink: &mut W) {
        for shift in (0..8).rev() {
            sink.write_bit((self >> shift) & 1 == 1);
        }
    }

    fn read_literal<R: BitSource>(source: &mut R) -> Result<Self, CodecError> {
        let mut value = 0u8;
        for _ in 0..8 {
            let bit = source.read_bit().ok_or(CodecError::TruncatedFallback)?;
            value = (value << 1) | bit as u8;
        }
        Ok(value)
    }
}

impl Literal for u64 {
    /// 7-bit groups, least significant first; each group is preceded by a
    /// continuation bit that is set while more groups follow.
    fn write_literal<W: BitSink>(&self, sink: &mut W) {
        let mut rest = *self;
        loop {
            let group = (rest & 0x7f) as u8;
            rest >>= 7;
            sink.write_bit(rest != 0);
            for shift in (0..7).rev() {
                sink.write_bit((group >> shift) & 1 == 1);
            }
            if rest == 0 {
                return;
            }
        }
    }

    fn read_literal<R: BitSource>(source: &mut R) -> Result<Self, CodecError> {
        let mut value = 0u64;
        let mut groups = 0u32;
        loop {
            let more = source.read_bit().ok_or(CodecError::TruncatedFallback)?;
            let mut group = 0u64;
            for _ in 0..7 {
                let bit = source.read_bit().ok_or(CodecError::TruncatedFallback)?;
                group = (group << 1) | bit as u64;
            }
            value |= group << (7 * groups);
            groups += 1;
            if !more {
                return Ok(value);
            }
            if groups == MAX_VARINT_GROUPS {
                return Err(CodecError::MalformedLiteral);
            }
        }
    }
}

/// Write one framed payload: a tag bit, then the literal for ordinary
/// symbols. `None` is the end marker and carries no payload bits.
pub fn write_payload<S: Literal, W: BitSink>(value: Option<&S>, sink: &mut W) {
    match value {
        None => sink.write_bit(true),
        Some(symbol) => {
            sink.write_bit(false);
            symbol.write_literal(sink);
        }
    }
}

/// Read one framed payload back.
pub fn read_payload<S: Literal, R: BitSource>(
    source: &mut R,
) -> Result<Decoded<S>, CodecError> {
    let end = source.read_bit().ok_or(CodecError::TruncatedFallback)?;
    if end {
        Ok(Decoded::End)
    } else {
        Ok(Decoded::Symbol(S::read_literal(source)?))
    }
}

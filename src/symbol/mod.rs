//! Symbol payload types
//!
//! The engine is generic over the payload it codes, and two instantiations
//! matter in practice: structured term values and plain integer indices.
//! Integers (and raw bytes) implement [`Literal`] directly in the fallback
//! module; this module provides [`Term`], the structured payload: a head
//! symbol applied to zero or more argument terms.

use crate::bitio::{BitSink, BitSource};
use crate::fallback::Literal;
use crate::CodecError;
use std::fmt;

/// Maximum nesting depth accepted when reading a term literal.
///
/// Deeper terms fail to decode with [`CodecError::MalformedLiteral`]; the
/// reader recurses per level, so the bound also caps stack use on
/// adversarial streams.
pub const MAX_TERM_DEPTH: usize = 128;

/// A structured term value: a head symbol applied to argument terms.
///
/// `f(a, g(b))` is `Term::apply("f", vec![Term::constant("a"),
/// Term::apply("g", vec![Term::constant("b")])])`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    head: String,
    args: Vec<Term>,
}

impl Term {
    /// A term with no arguments.
    pub fn constant(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            args: Vec::new(),
        }
    }

    /// A head symbol applied to arguments.
    pub fn apply(head: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            head: head.into(),
            args,
        }
    }

    /// The head symbol.
    #[inline]
    pub fn head(&self) -> &str {
        &self.head
    }

    /// The argument list.
    #[inline]
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    /// Number of arguments.
    #[inline]
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    fn read_at_depth<R: BitSource>(source: &mut R, depth: usize) -> Result<Self, CodecError> {
        if depth > MAX_TERM_DEPTH {
            return Err(CodecError::MalformedLiteral);
        }

        let head_len = u64::read_literal(source)?;
        let mut head_bytes = Vec::new();
        for _ in 0..head_len {
            head_bytes.push(u8::read_literal(source)?);
        }
        let head = String::from_utf8(head_bytes).map_err(|_| CodecError::MalformedLiteral)?;

        let arity = u64::read_literal(source)?;
        let mut args = Vec::new();
        for _ in 0..arity {
            args.push(Term::read_at_depth(source, depth + 1)?);
        }

        Ok(Self { head, args })
    }
}

impl Literal for Term {
    /// Head as a length-prefixed UTF-8 byte run, then arity, then each
    /// argument in order. Self-delimiting by construction.
    fn write_literal<W: BitSink>(&self, sink: &mut W) {
        (self.head.len() as u64).write_literal(sink);
        for byte in self.head.as_bytes() {
            byte.write_literal(sink);
        }
        (self.args.len() as u64).write_literal(sink);
        for arg in &self.args {
            arg.write_literal(sink);
        }
    }

    fn read_literal<R: BitSource>(source: &mut R) -> Result<Self, CodecError> {
        Term::read_at_depth(source, 0)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{arg}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

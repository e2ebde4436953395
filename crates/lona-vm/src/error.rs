// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The VM's error taxonomy (see `docs/architecture/errors.md` in the design
//! notes). Every primitive and evaluator failure is tagged with one of these
//! stable kinds; there is no ad-hoc error type scattered across modules the
//! way a hand-rolled `no_std` port would need.

use crate::value::Value;
use std::fmt;

/// A VM-level error.
///
/// `Read`, `Type`, `Arity`, `Unbound`, `Immutable`, `Range`, `Io` and
/// `Internal` all carry a human-readable message built at the error site;
/// `Throw` carries the raw value passed to `(throw ...)` unchanged, per the
/// "catch yields the raw thrown value for user throws" contract.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LonaError {
    /// Tokenizer/parser failure. Always carries position info when known.
    #[error("read error{}: {message}", at_display(*.line, *.column))]
    Read {
        message: String,
        file: Option<String>,
        line: u32,
        column: u32,
    },

    /// Wrong operand type for a primitive or special form.
    #[error("type error: {0}")]
    Type(String),

    /// Missing or excess arguments to a procedure.
    #[error("arity error in `{procedure}`: {message}")]
    Arity { procedure: String, message: String },

    /// Reference to a symbol with no binding that is also not primitive.
    #[error("unbound symbol: {0}")]
    Unbound(String),

    /// Write attempted on a constant or foreign-owned object.
    #[error("immutable: {0}")]
    Immutable(String),

    /// Out-of-bounds index, negative count, bad slice, bad UTF-8 boundary.
    #[error("range error: {0}")]
    Range(String),

    /// Port/stream operation failed, or was attempted on a closed port.
    #[error("I/O error: {0}")]
    Io(String),

    /// Max eval depth exceeded, allocation failure, internal invariant broken.
    #[error("internal error: {0}")]
    Internal(String),

    /// The payload of a `(throw value)` that escaped to the top level.
    #[error("uncaught throw: {0:?}")]
    Throw(Value),
}

fn at_display(line: u32, column: u32) -> String {
    if line == 0 && column == 0 {
        String::new()
    } else {
        format!(" at {line}:{column}")
    }
}

impl LonaError {
    /// The stable taxonomy tag, used by the callstack printer and by host
    /// code that wants to `match` on error category without parsing text.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Read { .. } => ErrorKind::ReadError,
            Self::Type(_) => ErrorKind::TypeError,
            Self::Arity { .. } => ErrorKind::ArityError,
            Self::Unbound(_) => ErrorKind::UnboundSymbol,
            Self::Immutable(_) => ErrorKind::ImmutableError,
            Self::Range(_) => ErrorKind::RangeError,
            Self::Io(_) => ErrorKind::IOError,
            Self::Internal(_) => ErrorKind::InternalError,
            Self::Throw(_) => ErrorKind::UserThrow,
        }
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    pub fn arity(procedure: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Arity {
            procedure: procedure.into(),
            message: msg.into(),
        }
    }

    pub fn unbound(name: impl Into<String>) -> Self {
        Self::Unbound(name.into())
    }

    pub fn immutable(msg: impl Into<String>) -> Self {
        Self::Immutable(msg.into())
    }

    pub fn range(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn read(msg: impl Into<String>, file: Option<String>, line: u32, column: u32) -> Self {
        Self::Read {
            message: msg.into(),
            file,
            line,
            column,
        }
    }
}

/// The stable taxonomy kind, independent of the formatted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ReadError,
    TypeError,
    ArityError,
    UnboundSymbol,
    ImmutableError,
    RangeError,
    IOError,
    InternalError,
    UserThrow,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadError => "ReadError",
            Self::TypeError => "TypeError",
            Self::ArityError => "ArityError",
            Self::UnboundSymbol => "UnboundSymbol",
            Self::ImmutableError => "ImmutableError",
            Self::RangeError => "RangeError",
            Self::IOError => "IOError",
            Self::InternalError => "InternalError",
            Self::UserThrow => "UserThrow",
        };
        f.write_str(name)
    }
}

/// Convenience alias used throughout the VM.
pub type Result<T> = std::result::Result<T, LonaError>;

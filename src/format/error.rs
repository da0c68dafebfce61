//! Error types for stitch-file codec operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::format::registry::FormatId;
use crate::pattern::{Command, PatternError};

/// Errors raised while decoding a stitch file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Magic bytes or header structure do not match the format
    #[error("{format}: bad signature: {reason}")]
    BadSignature {
        /// Format being decoded
        format: FormatId,
        /// What did not match
        reason: String,
    },

    /// Input ends before a declared or required field
    #[error(
        "{format}: truncated input: needed {needed} bytes at offset {offset}, {available} available"
    )]
    Truncated {
        /// Format being decoded
        format: FormatId,
        /// Offset of the failed read
        offset: usize,
        /// Bytes the read required
        needed: usize,
        /// Bytes left at that offset
        available: usize,
    },

    /// Control byte with no meaning in this format
    #[error("{format}: unknown command byte 0x{byte:02X} at offset {offset}")]
    UnknownCommand {
        /// Format being decoded
        format: FormatId,
        /// Offset of the record
        offset: usize,
        /// The unrecognized byte
        byte: u8,
    },

    /// Accumulated position leaves the supported coordinate range
    #[error("{format}: position ({x}, {y}) at offset {offset} exceeds the coordinate limit of {max}")]
    CoordinateOverflow {
        /// Format being decoded
        format: FormatId,
        /// Offset of the record that moved out of range
        offset: usize,
        /// X position in 0.1 mm units
        x: i64,
        /// Y position in 0.1 mm units
        y: i64,
        /// Largest absolute coordinate
        max: i64,
    },
}

impl DecodeError {
    /// Create a bad signature error with a reason.
    pub fn bad_signature(format: FormatId, reason: impl Into<String>) -> Self {
        Self::BadSignature {
            format,
            reason: reason.into(),
        }
    }

    /// Create a truncation error for a read of `needed` bytes at `offset`.
    pub fn truncated(format: FormatId, offset: usize, needed: usize, available: usize) -> Self {
        Self::Truncated {
            format,
            offset,
            needed,
            available,
        }
    }

    /// Create an unknown command error.
    pub fn unknown_command(format: FormatId, offset: usize, byte: u8) -> Self {
        Self::UnknownCommand {
            format,
            offset,
            byte,
        }
    }
}

/// Errors raised while encoding a pattern.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// The target format has no way to express a command
    #[error("{format}: cannot represent {command} (stitch #{index})")]
    Unrepresentable {
        /// Target format
        format: FormatId,
        /// The command that has no encoding
        command: Command,
        /// Index of the stitch in the pattern
        index: usize,
    },

    /// Displacement exceeds the per-record range and the format does not split
    #[error(
        "{format}: displacement ({dx}, {dy}) at stitch #{index} exceeds the per-record limit of {max}"
    )]
    OutOfRange {
        /// Target format
        format: FormatId,
        /// Index of the stitch in the pattern
        index: usize,
        /// X displacement in 0.1 mm units
        dx: i64,
        /// Y displacement in 0.1 mm units
        dy: i64,
        /// Largest displacement one record can hold
        max: i32,
    },

    /// A position is not finite or lies beyond the coordinate limit
    #[error("{format}: position ({x}, {y}) mm at stitch #{index} is outside the writable range")]
    InvalidCoordinate {
        /// Target format
        format: FormatId,
        /// Index of the stitch in the pattern
        index: usize,
        /// X position in millimetres
        x: f64,
        /// Y position in millimetres
        y: f64,
    },

    /// Stitch data does not fit the format's length fields
    #[error("{format}: {len} bytes of stitch data exceed the format limit of {max}")]
    TooLarge {
        /// Target format
        format: FormatId,
        /// Encoded length
        len: usize,
        /// Largest length the header can declare
        max: usize,
    },

    /// More color blocks than the header can index
    #[error("{format}: {count} color blocks exceed the format limit of {max}")]
    TooManyColors {
        /// Target format
        format: FormatId,
        /// Color blocks in the pattern
        count: usize,
        /// Largest supported count
        max: usize,
    },

    /// The pattern breaks the trailing-End invariant
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    /// The format has no encoder
    #[error("{format}: writing is not supported")]
    NotSupported {
        /// Format without an encoder
        format: FormatId,
    },
}

/// Errors raised while mapping a path or identifier to a format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Explicit identifier is not registered
    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    /// No format is registered for the path's extension
    #[error("unrecognized extension for {path:?}")]
    UnrecognizedExtension {
        /// The path whose extension did not match
        path: PathBuf,
    },
}

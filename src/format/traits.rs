//! Trait definitions for stitch-file format implementations.

use crate::format::error::{DecodeError, EncodeError};
use crate::format::registry::FormatId;
use crate::pattern::{Command, Pattern};

/// Trait for stitch-file decode/encode implementations.
///
/// Each format (DST, EXP, JEF, PEC, PES) implements this trait to convert
/// between its byte layout and the unified [`Pattern`].
pub trait StitchFormat: Send + Sync {
    /// Identifier of this format.
    fn id(&self) -> FormatId;

    /// Human-readable name for listings.
    fn display_name(&self) -> &'static str;

    /// File extensions this format uses, lowercase without the dot.
    fn extensions(&self) -> &[&'static str];

    /// What the encoder can express.
    fn capabilities(&self) -> Capabilities;

    /// Whether `bytes` look like this format.
    ///
    /// Formats without a signature never claim input.
    fn sniff(&self, _bytes: &[u8]) -> bool {
        false
    }

    /// Parse a complete file into a pattern.
    fn decode(&self, bytes: &[u8]) -> Result<Pattern, DecodeError>;

    /// Serialize a pattern into a complete file.
    fn encode(&self, _pattern: &Pattern) -> Result<Vec<u8>, EncodeError> {
        Err(EncodeError::NotSupported { format: self.id() })
    }
}

/// How an encoder treats a displacement larger than one record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongMovePolicy {
    /// Emit intermediate jumps, each within range.
    Split,
    /// Fail with [`EncodeError::OutOfRange`].
    Reject,
}

/// Declared limits of a format's encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the format has a decoder.
    pub can_read: bool,

    /// Whether the format has an encoder.
    pub can_write: bool,

    /// Largest per-axis displacement of one record, in 0.1 mm units.
    pub max_delta: i32,

    /// Behavior for displacements beyond `max_delta`.
    pub long_moves: LongMovePolicy,

    /// Whether sequin ejects can be written.
    pub sequins: bool,

    /// Whether trims can be written.
    pub trims: bool,

    /// Whether machine stops can be written.
    pub stops: bool,

    /// Whether the file carries its own thread table.
    pub thread_table: bool,
}

impl Capabilities {
    /// Whether `command` can be written.
    pub fn supports(&self, command: Command) -> bool {
        match command {
            Command::Stitch | Command::Jump | Command::ColorChange | Command::End => true,
            Command::Trim => self.trims,
            Command::Stop => self.stops,
            Command::Sequin => self.sequins,
        }
    }
}

//! stitchfile - embroidery stitch-file codec
//!
//! Reads and writes Tajima DST, Melco EXP, Janome JEF and Brother PEC/PES
//! machine files through a single [`Pattern`] model, converts between them
//! and reports design metadata.

pub mod config;
pub mod convert;
pub mod format;
pub mod pattern;

pub use convert::{
    ConversionError, ConversionSummary, Converter, ErrorKind, InspectError, Metadata, Settings,
    convert, inspect,
};
pub use format::{DecodeError, DispatchError, EncodeError, FormatHint, FormatId, StitchFormat};
pub use pattern::{Bounds, BoundsPolicy, Command, Pattern, Rgb, Stitch, Thread};

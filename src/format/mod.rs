//! Stitch-file format codecs.
//!
//! This module provides a trait-based system for decoding and encoding
//! embroidery machine files. Each format implements [`StitchFormat`] and is
//! reachable through a closed [`FormatId`] enum; the [`FormatRegistry`] maps
//! identifiers, file extensions and leading bytes to formats.
//!
//! ## Supported Formats
//!
//! - **DST**: Tajima, 3-byte ternary records, sequins, no colors
//! - **EXP**: Melco expanded, headerless 2-byte records
//! - **JEF**: Janome, header with hoop data and Janome palette colors
//! - **PEC**: Brother machine format with PEC palette colors
//! - **PES**: Brother design format wrapping a PEC block
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stitchfile::format::{FormatHint, resolve};
//!
//! let dst = resolve(FormatHint::Explicit("dst"))?;
//! let pattern = dst.decode(&std::fs::read("rose.dst")?)?;
//! let bytes = resolve(FormatHint::Explicit("pes"))?.encode(&pattern)?;
//! ```

pub mod bytes;
mod error;
pub mod formats;
pub mod palette;
mod registry;
pub mod steps;
mod traits;

pub use error::{DecodeError, DispatchError, EncodeError};
pub use registry::{FormatHint, FormatId, FormatRegistry, resolve};
pub use traits::{Capabilities, LongMovePolicy, StitchFormat};

//! File-level conversion and inspection.
//!
//! [`convert`] reads a stitch file, decodes it with the format implied by its
//! extension and writes it back out in the output's format. [`inspect`]
//! decodes a file and summarizes it. Both abort on the first error; a failed
//! conversion never leaves a partial output file behind.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::{
    DecodeError, DispatchError, EncodeError, FormatHint, FormatId, FormatRegistry, StitchFormat,
};
use crate::pattern::{BoundsPolicy, Command, Pattern, Thread};

// ============================================================================
// Errors
// ============================================================================

/// Coarse classification of a failure, for exit codes and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadSignature,
    Truncated,
    UnknownCommand,
    CoordinateOverflow,
    Unrepresentable,
    OutOfRange,
    TooManyColors,
    TooLarge,
    InvalidPattern,
    NotWritable,
    UnknownFormat,
    UnrecognizedExtension,
    Io,
}

impl ErrorKind {
    /// Process exit code for the command-line tool.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::UnknownFormat | ErrorKind::UnrecognizedExtension => 2,
            ErrorKind::Io => 3,
            ErrorKind::BadSignature
            | ErrorKind::Truncated
            | ErrorKind::UnknownCommand
            | ErrorKind::CoordinateOverflow => 4,
            ErrorKind::Unrepresentable
            | ErrorKind::OutOfRange
            | ErrorKind::TooManyColors
            | ErrorKind::TooLarge
            | ErrorKind::InvalidPattern
            | ErrorKind::NotWritable => 5,
        }
    }
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::BadSignature { .. } => ErrorKind::BadSignature,
            DecodeError::Truncated { .. } => ErrorKind::Truncated,
            DecodeError::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            DecodeError::CoordinateOverflow { .. } => ErrorKind::CoordinateOverflow,
        }
    }
}

impl EncodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::Unrepresentable { .. } => ErrorKind::Unrepresentable,
            EncodeError::OutOfRange { .. } | EncodeError::InvalidCoordinate { .. } => {
                ErrorKind::OutOfRange
            }
            EncodeError::TooLarge { .. } => ErrorKind::TooLarge,
            EncodeError::TooManyColors { .. } => ErrorKind::TooManyColors,
            EncodeError::InvalidPattern(_) => ErrorKind::InvalidPattern,
            EncodeError::NotSupported { .. } => ErrorKind::NotWritable,
        }
    }
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::UnknownFormat(_) => ErrorKind::UnknownFormat,
            DispatchError::UnrecognizedExtension { .. } => ErrorKind::UnrecognizedExtension,
        }
    }
}

/// Errors raised by [`convert`].
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Input or output format could not be determined
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Reading the input or writing the output failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The input is not a valid file of its format
    #[error("cannot read {path:?}: {source}")]
    Decode { path: PathBuf, source: DecodeError },

    /// The pattern cannot be written in the target format
    #[error("cannot write {path:?}: {source}")]
    Encode { path: PathBuf, source: EncodeError },

    /// The target format has no encoder
    #[error("{format} files cannot be written")]
    NotWritable { format: FormatId },
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::Dispatch(e) => e.kind(),
            ConversionError::Io { .. } => ErrorKind::Io,
            ConversionError::Decode { source, .. } => source.kind(),
            ConversionError::Encode { source, .. } => source.kind(),
            ConversionError::NotWritable { .. } => ErrorKind::NotWritable,
        }
    }
}

/// Errors raised by [`inspect`].
#[derive(Error, Debug)]
pub enum InspectError {
    /// The file's format could not be determined
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Reading the file failed
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not a valid file of its format
    #[error("cannot read {path:?}: {source}")]
    Decode { path: PathBuf, source: DecodeError },
}

impl InspectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InspectError::Dispatch(e) => e.kind(),
            InspectError::Io { .. } => ErrorKind::Io,
            InspectError::Decode { source, .. } => source.kind(),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub source_format: FormatId,
    pub target_format: FormatId,
    pub stitch_count: usize,
    pub thread_count: usize,
    pub bytes_written: usize,
}

/// Summary of a decoded design.
///
/// Coordinates are millimetres. When no entry qualifies for the bounding box
/// the extents are zero and `has_bounds` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub format: FormatId,
    pub stitch_count: usize,
    pub thread_count: usize,
    pub color_block_count: usize,
    pub jump_count: usize,
    pub trim_count: usize,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
    pub has_bounds: bool,
}

impl Metadata {
    /// Summarize `pattern`, measuring extents under `policy`.
    pub fn from_pattern(format: FormatId, pattern: &Pattern, policy: BoundsPolicy) -> Self {
        let bounds = pattern.bounds(policy);
        let (min_x, min_y, max_x, max_y) =
            bounds.map_or((0.0, 0.0, 0.0, 0.0), |b| (b.min_x, b.min_y, b.max_x, b.max_y));

        Self {
            format,
            stitch_count: pattern.stitch_count(),
            thread_count: pattern.thread_count(),
            color_block_count: pattern.color_block_count(),
            jump_count: pattern.count(Command::Jump),
            trim_count: pattern.count(Command::Trim),
            min_x,
            min_y,
            max_x,
            max_y,
            width: max_x - min_x,
            height: max_y - min_y,
            has_bounds: bounds.is_some(),
        }
    }

    /// Human-readable multi-line report.
    pub fn report(&self, path: &Path) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "File: {}\nFormat: {}\nWidth: {:.2} mm\nHeight: {:.2} mm\nStitch Count: {}\nColor Count: {}",
            path.display(),
            self.format,
            self.width,
            self.height,
            self.stitch_count,
            self.thread_count
        );
        if self.has_bounds {
            let _ = write!(
                out,
                "\nBounds: [{:.2}, {:.2}, {:.2}, {:.2}]",
                self.min_x, self.min_y, self.max_x, self.max_y
            );
        }
        out
    }
}

// ============================================================================
// Converter
// ============================================================================

/// Behavior knobs for [`Converter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Which commands count toward reported extents
    #[serde(default)]
    pub bounds_policy: BoundsPolicy,

    /// Thread assigned when a file carries no thread table
    #[serde(default)]
    pub default_thread: Thread,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bounds_policy: BoundsPolicy::Sewn,
            default_thread: Thread::default(),
        }
    }
}

/// Runs conversions and inspections with fixed [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct Converter {
    settings: Settings,
}

impl Converter {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Convert `input` to `output`, inferring both formats from extensions.
    pub fn convert(&self, input: &Path, output: &Path) -> Result<ConversionSummary, ConversionError> {
        self.convert_with(input, FormatHint::Path(input), output, FormatHint::Path(output))
    }

    /// Convert with explicit format hints.
    pub fn convert_with(
        &self,
        input: &Path,
        input_hint: FormatHint<'_>,
        output: &Path,
        output_hint: FormatHint<'_>,
    ) -> Result<ConversionSummary, ConversionError> {
        let registry = FormatRegistry::global();
        let reader = registry.resolve(input_hint)?;
        let writer = registry.resolve(output_hint)?;
        if !writer.capabilities().can_write {
            return Err(ConversionError::NotWritable { format: writer.id() });
        }

        log::info!(
            "Converting {:?} ({}) to {:?} ({})",
            input,
            reader.id(),
            output,
            writer.id()
        );

        let bytes = std::fs::read(input).map_err(|source| ConversionError::Io {
            path: input.to_path_buf(),
            source,
        })?;
        let pattern = self
            .decode(reader, input, &bytes)
            .map_err(|source| ConversionError::Decode {
                path: input.to_path_buf(),
                source,
            })?;

        let encoded = writer
            .encode(&pattern)
            .map_err(|source| ConversionError::Encode {
                path: output.to_path_buf(),
                source,
            })?;
        write_atomic(output, &encoded).map_err(|source| ConversionError::Io {
            path: output.to_path_buf(),
            source,
        })?;

        let summary = ConversionSummary {
            source_format: reader.id(),
            target_format: writer.id(),
            stitch_count: pattern.stitch_count(),
            thread_count: pattern.thread_count(),
            bytes_written: encoded.len(),
        };
        log::info!(
            "Wrote {} bytes ({} stitches, {} threads) to {:?}",
            summary.bytes_written,
            summary.stitch_count,
            summary.thread_count,
            output
        );
        Ok(summary)
    }

    /// Decode `path` and summarize it, inferring the format from the extension.
    pub fn inspect(&self, path: &Path) -> Result<Metadata, InspectError> {
        self.inspect_with(path, FormatHint::Path(path))
    }

    /// Inspect with an explicit format hint.
    pub fn inspect_with(&self, path: &Path, hint: FormatHint<'_>) -> Result<Metadata, InspectError> {
        let format = FormatRegistry::global().resolve(hint)?;
        log::info!("Inspecting {:?} as {}", path, format.id());

        let bytes = std::fs::read(path).map_err(|source| InspectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let pattern = self
            .decode(format, path, &bytes)
            .map_err(|source| InspectError::Decode {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Metadata::from_pattern(
            format.id(),
            &pattern,
            self.settings.bounds_policy,
        ))
    }

    /// Decode and fill in the default thread when the file has none.
    fn decode(
        &self,
        format: &dyn StitchFormat,
        path: &Path,
        bytes: &[u8],
    ) -> Result<Pattern, DecodeError> {
        let mut pattern = format.decode(bytes)?;
        if pattern.ensure_threads(&self.settings.default_thread) {
            log::warn!(
                "{:?} has no thread table; using default thread {}",
                path,
                self.settings.default_thread.color.hex()
            );
        }
        log::debug!(
            "Decoded {:?}: {} stitches, {} color blocks",
            path,
            pattern.stitch_count(),
            pattern.color_block_count()
        );
        Ok(pattern)
    }
}

/// Write `data` to a temporary file next to `path`, then move it into place.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // 0o666 filtered by the umask, the same as a plain create.
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut file = builder.tempfile_in(dir)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Convert with default [`Settings`].
pub fn convert(input: &Path, output: &Path) -> Result<ConversionSummary, ConversionError> {
    Converter::default().convert(input, output)
}

/// Inspect with default [`Settings`].
pub fn inspect(path: &Path) -> Result<Metadata, InspectError> {
    Converter::default().inspect(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Capabilities;
    use crate::pattern::Rgb;

    fn write_design(dir: &Path, name: &str, pattern: &Pattern) -> PathBuf {
        let path = dir.join(name);
        let format = FormatRegistry::global()
            .resolve(FormatHint::Path(&path))
            .unwrap();
        std::fs::write(&path, format.encode(pattern).unwrap()).unwrap();
        path
    }

    fn design() -> Pattern {
        let mut p = Pattern::new();
        p.add(0.0, 0.0, Command::Stitch);
        p.add(10.0, 5.0, Command::Stitch);
        p.add(10.0, 5.0, Command::Trim);
        p.add(20.0, 5.0, Command::Jump);
        p.finish();
        p
    }

    #[test]
    fn test_convert_dst_to_pes() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_design(dir.path(), "design.dst", &design());
        let output = dir.path().join("design.pes");

        let summary = convert(&input, &output).unwrap();
        assert_eq!(summary.source_format, FormatId::Dst);
        assert_eq!(summary.target_format, FormatId::Pes);
        assert_eq!(summary.stitch_count, 2);
        assert_eq!(summary.thread_count, 1, "default thread assigned");
        assert_eq!(
            summary.bytes_written as u64,
            std::fs::metadata(&output).unwrap().len()
        );

        let meta = inspect(&output).unwrap();
        assert_eq!(meta.format, FormatId::Pes);
        assert_eq!(meta.stitch_count, 2);
        assert_eq!(meta.trim_count, 1);
        assert_eq!(meta.jump_count, 1);
    }

    #[test]
    fn test_inspect_bounds_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_design(dir.path(), "design.jef", &design());

        let sewn = inspect(&path).unwrap();
        assert!(sewn.has_bounds);
        assert_eq!((sewn.width, sewn.height), (10.0, 5.0));

        let converter = Converter::new(Settings {
            bounds_policy: BoundsPolicy::Traversed,
            ..Settings::default()
        });
        let traversed = converter.inspect(&path).unwrap();
        assert_eq!(traversed.max_x, 20.0);
        assert_eq!(traversed.width, 20.0);
    }

    #[test]
    fn test_inspect_uses_configured_default_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_design(dir.path(), "design.exp", &design());

        let converter = Converter::new(Settings {
            default_thread: Thread::new(Rgb::new(0, 0, 255)),
            ..Settings::default()
        });
        let meta = converter.inspect(&path).unwrap();
        assert_eq!(meta.thread_count, 1);
    }

    #[test]
    fn test_report_text() {
        let meta = Metadata::from_pattern(FormatId::Dst, &design(), BoundsPolicy::Sewn);
        let text = meta.report(Path::new("rose.dst"));
        assert_eq!(
            text,
            "File: rose.dst\nFormat: DST\nWidth: 10.00 mm\nHeight: 5.00 mm\n\
             Stitch Count: 2\nColor Count: 0\nBounds: [0.00, 0.00, 10.00, 5.00]"
        );
    }

    #[test]
    fn test_report_without_bounds() {
        let mut empty = Pattern::new();
        empty.finish();
        let meta = Metadata::from_pattern(FormatId::Exp, &empty, BoundsPolicy::Sewn);
        assert!(!meta.has_bounds);
        assert!(!meta.report(Path::new("x.exp")).contains("Bounds"));
    }

    #[test]
    fn test_unrecognized_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("design.png");
        let err = convert(&input, &dir.path().join("out.dst")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnrecognizedExtension);
    }

    #[test]
    fn test_missing_input_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = convert(&dir.path().join("missing.dst"), &dir.path().join("out.pes")).unwrap_err();
        assert!(matches!(err, ConversionError::Io { .. }));
        assert_eq!(err.kind().exit_code(), 3);
    }

    #[test]
    fn test_failed_encode_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut long = Pattern::new();
        long.add(0.0, 0.0, Command::Stitch);
        long.add(40.0, 0.0, Command::Stitch);
        long.finish();
        let input = write_design(dir.path(), "long.pec", &long);
        let output = dir.path().join("long.exp");

        let err = convert(&input, &output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
        assert!(!output.exists());
        // Only the input remains; no temporary file was left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_output_permissions_follow_umask() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let input = write_design(dir.path(), "design.dst", &design());
        let output = dir.path().join("design.jef");
        convert(&input, &output).unwrap();

        let plain = dir.path().join("plain.bin");
        std::fs::write(&plain, b"x").unwrap();
        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&output), mode(&plain));
    }

    #[test]
    fn test_corrupt_input_keeps_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.dst");
        std::fs::write(&input, b"not a stitch file").unwrap();
        let output = dir.path().join("keep.pes");
        std::fs::write(&output, b"previous").unwrap();

        let err = convert(&input, &output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadSignature);
        assert_eq!(std::fs::read(&output).unwrap(), b"previous");
    }

    #[test]
    fn test_explicit_hints_override_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_design(dir.path(), "design.jef", &design());
        let renamed = dir.path().join("design.bin");
        std::fs::rename(&input, &renamed).unwrap();
        let output = dir.path().join("out.bin");

        let summary = Converter::default()
            .convert_with(
                &renamed,
                FormatHint::Explicit("jef"),
                &output,
                FormatHint::Explicit("DST"),
            )
            .unwrap();
        assert_eq!(summary.target_format, FormatId::Dst);
        let meta = Converter::default()
            .inspect_with(&output, FormatHint::Explicit("dst"))
            .unwrap();
        assert_eq!(meta.stitch_count, 2);
    }

    /// A format with a decoder only.
    struct ReadOnlyFormat;

    impl StitchFormat for ReadOnlyFormat {
        fn id(&self) -> FormatId {
            FormatId::Exp
        }

        fn display_name(&self) -> &'static str {
            "Read-only"
        }

        fn extensions(&self) -> &[&'static str] {
            &[]
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                can_write: false,
                ..FormatId::Exp.format().capabilities()
            }
        }

        fn decode(&self, bytes: &[u8]) -> Result<Pattern, DecodeError> {
            FormatId::Exp.format().decode(bytes)
        }
    }

    #[test]
    fn test_format_without_encoder() {
        let format = ReadOnlyFormat;
        assert!(!format.capabilities().can_write);
        let err = format.encode(&design()).unwrap_err();
        assert_eq!(err, EncodeError::NotSupported { format: FormatId::Exp });
        assert_eq!(err.kind(), ErrorKind::NotWritable);
    }
}

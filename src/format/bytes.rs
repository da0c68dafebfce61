//! Bounds-checked byte access shared by the codecs.
//!
//! Every read goes through [`ByteReader`], which reports a short read as
//! [`DecodeError::Truncated`] instead of indexing past the end of the input.

use crate::format::error::DecodeError;
use crate::format::registry::FormatId;

/// Native units per millimetre. All supported formats store 0.1 mm steps.
pub const UNITS_PER_MM: f64 = 10.0;

/// Native units to millimetres.
pub fn to_mm(units: i32) -> f64 {
    f64::from(units) / UNITS_PER_MM
}

/// Millimetres to the nearest native unit.
pub fn to_units(mm: f64) -> i64 {
    (mm * UNITS_PER_MM).round() as i64
}

/// Largest absolute coordinate on either axis, in native units.
///
/// Encoders reject positions beyond it and decoders stop accumulating there.
pub const MAX_COORDINATE: i64 = 99_999;

/// Apply a record's displacement `(dx, dy)` to the running position.
///
/// `offset` locates the record for the error.
pub fn advance(
    format: FormatId,
    offset: usize,
    (x, y): (i32, i32),
    (dx, dy): (i32, i32),
) -> Result<(i32, i32), DecodeError> {
    let nx = i64::from(x) + i64::from(dx);
    let ny = i64::from(y) + i64::from(dy);
    if nx.abs() > MAX_COORDINATE || ny.abs() > MAX_COORDINATE {
        return Err(DecodeError::CoordinateOverflow {
            format,
            offset,
            x: nx,
            y: ny,
            max: MAX_COORDINATE,
        });
    }
    // Both values are within MAX_COORDINATE, far inside i32.
    Ok((nx as i32, ny as i32))
}

/// Width of the `LA:` label field shared by DST and PEC headers.
pub const LABEL_LEN: usize = 16;

/// Label text for a header field: printable ASCII, at most [`LABEL_LEN`] chars.
pub fn label_field(label: Option<&str>) -> String {
    label
        .unwrap_or("Untitled")
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .take(LABEL_LEN)
        .collect()
}

// ============================================================================
// Reader
// ============================================================================

/// Cursor over an input slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    format: FormatId,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], format: FormatId) -> Self {
        Self {
            data,
            pos: 0,
            format,
        }
    }

    /// Current offset from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Length of the whole input.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Error for a read of `needed` bytes at the cursor.
    pub fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::truncated(self.format, self.pos, needed, self.remaining())
    }

    /// Fail unless `needed` bytes remain.
    pub fn require(&self, needed: usize) -> Result<(), DecodeError> {
        if self.remaining() < needed {
            Err(self.truncated(needed))
        } else {
            Ok(())
        }
    }

    /// Move the cursor to an absolute offset within the input.
    pub fn seek(&mut self, pos: usize) -> Result<(), DecodeError> {
        if pos > self.data.len() {
            let len = self.data.len();
            return Err(DecodeError::truncated(self.format, len, pos - len, 0));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    /// Borrow the next `n` bytes and advance.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.require(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_le_bytes(self.array::<1>()?))
    }

    pub fn u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u24_le(&mut self) -> Result<u32, DecodeError> {
        let [a, b, c] = self.array::<3>()?;
        Ok(u32::from_le_bytes([a, b, c, 0]))
    }

    pub fn u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i32_le(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.array()?))
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Growable output buffer with little-endian helpers.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u16_le(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u16_be(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn u24_le(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes()[..3]);
    }

    pub fn u32_le(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i32_le(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Append `count` copies of `byte`.
    pub fn fill(&mut self, byte: u8, count: usize) {
        self.buf.resize(self.buf.len() + count, byte);
    }

    /// Pad with `byte` until the buffer is `len` long.
    pub fn pad_to(&mut self, len: usize, byte: u8) {
        if self.buf.len() < len {
            self.buf.resize(len, byte);
        }
    }

    /// Overwrite three bytes at `at` with a little-endian value.
    ///
    /// `at` must point inside data already written.
    pub fn patch_u24_le(&mut self, at: usize, v: u32) {
        self.buf[at..at + 3].copy_from_slice(&v.to_le_bytes()[..3]);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

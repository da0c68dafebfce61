//! Brother PEC format implementation.
//!
//! A PEC block is a 512-byte header (label and palette indices), a stitch
//! section with variable-length records, and per-color preview graphics.
//! The same block is embedded in PES files, so the block codec is shared
//! with [`super::pes`].

use crate::format::bytes::{
    ByteReader, ByteWriter, LABEL_LEN, advance, label_field, to_mm, to_units,
};
use crate::format::error::{DecodeError, EncodeError};
use crate::format::palette::PEC;
use crate::format::registry::FormatId;
use crate::format::steps;
use crate::format::traits::{Capabilities, LongMovePolicy, StitchFormat};
use crate::pattern::{BoundsPolicy, Command, Pattern, Thread};

/// File signature of a standalone PEC file.
pub const MAGIC: &[u8; 8] = b"#PEC0001";

/// Largest displacement of a long-form record.
pub const MAX_DELTA: i32 = 2047;

/// Most color blocks the header's count byte can express.
pub const MAX_COLORS: usize = 256;

/// Offset of the stitch section from the start of the block.
const STITCH_SECTION: usize = 512;
/// Offset of the first record from the start of the block.
const FIRST_RECORD: usize = STITCH_SECTION + 20;
/// Room for palette indices and padding after the count byte.
const INDEX_AREA: usize = 463;
/// Bytes of preview graphics per color, plus one for the whole design.
const GRAPHIC_LEN: usize = 228;
/// Largest value of the 24-bit stitch section length.
const MAX_SECTION_LEN: u32 = 0xFF_FFFF;

const CMD_END: u8 = 0xFF;
const CMD_COLOR_CHANGE: u8 = 0xFE;
const COLOR_CHANGE_MARK: u8 = 0xB0;

const LONG_FORM: u8 = 0x80;
const FLAG_JUMP: u8 = 0x10;
const FLAG_TRIM: u8 = 0x20;
const FLAG_RESERVED: u8 = 0x40;

/// Brother PEC.
///
/// Supports:
/// - Stitches, jumps, trims, color changes
/// - Thread colors from the PEC palette
///
/// Does not support:
/// - Sequins, machine stops
pub struct PecFormat;

impl StitchFormat for PecFormat {
    fn id(&self) -> FormatId {
        FormatId::Pec
    }

    fn display_name(&self) -> &'static str {
        "Brother (PEC)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["pec"]
    }

    fn capabilities(&self) -> Capabilities {
        block_capabilities()
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"#PEC")
    }

    fn decode(&self, bytes: &[u8]) -> Result<Pattern, DecodeError> {
        let mut r = ByteReader::new(bytes, FormatId::Pec);
        let magic = r.take(MAGIC.len())?;
        if !versioned_magic(magic, b"#PEC") {
            return Err(DecodeError::bad_signature(
                FormatId::Pec,
                "missing #PEC signature",
            ));
        }
        decode_block(bytes, MAGIC.len(), FormatId::Pec)
    }

    fn encode(&self, pattern: &Pattern) -> Result<Vec<u8>, EncodeError> {
        let block = encode_block(pattern, FormatId::Pec)?;
        let mut w = ByteWriter::with_capacity(MAGIC.len() + block.len());
        w.bytes(MAGIC);
        w.bytes(&block);
        Ok(w.into_inner())
    }
}

/// Capabilities of any format built on a PEC block.
pub(crate) fn block_capabilities() -> Capabilities {
    Capabilities {
        can_read: true,
        can_write: true,
        max_delta: MAX_DELTA,
        long_moves: LongMovePolicy::Split,
        sequins: false,
        trims: true,
        stops: false,
        thread_table: true,
    }
}

/// Whether `magic` is `prefix` followed by four ASCII digits.
pub(crate) fn versioned_magic(magic: &[u8], prefix: &[u8; 4]) -> bool {
    magic.len() == 8 && magic.starts_with(prefix) && magic[4..].iter().all(u8::is_ascii_digit)
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode the PEC block starting at `start`.
pub(crate) fn decode_block(
    bytes: &[u8],
    start: usize,
    format: FormatId,
) -> Result<Pattern, DecodeError> {
    let mut r = ByteReader::new(bytes, format);
    r.seek(start)?;

    if r.take(3)? != b"LA:" {
        return Err(DecodeError::bad_signature(format, "PEC block lacks LA: label"));
    }
    let label = String::from_utf8_lossy(r.take(LABEL_LEN)?).trim().to_string();
    r.skip(29)?;

    let blocks = usize::from(r.u8()?) + 1;
    let indices = r.take(blocks)?;
    let mut pattern = Pattern::new();
    if !label.is_empty() {
        pattern.label = Some(label);
    }
    for &index in indices {
        let thread = PEC.thread(usize::from(index)).ok_or_else(|| {
            DecodeError::bad_signature(format, format!("palette index {} out of range", index))
        })?;
        pattern.add_thread(thread);
    }

    r.seek(start + STITCH_SECTION)?;
    r.skip(2)?;
    let section_len = r.u24_le()? as usize;
    let end = start + STITCH_SECTION + section_len;
    r.skip(FIRST_RECORD - STITCH_SECTION - 5)?;
    if end < r.position() {
        return Err(DecodeError::bad_signature(
            format,
            format!("stitch section length {} too small", section_len),
        ));
    }
    if end > bytes.len() {
        return Err(DecodeError::truncated(format, bytes.len(), end - bytes.len(), 0));
    }
    log::debug!(
        "{} block: colors={}, stitch section={} bytes",
        format,
        blocks,
        section_len
    );

    // Records may not run past the declared section.
    let mut records = ByteReader::new(&bytes[..end], format);
    records.seek(r.position())?;
    decode_records(&mut records, &mut pattern, format)?;

    let graphics = GRAPHIC_LEN * (blocks + 1);
    if bytes.len() - end < graphics {
        return Err(DecodeError::truncated(format, end, graphics, bytes.len() - end));
    }

    Ok(pattern)
}

fn decode_records(
    r: &mut ByteReader<'_>,
    pattern: &mut Pattern,
    format: FormatId,
) -> Result<(), DecodeError> {
    let (mut x, mut y) = (0i32, 0i32);

    loop {
        let record = r.position();
        let first = r.u8()?;
        if first == CMD_END {
            pattern.add(to_mm(x), to_mm(y), Command::End);
            return Ok(());
        }
        if first == CMD_COLOR_CHANGE {
            let mark = r.u8()?;
            if mark != COLOR_CHANGE_MARK {
                return Err(DecodeError::unknown_command(format, record + 1, mark));
            }
            r.skip(1)?;
            pattern.add(to_mm(x), to_mm(y), Command::ColorChange);
            continue;
        }

        let (dx, fx) = read_value(r, first, record, format)?;
        let offset = r.position();
        let second = r.u8()?;
        let (dy, fy) = read_value(r, second, offset, format)?;
        let flags = fx | fy;

        if flags & FLAG_TRIM != 0 {
            pattern.add(to_mm(x), to_mm(y), Command::Trim);
        }
        (x, y) = advance(format, record, (x, y), (dx, dy))?;

        if flags & FLAG_TRIM != 0 {
            if dx != 0 || dy != 0 {
                pattern.add(to_mm(x), to_mm(y), Command::Jump);
            }
        } else if flags & FLAG_JUMP != 0 {
            pattern.add(to_mm(x), to_mm(y), Command::Jump);
        } else {
            pattern.add(to_mm(x), to_mm(y), Command::Stitch);
        }
    }
}

/// Read one coordinate whose first byte is `first`. Returns the value and
/// its command flags.
fn read_value(
    r: &mut ByteReader<'_>,
    first: u8,
    offset: usize,
    format: FormatId,
) -> Result<(i32, u8), DecodeError> {
    if first & LONG_FORM == 0 {
        let v = i32::from(first);
        return Ok((if v > 0x3F { v - 0x80 } else { v }, 0));
    }
    if first & FLAG_RESERVED != 0 {
        return Err(DecodeError::unknown_command(format, offset, first));
    }
    let low = r.u8()?;
    let v = (i32::from(first & 0x0F) << 8) | i32::from(low);
    let v = if v > 0x7FF { v - 0x1000 } else { v };
    Ok((v, first & (FLAG_JUMP | FLAG_TRIM)))
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a complete PEC block (without the `#PEC0001` file signature).
pub(crate) fn encode_block(pattern: &Pattern, format: FormatId) -> Result<Vec<u8>, EncodeError> {
    let steps = steps::plan(format, &block_capabilities(), pattern)?;

    let blocks = pattern.color_block_count().max(1);
    if blocks > MAX_COLORS {
        return Err(EncodeError::TooManyColors {
            format,
            count: blocks,
            max: MAX_COLORS,
        });
    }
    let indices: Vec<u8> = (0..blocks)
        .map(|block| {
            let color = pattern
                .thread_for_block(block)
                .map_or(Thread::default().color, |t| t.color);
            // Palette has 65 slots, so the index fits a byte.
            PEC.nearest(color) as u8
        })
        .collect();

    let mut w = ByteWriter::with_capacity(FIRST_RECORD + steps.len() * 4 + GRAPHIC_LEN * (blocks + 1));

    // Header
    w.bytes(format!("LA:{:<16}\r", label_field(pattern.label.as_deref())).as_bytes());
    w.fill(0x20, 12);
    w.bytes(&[0xFF, 0x00, 0x06, 0x26]);
    w.fill(0x20, 12);
    w.u8((blocks - 1) as u8);
    w.bytes(&indices);
    w.fill(0x20, INDEX_AREA - indices.len());

    // Stitch section
    let (left, top, width, height) = pattern
        .bounds(BoundsPolicy::Traversed)
        .map_or((0, 0, 0, 0), |b| {
            (to_units(b.min_x), to_units(b.min_y), to_units(b.width()), to_units(b.height()))
        });
    w.bytes(&[0x00, 0x00]);
    let length_at = w.len();
    w.u24_le(0);
    w.bytes(&[0x31, 0xFF, 0xF0]);
    w.u16_le(u16::try_from(width).unwrap_or(u16::MAX));
    w.u16_le(u16::try_from(height).unwrap_or(u16::MAX));
    w.u16_le(0x1E0);
    w.u16_le(0x1B0);
    w.u16_be(0x9000 | ((-left) as u16 & 0x0FFF));
    w.u16_be(0x9000 | ((-top) as u16 & 0x0FFF));

    let mut toggle = 2u8;
    for step in &steps {
        match step.command {
            Command::Stitch => {
                if (-64..=63).contains(&step.dx) && (-64..=63).contains(&step.dy) {
                    w.u8((step.dx & 0x7F) as u8);
                    w.u8((step.dy & 0x7F) as u8);
                } else {
                    w.bytes(&long_value(step.dx, 0));
                    w.bytes(&long_value(step.dy, 0));
                }
            }
            Command::Jump => {
                w.bytes(&long_value(step.dx, FLAG_JUMP));
                w.bytes(&long_value(step.dy, FLAG_JUMP));
            }
            Command::Trim => {
                w.bytes(&long_value(0, FLAG_TRIM));
                w.bytes(&long_value(0, FLAG_TRIM));
            }
            Command::ColorChange => {
                w.bytes(&[CMD_COLOR_CHANGE, COLOR_CHANGE_MARK, toggle]);
                toggle = 3 - toggle;
            }
            Command::End => w.u8(CMD_END),
            Command::Stop | Command::Sequin => {
                return Err(EncodeError::Unrepresentable {
                    format,
                    command: step.command,
                    index: step.index,
                });
            }
        }
    }

    w.patch_u24_le(length_at, section_length(format, w.len() - STITCH_SECTION)?);

    w.fill(0x00, GRAPHIC_LEN * (blocks + 1));
    Ok(w.into_inner())
}

/// The stitch section length as the 24-bit header field holds it.
fn section_length(format: FormatId, len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len)
        .ok()
        .filter(|&v| v <= MAX_SECTION_LEN)
        .ok_or(EncodeError::TooLarge {
            format,
            len,
            max: MAX_SECTION_LEN as usize,
        })
}

/// Two-byte long-form coordinate with command flags.
fn long_value(v: i32, flags: u8) -> [u8; 2] {
    let v = (v as u16) & 0x0FFF;
    [LONG_FORM | flags | (v >> 8) as u8, (v & 0xFF) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_value_round_trip() {
        for v in [-2047, -64, -1, 0, 1, 64, 2047] {
            let [hi, lo] = long_value(v, FLAG_JUMP);
            let data = [lo];
            let mut r = ByteReader::new(&data, FormatId::Pec);
            assert_eq!(read_value(&mut r, hi, 0, FormatId::Pec).unwrap(), (v, FLAG_JUMP));
        }
    }

    #[test]
    fn test_short_form_sign() {
        let mut r = ByteReader::new(&[], FormatId::Pec);
        assert_eq!(read_value(&mut r, 0x7F, 0, FormatId::Pec).unwrap(), (-1, 0));
        assert_eq!(read_value(&mut r, 0x40, 0, FormatId::Pec).unwrap(), (-64, 0));
        assert_eq!(read_value(&mut r, 0x3F, 0, FormatId::Pec).unwrap(), (63, 0));
    }

    #[test]
    fn test_reserved_flag_is_unknown() {
        let mut r = ByteReader::new(&[0x00], FormatId::Pec);
        assert!(matches!(
            read_value(&mut r, 0xC0, 7, FormatId::Pec),
            Err(DecodeError::UnknownCommand { offset: 7, byte: 0xC0, .. })
        ));
    }

    #[test]
    fn test_section_length_fits_24_bits() {
        assert_eq!(section_length(FormatId::Pec, 0xFF_FFFF).unwrap(), 0xFF_FFFF);
        assert_eq!(
            section_length(FormatId::Pes, 0x100_0000).unwrap_err(),
            EncodeError::TooLarge {
                format: FormatId::Pes,
                len: 0x100_0000,
                max: 0xFF_FFFF,
            }
        );
    }

    #[test]
    fn test_versioned_magic() {
        assert!(versioned_magic(b"#PEC0001", b"#PEC"));
        assert!(versioned_magic(b"#PES0060", b"#PES"));
        assert!(!versioned_magic(b"#PES00a1", b"#PES"));
        assert!(!versioned_magic(b"#PEC0001", b"#PES"));
    }
}

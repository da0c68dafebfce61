//! Tajima DST format implementation.
//!
//! A 512-byte ASCII header followed by 3-byte records. Each record packs a
//! balanced-ternary displacement (at most 121 units per axis, +Y up) and two
//! flag bits in the third byte.

use crate::format::bytes::{ByteReader, ByteWriter, advance, label_field, to_mm, to_units};
use crate::format::error::{DecodeError, EncodeError};
use crate::format::registry::FormatId;
use crate::format::steps::{self, Step};
use crate::format::traits::{Capabilities, LongMovePolicy, StitchFormat};
use crate::pattern::{BoundsPolicy, Command, Pattern};

/// Size of the ASCII header block.
pub const HEADER_LEN: usize = 512;

/// Largest displacement one record holds.
pub const MAX_DELTA: i32 = 121;

const RECORD_LEN: usize = 3;
const END_RECORD: [u8; 3] = [0x00, 0x00, 0xF3];

const FLAG_JUMP: u8 = 0x80;
const FLAG_COLOR_CHANGE: u8 = 0xC0;
const FLAG_SEQUIN_MODE: u8 = 0x40;

/// Zero-displacement jumps that together mean "trim".
const TRIM_JUMPS: usize = 3;

/// Tajima DST.
///
/// Supports:
/// - Stitches, jumps, color changes
/// - Trims (as three zero-length jumps)
/// - Sequin ejects (inside sequin mode)
///
/// Does not support:
/// - Machine stops
/// - Thread colors (the file carries only color change records)
pub struct DstFormat;

impl StitchFormat for DstFormat {
    fn id(&self) -> FormatId {
        FormatId::Dst
    }

    fn display_name(&self) -> &'static str {
        "Tajima (DST)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["dst"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_read: true,
            can_write: true,
            max_delta: MAX_DELTA,
            long_moves: LongMovePolicy::Split,
            sequins: true,
            trims: true,
            stops: false,
            thread_table: false,
        }
    }

    fn sniff(&self, bytes: &[u8]) -> bool {
        bytes.len() >= HEADER_LEN && bytes.starts_with(b"LA:")
    }

    fn decode(&self, bytes: &[u8]) -> Result<Pattern, DecodeError> {
        let mut r = ByteReader::new(bytes, FormatId::Dst);
        if r.take(3)? != b"LA:" {
            return Err(DecodeError::bad_signature(
                FormatId::Dst,
                "header does not start with LA:",
            ));
        }
        r.seek(0)?;
        let header = Header::parse(r.take(HEADER_LEN)?)?;
        log::debug!(
            "DST header: label={:?}, records={}, color changes={:?}",
            header.label,
            header.records,
            header.color_changes
        );

        let declared = header.records.checked_mul(RECORD_LEN).ok_or_else(|| {
            DecodeError::bad_signature(FormatId::Dst, "record count overflows")
        })?;
        r.require(declared)?;

        let mut pattern = Pattern::with_capacity(header.records);
        pattern.label = header.label;

        let (mut x, mut y) = (0i32, 0i32);
        let mut sequin_mode = false;
        let mut zero_jumps = 0usize;

        loop {
            let offset = r.position();
            let record = r.take(RECORD_LEN)?;
            let (b0, b1, b2) = (record[0], record[1], record[2]);

            if b2 & 0xF3 == 0xF3 {
                flush_jumps(&mut pattern, &mut zero_jumps, x, y);
                pattern.add(to_mm(x), to_mm(y), Command::End);
                break;
            }
            if b2 & 0x03 != 0x03 {
                return Err(DecodeError::unknown_command(FormatId::Dst, offset + 2, b2));
            }

            let (dx, dy) = decode_delta(b0, b1, b2);
            let flags = b2 & 0xC0;
            let zero_jump = flags == FLAG_JUMP && !sequin_mode && dx == 0 && dy == 0;
            if !zero_jump {
                flush_jumps(&mut pattern, &mut zero_jumps, x, y);
            }
            (x, y) = advance(FormatId::Dst, offset, (x, y), (dx, dy))?;

            match flags {
                FLAG_JUMP if sequin_mode => pattern.add(to_mm(x), to_mm(y), Command::Sequin),
                FLAG_JUMP if zero_jump => {
                    zero_jumps += 1;
                    if zero_jumps == TRIM_JUMPS {
                        zero_jumps = 0;
                        pattern.add(to_mm(x), to_mm(y), Command::Trim);
                    }
                }
                FLAG_JUMP => pattern.add(to_mm(x), to_mm(y), Command::Jump),
                FLAG_COLOR_CHANGE => pattern.add(to_mm(x), to_mm(y), Command::ColorChange),
                FLAG_SEQUIN_MODE => {
                    if dx != 0 || dy != 0 {
                        pattern.add(to_mm(x), to_mm(y), Command::Jump);
                    }
                    sequin_mode = !sequin_mode;
                }
                _ => pattern.add(to_mm(x), to_mm(y), Command::Stitch),
            }
        }

        log::debug!("DST decoded {} entries", pattern.stitches().len());
        Ok(pattern)
    }

    fn encode(&self, pattern: &Pattern) -> Result<Vec<u8>, EncodeError> {
        let mut steps = steps::plan(FormatId::Dst, &self.capabilities(), pattern)?;
        // A zero-length jump would read back as a trim.
        steps::drop_idle_jumps(&mut steps);

        let mut body = ByteWriter::with_capacity(steps.len() * RECORD_LEN + 16);
        let mut records = 0usize;
        let mut sequin_mode = false;
        let mut put = |body: &mut ByteWriter, record: [u8; 3]| {
            body.bytes(&record);
            records += 1;
        };

        for step in &steps {
            if (step.command == Command::Sequin) != sequin_mode {
                put(&mut body, encode_record(0, 0, FLAG_SEQUIN_MODE));
                sequin_mode = !sequin_mode;
            }
            match step.command {
                Command::Stitch => put(&mut body, encode_record(step.dx, step.dy, 0)),
                Command::Jump | Command::Sequin => {
                    put(&mut body, encode_record(step.dx, step.dy, FLAG_JUMP));
                }
                Command::Trim => {
                    for _ in 0..TRIM_JUMPS {
                        put(&mut body, encode_record(0, 0, FLAG_JUMP));
                    }
                }
                Command::ColorChange => {
                    put(&mut body, encode_record(step.dx, step.dy, FLAG_COLOR_CHANGE));
                }
                Command::End => put(&mut body, END_RECORD),
                Command::Stop => {
                    return Err(EncodeError::Unrepresentable {
                        format: FormatId::Dst,
                        command: Command::Stop,
                        index: step.index,
                    });
                }
            }
        }

        let mut out = ByteWriter::with_capacity(HEADER_LEN + body.len());
        out.bytes(&write_header(pattern, &steps, records));
        out.bytes(&body.into_inner());
        Ok(out.into_inner())
    }
}

/// Emit jumps held back while waiting for a possible trim.
fn flush_jumps(pattern: &mut Pattern, pending: &mut usize, x: i32, y: i32) {
    for _ in 0..*pending {
        pattern.add(to_mm(x), to_mm(y), Command::Jump);
    }
    *pending = 0;
}

// ============================================================================
// Header
// ============================================================================

#[derive(Debug)]
struct Header {
    label: Option<String>,
    records: usize,
    color_changes: Option<usize>,
}

impl Header {
    fn parse(block: &[u8]) -> Result<Self, DecodeError> {
        let text = String::from_utf8_lossy(block);
        let mut label = None;
        let mut records = None;
        let mut color_changes = None;

        for field in text.split('\r') {
            if let Some(v) = field.strip_prefix("LA:") {
                let v = v.trim();
                if !v.is_empty() {
                    label = Some(v.to_string());
                }
            } else if let Some(v) = field.strip_prefix("ST:") {
                records = v.trim().parse::<usize>().ok();
            } else if let Some(v) = field.strip_prefix("CO:") {
                color_changes = v.trim().parse::<usize>().ok();
            }
        }

        let records = records
            .ok_or_else(|| DecodeError::bad_signature(FormatId::Dst, "missing or invalid ST field"))?;

        Ok(Self {
            label,
            records,
            color_changes,
        })
    }
}

fn write_header(pattern: &Pattern, steps: &[Step], records: usize) -> Vec<u8> {
    let label = label_field(pattern.label.as_deref());

    let (min_x, min_y, max_x, max_y) = pattern
        .bounds(BoundsPolicy::Traversed)
        .map_or((0, 0, 0, 0), |b| {
            (to_units(b.min_x), to_units(b.min_y), to_units(b.max_x), to_units(b.max_y))
        });
    let end_x: i64 = steps.iter().map(|s| i64::from(s.dx)).sum();
    let end_y: i64 = -steps.iter().map(|s| i64::from(s.dy)).sum::<i64>();
    let color_changes = pattern.count(Command::ColorChange);

    let signed = |v: i64| format!("{}{:>5}", if v < 0 { '-' } else { '+' }, v.abs());

    let mut header = String::with_capacity(HEADER_LEN);
    header.push_str(&format!("LA:{:<16}\r", label));
    header.push_str(&format!("ST:{:>7}\r", records));
    header.push_str(&format!("CO:{:>3}\r", color_changes));
    header.push_str(&format!("+X:{:>5}\r", max_x.abs()));
    header.push_str(&format!("-X:{:>5}\r", min_x.abs()));
    header.push_str(&format!("+Y:{:>5}\r", min_y.abs()));
    header.push_str(&format!("-Y:{:>5}\r", max_y.abs()));
    header.push_str(&format!("AX:{}\r", signed(end_x)));
    header.push_str(&format!("AY:{}\r", signed(end_y)));
    header.push_str(&format!("MX:{}\r", signed(0)));
    header.push_str(&format!("MY:{}\r", signed(0)));
    header.push_str("PD:******\r");

    let mut w = ByteWriter::with_capacity(HEADER_LEN);
    w.bytes(header.as_bytes());
    w.u8(0x1A);
    w.pad_to(HEADER_LEN, 0x20);
    w.into_inner()
}

// ============================================================================
// Records
// ============================================================================

fn bit(byte: u8, n: u32) -> i32 {
    i32::from((byte >> n) & 1)
}

/// Displacement of one record in canonical orientation (+Y down).
fn decode_delta(b0: u8, b1: u8, b2: u8) -> (i32, i32) {
    let dx = bit(b0, 0) - bit(b0, 1) + 9 * (bit(b0, 2) - bit(b0, 3))
        + 3 * (bit(b1, 0) - bit(b1, 1))
        + 27 * (bit(b1, 2) - bit(b1, 3))
        + 81 * (bit(b2, 2) - bit(b2, 3));
    let dy = bit(b0, 7) - bit(b0, 6) + 9 * (bit(b0, 5) - bit(b0, 4))
        + 3 * (bit(b1, 7) - bit(b1, 6))
        + 27 * (bit(b1, 5) - bit(b1, 4))
        + 81 * (bit(b2, 5) - bit(b2, 4));
    (dx, -dy)
}

/// Pack a displacement (+Y down, within ±121) and flag bits into a record.
fn encode_record(dx: i32, dy: i32, flags: u8) -> [u8; 3] {
    let mut b = [0u8, 0u8, flags | 0x03];
    let mut x = dx;
    let mut y = -dy;

    // (threshold, weight, byte, positive bit, negative bit)
    const X_DIGITS: [(i32, i32, usize, u8, u8); 5] = [
        (40, 81, 2, 2, 3),
        (13, 27, 1, 2, 3),
        (4, 9, 0, 2, 3),
        (1, 3, 1, 0, 1),
        (0, 1, 0, 0, 1),
    ];
    const Y_DIGITS: [(i32, i32, usize, u8, u8); 5] = [
        (40, 81, 2, 5, 4),
        (13, 27, 1, 5, 4),
        (4, 9, 0, 5, 4),
        (1, 3, 1, 7, 6),
        (0, 1, 0, 7, 6),
    ];

    for (threshold, weight, byte, pos, neg) in X_DIGITS {
        if x > threshold {
            b[byte] |= 1 << pos;
            x -= weight;
        } else if x < -threshold {
            b[byte] |= 1 << neg;
            x += weight;
        }
    }
    for (threshold, weight, byte, pos, neg) in Y_DIGITS {
        if y > threshold {
            b[byte] |= 1 << pos;
            y -= weight;
        } else if y < -threshold {
            b[byte] |= 1 << neg;
            y += weight;
        }
    }
    b
}

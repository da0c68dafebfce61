//! Janome JEF format implementation.
//!
//! Little-endian header with hoop and extents information, a table of Janome
//! palette indices, then 2-byte signed records with `0x80` escapes.

use crate::format::bytes::{ByteReader, ByteWriter, advance, to_mm, to_units};
use crate::format::error::{DecodeError, EncodeError};
use crate::format::palette::JANOME;
use crate::format::registry::FormatId;
use crate::format::steps;
use crate::format::traits::{Capabilities, LongMovePolicy, StitchFormat};
use crate::pattern::{BoundsPolicy, Command, Pattern, Thread};

/// Fixed part of the header, before the color tables.
pub const HEADER_LEN: usize = 116;

pub const MAX_DELTA: i32 = 127;

/// Most color blocks written into one header.
pub const MAX_COLORS: usize = 4096;

const FLAGS: i32 = 0x14;
const THREAD_TYPE: i32 = 0x0D;
/// Date field written into new files (YYYYMMDDhhmmss).
const DATE: &[u8; 14] = b"20000101000000";

const ESCAPE: u8 = 0x80;
const CODE_COLOR_CHANGE: u8 = 0x01;
const CODE_JUMP: u8 = 0x02;
const CODE_JUMP_ALT: u8 = 0x04;
const CODE_END: u8 = 0x10;

/// Janome hoop sizes in millimetres, by header code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hoop {
    A110x110 = 0,
    C50x50 = 1,
    B140x200 = 2,
    F126x110 = 3,
    D200x200 = 4,
}

impl Hoop {
    /// Hoops whose clearance is recorded in the header, in order.
    const EXTENTS_ORDER: [Hoop; 4] = [Hoop::A110x110, Hoop::C50x50, Hoop::B140x200, Hoop::D200x200];

    /// Width and height in native units.
    pub fn size(self) -> (i64, i64) {
        match self {
            Hoop::A110x110 => (1100, 1100),
            Hoop::C50x50 => (500, 500),
            Hoop::B140x200 => (1400, 2000),
            Hoop::F126x110 => (1260, 1100),
            Hoop::D200x200 => (2000, 2000),
        }
    }

    /// Smallest hoop that holds a design of the given size, in native units.
    pub fn for_design(width: i64, height: i64) -> Hoop {
        [Hoop::C50x50, Hoop::F126x110, Hoop::B140x200, Hoop::D200x200]
            .into_iter()
            .find(|h| {
                let (w, hh) = h.size();
                width < w && height < hh
            })
            .unwrap_or(Hoop::A110x110)
    }
}

/// Janome JEF.
///
/// Supports:
/// - Stitches, jumps, color changes
/// - Trims (as zero-length jumps)
/// - Thread colors from the Janome palette
///
/// Does not support:
/// - Sequins, machine stops
pub struct JefFormat;

impl StitchFormat for JefFormat {
    fn id(&self) -> FormatId {
        FormatId::Jef
    }

    fn display_name(&self) -> &'static str {
        "Janome (JEF)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["jef"]
    }

    fn capabilities(&self) -> Capabilities {
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

    fn sniff(&self, bytes: &[u8]) -> bool {
        let mut r = ByteReader::new(bytes, FormatId::Jef);
        let Ok(offset) = r.i32_le() else {
            return false;
        };
        if r.skip(20).is_err() {
            return false;
        }
        let Ok(count) = r.i32_le() else {
            return false;
        };
        bytes.len() >= HEADER_LEN && expected_offset(count) == Some(offset)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Pattern, DecodeError> {
        let mut r = ByteReader::new(bytes, FormatId::Jef);
        let stitch_offset = r.i32_le()?;
        let _flags = r.i32_le()?;
        r.skip(16)?;
        let color_count = r.i32_le()?;

        if expected_offset(color_count) != Some(stitch_offset) {
            return Err(DecodeError::bad_signature(
                FormatId::Jef,
                format!(
                    "stitch offset {} does not match {} colors",
                    stitch_offset, color_count
                ),
            ));
        }

        let point_count = r.i32_le()?;
        let hoop = r.i32_le()?;
        r.seek(HEADER_LEN)?;
        log::debug!(
            "JEF header: colors={}, points={}, hoop={}",
            color_count,
            point_count,
            hoop
        );

        // The offset check guarantees a non-negative count.
        let colors = color_count as usize;
        let capacity = usize::try_from(point_count).unwrap_or(0).min(bytes.len());
        let mut pattern = Pattern::with_capacity(capacity);
        for _ in 0..colors {
            let index = r.i32_le()?;
            let thread = usize::try_from(index)
                .ok()
                .filter(|&i| i > 0)
                .and_then(|i| JANOME.thread(i))
                .ok_or_else(|| {
                    DecodeError::bad_signature(
                        FormatId::Jef,
                        format!("palette index {} out of range", index),
                    )
                })?;
            pattern.add_thread(thread);
        }
        r.skip(colors * 4)?;

        let (mut x, mut y) = (0i32, 0i32);
        loop {
            let record = r.position();
            let first = r.u8()?;
            if first != ESCAPE {
                let dy = r.i8()?;
                (x, y) = advance(
                    FormatId::Jef,
                    record,
                    (x, y),
                    (i32::from(first as i8), -i32::from(dy)),
                )?;
                pattern.add(to_mm(x), to_mm(y), Command::Stitch);
                continue;
            }

            let offset = r.position();
            let code = r.u8()?;
            match code {
                CODE_END => {
                    pattern.add(to_mm(x), to_mm(y), Command::End);
                    break;
                }
                CODE_COLOR_CHANGE | CODE_JUMP | CODE_JUMP_ALT => {
                    let dx = r.i8()?;
                    let dy = r.i8()?;
                    (x, y) =
                        advance(FormatId::Jef, record, (x, y), (i32::from(dx), -i32::from(dy)))?;
                    let command = match code {
                        CODE_COLOR_CHANGE => Command::ColorChange,
                        _ if dx == 0 && dy == 0 => Command::Trim,
                        _ => Command::Jump,
                    };
                    pattern.add(to_mm(x), to_mm(y), command);
                }
                other => return Err(DecodeError::unknown_command(FormatId::Jef, offset, other)),
            }
        }

        log::debug!("JEF decoded {} entries", pattern.stitches().len());
        Ok(pattern)
    }

    fn encode(&self, pattern: &Pattern) -> Result<Vec<u8>, EncodeError> {
        let mut steps = steps::plan(FormatId::Jef, &self.capabilities(), pattern)?;
        // A zero-length jump would read back as a trim.
        steps::drop_idle_jumps(&mut steps);

        let blocks = pattern.color_block_count();
        if blocks > MAX_COLORS {
            return Err(EncodeError::TooManyColors {
                format: FormatId::Jef,
                count: blocks,
                max: MAX_COLORS,
            });
        }
        let color_count = blocks as i32;
        let indices: Vec<i32> = (0..blocks)
            .map(|block| {
                let color = pattern
                    .thread_for_block(block)
                    .map_or(Thread::default().color, |t| t.color);
                JANOME.nearest(color) as i32
            })
            .collect();

        let mut body = ByteWriter::with_capacity(steps.len() * 4);
        let mut points = 0i32;
        for step in &steps {
            let (dx, dy) = (step.dx as i8, (-step.dy) as i8);
            match step.command {
                Command::Stitch => {
                    body.i8(dx);
                    body.i8(dy);
                }
                Command::Jump => {
                    body.bytes(&[ESCAPE, CODE_JUMP]);
                    body.i8(dx);
                    body.i8(dy);
                }
                Command::Trim => body.bytes(&[ESCAPE, CODE_JUMP, 0, 0]),
                Command::ColorChange => body.bytes(&[ESCAPE, CODE_COLOR_CHANGE, 0, 0]),
                Command::End => body.bytes(&[ESCAPE, CODE_END]),
                Command::Stop | Command::Sequin => {
                    return Err(EncodeError::Unrepresentable {
                        format: FormatId::Jef,
                        command: step.command,
                        index: step.index,
                    });
                }
            }
            points += 1;
        }

        let (width, height) = pattern
            .bounds(BoundsPolicy::Traversed)
            .map_or((0, 0), |b| (to_units(b.width()), to_units(b.height())));
        let hoop = Hoop::for_design(width, height);
        let (half_w, half_h) = (half(width), half(height));

        let mut w = ByteWriter::with_capacity(HEADER_LEN + indices.len() * 8 + body.len());
        w.i32_le(HEADER_LEN as i32 + color_count * 8);
        w.i32_le(FLAGS);
        w.bytes(DATE);
        w.fill(0, 2);
        w.i32_le(color_count);
        w.i32_le(points);
        w.i32_le(hoop as i32);

        for _ in 0..2 {
            w.i32_le(half_w);
            w.i32_le(half_h);
        }
        for h in Hoop::EXTENTS_ORDER {
            let (hw, hh) = h.size();
            let (clear_x, clear_y) = (hw / 2 - i64::from(half_w), hh / 2 - i64::from(half_h));
            if clear_x >= 0 && clear_y >= 0 {
                for _ in 0..2 {
                    w.i32_le(clear_x as i32);
                    w.i32_le(clear_y as i32);
                }
            } else {
                for _ in 0..4 {
                    w.i32_le(-1);
                }
            }
        }

        for index in &indices {
            w.i32_le(*index);
        }
        for _ in &indices {
            w.i32_le(THREAD_TYPE);
        }
        w.bytes(&body.into_inner());
        Ok(w.into_inner())
    }
}

/// Stitch offset a header with `count` colors must declare.
fn expected_offset(count: i32) -> Option<i32> {
    if count < 0 {
        return None;
    }
    count.checked_mul(8)?.checked_add(HEADER_LEN as i32)
}

fn half(units: i64) -> i32 {
    i32::try_from((units + 1) / 2).unwrap_or(i32::MAX)
}

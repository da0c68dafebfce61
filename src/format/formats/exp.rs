//! Melco EXP format implementation.
//!
//! Headerless stream of 2-byte signed records with `0x80` escapes for
//! control codes. The end of the data is the end of the design.

use crate::format::bytes::{ByteReader, ByteWriter, advance, to_mm};
use crate::format::error::{DecodeError, EncodeError};
use crate::format::registry::FormatId;
use crate::format::steps;
use crate::format::traits::{Capabilities, LongMovePolicy, StitchFormat};
use crate::pattern::{Command, Pattern};

pub const MAX_DELTA: i32 = 127;

const ESCAPE: u8 = 0x80;
const CODE_COLOR_CHANGE: u8 = 0x01;
const CODE_STITCH: u8 = 0x02;
const CODE_JUMP: u8 = 0x04;
const CODE_TRIM: u8 = 0x80;

/// Melco expanded (EXP).
///
/// Supports:
/// - Stitches, jumps, trims, color changes
///
/// Does not support:
/// - Sequins, machine stops
/// - Long moves (no splitting; out-of-range displacements fail)
/// - Thread colors
pub struct ExpFormat;

impl StitchFormat for ExpFormat {
    fn id(&self) -> FormatId {
        FormatId::Exp
    }

    fn display_name(&self) -> &'static str {
        "Melco (EXP)"
    }

    fn extensions(&self) -> &[&'static str] {
        &["exp"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_read: true,
            can_write: true,
            max_delta: MAX_DELTA,
            long_moves: LongMovePolicy::Reject,
            sequins: false,
            trims: true,
            stops: false,
            thread_table: false,
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Pattern, DecodeError> {
        let mut r = ByteReader::new(bytes, FormatId::Exp);
        r.require(2)?;

        let mut pattern = Pattern::with_capacity(bytes.len() / 2 + 1);
        let (mut x, mut y) = (0i32, 0i32);

        while !r.is_empty() {
            let record = r.position();
            let first = r.u8()?;
            if first != ESCAPE {
                let dy = r.i8()?;
                (x, y) = advance(
                    FormatId::Exp,
                    record,
                    (x, y),
                    (i32::from(first as i8), -i32::from(dy)),
                )?;
                pattern.add(to_mm(x), to_mm(y), Command::Stitch);
                continue;
            }

            let offset = r.position();
            let code = r.u8()?;
            let dx = r.i8()?;
            let dy = r.i8()?;
            (x, y) = advance(FormatId::Exp, record, (x, y), (i32::from(dx), -i32::from(dy)))?;

            let command = match code {
                CODE_COLOR_CHANGE => Command::ColorChange,
                CODE_STITCH => Command::Stitch,
                CODE_JUMP => Command::Jump,
                CODE_TRIM => Command::Trim,
                other => return Err(DecodeError::unknown_command(FormatId::Exp, offset, other)),
            };
            pattern.add(to_mm(x), to_mm(y), command);
        }

        pattern.finish();
        log::debug!("EXP decoded {} entries", pattern.stitches().len());
        Ok(pattern)
    }

    fn encode(&self, pattern: &Pattern) -> Result<Vec<u8>, EncodeError> {
        let steps = steps::plan(FormatId::Exp, &self.capabilities(), pattern)?;
        let mut w = ByteWriter::with_capacity(steps.len() * 4);

        for step in &steps {
            // Planned displacements are within ±127.
            let (dx, dy) = (step.dx as i8, (-step.dy) as i8);
            match step.command {
                Command::Stitch => {
                    w.i8(dx);
                    w.i8(dy);
                }
                Command::Jump => {
                    w.bytes(&[ESCAPE, CODE_JUMP]);
                    w.i8(dx);
                    w.i8(dy);
                }
                Command::Trim => w.bytes(&[ESCAPE, CODE_TRIM, 0, 0]),
                Command::ColorChange => w.bytes(&[ESCAPE, CODE_COLOR_CHANGE, 0, 0]),
                Command::End => {}
                Command::Stop | Command::Sequin => {
                    return Err(EncodeError::Unrepresentable {
                        format: FormatId::Exp,
                        command: step.command,
                        index: step.index,
                    });
                }
            }
        }

        Ok(w.into_inner())
    }
}

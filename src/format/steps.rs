//! Conversion of absolute stitch positions into per-record displacements.
//!
//! Encoders write relative records. [`plan`] walks a pattern once, rounds each
//! position to native units, enforces the format's [`Capabilities`] and splits
//! long moves into in-range jumps when the format allows it.

use crate::format::bytes::{MAX_COORDINATE, UNITS_PER_MM};
use crate::format::error::EncodeError;
use crate::format::registry::FormatId;
use crate::format::traits::{Capabilities, LongMovePolicy};
use crate::pattern::{Command, Pattern};

/// One record to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// X displacement in native units (+X right).
    pub dx: i32,
    /// Y displacement in native units (+Y down).
    pub dy: i32,
    pub command: Command,
    /// Index of the pattern stitch this record came from.
    pub index: usize,
}

/// Plan the records for `pattern` under `caps`.
///
/// Stitches, jumps and sequins move to their position in the same record.
/// Trims, color changes, stops and the End are written in place, preceded by
/// a jump when their position differs from the current one.
pub fn plan(format: FormatId, caps: &Capabilities, pattern: &Pattern) -> Result<Vec<Step>, EncodeError> {
    pattern.validate()?;

    let mut steps = Vec::with_capacity(pattern.stitches().len());
    let (mut cx, mut cy) = (0i64, 0i64);

    for (index, stitch) in pattern.stitches().iter().enumerate() {
        if !caps.supports(stitch.command) {
            return Err(EncodeError::Unrepresentable {
                format,
                command: stitch.command,
                index,
            });
        }

        let (Some(tx), Some(ty)) = (checked_units(stitch.x), checked_units(stitch.y)) else {
            return Err(EncodeError::InvalidCoordinate {
                format,
                index,
                x: stitch.x,
                y: stitch.y,
            });
        };
        let (dx, dy) = (tx - cx, ty - cy);

        match stitch.command {
            Command::Stitch | Command::Jump | Command::Sequin => {
                push_move(&mut steps, format, caps, index, dx, dy, stitch.command)?;
            }
            Command::Trim | Command::ColorChange | Command::Stop | Command::End => {
                if dx != 0 || dy != 0 {
                    push_move(&mut steps, format, caps, index, dx, dy, Command::Jump)?;
                }
                steps.push(Step {
                    dx: 0,
                    dy: 0,
                    command: stitch.command,
                    index,
                });
            }
        }

        cx = tx;
        cy = ty;
    }

    Ok(steps)
}

/// Native units for `mm`, or None when it is not finite or lies beyond
/// [`MAX_COORDINATE`].
fn checked_units(mm: f64) -> Option<i64> {
    let units = (mm * UNITS_PER_MM).round();
    if units.is_finite() && units.abs() <= MAX_COORDINATE as f64 {
        Some(units as i64)
    } else {
        None
    }
}

/// Remove jumps that do not move the needle.
///
/// Formats that spell a trim as zero-length jumps call this so a no-op jump
/// is not read back as a trim.
pub fn drop_idle_jumps(steps: &mut Vec<Step>) {
    let before = steps.len();
    steps.retain(|s| !(s.command == Command::Jump && s.dx == 0 && s.dy == 0));
    if steps.len() != before {
        log::debug!("Dropped {} zero-length jumps", before - steps.len());
    }
}

fn push_move(
    steps: &mut Vec<Step>,
    format: FormatId,
    caps: &Capabilities,
    index: usize,
    dx: i64,
    dy: i64,
    command: Command,
) -> Result<(), EncodeError> {
    let max = i64::from(caps.max_delta);
    let longest = dx.abs().max(dy.abs());

    if longest <= max {
        steps.push(Step {
            dx: dx as i32,
            dy: dy as i32,
            command,
            index,
        });
        return Ok(());
    }

    if caps.long_moves == LongMovePolicy::Reject || command == Command::Sequin {
        return Err(EncodeError::OutOfRange {
            format,
            index,
            dx,
            dy,
            max: caps.max_delta,
        });
    }

    // Evenly spaced records; each difference is at most ceil(longest / n) <= max.
    let n = (longest + max - 1) / max;
    log::trace!(
        "{}: splitting ({}, {}) at stitch #{} into {} records",
        format,
        dx,
        dy,
        index,
        n
    );
    let (mut px, mut py) = (0i64, 0i64);
    for k in 1..=n {
        let (nx, ny) = (dx * k / n, dy * k / n);
        steps.push(Step {
            dx: (nx - px) as i32,
            dy: (ny - py) as i32,
            command: if k == n { command } else { Command::Jump },
            index,
        });
        px = nx;
        py = ny;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(long_moves: LongMovePolicy) -> Capabilities {
        Capabilities {
            can_read: true,
            can_write: true,
            max_delta: 121,
            long_moves,
            sequins: true,
            trims: true,
            stops: false,
            thread_table: false,
        }
    }

    fn pattern(points: &[(f64, f64, Command)]) -> Pattern {
        let mut p = Pattern::new();
        for &(x, y, c) in points {
            p.add(x, y, c);
        }
        p.finish();
        p
    }

    #[test]
    fn test_short_moves_map_one_to_one() {
        let p = pattern(&[(0.0, 0.0, Command::Stitch), (1.0, -2.5, Command::Stitch)]);
        let steps = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!((steps[1].dx, steps[1].dy), (10, -25));
        assert_eq!(steps[2].command, Command::End);
    }

    #[test]
    fn test_long_stitch_is_split_into_jumps() {
        let p = pattern(&[(50.0, -30.0, Command::Stitch)]);
        let steps = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap();

        let moves: Vec<_> = steps.iter().filter(|s| s.index == 0).collect();
        assert_eq!(moves.len(), 5);
        assert!(moves[..4].iter().all(|s| s.command == Command::Jump));
        assert_eq!(moves[4].command, Command::Stitch);
        assert!(moves.iter().all(|s| s.dx.abs() <= 121 && s.dy.abs() <= 121));
        assert_eq!(moves.iter().map(|s| s.dx).sum::<i32>(), 500);
        assert_eq!(moves.iter().map(|s| s.dy).sum::<i32>(), -300);
    }

    #[test]
    fn test_long_move_rejected() {
        let p = pattern(&[(50.0, 0.0, Command::Stitch)]);
        let err = plan(FormatId::Exp, &caps(LongMovePolicy::Reject), &p).unwrap_err();
        assert_eq!(
            err,
            EncodeError::OutOfRange {
                format: FormatId::Exp,
                index: 0,
                dx: 500,
                dy: 0,
                max: 121,
            }
        );
    }

    #[test]
    fn test_sequin_never_split() {
        let p = pattern(&[(50.0, 0.0, Command::Sequin)]);
        let err = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { .. }));
    }

    #[test]
    fn test_displaced_control_gets_a_jump() {
        let p = pattern(&[
            (0.0, 0.0, Command::Stitch),
            (3.0, 0.0, Command::ColorChange),
        ]);
        let steps = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap();
        assert_eq!(steps[1].command, Command::Jump);
        assert_eq!(steps[1].dx, 30);
        assert_eq!(steps[2].command, Command::ColorChange);
        assert_eq!((steps[2].dx, steps[2].dy), (0, 0));
    }

    #[test]
    fn test_unsupported_command() {
        let p = pattern(&[(0.0, 0.0, Command::Stop)]);
        let err = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap_err();
        assert_eq!(
            err,
            EncodeError::Unrepresentable {
                format: FormatId::Dst,
                command: Command::Stop,
                index: 0,
            }
        );
    }

    #[test]
    fn test_rejects_pattern_without_end() {
        let mut p = Pattern::new();
        p.add(0.0, 0.0, Command::Stitch);
        let err = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidPattern(_)));
    }

    #[test]
    fn test_coordinate_limit() {
        let p = pattern(&[(20_000.0, 0.0, Command::Jump)]);
        let err = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidCoordinate { index: 0, .. }));

        let edge = pattern(&[(9_999.9, -9_999.9, Command::Jump)]);
        assert!(plan(FormatId::Dst, &caps(LongMovePolicy::Split), &edge).is_ok());
    }

    #[test]
    fn test_non_finite_and_extreme_coordinates() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300, -1e300] {
            let p = pattern(&[(0.0, 0.0, Command::Stitch), (v, 0.0, Command::Stitch)]);
            let err = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap_err();
            assert!(
                matches!(err, EncodeError::InvalidCoordinate { index: 1, .. }),
                "{}: {:?}",
                v,
                err
            );

            let p = pattern(&[(0.0, v, Command::Jump)]);
            assert!(plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).is_err(), "{}", v);
        }
    }

    #[test]
    fn test_drop_idle_jumps() {
        let p = pattern(&[
            (0.0, 0.0, Command::Stitch),
            (1.0, 0.0, Command::Stitch),
            (1.0, 0.0, Command::Jump),
            (1.0, 0.0, Command::Trim),
            (2.0, 0.0, Command::Jump),
        ]);
        let mut steps = plan(FormatId::Dst, &caps(LongMovePolicy::Split), &p).unwrap();
        drop_idle_jumps(&mut steps);
        let commands: Vec<_> = steps.iter().map(|s| s.command).collect();
        assert_eq!(
            commands,
            vec![
                Command::Stitch,
                Command::Stitch,
                Command::Trim,
                Command::Jump,
                Command::End
            ]
        );
    }
}

//! Unit tests for stitch-file format implementations.
//!
//! These tests verify byte layouts, error reporting on malformed input, and
//! round-trip conversions.

mod dst_tests;

use crate::pattern::{Command, Pattern, Rgb, Thread};

/// Build a pattern from absolute points, appending the End if missing.
pub(super) fn build(points: &[(f64, f64, Command)]) -> Pattern {
    let mut pattern = Pattern::new();
    for &(x, y, command) in points {
        pattern.add(x, y, command);
    }
    pattern.finish();
    pattern
}

/// Stitches at (0,0) and (10,5), a trim at (10,5), then the End.
pub(super) fn end_to_end_pattern() -> Pattern {
    build(&[
        (0.0, 0.0, Command::Stitch),
        (10.0, 5.0, Command::Stitch),
        (10.0, 5.0, Command::Trim),
    ])
}

/// Two color blocks, with jumps and a trim, representable in every format.
pub(super) fn two_color_pattern() -> Pattern {
    let mut pattern = build(&[
        (0.0, 0.0, Command::Stitch),
        (2.5, 1.0, Command::Stitch),
        (5.0, -3.2, Command::Stitch),
        (8.0, -3.2, Command::Jump),
        (8.5, -3.0, Command::Stitch),
        (8.5, -3.0, Command::Trim),
        (12.0, 4.0, Command::Jump),
        (12.0, 4.0, Command::ColorChange),
        (12.3, 4.1, Command::Stitch),
        (11.0, 6.0, Command::Stitch),
    ]);
    pattern.add_thread(Thread::new(Rgb::new(255, 0, 0)).with_description("Red"));
    pattern.add_thread(Thread::new(Rgb::new(255, 255, 255)).with_description("White"));
    pattern
}

pub(super) fn commands(pattern: &Pattern) -> Vec<Command> {
    pattern.stitches().iter().map(|s| s.command).collect()
}

/// Assert two patterns carry the same commands at the same positions, to
/// within half a native unit.
pub(super) fn assert_same_geometry(actual: &Pattern, expected: &Pattern) {
    assert_eq!(commands(actual), commands(expected));
    for (i, (a, e)) in actual.stitches().iter().zip(expected.stitches()).enumerate() {
        assert!(
            (a.x - e.x).abs() < 0.051 && (a.y - e.y).abs() < 0.051,
            "stitch #{} at ({}, {}), expected ({}, {})",
            i,
            a.x,
            a.y,
            e.x,
            e.y
        );
    }
}

//! Conversion through the public API, file to file.

use std::path::Path;

use stitchfile::format::FormatRegistry;
use stitchfile::{Command, ErrorKind, FormatId, Pattern, Rgb, Thread, convert, inspect};

fn sample() -> Pattern {
    let mut pattern = Pattern::new();
    pattern.add_thread(Thread::new(Rgb::new(237, 23, 31)).with_description("Red"));
    pattern.add_thread(Thread::new(Rgb::new(240, 240, 240)).with_description("White"));
    pattern.add(0.0, 0.0, Command::Stitch);
    pattern.add(12.5, 0.0, Command::Stitch);
    pattern.add(12.5, 7.5, Command::Stitch);
    pattern.add(12.5, 7.5, Command::ColorChange);
    pattern.add(0.0, 7.5, Command::Stitch);
    pattern.finish();
    pattern
}

fn write(path: &Path, id: FormatId, pattern: &Pattern) {
    std::fs::write(path, id.format().encode(pattern).unwrap()).unwrap();
}

#[test]
fn converts_through_every_writable_format() {
    let dir = tempfile::tempdir().unwrap();
    let mut current = dir.path().join("start.pes");
    write(&current, FormatId::Pes, &sample());

    for id in FormatRegistry::global().writable() {
        let next = dir
            .path()
            .join(format!("step.{}", id.as_str().to_ascii_lowercase()));
        let summary = convert(&current, &next).unwrap();
        assert_eq!(summary.target_format, id);
        assert_eq!(summary.stitch_count, 4, "{}", id);
        current = next;
    }

    let meta = inspect(&current).unwrap();
    assert_eq!(meta.stitch_count, 4);
    assert_eq!(meta.color_block_count, 2);
    assert!((meta.width - 12.5).abs() < 0.051);
    assert!((meta.height - 7.5).abs() < 0.051);
}

#[test]
fn sniffed_format_matches_extension() {
    let dir = tempfile::tempdir().unwrap();
    for id in [FormatId::Dst, FormatId::Jef, FormatId::Pec, FormatId::Pes] {
        let path = dir.path().join(format!("s.{}", id.as_str().to_ascii_lowercase()));
        write(&path, id, &sample());
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(FormatRegistry::global().sniff(&bytes), Some(id));
    }
}

#[test]
fn unknown_output_extension_is_rejected_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let err = convert(&dir.path().join("missing.dst"), &dir.path().join("out.svg")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnrecognizedExtension);
    assert_eq!(err.kind().exit_code(), 2);
}

#[test]
fn truncated_input_reports_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("cut.jef");
    let bytes = FormatId::Jef.format().encode(&sample()).unwrap();
    std::fs::write(&input, &bytes[..bytes.len() - 3]).unwrap();

    let err = inspect(&input).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncated);
    assert_eq!(err.kind().exit_code(), 4);
}

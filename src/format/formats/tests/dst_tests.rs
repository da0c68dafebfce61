//! Tests for the DST format.

use super::{assert_same_geometry, build, commands, end_to_end_pattern, two_color_pattern};
use crate::format::error::{DecodeError, EncodeError};
use crate::format::formats::DstFormat;
use crate::format::registry::FormatId;
use crate::format::traits::{LongMovePolicy, StitchFormat};
use crate::pattern::{Command, Pattern};

/// Hand-built file: minimal header and the given records.
fn raw_file(records: &[[u8; 3]]) -> Vec<u8> {
    let mut data = format!("LA:hand\rST:{}\r", records.len()).into_bytes();
    data.resize(512, 0x20);
    for record in records {
        data.extend_from_slice(record);
    }
    data
}

#[test]
fn test_dst_format_metadata() {
    let format = DstFormat;

    assert_eq!(format.id(), FormatId::Dst);
    assert_eq!(format.display_name(), "Tajima (DST)");
    assert!(format.extensions().contains(&"dst"));

    let caps = format.capabilities();
    assert_eq!(caps.max_delta, 121);
    assert_eq!(caps.long_moves, LongMovePolicy::Split);
    assert!(caps.sequins, "DST supports sequins");
    assert!(!caps.stops, "DST has no stop record");
    assert!(!caps.thread_table);
}

#[test]
fn test_dst_header_layout() {
    let bytes = DstFormat.encode(&end_to_end_pattern()).unwrap();

    // Two stitches, three jumps for the trim, one end record.
    assert_eq!(bytes.len(), 512 + 6 * 3);
    let header = String::from_utf8_lossy(&bytes[..512]);
    assert!(header.starts_with("LA:Untitled        \r"));
    assert!(header.contains("ST:      6\r"));
    assert!(header.contains("CO:  0\r"));
    assert!(header.contains("+X:  100\r"));
    assert!(header.contains("-Y:   50\r"));
    assert!(header.contains("AX:+  100\r"));
    assert!(header.contains("AY:-   50\r"));
    assert_eq!(bytes[511], 0x20);
    assert_eq!(&bytes[bytes.len() - 3..], &[0x00, 0x00, 0xF3]);
}

#[test]
fn test_dst_end_to_end() {
    let bytes = DstFormat.encode(&end_to_end_pattern()).unwrap();
    let decoded = DstFormat.decode(&bytes).unwrap();

    assert_same_geometry(&decoded, &end_to_end_pattern());
    assert!(decoded.threads().is_empty(), "DST carries no thread table");
}

#[test]
fn test_dst_label_round_trip() {
    let mut pattern = end_to_end_pattern();
    pattern.label = Some("Rose".to_string());
    let decoded = DstFormat.decode(&DstFormat.encode(&pattern).unwrap()).unwrap();
    assert_eq!(decoded.label.as_deref(), Some("Rose"));
}

#[test]
fn test_dst_y_axis_points_up() {
    // +1 unit on the native Y axis.
    let data = raw_file(&[[0x80, 0x00, 0x03], [0x00, 0x00, 0xF3]]);
    let pattern = DstFormat.decode(&data).unwrap();

    assert_eq!(commands(&pattern), vec![Command::Stitch, Command::End]);
    let s = pattern.stitches()[0];
    assert_eq!(s.x, 0.0);
    assert!((s.y + 0.1).abs() < 1e-9, "y was {}", s.y);
}

#[test]
fn test_dst_long_move_is_split() {
    let pattern = build(&[(30.0, 0.0, Command::Stitch)]);
    let decoded = DstFormat.decode(&DstFormat.encode(&pattern).unwrap()).unwrap();

    assert_eq!(
        commands(&decoded),
        vec![Command::Jump, Command::Jump, Command::Stitch, Command::End]
    );
    let last = decoded.stitches()[2];
    assert_eq!((last.x, last.y), (30.0, 0.0));
}

#[test]
fn test_dst_sequins_round_trip() {
    let pattern = build(&[
        (0.0, 0.0, Command::Stitch),
        (1.0, 0.0, Command::Sequin),
        (2.0, 0.0, Command::Sequin),
        (3.0, 0.0, Command::Jump),
        (3.0, 1.0, Command::Stitch),
    ]);
    let decoded = DstFormat.decode(&DstFormat.encode(&pattern).unwrap()).unwrap();
    assert_same_geometry(&decoded, &pattern);
}

#[test]
fn test_dst_color_changes() {
    let decoded = DstFormat
        .decode(&DstFormat.encode(&two_color_pattern()).unwrap())
        .unwrap();
    assert_eq!(decoded.count(Command::ColorChange), 1);
    assert_eq!(decoded.color_block_count(), 2);
}

#[test]
fn test_dst_short_jump_runs_stay_jumps() {
    let data = raw_file(&[
        [0x00, 0x00, 0x83],
        [0x00, 0x00, 0x83],
        [0x01, 0x00, 0x03],
        [0x00, 0x00, 0xF3],
    ]);
    let pattern = DstFormat.decode(&data).unwrap();
    assert_eq!(
        commands(&pattern),
        vec![Command::Jump, Command::Jump, Command::Stitch, Command::End]
    );
}

#[test]
fn test_dst_stop_is_unrepresentable() {
    let pattern = build(&[(0.0, 0.0, Command::Stitch), (1.0, 0.0, Command::Stop)]);
    let err = DstFormat.encode(&pattern).unwrap_err();
    assert_eq!(
        err,
        EncodeError::Unrepresentable {
            format: FormatId::Dst,
            command: Command::Stop,
            index: 1,
        }
    );
}

#[test]
fn test_dst_bad_signature() {
    let mut bytes = DstFormat.encode(&end_to_end_pattern()).unwrap();
    bytes[0] = b'X';
    assert!(matches!(
        DstFormat.decode(&bytes),
        Err(DecodeError::BadSignature { format: FormatId::Dst, .. })
    ));
}

#[test]
fn test_dst_unknown_command() {
    let data = raw_file(&[[0x00, 0x00, 0x00], [0x00, 0x00, 0xF3]]);
    assert_eq!(
        DstFormat.decode(&data).unwrap_err(),
        DecodeError::UnknownCommand {
            format: FormatId::Dst,
            offset: 514,
            byte: 0x00,
        }
    );
}

#[test]
fn test_dst_missing_end_is_truncated() {
    let data = raw_file(&[[0x01, 0x00, 0x03]]);
    assert!(matches!(
        DstFormat.decode(&data),
        Err(DecodeError::Truncated { offset: 515, .. })
    ));
}

#[test]
fn test_dst_empty_pattern() {
    let mut pattern = Pattern::new();
    pattern.finish();
    let bytes = DstFormat.encode(&pattern).unwrap();
    assert_eq!(bytes.len(), 515);

    let decoded = DstFormat.decode(&bytes).unwrap();
    assert_eq!(commands(&decoded), vec![Command::End]);
    assert_eq!(decoded.stitch_count(), 0);
}

#[test]
fn test_dst_sniff() {
    let bytes = DstFormat.encode(&end_to_end_pattern()).unwrap();
    assert!(DstFormat.sniff(&bytes));
    assert!(!DstFormat.sniff(&bytes[..100]));
    assert!(!DstFormat.sniff(b"#PES0001"));
}

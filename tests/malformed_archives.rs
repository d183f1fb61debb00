//! Tests for malformed and corrupted input handling.
//!
//! Every failure must be reported with the right error kind, leave the input
//! file in place and leave no output or temporary file behind.

mod common;

use std::path::Path;

use common::{
    CTR, PLAIN, PayloadMode, SectionSpec, build_pfs0, compress_payload, dir_listing, make_ncz,
    typical_sections, write_input,
};
use nszconv::{ConvertOptions, Converter, Error, ResourceLimits};

/// Converts `bytes` stored as `name` and checks that the failure left only
/// the input behind.
fn convert_expecting_failure(name: &str, bytes: &[u8], options: ConvertOptions) -> Error {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), name, bytes);

    let err = Converter::new(options).convert(&input).unwrap_err();

    assert_untouched(dir.path(), name, bytes);
    err
}

fn assert_untouched(dir: &Path, name: &str, bytes: &[u8]) {
    assert_eq!(dir_listing(dir), vec![name.to_string()]);
    assert_eq!(std::fs::read(dir.join(name)).unwrap(), bytes);
}

/// An NCZ entry with the given metadata bytes after the NCA header.
fn ncz_with_metadata(metadata: &[u8]) -> Vec<u8> {
    let mut ncz = vec![0u8; common::NCA_HEADER_SIZE];
    ncz.extend_from_slice(metadata);
    ncz
}

fn section_table(sections: &[SectionSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"NCZSECTN");
    out.extend_from_slice(&(sections.len() as u64).to_le_bytes());
    for s in sections {
        out.extend_from_slice(&s.offset.to_le_bytes());
        out.extend_from_slice(&s.size.to_le_bytes());
        out.extend_from_slice(&s.crypto_type.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
        out.extend_from_slice(&s.key);
        out.extend_from_slice(&s.counter);
    }
    out
}

#[test]
fn test_unrecognized_extension() {
    let err = convert_expecting_failure("game.nsp", b"PFS0", ConvertOptions::new());
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn test_bad_container_magic() {
    let mut bytes = build_pfs0(&[("a.tik", &b"ticket"[..])]);
    bytes[..4].copy_from_slice(b"HFS0");
    let err = convert_expecting_failure("game.nsz", &bytes, ConvertOptions::new());
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn test_empty_file() {
    let err = convert_expecting_failure("game.nsz", &[], ConvertOptions::new());
    assert!(matches!(err, Error::CorruptHeader { .. }), "got {:?}", err);
}

#[test]
fn test_truncated_container_table() {
    let bytes = build_pfs0(&[("a.tik", &b"ticket"[..]), ("b.cert", &b"cert"[..])]);
    let err = convert_expecting_failure("game.nsz", &bytes[..30], ConvertOptions::new());
    assert!(matches!(err, Error::CorruptHeader { .. }));
}

#[test]
fn test_entry_past_end_of_file() {
    let bytes = build_pfs0(&[("a.tik", &[7u8; 100][..])]);
    let err = convert_expecting_failure("game.nsz", &bytes[..bytes.len() - 1], ConvertOptions::new());
    assert!(matches!(err, Error::CorruptHeader { .. }));
}

#[test]
fn test_bad_section_magic() {
    let mut metadata = section_table(&[SectionSpec::new(0, 0x4100, CTR, 1)]);
    metadata[..8].copy_from_slice(b"NCZSECTX");
    let nsz = build_pfs0(&[("a.ncz", &ncz_with_metadata(&metadata)[..])]);
    let err = convert_expecting_failure("game.nsz", &nsz, ConvertOptions::new());
    match err {
        Error::CorruptHeader { reason, .. } => assert!(reason.contains("magic")),
        other => panic!("expected CorruptHeader, got {:?}", other),
    }
}

#[test]
fn test_huge_section_count() {
    let mut metadata = Vec::new();
    metadata.extend_from_slice(b"NCZSECTN");
    metadata.extend_from_slice(&u64::MAX.to_le_bytes());
    let ncz = ncz_with_metadata(&metadata);
    let err = convert_expecting_failure("single.ncz", &ncz, ConvertOptions::new());
    match err {
        Error::CorruptHeader { offset, .. } => assert_eq!(offset, 0x4008),
        other => panic!("expected CorruptHeader, got {:?}", other),
    }
}

#[test]
fn test_truncated_section_table() {
    let metadata = section_table(&[SectionSpec::new(0, 0x4100, CTR, 1)]);
    let ncz = ncz_with_metadata(&metadata[..40]);
    let err = convert_expecting_failure("single.ncz", &ncz, ConvertOptions::new());
    assert!(matches!(err, Error::CorruptHeader { .. }));
}

#[test]
fn test_entry_shorter_than_nca_header() {
    let nsz = build_pfs0(&[("a.ncz", &[0u8; 100][..])]);
    let err = convert_expecting_failure("game.nsz", &nsz, ConvertOptions::new());
    assert!(matches!(err, Error::CorruptHeader { .. }));
}

#[test]
fn test_gap_between_sections() {
    let sections = [
        SectionSpec::new(0x4000, 0x100, CTR, 1),
        SectionSpec::new(0x4200, 0x100, PLAIN, 2),
    ];
    let mut metadata = section_table(&sections);
    metadata.extend_from_slice(&zstd::encode_all(&[0u8; 0x300][..], 3).unwrap());
    let err = convert_expecting_failure("single.ncz", &ncz_with_metadata(&metadata), ConvertOptions::new());
    match err {
        Error::CorruptHeader { reason, .. } => assert!(reason.contains("gap")),
        other => panic!("expected CorruptHeader, got {:?}", other),
    }
}

#[test]
fn test_corrupt_solid_payload() {
    let fixture = make_ncz(&typical_sections(40_000), PayloadMode::Solid, 21);
    let mut ncz = fixture.ncz.clone();
    let payload_start = common::NCA_HEADER_SIZE + 16 + 3 * 64;
    for byte in &mut ncz[payload_start..payload_start + 64] {
        *byte ^= 0x5A;
    }
    let nsz = build_pfs0(&[("a.ncz", &ncz[..])]);
    let err = convert_expecting_failure("game.nsz", &nsz, ConvertOptions::new());
    assert!(
        matches!(err, Error::DecompressionFailure { .. }),
        "got {:?}",
        err
    );
}

#[test]
fn test_solid_stream_ends_early() {
    // The sections promise more bytes than the stream holds.
    let sections = [SectionSpec::new(0, 0x4000 + 1000, CTR, 1)];
    let mut metadata = section_table(&sections);
    metadata.extend_from_slice(&zstd::encode_all(&[1u8; 999][..], 3).unwrap());
    let err = convert_expecting_failure("single.ncz", &ncz_with_metadata(&metadata), ConvertOptions::new());
    match err {
        Error::DecompressionFailure { entry, .. } => assert_eq!(entry, "single.ncz"),
        other => panic!("expected DecompressionFailure, got {:?}", other),
    }
}

#[test]
fn test_block_sizes_do_not_match_payload() {
    let sections = [SectionSpec::new(0x4000, 0x8000, CTR, 1)];
    let mut metadata = section_table(&sections);
    let mut blocks = compress_payload(&[3u8; 0x8000], PayloadMode::Blocks { exponent: 14 });
    blocks.pop();
    metadata.extend_from_slice(&blocks);
    let err = convert_expecting_failure("single.ncz", &ncz_with_metadata(&metadata), ConvertOptions::new());
    assert!(matches!(err, Error::CorruptHeader { .. }));
}

#[test]
fn test_block_layout_disagrees_with_sections() {
    let sections = [SectionSpec::new(0x4000, 0x8000, CTR, 1)];
    let mut metadata = section_table(&sections);
    metadata.extend_from_slice(&compress_payload(
        &[3u8; 0x7000],
        PayloadMode::Blocks { exponent: 14 },
    ));
    let err = convert_expecting_failure("single.ncz", &ncz_with_metadata(&metadata), ConvertOptions::new());
    assert!(matches!(err, Error::CorruptHeader { .. }));
}

#[test]
fn test_block_size_over_limit() {
    let fixture = make_ncz(
        &typical_sections(40_000),
        PayloadMode::Blocks { exponent: 17 },
        22,
    );
    let options = ConvertOptions::new().limits(ResourceLimits::default().max_block_size(1 << 16));
    let err = convert_expecting_failure("single.ncz", &fixture.ncz, options);
    assert!(matches!(err, Error::ResourceLimitExceeded(_)));
}

#[test]
fn test_too_many_entries() {
    let bytes = build_pfs0(&[("a.tik", &b"a"[..]), ("b.tik", &b"b"[..]), ("c.tik", &b"c"[..])]);
    let options = ConvertOptions::new().limits(ResourceLimits::default().max_entries(2));
    let err = convert_expecting_failure("game.nsz", &bytes, options);
    assert!(matches!(err, Error::CorruptHeader { .. }));
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let err = Converter::new(ConvertOptions::new())
        .convert(dir.path().join("absent.nsz"))
        .unwrap_err();
    assert!(err.is_io());
    assert!(dir_listing(dir.path()).is_empty());
}

#[test]
fn test_failed_entry_after_good_ones_leaves_nothing() {
    let good = make_ncz(&typical_sections(30_000), PayloadMode::Solid, 23);
    let mut bad = make_ncz(&typical_sections(30_000), PayloadMode::Solid, 24).ncz;
    let payload_start = common::NCA_HEADER_SIZE + 16 + 3 * 64;
    for byte in &mut bad[payload_start..] {
        *byte = 0xAA;
    }
    let nsz = build_pfs0(&[
        ("good.ncz", &good.ncz[..]),
        ("x.tik", &b"ticket"[..]),
        ("bad.ncz", &bad[..]),
    ]);
    let err = convert_expecting_failure("game.nsz", &nsz, ConvertOptions::new());
    assert!(err.is_corruption(), "got {:?}", err);
}

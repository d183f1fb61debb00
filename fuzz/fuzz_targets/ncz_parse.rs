//! Fuzz target for NczHeader::parse with arbitrary byte input.
//!
//! Run with: cargo +nightly fuzz run ncz_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use nszconv::ResourceLimits;
use nszconv::format::NczHeader;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let mut cursor = Cursor::new(data);
    let Ok(header) = NczHeader::parse(&mut cursor, &ResourceLimits::default()) else {
        return;
    };
    assert!(header.payload_offset <= data.len() as u64);

    // Exercise region derivation and layout consistency checks.
    let _ = header.regions();
    let _ = header.check_payload(data.len() as u64 - header.payload_offset);
});

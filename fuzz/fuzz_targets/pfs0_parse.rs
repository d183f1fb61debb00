//! Fuzz target for Pfs0Header::parse with arbitrary byte input.
//!
//! Run with: cargo +nightly fuzz run pfs0_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use nszconv::ResourceLimits;
use nszconv::format::Pfs0Header;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let limits = ResourceLimits::default();
    let Ok(header) = Pfs0Header::parse(&mut Cursor::new(data), &limits) else {
        return;
    };
    let _ = header.check_within(data.len() as u64);

    // A parsed header must survive a rebuild with its own sizes.
    let sizes: Vec<u64> = header.entries().iter().map(|e| e.size).collect();
    if let Ok(rebuilt) = Pfs0Header::rebuild(header.entries(), &sizes) {
        let bytes = rebuilt.to_bytes();
        assert_eq!(bytes.len() as u64, rebuilt.header_size());
        let reparsed = Pfs0Header::parse(&mut Cursor::new(&bytes), &limits)
            .expect("rebuilt header must parse");
        assert_eq!(reparsed.entries().len(), header.entries().len());
    }
});

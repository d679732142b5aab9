#![no_main]

//! Fuzz target for fingerprint extraction
//!
//! Arbitrary bytes must either fingerprint or fail with an error, never panic.
//! A successful extraction must be deterministic and self-similar.
//!
//! Run with: cargo +nightly fuzz run fuzz_extract

use imgdedup_core::{score, HashExtractor};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let extractor = HashExtractor::new();
    if let Ok(first) = extractor.extract_bytes(data) {
        let second = extractor
            .extract_bytes(data)
            .expect("second extraction of accepted bytes failed");
        assert_eq!(first.fingerprint, second.fingerprint);

        let set = first.fingerprint.set();
        assert_eq!(score(&set, &set).ok(), Some(100.0));
    }
});

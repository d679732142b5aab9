#![no_main]

//! Fuzz target for parsing persisted perceptual hashes
//!
//! Run with: cargo +nightly fuzz run fuzz_hash_hex

use imgdedup_core::PerceptualHash;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(hash) = PerceptualHash::from_hex(s) {
            // Anything accepted re-encodes to the canonical lowercase form
            assert_eq!(hash.to_hex(), s.to_ascii_lowercase());
        }
    }
});

#![no_main]
use cbordelta::diff::{Diff, apply_encoded};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary envelopes must only ever produce errors, never panics.
    let _ = apply_encoded(&[], data);

    if data.len() >= 2 {
        let split = data.len() / 2;
        let (original, envelope) = data.split_at(split);
        if let Ok(out) = apply_encoded(original, envelope) {
            // A successful replay produces exactly the advertised length.
            let diff = Diff::from_bytes(envelope).unwrap();
            assert_eq!(out.len() as u64, diff.target_len());
        }
    }
});

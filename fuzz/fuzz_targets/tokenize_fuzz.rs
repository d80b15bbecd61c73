#![no_main]
use cbordelta::cbor::{collect_tokens, get_cbor_tokens};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The tokenizer must never panic, and any success must partition the
    // input exactly.
    for result in [
        collect_tokens(data, false),
        collect_tokens(data, true),
        get_cbor_tokens(data),
    ] {
        if let Ok(tokens) = result {
            let mut pos = 0;
            for t in &tokens {
                assert_eq!(t.offset, pos);
                assert!(t.len > 0);
                pos = t.end();
            }
            assert_eq!(pos, data.len());
        }
    }
});

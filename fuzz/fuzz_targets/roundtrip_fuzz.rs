#![no_main]
use cbordelta::engine::{self, Descend, DiffOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte selects the descent policy and the split point.
    let flags = data[0];
    let payload = &data[1..];
    let descend = match flags % 3 {
        0 => Descend::Auto,
        1 => Descend::Always,
        _ => Descend::Never,
    };
    let split = (flags as usize >> 2) % (payload.len() + 1);
    let (original, target) = payload.split_at(split);

    // Most inputs are not CBOR; only tokenizable pairs have a diff.
    let Ok(delta) = engine::make_diff(original, target, &DiffOptions { descend }) else {
        return;
    };
    let decoded = engine::patch(original, &delta).unwrap();
    assert_eq!(decoded, target);
});

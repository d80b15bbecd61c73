#![no_main]
use libfuzzer_sys::fuzz_target;

const SUBCOMMANDS: [&str; 5] = ["diff", "patch", "tokens", "inspect", "config"];

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };

    // Steer half the inputs into a subcommand so its options get exercised.
    let mut args: Vec<String> = Vec::new();
    if selector & 0x80 == 0 {
        args.push(SUBCOMMANDS[selector as usize % SUBCOMMANDS.len()].to_string());
    }
    args.extend(
        String::from_utf8_lossy(rest)
            .split_whitespace()
            .take(32)
            .map(str::to_string),
    );
    cbordelta::cli::fuzz_try_parse_args(&args);
});

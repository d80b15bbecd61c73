fn main() {
    #[cfg(feature = "cli")]
    cbordelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("cbordelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}

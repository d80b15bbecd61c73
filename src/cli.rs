// Command-line front end for cbordelta.
//
// Explicit subcommands with long-form options: diff, patch, and two
// inspection commands (token listing and edit script listing).

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::cbor::tokenize;
use crate::diff::{Command as EditCommand, Diff};
use crate::engine::{self, Descend, DiffOptions};

const BUF_SIZE: usize = 64 * 1024;

/// Token and insert payloads longer than this are abbreviated in listings.
const HEX_PREVIEW_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Structure-aware diff/patch for CBOR data.
#[derive(Parser, Debug)]
#[command(
    name = "cbordelta",
    version,
    about = "Structure-aware diff/patch for CBOR data",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compute a diff from an original to a target.
    Diff(DiffArgs),
    /// Apply a diff to an original, reconstructing the target.
    Patch(PatchArgs),
    /// List the tokens of a CBOR file.
    Tokens(TokensArgs),
    /// List the commands of a diff.
    Inspect(InspectArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DescendArg {
    Auto,
    Always,
    Never,
}

impl From<DescendArg> for Descend {
    fn from(arg: DescendArg) -> Self {
        match arg {
            DescendArg::Auto => Descend::Auto,
            DescendArg::Always => Descend::Always,
            DescendArg::Never => Descend::Never,
        }
    }
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Original file to diff against (default: empty).
    #[arg(long, short = 's', visible_alias = "source", value_hint = ValueHint::FilePath)]
    original: Option<PathBuf>,

    /// Target file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Check/compute only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    /// Descent into tag-24 embedded CBOR.
    #[arg(long, value_enum, default_value_t = DescendArg::Auto)]
    descend: DescendArg,

    /// Target file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Original file the diff was computed against (default: empty).
    #[arg(long, short = 's', visible_alias = "source", value_hint = ValueHint::FilePath)]
    original: Option<PathBuf>,

    /// Diff file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Check/compute only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    /// Diff file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TokensArgs {
    /// CBOR input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Descent into tag-24 embedded CBOR.
    #[arg(long, value_enum, default_value_t = DescendArg::Auto)]
    descend: DescendArg,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Diff input file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Diff,
    Patch,
    Tokens,
    Inspect,
    Config,
}

struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    no_output: bool,
    descend: Descend,
    original_file: Option<PathBuf>,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json_output: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let base = Options {
        command: Command::Config,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        no_output: false,
        descend: Descend::Auto,
        original_file: None,
        input_file: None,
        output_file: None,
        json_output: cli.json_output,
    };

    match cli.command {
        Cmd::Diff(args) => Options {
            command: Command::Diff,
            use_stdout: args.stdout,
            no_output: args.no_output,
            descend: args.descend.into(),
            original_file: args.original,
            input_file: args.input.or(args.input_pos),
            output_file: args.output.or(args.output_pos),
            ..base
        },
        Cmd::Patch(args) => Options {
            command: Command::Patch,
            use_stdout: args.stdout,
            no_output: args.no_output,
            original_file: args.original,
            input_file: args.input.or(args.input_pos),
            output_file: args.output.or(args.output_pos),
            ..base
        },
        Cmd::Tokens(args) => Options {
            command: Command::Tokens,
            descend: args.descend.into(),
            input_file: Some(args.input),
            ..base
        },
        Cmd::Inspect(args) => Options {
            command: Command::Inspect,
            input_file: Some(args.input),
            ..base
        },
        Cmd::Config => base,
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("cbordelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Input / output helpers
// ---------------------------------------------------------------------------

/// Read a whole file, or stdin when `path` is `None`.
fn read_input(what: &str, path: Option<&Path>) -> Option<Vec<u8>> {
    let result = match path {
        Some(path) => std::fs::read(path),
        None => {
            let mut data = Vec::new();
            io::stdin().lock().read_to_end(&mut data).map(|_| data)
        }
    };
    match result {
        Ok(data) => Some(data),
        Err(e) => {
            let name = path.map_or_else(|| "stdin".to_string(), |p| p.display().to_string());
            eprintln!("cbordelta: {what}: {name}: {e}");
            None
        }
    }
}

/// The original is optional; a missing one diffs against empty input.
fn read_original(opts: &Options) -> Option<Vec<u8>> {
    match &opts.original_file {
        Some(path) => read_input("original file", Some(path)),
        None => Some(Vec::new()),
    }
}

/// Write `data` to the output file or stdout. Returns the exit code.
fn write_output(opts: &Options, data: &[u8]) -> i32 {
    let mut writer: Box<dyn Write> = match (opts.use_stdout, &opts.output_file) {
        (true, _) | (_, None) => Box::new(BufWriter::with_capacity(BUF_SIZE, io::stdout().lock())),
        (false, Some(path)) => {
            if path.exists() && !opts.force {
                eprintln!(
                    "cbordelta: output file exists, use -f to overwrite: {}",
                    path.display()
                );
                return 1;
            }
            match File::create(path) {
                Ok(f) => Box::new(BufWriter::with_capacity(BUF_SIZE, f)),
                Err(e) => {
                    eprintln!("cbordelta: output file: {}: {e}", path.display());
                    return 1;
                }
            }
        }
    };

    if let Err(e) = writer.write_all(data).and_then(|()| writer.flush()) {
        eprintln!("cbordelta: write error: {e}");
        return 1;
    }
    0
}

fn hex_preview(bytes: &[u8]) -> String {
    let mut s: String = bytes
        .iter()
        .take(HEX_PREVIEW_LEN)
        .map(|b| format!("{b:02x}"))
        .collect();
    if bytes.len() > HEX_PREVIEW_LEN {
        s.push_str("...");
    }
    s
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("cbordelta version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("DEFAULT_DESCEND={:?}", Descend::default());
    eprintln!("ENVELOPE_KEY={}", crate::diff::envelope::COMMANDS_KEY);
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Diff command
// ---------------------------------------------------------------------------

fn cmd_diff(opts: &Options) -> i32 {
    let Some(original) = read_original(opts) else {
        return 1;
    };
    let Some(target) = read_input("input file", opts.input_file.as_deref()) else {
        return 1;
    };

    let diff_opts = DiffOptions {
        descend: opts.descend,
    };
    let diff = match engine::diff(&original, &target, &diff_opts) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("cbordelta: diff error: {e}");
            return 1;
        }
    };
    let delta = match diff.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("cbordelta: diff error: {e}");
            return 1;
        }
    };

    if !opts.no_output {
        let code = write_output(opts, &delta);
        if code != 0 {
            return code;
        }
    }

    let stats = diff.stats();
    if (opts.verbose > 0 || opts.no_output) && !opts.quiet {
        eprintln!(
            "cbordelta: diff: original size: {}, target size: {}, delta size: {}, \
             copies: {}, inserts: {}",
            original.len(),
            target.len(),
            delta.len(),
            stats.copies,
            stats.inserts
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "diff",
            "original_size": original.len(),
            "target_size": target.len(),
            "delta_size": delta.len(),
            "copies": stats.copies,
            "inserts": stats.inserts,
            "copied_bytes": stats.copied_bytes,
            "inserted_bytes": stats.inserted_bytes,
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Patch command
// ---------------------------------------------------------------------------

fn cmd_patch(opts: &Options) -> i32 {
    let Some(original) = read_original(opts) else {
        return 1;
    };
    let Some(delta) = read_input("input file", opts.input_file.as_deref()) else {
        return 1;
    };

    let output = match engine::patch(&original, &delta) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("cbordelta: patch error: {e}");
            return 1;
        }
    };

    if !opts.no_output {
        let code = write_output(opts, &output);
        if code != 0 {
            return code;
        }
    }

    if (opts.verbose > 0 || opts.no_output) && !opts.quiet {
        eprintln!(
            "cbordelta: patch: original size: {}, delta size: {}, output size: {}",
            original.len(),
            delta.len(),
            output.len()
        );
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "patch",
            "original_size": original.len(),
            "delta_size": delta.len(),
            "output_size": output.len(),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Tokens command
// ---------------------------------------------------------------------------

fn cmd_tokens(opts: &Options) -> i32 {
    let Some(buf) = read_input("input file", opts.input_file.as_deref()) else {
        return 1;
    };

    let tokens = match engine::tokens(&buf, opts.descend) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("cbordelta: tokenize error: {e}");
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(BUF_SIZE, stdout.lock());
    let mut result = writeln!(out, "  offset  length  major   depth  bytes");
    for t in &tokens {
        result = result.and_then(|()| {
            writeln!(
                out,
                "{:>8}  {:>6}  {:<6}  {:>5}  {}",
                t.offset,
                t.len,
                t.major,
                t.depth,
                hex_preview(t.bytes(&buf))
            )
        });
    }
    if let Err(e) = result.and_then(|()| out.flush()) {
        eprintln!("cbordelta: write error: {e}");
        return 1;
    }

    if opts.json_output {
        // Descent only ever nests when it succeeded, so depth > 0 tells
        // whether the embedded payloads were walked.
        let json = serde_json::json!({
            "command": "tokens",
            "input_size": buf.len(),
            "tokens": tokens.len(),
            "max_depth": tokens.iter().map(|t| t.depth).max().unwrap_or(0),
        });
        eprintln!("{json:#}");
    }

    // Tokens that a plain walk would produce, for comparison at -v.
    if opts.verbose > 0 && !opts.quiet {
        let flat = tokenize(&buf, false).count();
        eprintln!(
            "cbordelta: tokens: {} ({} without descent)",
            tokens.len(),
            flat
        );
    }

    0
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

fn cmd_inspect(opts: &Options) -> i32 {
    let Some(bytes) = read_input("input file", opts.input_file.as_deref()) else {
        return 1;
    };

    let diff = match Diff::from_bytes(&bytes) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("cbordelta: invalid diff: {e}");
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(BUF_SIZE, stdout.lock());
    let mut result: io::Result<()> = Ok(());
    for (index, cmd) in diff.commands().iter().enumerate() {
        result = result.and_then(|()| match cmd {
            EditCommand::Copy { start, end } => writeln!(
                out,
                "{index:>6}  copy    {start}..{end} ({} bytes)",
                cmd.output_len()
            ),
            EditCommand::Insert(data) => writeln!(
                out,
                "{index:>6}  insert  {} bytes: {}",
                data.len(),
                hex_preview(data)
            ),
        });
    }

    let stats = diff.stats();
    result = result.and_then(|()| {
        writeln!(
            out,
            "commands: {}, copies: {} ({} bytes), inserts: {} ({} bytes), target size: {}",
            diff.len(),
            stats.copies,
            stats.copied_bytes,
            stats.inserts,
            stats.inserted_bytes,
            diff.target_len()
        )
    });
    if let Err(e) = result.and_then(|()| out.flush()) {
        eprintln!("cbordelta: write error: {e}");
        return 1;
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "inspect",
            "delta_size": bytes.len(),
            "commands": diff.len(),
            "copies": stats.copies,
            "inserts": stats.inserts,
            "copied_bytes": stats.copied_bytes,
            "inserted_bytes": stats.inserted_bytes,
            "target_size": diff.target_len(),
        });
        eprintln!("{json:#}");
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    let filter = match (opts.quiet, opts.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && let Some(path) = opts.output_file.take()
        && !opts.quiet
    {
        log::warn!("-c option overrides output filename: {}", path.display());
    }

    let exit_code = match opts.command {
        Command::Diff => cmd_diff(&opts),
        Command::Patch => cmd_patch(&opts),
        Command::Tokens => cmd_tokens(&opts),
        Command::Inspect => cmd_inspect(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Command-line interface for the `bnd2` bundle codec.

use bnd2::sidecar::{
    parse_uint, AlignmentDefaults, DEFAULT_PRIMARY_ALIGNMENT, DEFAULT_SECONDARY_ALIGNMENT,
};
use bnd2::{create, extract, BundleError, CreateOptions, ExtractOptions};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Extract the contents of a bundle to a folder
    #[value(name = "e")]
    Extract,
    /// Create a new bundle from a folder
    #[value(name = "c")]
    Create,
}

#[derive(Parser, Debug)]
#[command(name = "bnd2", version, about = "A simple bundle extractor/creator.")]
struct Args {
    #[arg(value_enum)]
    mode: Mode,

    /// If extracting, the bundle to extract; if creating, the folder to
    /// generate a bundle from
    input: PathBuf,

    /// If extracting, the folder to output to; if creating, the file to
    /// output
    output: PathBuf,

    /// (Extract only) Do not sort resources by type
    #[arg(long, alias = "ns")]
    nosort: bool,

    /// (Extract only) Consolidate the imports for every resource into a
    /// single file
    #[arg(long, alias = "ci")]
    combine_imports: bool,

    /// (Create only) The alignment to be set on a resource's primary
    /// portion if no value is specified. Must be a power of 2 <= 0x8000
    #[arg(long, alias = "ap")]
    primary_alignment: Option<String>,

    /// (Create only) The alignment to be set on a resource's secondary
    /// portion if no value is specified. Must be a power of 2 <= 0x8000
    #[arg(long, alias = "as")]
    secondary_alignment: Option<String>,
}

/// Alignment flags accept hex or decimal; a value that fails to parse
/// warns and falls back to the default rather than aborting.
fn alignment_value(arg: Option<&str>, fallback: u32) -> u32 {
    match arg {
        None => fallback,
        Some(text) => match parse_uint(text).and_then(|v| u32::try_from(v).ok()) {
            Some(value) => value,
            None => {
                warn!("Invalid value {text}, setting default 0x{fallback:X}.");
                fallback
            }
        },
    }
}

fn run(args: &Args) -> bnd2::Result<()> {
    match args.mode {
        Mode::Extract => {
            if !args.input.is_file() {
                return Err(BundleError::Argument(
                    "Input file cannot be opened. Ensure it exists and has the correct \
                     permissions set."
                        .into(),
                ));
            }
            extract(
                &args.input,
                &args.output,
                &ExtractOptions {
                    no_sort: args.nosort,
                    combine_imports: args.combine_imports,
                },
            )
        }
        Mode::Create => {
            if !args.input.is_dir() {
                return Err(BundleError::Argument(
                    "Input folder cannot be opened. Ensure it exists and has the correct \
                     permissions set."
                        .into(),
                ));
            }
            let primary =
                alignment_value(args.primary_alignment.as_deref(), DEFAULT_PRIMARY_ALIGNMENT);
            let secondary = alignment_value(
                args.secondary_alignment.as_deref(),
                DEFAULT_SECONDARY_ALIGNMENT,
            );
            create(
                &args.input,
                &args.output,
                &CreateOptions {
                    alignments: AlignmentDefaults::new(primary, secondary),
                },
            )
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Usage problems always exit 1, including clap's own errors.
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    if let Err(err) = run(&args) {
        error!("{err}");
        process::exit(err.exit_code());
    }
}

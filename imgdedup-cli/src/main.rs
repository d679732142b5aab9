//! imgdedup CLI - perceptual duplicate detection tools.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use imgdedup_core::StorageConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success (image admitted, command completed)
  1   General error
  3   Duplicate found (submit)
  64  Usage error (e.g. reset without --yes)
  65  Data error (file is not a decodable image, bad ground truth)
  66  Input file or directory not found
  69  Repository unavailable
  74  I/O error (cannot write to the upload directory)";

#[derive(Parser)]
#[command(name = "imgdedup")]
#[command(author, version, about = "Perceptual image duplicate detection", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// When to use colors
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-readable JSON on stdout
    Json,
}

/// Options shared by commands that touch the corpus
#[derive(clap::Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Upload root (default: $UPLOAD_DIR or "uploads")
    #[arg(long, value_name = "DIR")]
    upload_dir: Option<PathBuf>,
}

impl CorpusArgs {
    /// Storage settings from the environment, with `--upload-dir` taking precedence
    pub fn storage(&self) -> StorageConfig {
        match &self.upload_dir {
            Some(dir) => StorageConfig::rooted_at(dir),
            None => StorageConfig::from_env(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fingerprint of an image
    Hash {
        /// Image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the similarity of two images
    Compare {
        #[arg(value_name = "A")]
        a: PathBuf,

        #[arg(value_name = "B")]
        b: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Submit one image through the admission pipeline
    Submit {
        /// Image file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        corpus: CorpusArgs,

        /// Override the similarity threshold (0-100)
        #[arg(short, long, value_parser = utils::parse_threshold)]
        threshold: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Submit every image under a directory
    Import {
        /// Directory to walk
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        #[command(flatten)]
        corpus: CorpusArgs,

        /// Concurrent submissions
        #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..=64))]
        jobs: u16,

        /// Do not descend into subdirectories
        #[arg(long)]
        no_recursive: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Score stored images against a labelled ground truth
    Evaluate {
        /// JSON object mapping each path to the paths of its duplicates
        #[arg(value_name = "GROUND_TRUTH")]
        ground_truth: PathBuf,

        /// Fingerprint the images in this directory instead of reading the repository
        #[arg(long, value_name = "DIR")]
        images: Option<PathBuf>,

        /// Similarity threshold (0-100)
        #[arg(short, long, default_value_t = imgdedup_core::evaluation::DEFAULT_EVALUATION_THRESHOLD, value_parser = utils::parse_threshold)]
        threshold: f64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Delete every record and stored file
    Reset {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing(verbose: bool, quiet: bool, ansi: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let ansi = match cli.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
            true
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
            false
        }
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    };
    init_tracing(cli.verbose, cli.quiet, ansi);

    let quiet = cli.quiet;
    let result = match cli.command {
        Commands::Hash { file, format } => commands::hash::execute(file, format, quiet).await,
        Commands::Compare { a, b, format } => commands::compare::execute(a, b, format, quiet).await,
        Commands::Submit {
            file,
            corpus,
            threshold,
            format,
        } => commands::submit::execute(file, corpus, threshold, format, quiet).await,
        Commands::Import {
            dir,
            corpus,
            jobs,
            no_recursive,
            format,
        } => {
            commands::import::execute(dir, corpus, usize::from(jobs), !no_recursive, format, quiet)
                .await
        }
        Commands::Evaluate {
            ground_truth,
            images,
            threshold,
            format,
        } => commands::evaluate::execute(ground_truth, images, threshold, format, quiet).await,
        Commands::Reset { corpus, yes } => commands::reset::execute(corpus, yes, quiet).await,
    };

    let exit = match result {
        Ok(exit) => exit,
        Err(err) => ExitCode::from_anyhow(&err),
    };
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    std::process::exit(exit.code);
}

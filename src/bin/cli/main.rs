//! CLI tool for converting NSZ and NCZ files.

mod commands;
mod exit_codes;
mod output;
mod progress;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use exit_codes::ExitCode;

/// Streaming NSZ/NCZ to NSP/NCA converter
#[derive(Parser)]
#[command(name = "nszconv")]
#[command(author, version, about = "Streaming NSZ/NCZ to NSP/NCA converter", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress progress output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert .nsz files to .nsp and .ncz files to .nca (alias: d)
    #[command(alias = "d")]
    Decompress {
        /// Files to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory (defaults to each input's directory)
        #[arg(short = 'o', long)]
        output_dir: Option<PathBuf>,

        /// Keep the input file after a successful conversion
        #[arg(short = 'k', long)]
        keep: bool,

        /// Replace existing output files
        #[arg(short = 'w', long)]
        overwrite: bool,

        /// Verify hash-named entries against their SHA-256
        #[arg(short = 'V', long)]
        verify: bool,

        /// Buffer size in KiB
        #[arg(long, default_value = "1024")]
        chunk_kib: usize,
    },

    /// Show the structure of a compressed file (alias: i)
    #[command(alias = "i")]
    Info {
        /// File to inspect
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    // The first Ctrl+C cancels the running conversion so its temporary file
    // is cleaned up; a second one exits immediately.
    let interrupted = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            std::process::exit(exit_codes::USER_INTERRUPT);
        }
        eprintln!("\nInterrupted, cleaning up");
    })
    .ok();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Decompress {
            files,
            output_dir,
            keep,
            overwrite,
            verify,
            chunk_kib,
        } => commands::decompress(&commands::DecompressConfig {
            files: &files,
            output_dir: output_dir.as_deref(),
            keep_input: keep,
            overwrite,
            verify_hash: verify,
            chunk_size: chunk_kib.saturating_mul(1024),
            format: cli.format,
            quiet: cli.quiet,
            interrupted: &interrupted,
        }),

        Commands::Info { file } => commands::info(&file, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}

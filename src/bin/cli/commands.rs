//! Command implementations for the CLI tool.

use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use nszconv::{ConvertOptions, Converter, Error, ResourceLimits, inspect, is_compressed_format};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;
use crate::progress::CliProgress;

/// Configuration for the decompress command.
pub struct DecompressConfig<'a> {
    pub files: &'a [PathBuf],
    pub output_dir: Option<&'a Path>,
    pub keep_input: bool,
    pub overwrite: bool,
    pub verify_hash: bool,
    pub chunk_size: usize,
    pub format: OutputFormat,
    pub quiet: bool,
    pub interrupted: &'a Arc<AtomicBool>,
}

/// Decompress command implementation
///
/// Files are converted one after another. A failure is reported and the
/// remaining files are still processed, except after a cancellation.
pub fn decompress(config: &DecompressConfig<'_>) -> ExitCode {
    let formatter = create_formatter(config.format);

    if let Some(dir) = config.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            report_error(&format!("creating output directory {}: {}", dir.display(), e));
            return ExitCode::IoError;
        }
    }

    let mut base = ConvertOptions::new()
        .keep_input(config.keep_input)
        .overwrite(config.overwrite)
        .verify_hash(config.verify_hash)
        .chunk_size(config.chunk_size);
    if let Some(dir) = config.output_dir {
        base = base.output_dir(dir);
    }

    let mut exit_code = ExitCode::Success;
    for file in config.files {
        if !is_compressed_format(file) {
            report_error(&format!("{}: not a .nsz or .ncz file", file.display()));
            exit_code = ExitCode::BadArgs;
            continue;
        }

        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        let progress = CliProgress::new(&name, config.quiet, Arc::clone(config.interrupted));
        let bar = progress.bar();

        let mut converter = Converter::new(base.clone_settings().progress(progress));
        match converter.convert(file) {
            Ok(result) => {
                bar.finish_and_clear();
                print!("{}", formatter.format_convert_result(file, &result));
            }
            Err(Error::Cancelled) => {
                bar.abandon_with_message("cancelled");
                return ExitCode::UserInterrupt;
            }
            Err(e) => {
                bar.abandon_with_message("failed");
                report_error(&format!("{}: {}", file.display(), e));
                exit_code = error_to_exit_code(&e);
            }
        }
    }

    exit_code
}

/// Info command implementation
pub fn info(path: &Path, format: OutputFormat) -> ExitCode {
    let formatter = create_formatter(format);

    match inspect(path, &ResourceLimits::default()) {
        Ok(info) => {
            print!("{}", formatter.format_info(path, &info));
            ExitCode::Success
        }
        Err(e) => {
            report_error(&format!("{}: {}", path.display(), e));
            error_to_exit_code(&e)
        }
    }
}

fn report_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

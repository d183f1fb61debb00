//! Conversion of compressed containers back to their plain form.
//!
//! A conversion runs in two passes over the input. The planning pass parses
//! the container and every NCZ header, which fixes the output header and the
//! exact output size. The writing pass then streams every entry into a
//! temporary file next to the destination, which is renamed into place only
//! once all bytes are written and synced.
//!
//! # Example
//!
//! ```rust,no_run
//! use nszconv::{ConvertOptions, Converter};
//!
//! let mut converter = Converter::new(ConvertOptions::new().keep_input(true));
//! let result = converter.convert("game.nsz")?;
//! println!("wrote {}", result.output_path.display());
//! # Ok::<(), nszconv::Error>(())
//! ```

mod entry;
pub mod options;

use std::fs::{self, File};
use std::io::{self, BufReader, Seek};
use std::path::{Path, PathBuf};

use crate::format::{CompressedFormat, ContainerEntry, Pfs0Header, ResourceLimits};
use crate::progress::{CallbackProgress, NoProgress, ProgressReporter};
use crate::{Error, Result};

pub use entry::EntryPlan;
use entry::{OutputSink, write_entry};
pub use options::ConvertOptions;

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertResult {
    /// Path of the written file.
    pub output_path: PathBuf,
    /// Number of entries in the output.
    pub entries_total: usize,
    /// Number of entries that were decompressed.
    pub entries_decompressed: usize,
    /// Size of the written file.
    pub bytes_written: u64,
}

/// Parsed structure of a compressed file, without converting it.
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    /// Detected format.
    pub format: CompressedFormat,
    /// Size of the input file.
    pub input_size: u64,
    /// Size the converted file will have.
    pub output_size: u64,
    /// Entries in data order.
    pub entries: Vec<EntryPlan>,
}

impl ContainerInfo {
    /// Returns the number of entries that would be decompressed.
    pub fn compressed_entries(&self) -> usize {
        self.entries.iter().filter(|p| p.is_compressed()).count()
    }
}

/// Everything known about an input before writing starts.
struct Plan {
    format: CompressedFormat,
    input_size: u64,
    /// Serialized output container header; empty for a standalone NCZ.
    output_header: Vec<u8>,
    entries: Vec<EntryPlan>,
}

impl Plan {
    fn build<R: io::Read + Seek>(
        r: &mut R,
        path: &Path,
        format: CompressedFormat,
        input_size: u64,
        limits: &ResourceLimits,
    ) -> Result<Self> {
        let (output_header, entries) = match format {
            CompressedFormat::Nsz => {
                let container = Pfs0Header::parse(r, limits)?;
                container.check_within(input_size)?;
                let entries = container
                    .entries()
                    .iter()
                    .map(|entry| EntryPlan::build(r, entry.clone(), limits))
                    .collect::<Result<Vec<_>>>()?;
                let sizes: Vec<u64> = entries.iter().map(EntryPlan::output_size).collect();
                let plain: Vec<ContainerEntry> =
                    entries.iter().map(|p| p.entry().clone()).collect();
                let output_header = Pfs0Header::rebuild(&plain, &sizes)?.to_bytes();
                (output_header, entries)
            }
            CompressedFormat::Ncz => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        Error::UnsupportedFormat(format!("'{}' has no file name", path.display()))
                    })?;
                let entry = ContainerEntry::new(name, input_size, 0);
                (Vec::new(), vec![EntryPlan::build(r, entry, limits)?])
            }
        };

        Ok(Self {
            format,
            input_size,
            output_header,
            entries,
        })
    }

    fn output_size(&self) -> u64 {
        self.output_header.len() as u64
            + self.entries.iter().map(EntryPlan::output_size).sum::<u64>()
    }
}

/// Converts compressed files using a fixed set of options.
///
/// A converter holds no state between conversions and can be reused.
#[derive(Debug, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    /// Creates a converter.
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Returns the options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Converts `input` and returns where the result was written.
    ///
    /// On success the output exists and, unless
    /// [`keep_input`](ConvertOptions::keep_input) is set, the input has been
    /// deleted. On failure the input is untouched and no output or temporary
    /// file remains.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedFormat`] if the extension is not recognized or
    ///   the container magic is wrong
    /// - [`Error::CorruptHeader`] for malformed or inconsistent metadata
    /// - [`Error::DecompressionFailure`] if a payload cannot be decoded
    /// - [`Error::HashMismatch`] if hash verification is enabled and fails
    /// - [`Error::Cancelled`] if the progress reporter asked to stop
    /// - [`Error::Io`] for storage failures, including an existing output
    ///   when overwriting is disabled
    pub fn convert(&mut self, input: impl AsRef<Path>) -> Result<ConvertResult> {
        let mut reporter = self.options.progress.take();
        let result = match reporter.as_deref_mut() {
            Some(progress) => self.run(input.as_ref(), progress),
            None => self.run(input.as_ref(), &mut NoProgress),
        };
        self.options.progress = reporter;
        result
    }

    fn output_path(&self, input: &Path, format: CompressedFormat) -> Result<PathBuf> {
        let default = format.output_path(input)?;
        Ok(match (&self.options.output_dir, default.file_name()) {
            (Some(dir), Some(name)) => dir.join(name),
            _ => default,
        })
    }

    fn run(&self, input: &Path, progress: &mut dyn ProgressReporter) -> Result<ConvertResult> {
        let format = CompressedFormat::from_path(input).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "'{}' is not a .nsz or .ncz file",
                input.display()
            ))
        })?;
        let output_path = self.output_path(input, format)?;
        if !self.options.overwrite && output_path.exists() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{}' already exists", output_path.display()),
            )));
        }

        let file = File::open(input)?;
        let input_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let plan = Plan::build(&mut reader, input, format, input_size, &self.options.limits)?;
        let total = plan.output_size();
        log::debug!(
            "{}: {} entries, {} -> {} bytes",
            input.display(),
            plan.entries.len(),
            plan.input_size,
            total
        );

        let output_dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = tempfile::Builder::new()
            .prefix(".nszconv-")
            .suffix(".tmp")
            .tempfile_in(&output_dir)?;

        progress.on_total(total);
        let mut buf = vec![0u8; self.options.chunk_size];
        let written = {
            let mut sink = OutputSink::new(temp.as_file_mut(), total, progress);
            if !plan.output_header.is_empty() {
                sink.write_chunk(&plan.output_header)?;
            }
            for entry_plan in &plan.entries {
                let name = &entry_plan.entry().output_name;
                sink.progress()
                    .on_entry_start(name, entry_plan.output_size());
                let result = write_entry(
                    &mut reader,
                    entry_plan,
                    &mut sink,
                    &mut buf,
                    &self.options.limits,
                    self.options.verify_hash,
                );
                sink.progress().on_entry_complete(name, result.is_ok());
                result?;
            }
            sink.flush()?;
            sink.written()
        };
        drop(reader);

        if written != total {
            return Err(Error::DecompressionFailure {
                entry: input.display().to_string(),
                reason: format!("wrote {} bytes, planned {}", written, total),
            });
        }

        temp.as_file().sync_all()?;
        let persisted = if self.options.overwrite {
            temp.persist(&output_path)
        } else {
            temp.persist_noclobber(&output_path)
        };
        persisted.map_err(|e| Error::Io(e.error))?;

        if !self.options.keep_input {
            fs::remove_file(input)?;
        }

        let entries_decompressed = plan.entries.iter().filter(|p| p.is_compressed()).count();
        log::info!(
            "converted {} ({}) to {}: {} entries, {} decompressed, {} bytes",
            input.display(),
            plan.format,
            output_path.display(),
            plan.entries.len(),
            entries_decompressed,
            written
        );

        Ok(ConvertResult {
            output_path,
            entries_total: plan.entries.len(),
            entries_decompressed,
            bytes_written: written,
        })
    }
}

/// Converts `input` with default options.
///
/// The optional callback receives `(bytes_written, total_bytes)` after every
/// chunk. Returns the path of the converted file; the input is deleted.
///
/// # Example
///
/// ```rust,no_run
/// let mut report = |written: u64, total: u64| eprintln!("{written}/{total}");
/// let output = nszconv::decompress("game.nsz", Some(&mut report))?;
/// assert_eq!(output.extension().unwrap(), "nsp");
/// # Ok::<(), nszconv::Error>(())
/// ```
pub fn decompress(
    input: impl AsRef<Path>,
    progress: Option<&mut (dyn FnMut(u64, u64) + Send)>,
) -> Result<PathBuf> {
    let converter = Converter::new(ConvertOptions::default());
    let result = match progress {
        Some(callback) => converter.run(input.as_ref(), &mut CallbackProgress::new(callback)),
        None => converter.run(input.as_ref(), &mut NoProgress),
    }?;
    Ok(result.output_path)
}

/// Parses `input` and every compressed entry header without writing.
///
/// # Errors
///
/// Fails like [`Converter::convert`] does before its writing pass.
pub fn inspect(input: impl AsRef<Path>, limits: &ResourceLimits) -> Result<ContainerInfo> {
    let input = input.as_ref();
    let format = CompressedFormat::from_path(input).ok_or_else(|| {
        Error::UnsupportedFormat(format!("'{}' is not a .nsz or .ncz file", input.display()))
    })?;
    let file = File::open(input)?;
    let input_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);
    let plan = Plan::build(&mut reader, input, format, input_size, limits)?;
    Ok(ContainerInfo {
        format,
        input_size,
        output_size: plan.output_size(),
        entries: plan.entries,
    })
}

//! Progress reporting for conversions.
//!
//! Reporters receive the exact output size once, then the running number of
//! bytes written after every chunk. Returning `false` from
//! [`ProgressReporter::on_progress`] cancels the conversion.
//!
//! # Example
//!
//! ```rust,no_run
//! use nszconv::progress::progress_fn;
//! use nszconv::{ConvertOptions, Converter};
//!
//! let options = ConvertOptions::new().progress(progress_fn(|written, total| {
//!     eprintln!("{written}/{total}");
//!     true
//! }));
//! let mut converter = Converter::new(options);
//! converter.convert("game.nsz")?;
//! # Ok::<(), nszconv::Error>(())
//! ```

// Floating point versions for formatting calculations
const BYTES_KB: f64 = 1024.0;
const BYTES_MB: f64 = BYTES_KB * 1024.0;
const BYTES_GB: f64 = BYTES_MB * 1024.0;

/// Progress reporting trait for conversions.
pub trait ProgressReporter: Send {
    /// Called once, before any output is written, with the exact output size.
    fn on_total(&mut self, total_bytes: u64) {
        let _ = total_bytes;
    }

    /// Called after every chunk written to the output.
    ///
    /// `bytes_written` never decreases and its final value equals
    /// `total_bytes`. Returns `true` to continue or `false` to cancel.
    fn on_progress(&mut self, bytes_written: u64, total_bytes: u64) -> bool {
        let _ = (bytes_written, total_bytes);
        true
    }

    /// Called when the converter starts writing an entry.
    fn on_entry_start(&mut self, entry_name: &str, size: u64) {
        let _ = (entry_name, size);
    }

    /// Called when an entry has been written, or has failed.
    fn on_entry_complete(&mut self, entry_name: &str, success: bool) {
        let _ = (entry_name, success);
    }
}

/// A no-op progress reporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// A progress reporter that calls a closure.
pub struct ClosureProgress<F> {
    callback: F,
}

impl<F> ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    /// Creates a progress reporter from a closure.
    ///
    /// The closure receives (bytes_written, total_bytes) and returns
    /// `true` to continue or `false` to cancel.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    fn on_progress(&mut self, bytes_written: u64, total_bytes: u64) -> bool {
        (self.callback)(bytes_written, total_bytes)
    }
}

/// Creates a closure-based progress reporter.
pub fn progress_fn<F>(f: F) -> ClosureProgress<F>
where
    F: FnMut(u64, u64) -> bool + Send,
{
    ClosureProgress::new(f)
}

/// Adapts a borrowed, non-cancelling callback of the form used by
/// [`crate::decompress`].
pub(crate) struct CallbackProgress<'a> {
    callback: &'a mut (dyn FnMut(u64, u64) + Send),
}

impl<'a> CallbackProgress<'a> {
    pub(crate) fn new(callback: &'a mut (dyn FnMut(u64, u64) + Send)) -> Self {
        Self { callback }
    }
}

impl ProgressReporter for CallbackProgress<'_> {
    fn on_progress(&mut self, bytes_written: u64, total_bytes: u64) -> bool {
        (self.callback)(bytes_written, total_bytes);
        true
    }
}

/// Formats bytes as a human-readable string using IEC units (KiB, MiB, GiB).
///
/// # Examples
///
/// ```rust
/// use nszconv::progress::format_bytes_iec;
///
/// assert_eq!(format_bytes_iec(0), "0 B");
/// assert_eq!(format_bytes_iec(512), "512 B");
/// assert_eq!(format_bytes_iec(1024), "1.0 KiB");
/// assert_eq!(format_bytes_iec(1536), "1.5 KiB");
/// assert_eq!(format_bytes_iec(1048576), "1.0 MiB");
/// ```
pub fn format_bytes_iec(bytes: u64) -> String {
    let bytes_f64 = bytes as f64;
    if bytes_f64 < BYTES_KB {
        format!("{} B", bytes)
    } else if bytes_f64 < BYTES_MB {
        format!("{:.1} KiB", bytes_f64 / BYTES_KB)
    } else if bytes_f64 < BYTES_GB {
        format!("{:.1} MiB", bytes_f64 / BYTES_MB)
    } else {
        format!("{:.1} GiB", bytes_f64 / BYTES_GB)
    }
}

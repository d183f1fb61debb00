//! Conversion options.

use std::path::{Path, PathBuf};

use crate::format::ResourceLimits;
use crate::progress::ProgressReporter;

/// Default size of the copy and decompression buffer (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Smallest accepted chunk size.
pub const MIN_CHUNK_SIZE: usize = 16;

/// Options for a conversion.
///
/// # Defaults
///
/// | Option | Default |
/// |--------|---------|
/// | `limits` | [`ResourceLimits::default()`] |
/// | `chunk_size` | 1 MiB |
/// | `overwrite` | `false` (an existing output is an error) |
/// | `keep_input` | `false` (the input is deleted after success) |
/// | `verify_hash` | `false` |
/// | `output_dir` | the input's directory |
/// | `progress` | none |
pub struct ConvertOptions {
    /// Resource limits applied while parsing and decoding.
    pub limits: ResourceLimits,
    /// Buffer size for copying and decompressing.
    pub chunk_size: usize,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// Keep the input file after a successful conversion.
    pub keep_input: bool,
    /// Check hash-named entries against their SHA-256.
    pub verify_hash: bool,
    /// Directory for the output file.
    pub output_dir: Option<PathBuf>,
    /// Progress reporter (optional).
    pub progress: Option<Box<dyn ProgressReporter>>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            overwrite: false,
            keep_input: false,
            verify_hash: false,
            output_dir: None,
            progress: None,
        }
    }
}

impl std::fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("limits", &self.limits)
            .field("chunk_size", &self.chunk_size)
            .field("overwrite", &self.overwrite)
            .field("keep_input", &self.keep_input)
            .field("verify_hash", &self.verify_hash)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl ConvertOptions {
    /// Creates conversion options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource limits.
    pub fn limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the buffer size. Values below 16 bytes are raised to 16.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(MIN_CHUNK_SIZE);
        self
    }

    /// Sets whether an existing output file is replaced.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets whether the input file is kept after success.
    pub fn keep_input(mut self, keep: bool) -> Self {
        self.keep_input = keep;
        self
    }

    /// Sets whether hash-named entries are verified.
    pub fn verify_hash(mut self, verify: bool) -> Self {
        self.verify_hash = verify;
        self
    }

    /// Sets the output directory.
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Sets the progress reporter.
    pub fn progress(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.progress = Some(Box::new(reporter));
        self
    }

    /// Clones all settings except the progress reporter.
    ///
    /// Useful for converting several files with the same settings, since the
    /// progress reporter cannot be cloned.
    pub fn clone_settings(&self) -> Self {
        Self {
            limits: self.limits.clone(),
            chunk_size: self.chunk_size,
            overwrite: self.overwrite,
            keep_input: self.keep_input,
            verify_hash: self.verify_hash,
            output_dir: self.output_dir.clone(),
            progress: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    #[test]
    fn test_defaults() {
        let options = ConvertOptions::default();
        assert_eq!(options.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(!options.overwrite);
        assert!(!options.keep_input);
        assert!(!options.verify_hash);
        assert!(options.output_dir.is_none());
        assert!(options.progress.is_none());
    }

    #[test]
    fn test_builder_and_clone_settings() {
        let options = ConvertOptions::new()
            .chunk_size(4096)
            .overwrite(true)
            .keep_input(true)
            .verify_hash(true)
            .output_dir("/tmp/out")
            .progress(NoProgress);
        let cloned = options.clone_settings();
        assert_eq!(cloned.chunk_size, 4096);
        assert!(cloned.overwrite && cloned.keep_input && cloned.verify_hash);
        assert_eq!(cloned.output_dir.as_deref(), Some(Path::new("/tmp/out")));
        assert!(cloned.progress.is_none());
        assert!(options.progress.is_some());
    }

    #[test]
    fn test_chunk_size_floor() {
        assert_eq!(ConvertOptions::new().chunk_size(0).chunk_size, MIN_CHUNK_SIZE);
    }
}

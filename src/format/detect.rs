//! Compressed-format detection by file name.
//!
//! Conversion eligibility is decided purely from the extension, before any
//! byte of the file is read.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Suffix marking a compressed entry inside a container.
pub const COMPRESSED_ENTRY_SUFFIX: &str = ".ncz";

/// Suffix of the plain equivalent of a compressed entry.
pub const PLAIN_ENTRY_SUFFIX: &str = ".nca";

/// A recognized compressed file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressedFormat {
    /// PFS0 container holding NCZ and passthrough entries (`.nsz` → `.nsp`).
    Nsz,
    /// A single standalone NCZ entry (`.ncz` → `.nca`).
    Ncz,
}

impl CompressedFormat {
    /// Detects the format from a path's extension (ASCII case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("nsz") {
            Some(CompressedFormat::Nsz)
        } else if ext.eq_ignore_ascii_case("ncz") {
            Some(CompressedFormat::Ncz)
        } else {
            None
        }
    }

    /// Returns the compressed extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            CompressedFormat::Nsz => "nsz",
            CompressedFormat::Ncz => "ncz",
        }
    }

    /// Returns the extension of the converted output, without the dot.
    pub fn plain_extension(&self) -> &'static str {
        match self {
            CompressedFormat::Nsz => "nsp",
            CompressedFormat::Ncz => "nca",
        }
    }

    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            CompressedFormat::Nsz => "NSZ",
            CompressedFormat::Ncz => "NCZ",
        }
    }

    /// Returns the output path for `input`: same directory, plain extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if `input` has no file name.
    pub fn output_path(&self, input: &Path) -> Result<PathBuf> {
        if input.file_name().is_none() {
            return Err(Error::UnsupportedFormat(format!(
                "'{}' has no file name",
                input.display()
            )));
        }
        Ok(input.with_extension(self.plain_extension()))
    }
}

impl std::fmt::Display for CompressedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returns `true` if `path` names a file this crate can convert.
///
/// This is a pure predicate on the extension: `.nsz` or `.ncz`, ignoring
/// ASCII case. The file is not opened.
///
/// # Example
///
/// ```rust
/// use nszconv::is_compressed_format;
///
/// assert!(is_compressed_format("Game [0100000000010000].NSZ"));
/// assert!(is_compressed_format("/tmp/0123456789abcdef0123456789abcdef.ncz"));
/// assert!(!is_compressed_format("game.nsp"));
/// ```
pub fn is_compressed_format(path: impl AsRef<Path>) -> bool {
    CompressedFormat::from_path(path).is_some()
}

/// Returns `true` if a container entry name carries the compressed marker.
pub fn is_compressed_entry_name(name: &str) -> bool {
    let suffix = COMPRESSED_ENTRY_SUFFIX.as_bytes();
    let bytes = name.as_bytes();
    bytes.len() >= suffix.len() && bytes[bytes.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Returns the plain output name for a container entry.
///
/// A trailing `.ncz` (any case) becomes `.nca`; other names are unchanged.
pub fn plain_entry_name(name: &str) -> String {
    if is_compressed_entry_name(name) {
        // The matched suffix is ASCII, so this is a char boundary.
        let stem = &name[..name.len() - COMPRESSED_ENTRY_SUFFIX.len()];
        format!("{}{}", stem, PLAIN_ENTRY_SUFFIX)
    } else {
        name.to_string()
    }
}

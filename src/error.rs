//! Error types for container conversion.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when converting a compressed container, along with a
//! convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! Every fallible operation returns `Result<T, Error>`. A failure is terminal
//! for the conversion that raised it: nothing is retried internally, and the
//! input file is never touched on failure.
//!
//! ```rust,no_run
//! use nszconv::{Error, decompress};
//!
//! match decompress("game.nsz", None) {
//!     Ok(path) => println!("wrote {}", path.display()),
//!     Err(Error::UnsupportedFormat(msg)) => eprintln!("not an NSZ/NCZ file: {}", msg),
//!     Err(e) if e.is_corruption() => eprintln!("damaged input: {}", e),
//!     Err(Error::Io(e)) => eprintln!("storage error: {}", e),
//!     Err(e) => eprintln!("conversion failed: {}", e),
//! }
//! ```

use std::io;

/// The main error type for conversion operations.
///
/// # Error Categories
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Format | [`UnsupportedFormat`][Self::UnsupportedFormat] | Wrong extension or outer magic |
/// | Corruption | [`CorruptHeader`][Self::CorruptHeader], [`HashMismatch`][Self::HashMismatch] | Damaged or hostile input |
/// | Codec | [`DecompressionFailure`][Self::DecompressionFailure] | zstd rejected the payload |
/// | I/O | [`Io`][Self::Io] | File system operations |
/// | Resources | [`ResourceLimitExceeded`][Self::ResourceLimitExceeded] | Safety limits |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading the input or writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file is not a recognized compressed container.
    ///
    /// Returned for a file name without a `.nsz`/`.ncz` extension, or for a
    /// container whose outer magic is not `PFS0`.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A header is corrupt or truncated.
    ///
    /// Covers the container file table, the NCZ section table and the NCZ
    /// block layout. The offset is the absolute position in the input file
    /// where the problem was detected.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset where corruption was detected.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// The compressed payload of an entry could not be decoded.
    #[error("Decompression failed for entry '{entry}': {reason}")]
    DecompressionFailure {
        /// Name of the entry being decompressed.
        entry: String,
        /// A description of the failure.
        reason: String,
    },

    /// A cryptographic primitive was constructed with invalid parameters.
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// An entry name cannot be stored in a container string table.
    #[error("Invalid entry name: {0}")]
    InvalidEntryName(String),

    /// The SHA-256 prefix of a decompressed entry does not match its name.
    #[error("Hash mismatch for entry '{entry}': expected {expected}, got {actual}")]
    HashMismatch {
        /// Name of the produced entry.
        entry: String,
        /// Hash prefix encoded in the entry name.
        expected: String,
        /// Hash prefix of the produced data.
        actual: String,
    },

    /// A configured resource limit was exceeded.
    ///
    /// Adjust limits using [`ResourceLimits`].
    ///
    /// [`ResourceLimits`]: crate::format::ResourceLimits
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// The progress reporter requested cancellation.
    ///
    /// The partial output is discarded and the input is left in place.
    #[error("Operation cancelled")]
    Cancelled,
}

/// A specialized Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a [`CorruptHeader`][Self::CorruptHeader] error.
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader {
            offset,
            reason: reason.into(),
        }
    }

    /// Converts an I/O error raised while parsing a header.
    ///
    /// A short read means the header is truncated and is reported as
    /// [`CorruptHeader`][Self::CorruptHeader]; anything else stays an I/O error.
    pub(crate) fn from_header_io(err: io::Error, offset: u64, field: &str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::corrupt(offset, format!("truncated while reading {}", field))
        } else {
            Error::Io(err)
        }
    }

    /// Returns `true` if this error indicates damaged or hostile input data.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CorruptHeader { .. }
                | Error::HashMismatch { .. }
                | Error::DecompressionFailure { .. }
        )
    }

    /// Returns `true` if this error came from the underlying storage.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

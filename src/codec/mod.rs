//! Payload decoders for NCZ entries.
//!
//! An NCZ payload is either one solid zstd stream or a sequence of
//! independently compressed fixed-size blocks. Both are exposed through the
//! [`PayloadDecoder`] trait so the converter can pull decompressed bytes in
//! chunks of its choosing without knowing which layout is in use.

pub mod block;
pub mod zstd;

use std::io::{self, Read};

use crate::format::{NczHeader, ResourceLimits};
use crate::{Error, Result};

pub use block::BlockDecoder;
pub use self::zstd::SolidDecoder;

/// Source of decompressed payload bytes.
pub trait PayloadDecoder {
    /// Returns a short name of the payload layout, for logging.
    fn method(&self) -> &'static str;

    /// Fills `buf` completely with the next decompressed bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::DecompressionFailure`] if the codec rejects the data or the
    ///   payload ends before `buf` is full
    /// - [`Error::Io`] if reading the compressed input fails
    fn read_exact_payload(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// Builds the decoder matching `header`'s payload layout.
///
/// `input` must yield exactly the compressed payload of the entry, starting
/// at `header.payload_offset`.
pub fn build_payload_decoder<'a, R: Read + 'a>(
    input: R,
    header: &NczHeader,
    entry_name: &str,
    limits: &ResourceLimits,
) -> Result<Box<dyn PayloadDecoder + 'a>> {
    match &header.block_layout {
        Some(layout) => Ok(Box::new(BlockDecoder::new(
            input,
            layout.clone(),
            entry_name,
            limits,
        )?)),
        None => Ok(Box::new(SolidDecoder::new(input, entry_name)?)),
    }
}

/// Error raised by the compressed input itself rather than by the codec.
///
/// Wrapping input errors lets [`classify_read_error`] tell storage failures
/// apart from codec failures after they have passed through the zstd reader.
#[derive(Debug)]
pub(crate) struct SourceError(pub(crate) io::Error);

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "input read failed: {}", self.0)
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Reader that tags every error of the wrapped input as a [`SourceError`].
pub(crate) struct SourceReader<R> {
    inner: R,
}

impl<R> SourceReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner
            .read(buf)
            .map_err(|e| io::Error::new(e.kind(), SourceError(e)))
    }
}

/// Maps an error from a decoding reader to the crate error taxonomy.
pub(crate) fn classify_read_error(entry: &str, err: io::Error) -> Error {
    let from_source = err
        .get_ref()
        .is_some_and(|inner| inner.downcast_ref::<SourceError>().is_some());
    if from_source {
        let kind = err.kind();
        return match err.into_inner().map(|inner| inner.downcast::<SourceError>()) {
            Some(Ok(source)) => Error::Io(source.0),
            _ => Error::Io(io::Error::from(kind)),
        };
    }

    let reason = if err.kind() == io::ErrorKind::UnexpectedEof {
        "payload ended before all sections were produced".to_string()
    } else {
        err.to_string()
    };
    Error::DecompressionFailure {
        entry: entry.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn test_source_errors_classified_as_io() {
        let mut reader = SourceReader::new(FailingReader);
        let mut buf = [0u8; 4];
        let err = reader.read(&mut buf).unwrap_err();
        match classify_read_error("x.ncz", err) {
            Error::Io(e) => assert_eq!(e.kind(), io::ErrorKind::PermissionDenied),
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_codec_errors_classified_as_decompression_failure() {
        let err = io::Error::other("Unknown frame descriptor");
        assert!(matches!(
            classify_read_error("x.ncz", err),
            Error::DecompressionFailure { .. }
        ));

        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        match classify_read_error("x.ncz", eof) {
            Error::DecompressionFailure { entry, reason } => {
                assert_eq!(entry, "x.ncz");
                assert!(reason.contains("ended"));
            }
            other => panic!("expected DecompressionFailure, got {:?}", other),
        }
    }
}

//! Solid zstd payload decoding.

use std::io::{BufReader, Read};

use zstd::stream::Decoder as ZstdDecoder;

use super::{PayloadDecoder, SourceReader, classify_read_error};
use crate::Result;

/// Decoder for a payload compressed as one continuous zstd stream.
///
/// Concatenated frames are accepted. Memory use is bounded by zstd's window
/// and the internal read buffer, independent of the payload size.
pub struct SolidDecoder<R: Read> {
    inner: ZstdDecoder<'static, BufReader<SourceReader<R>>>,
    entry: String,
}

impl<R: Read> std::fmt::Debug for SolidDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolidDecoder")
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl<R: Read> SolidDecoder<R> {
    /// Creates a solid decoder over the compressed payload.
    pub fn new(input: R, entry_name: &str) -> Result<Self> {
        let inner = ZstdDecoder::new(SourceReader::new(input))?;
        Ok(Self {
            inner,
            entry: entry_name.to_string(),
        })
    }
}

impl<R: Read> PayloadDecoder for SolidDecoder<R> {
    fn method(&self) -> &'static str {
        "solid"
    }

    fn read_exact_payload(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner
            .read_exact(buf)
            .map_err(|e| classify_read_error(&self.entry, e))
    }
}

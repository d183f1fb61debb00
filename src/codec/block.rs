//! Block-compressed payload decoding.
//!
//! Each block is an independent zstd frame, except that a block whose
//! compressed size equals its decompressed size is stored as-is.

use std::io::Read;

use zstd::bulk::Decompressor;

use super::{PayloadDecoder, classify_read_error};
use crate::format::{BlockLayout, ResourceLimits};
use crate::{Error, Result};

/// Decoder for a payload split into fixed-size blocks.
///
/// Holds at most one decompressed block plus one compressed block in memory.
pub struct BlockDecoder<R: Read> {
    input: R,
    layout: BlockLayout,
    entry: String,
    decompressor: Decompressor<'static>,
    compressed: Vec<u8>,
    block: Vec<u8>,
    /// Valid bytes in `block`.
    filled: usize,
    /// Bytes of `block` already handed out.
    consumed: usize,
    next_block: u32,
}

impl<R: Read> std::fmt::Debug for BlockDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockDecoder")
            .field("entry", &self.entry)
            .field("next_block", &self.next_block)
            .field("number_of_blocks", &self.layout.number_of_blocks)
            .finish_non_exhaustive()
    }
}

impl<R: Read> BlockDecoder<R> {
    /// Creates a block decoder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceLimitExceeded`] if the layout's block size is
    /// above `limits.max_block_size`.
    pub fn new(
        input: R,
        layout: BlockLayout,
        entry_name: &str,
        limits: &ResourceLimits,
    ) -> Result<Self> {
        limits.check_block_size(layout.block_size())?;
        let buffer_size = layout.block_size().min(layout.decompressed_size) as usize;
        Ok(Self {
            input,
            entry: entry_name.to_string(),
            decompressor: Decompressor::new()?,
            compressed: Vec::new(),
            block: vec![0u8; buffer_size],
            filled: 0,
            consumed: 0,
            next_block: 0,
            layout,
        })
    }

    fn failure(&self, reason: impl Into<String>) -> Error {
        Error::DecompressionFailure {
            entry: self.entry.clone(),
            reason: reason.into(),
        }
    }

    fn load_next_block(&mut self) -> Result<()> {
        let index = self.next_block;
        if index >= self.layout.number_of_blocks {
            return Err(self.failure("payload ended before all sections were produced"));
        }

        let compressed_size = self.layout.compressed_block_sizes[index as usize] as usize;
        let expected = self.layout.decompressed_block_size(index) as usize;

        if compressed_size > expected {
            return Err(self.failure(format!(
                "block {} is {} bytes compressed but only {} bytes decompressed",
                index, compressed_size, expected
            )));
        }

        self.compressed.resize(compressed_size, 0);
        self.input
            .read_exact(&mut self.compressed)
            .map_err(|e| classify_read_error(&self.entry, e))?;

        let produced = if compressed_size == expected {
            self.block[..expected].copy_from_slice(&self.compressed);
            expected
        } else {
            self.decompressor
                .decompress_to_buffer(&self.compressed[..], &mut self.block[..expected])
                .map_err(|e| self.failure(format!("block {}: {}", index, e)))?
        };

        if produced != expected {
            return Err(self.failure(format!(
                "block {} decompressed to {} bytes, expected {}",
                index, produced, expected
            )));
        }

        log::trace!(
            "{}: block {}/{} {} -> {} bytes",
            self.entry,
            index + 1,
            self.layout.number_of_blocks,
            compressed_size,
            produced
        );

        self.filled = produced;
        self.consumed = 0;
        self.next_block += 1;
        Ok(())
    }
}

impl<R: Read> PayloadDecoder for BlockDecoder<R> {
    fn method(&self) -> &'static str {
        "block"
    }

    fn read_exact_payload(&mut self, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            if self.consumed == self.filled {
                self.load_next_block()?;
            }
            let n = buf.len().min(self.filled - self.consumed);
            buf[..n].copy_from_slice(&self.block[self.consumed..self.consumed + n]);
            self.consumed += n;
            buf = &mut buf[n..];
        }
        Ok(())
    }
}

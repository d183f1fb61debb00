//! NCZ section table and block layout parsing.
//!
//! An NCZ is an NCA whose body has been zstd-compressed after decryption.
//! The first [`NCA_HEADER_SIZE`] bytes are kept verbatim; the NCZ metadata
//! follows immediately after them.
//!
//! ## Layout
//! ```text
//! [0x0000]             NCA header, copied verbatim         (0x4000 bytes)
//! [0x4000]             Magic "NCZSECTN"                    (8 bytes)
//! [0x4008]             Section count N                     (u64 LE)
//! [0x4010 + i*0x40]    Offset                              (u64 LE)
//!                      Size                                (u64 LE)
//!                      Crypto type                         (u64 LE)
//!                      Padding                             (u64 LE)
//!                      AES-128 key                         (16 bytes)
//!                      AES-CTR counter                     (16 bytes)
//! optional:
//!   Magic "NCZBLOCK"                                       (8 bytes)
//!   Version (2), type (1), reserved, block size exponent   (4 x u8)
//!   Block count K                                          (u32 LE)
//!   Decompressed size                                      (u64 LE)
//!   Compressed block sizes                                 (K x u32 LE)
//! [payload_offset]     zstd stream, or K concatenated blocks
//! ```
//!
//! Section offsets are absolute offsets within the decompressed NCA, so the
//! first section usually starts at 0 and overlaps the verbatim header.

use std::io::{Read, Seek, SeekFrom, Write};

use super::limits::ResourceLimits;
use super::reader::{read_array, read_field, read_u8, read_u32_le, read_u64_le, read_up_to};
use crate::{Error, Result};

/// Size of the verbatim NCA header preceding the NCZ metadata.
pub const NCA_HEADER_SIZE: u64 = 0x4000;

/// Section table magic.
pub const NCZ_SECTION_MAGIC: &[u8; 8] = b"NCZSECTN";

/// Block layout magic.
pub const NCZ_BLOCK_MAGIC: &[u8; 8] = b"NCZBLOCK";

/// Size of one section record.
pub const SECTION_RECORD_SIZE: u64 = 0x40;

/// Crypto type of a plaintext section.
pub const CRYPTO_TYPE_NONE: u64 = 1;

/// Crypto type of an AES-CTR section.
pub const CRYPTO_TYPE_CTR: u64 = 3;

/// Crypto type of a BKTR (patch) section; CTR-encrypted on disk.
pub const CRYPTO_TYPE_BKTR: u64 = 4;

/// Crypto type of an AES-CTR section with skipped layer hashes.
pub const CRYPTO_TYPE_CTR_SKIP_LAYER_HASH: u64 = 5;

/// The only block layout version in use.
pub const BLOCK_LAYOUT_VERSION: u8 = 2;

/// The only block layout type in use (zstd blocks).
pub const BLOCK_LAYOUT_TYPE: u8 = 1;

/// Smallest valid block size exponent (16 KiB blocks).
pub const MIN_BLOCK_SIZE_EXPONENT: u8 = 14;

/// Largest valid block size exponent (4 GiB blocks).
pub const MAX_BLOCK_SIZE_EXPONENT: u8 = 32;

/// One independently keyed region of the decompressed NCA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NczSection {
    /// Absolute offset within the decompressed NCA.
    pub offset: u64,
    /// Length in bytes.
    pub size: u64,
    /// Crypto type; [`CRYPTO_TYPE_NONE`] means plaintext and every other
    /// value is AES-CTR encrypted on disk.
    pub crypto_type: u64,
    /// AES-128 key.
    pub key: [u8; 16],
    /// Initial AES-CTR counter block.
    pub counter: [u8; 16],
}

impl NczSection {
    /// Returns `true` unless the section is stored in plaintext.
    pub fn needs_encryption(&self) -> bool {
        self.crypto_type != CRYPTO_TYPE_NONE
    }

    /// Returns the offset one past the section's last byte, if it fits in a `u64`.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

/// Fixed-size block compression layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    /// Layout version.
    pub version: u8,
    /// Layout type.
    pub block_type: u8,
    /// `block_size = 1 << block_size_exponent`.
    pub block_size_exponent: u8,
    /// Number of blocks.
    pub number_of_blocks: u32,
    /// Total decompressed length of all blocks.
    pub decompressed_size: u64,
    /// Compressed length of each block, in order.
    pub compressed_block_sizes: Vec<u32>,
}

impl BlockLayout {
    /// Returns the decompressed size of every block but the last.
    pub fn block_size(&self) -> u64 {
        1u64 << self.block_size_exponent
    }

    /// Returns the decompressed size of block `index`.
    ///
    /// Every block is `block_size()` bytes long except the final one, which
    /// holds the remainder.
    pub fn decompressed_block_size(&self, index: u32) -> u64 {
        let block_size = self.block_size();
        if index + 1 < self.number_of_blocks {
            block_size
        } else {
            self.decompressed_size - block_size * (self.number_of_blocks as u64 - 1)
        }
    }

    /// Returns the sum of all compressed block sizes.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_block_sizes.iter().map(|&s| s as u64).sum()
    }
}

/// A contiguous byte range of the decompressed payload with one encryption
/// setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadRegion {
    /// Absolute NCA offset of the first byte (at least [`NCA_HEADER_SIZE`]).
    pub start: u64,
    /// Absolute NCA offset one past the last byte.
    pub end: u64,
    /// Key and counter when the region must be re-encrypted.
    pub encryption: Option<([u8; 16], [u8; 16])>,
}

impl PayloadRegion {
    /// Returns the region length.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` if the region is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Parsed NCZ metadata following the verbatim NCA header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NczHeader {
    /// Sections in table order.
    pub sections: Vec<NczSection>,
    /// Block layout, or `None` for a solid zstd stream.
    pub block_layout: Option<BlockLayout>,
    /// Stream position of the section table magic.
    pub table_offset: u64,
    /// Stream position where the compressed payload begins.
    pub payload_offset: u64,
}

impl NczHeader {
    /// Parses the section table and optional block layout.
    ///
    /// `r` must be positioned right after the verbatim NCA header, at the
    /// `NCZSECTN` magic. On success `r` is positioned at the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptHeader`] for a wrong magic, a truncated field,
    /// a section count above `limits.max_sections` or an inconsistent block
    /// layout.
    pub fn parse<R: Read + Seek>(r: &mut R, limits: &ResourceLimits) -> Result<Self> {
        let table_offset = r.stream_position()?;

        let magic: [u8; 8] = read_field(r, "section table magic", read_array)?;
        if &magic != NCZ_SECTION_MAGIC {
            return Err(Error::corrupt(
                table_offset,
                format!("bad section table magic {:02x?}, expected \"NCZSECTN\"", magic),
            ));
        }

        let section_count = read_field(r, "section count", read_u64_le)?;
        if section_count > limits.max_sections {
            return Err(Error::corrupt(
                table_offset + 8,
                format!(
                    "section count {} exceeds limit {}",
                    section_count, limits.max_sections
                ),
            ));
        }

        let mut sections = Vec::with_capacity(section_count as usize);
        for _ in 0..section_count {
            let offset = read_field(r, "section offset", read_u64_le)?;
            let size = read_field(r, "section size", read_u64_le)?;
            let crypto_type = read_field(r, "section crypto type", read_u64_le)?;
            let _padding = read_field(r, "section padding", read_u64_le)?;
            let key = read_field(r, "section key", read_array)?;
            let counter = read_field(r, "section counter", read_array)?;

            sections.push(NczSection {
                offset,
                size,
                crypto_type,
                key,
                counter,
            });
        }

        let block_layout = parse_block_layout(r, limits)?;
        let payload_offset = r.stream_position()?;

        log::debug!(
            "parsed NCZ header: {} sections, {}",
            sections.len(),
            match &block_layout {
                Some(layout) => format!(
                    "{} blocks of {} bytes",
                    layout.number_of_blocks,
                    layout.block_size()
                ),
                None => "solid stream".to_string(),
            }
        );

        Ok(Self {
            sections,
            block_layout,
            table_offset,
            payload_offset,
        })
    }

    /// Serializes the section table and block layout.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(NCZ_SECTION_MAGIC)?;
        w.write_all(&(self.sections.len() as u64).to_le_bytes())?;
        for section in &self.sections {
            w.write_all(&section.offset.to_le_bytes())?;
            w.write_all(&section.size.to_le_bytes())?;
            w.write_all(&section.crypto_type.to_le_bytes())?;
            w.write_all(&0u64.to_le_bytes())?;
            w.write_all(&section.key)?;
            w.write_all(&section.counter)?;
        }
        if let Some(layout) = &self.block_layout {
            w.write_all(NCZ_BLOCK_MAGIC)?;
            w.write_all(&[
                layout.version,
                layout.block_type,
                0,
                layout.block_size_exponent,
            ])?;
            w.write_all(&layout.number_of_blocks.to_le_bytes())?;
            w.write_all(&layout.decompressed_size.to_le_bytes())?;
            for size in &layout.compressed_block_sizes {
                w.write_all(&size.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Splits the decompressed payload into regions by encryption setting.
    ///
    /// Sections must be contiguous. Bytes of the first section that fall
    /// inside the verbatim NCA header are dropped; a first section starting
    /// after the header end is preceded by an implicit plaintext region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptHeader`] if there are no sections, if a section
    /// end overflows, or if two consecutive sections leave a gap or overlap.
    pub fn regions(&self) -> Result<Vec<PayloadRegion>> {
        let first = self
            .sections
            .first()
            .ok_or_else(|| Error::corrupt(self.table_offset + 8, "section table is empty"))?;

        let mut regions = Vec::with_capacity(self.sections.len() + 1);
        if first.offset > NCA_HEADER_SIZE {
            regions.push(PayloadRegion {
                start: NCA_HEADER_SIZE,
                end: first.offset,
                encryption: None,
            });
        }

        let mut previous_end: Option<u64> = None;
        for (index, section) in self.sections.iter().enumerate() {
            let record_offset = self.table_offset + 16 + index as u64 * SECTION_RECORD_SIZE;
            let end = section.end().ok_or_else(|| {
                Error::corrupt(record_offset, format!("section {} end overflows", index))
            })?;

            if let Some(previous_end) = previous_end {
                if section.offset != previous_end {
                    let what = if section.offset > previous_end {
                        "gap"
                    } else {
                        "overlap"
                    };
                    return Err(Error::corrupt(
                        record_offset,
                        format!(
                            "{} between section {} ending at {:#x} and section {} starting at {:#x}",
                            what,
                            index - 1,
                            previous_end,
                            index,
                            section.offset
                        ),
                    ));
                }
            }
            previous_end = Some(end);

            let start = section.offset.max(NCA_HEADER_SIZE);
            if end <= start {
                continue;
            }
            regions.push(PayloadRegion {
                start,
                end,
                encryption: section
                    .needs_encryption()
                    .then_some((section.key, section.counter)),
            });
        }

        Ok(regions)
    }

    /// Returns the decompressed payload length implied by the sections.
    pub fn payload_size(&self) -> Result<u64> {
        Ok(self
            .regions()?
            .last()
            .map_or(0, |region| region.end - NCA_HEADER_SIZE))
    }

    /// Checks the block layout against the payload it describes.
    ///
    /// `compressed_len` is the number of bytes from `payload_offset` to the
    /// end of the entry.
    pub fn check_payload(&self, compressed_len: u64) -> Result<()> {
        let payload_size = self.payload_size()?;
        let Some(layout) = &self.block_layout else {
            return Ok(());
        };

        if layout.decompressed_size != payload_size {
            return Err(Error::corrupt(
                self.payload_offset,
                format!(
                    "block layout decompresses to {} bytes but sections describe {}",
                    layout.decompressed_size, payload_size
                ),
            ));
        }
        if layout.compressed_size() != compressed_len {
            return Err(Error::corrupt(
                self.payload_offset,
                format!(
                    "compressed blocks total {} bytes but {} bytes remain in the entry",
                    layout.compressed_size(),
                    compressed_len
                ),
            ));
        }
        Ok(())
    }
}

fn parse_block_layout<R: Read + Seek>(
    r: &mut R,
    limits: &ResourceLimits,
) -> Result<Option<BlockLayout>> {
    let layout_offset = r.stream_position()?;
    let mut magic = [0u8; 8];
    let n = read_up_to(r, &mut magic)?;
    if n < magic.len() || &magic != NCZ_BLOCK_MAGIC {
        r.seek(SeekFrom::Start(layout_offset))?;
        return Ok(None);
    }

    let version = read_field(r, "block layout version", read_u8)?;
    let block_type = read_field(r, "block layout type", read_u8)?;
    let _reserved = read_field(r, "block layout reserved byte", read_u8)?;
    let block_size_exponent = read_field(r, "block size exponent", read_u8)?;
    let number_of_blocks = read_field(r, "block count", read_u32_le)?;
    let decompressed_size = read_field(r, "block decompressed size", read_u64_le)?;

    if version != BLOCK_LAYOUT_VERSION {
        return Err(Error::corrupt(
            layout_offset + 8,
            format!("unsupported block layout version {}", version),
        ));
    }
    if block_type != BLOCK_LAYOUT_TYPE {
        return Err(Error::corrupt(
            layout_offset + 9,
            format!("unsupported block layout type {}", block_type),
        ));
    }
    if !(MIN_BLOCK_SIZE_EXPONENT..=MAX_BLOCK_SIZE_EXPONENT).contains(&block_size_exponent) {
        return Err(Error::corrupt(
            layout_offset + 11,
            format!(
                "block size exponent {} outside {}..={}",
                block_size_exponent, MIN_BLOCK_SIZE_EXPONENT, MAX_BLOCK_SIZE_EXPONENT
            ),
        ));
    }

    let block_size = 1u64 << block_size_exponent;
    let expected_blocks = decompressed_size.div_ceil(block_size);
    if expected_blocks != number_of_blocks as u64 {
        return Err(Error::corrupt(
            layout_offset + 12,
            format!(
                "{} blocks declared, {} bytes in {} byte blocks needs {}",
                number_of_blocks, decompressed_size, block_size, expected_blocks
            ),
        ));
    }

    let table_bytes = number_of_blocks as u64 * 4;
    if table_bytes > limits.max_header_bytes {
        return Err(Error::corrupt(
            layout_offset + 12,
            format!(
                "block size table of {} bytes exceeds limit {}",
                table_bytes, limits.max_header_bytes
            ),
        ));
    }

    let mut raw = vec![0u8; table_bytes as usize];
    read_field(r, "compressed block sizes", |r| r.read_exact(&mut raw))?;
    let compressed_block_sizes = raw
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(Some(BlockLayout {
        version,
        block_type,
        block_size_exponent,
        number_of_blocks,
        decompressed_size,
        compressed_block_sizes,
    }))
}

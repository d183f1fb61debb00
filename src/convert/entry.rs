//! Per-entry planning and output.

use std::io::{Read, Seek, SeekFrom, Write};

use sha2::{Digest, Sha256};

use crate::codec::build_payload_decoder;
use crate::crypto::AesCtr;
use crate::format::{ContainerEntry, NCA_HEADER_SIZE, NczHeader, PayloadRegion, ResourceLimits};
use crate::progress::ProgressReporter;
use crate::{Error, Result};

/// How one container entry is turned into output.
#[derive(Debug, Clone)]
pub enum EntryPlan {
    /// Copied byte for byte.
    Passthrough {
        /// The entry.
        entry: ContainerEntry,
    },
    /// Decompressed and re-encrypted.
    Compressed {
        /// The entry.
        entry: ContainerEntry,
        /// Its parsed section table and block layout.
        header: NczHeader,
        /// Payload regions derived from the sections.
        regions: Vec<PayloadRegion>,
    },
}

impl EntryPlan {
    /// Returns the container entry.
    pub fn entry(&self) -> &ContainerEntry {
        match self {
            Self::Passthrough { entry } | Self::Compressed { entry, .. } => entry,
        }
    }

    /// Returns the NCZ header of a compressed entry.
    pub fn header(&self) -> Option<&NczHeader> {
        match self {
            Self::Passthrough { .. } => None,
            Self::Compressed { header, .. } => Some(header),
        }
    }

    /// Returns `true` for an entry that will be decompressed.
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Compressed { .. })
    }

    /// Returns the entry's size in the output.
    pub fn output_size(&self) -> u64 {
        match self {
            Self::Passthrough { entry } => entry.size,
            Self::Compressed { regions, .. } => regions
                .last()
                .map_or(NCA_HEADER_SIZE, |region| region.end),
        }
    }

    /// Plans one entry, parsing its NCZ header if it is compressed.
    pub(crate) fn build<R: Read + Seek>(
        r: &mut R,
        entry: ContainerEntry,
        limits: &ResourceLimits,
    ) -> Result<Self> {
        if !entry.is_compressed {
            log::debug!("{}: passthrough, {} bytes", entry.name, entry.size);
            return Ok(Self::Passthrough { entry });
        }

        if entry.size < NCA_HEADER_SIZE {
            return Err(Error::corrupt(
                entry.data_offset,
                format!(
                    "compressed entry '{}' is {} bytes, smaller than the {:#x} byte NCA header",
                    entry.name, entry.size, NCA_HEADER_SIZE
                ),
            ));
        }

        r.seek(SeekFrom::Start(entry.data_offset + NCA_HEADER_SIZE))?;
        let header = NczHeader::parse(r, limits)?;
        if header.payload_offset > entry.data_end() {
            return Err(Error::corrupt(
                header.table_offset,
                format!(
                    "NCZ header of '{}' runs past the end of the entry",
                    entry.name
                ),
            ));
        }

        let regions = header.regions()?;
        header.check_payload(entry.data_end() - header.payload_offset)?;
        if let Some(layout) = &header.block_layout {
            limits.check_block_size(layout.block_size())?;
        }

        let plan = Self::Compressed {
            entry,
            header,
            regions,
        };
        limits.check_entry_unpacked(&plan.entry().name, plan.output_size())?;

        if let Self::Compressed { entry, header, .. } = &plan {
            log::debug!(
                "{}: {} sections, {} payload, {} -> {} bytes",
                entry.name,
                header.sections.len(),
                if header.block_layout.is_some() {
                    "block"
                } else {
                    "solid"
                },
                entry.size,
                plan.output_size()
            );
        }
        Ok(plan)
    }
}

/// Output writer that reports progress after every chunk.
pub(crate) struct OutputSink<'p, W> {
    inner: W,
    written: u64,
    total: u64,
    progress: &'p mut dyn ProgressReporter,
}

impl<'p, W: Write> OutputSink<'p, W> {
    pub(crate) fn new(inner: W, total: u64, progress: &'p mut dyn ProgressReporter) -> Self {
        Self {
            inner,
            written: 0,
            total,
            progress,
        }
    }

    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    pub(crate) fn progress(&mut self) -> &mut dyn ProgressReporter {
        &mut *self.progress
    }

    pub(crate) fn write_chunk(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf)?;
        self.written += buf.len() as u64;
        if !self.progress.on_progress(self.written, self.total) {
            log::debug!("cancelled at {} of {} bytes", self.written, self.total);
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Writes one planned entry to `sink`.
pub(crate) fn write_entry<R, W>(
    input: &mut R,
    plan: &EntryPlan,
    sink: &mut OutputSink<'_, W>,
    buf: &mut [u8],
    limits: &ResourceLimits,
    verify_hash: bool,
) -> Result<()>
where
    R: Read + Seek,
    W: Write,
{
    match plan {
        EntryPlan::Passthrough { entry } => {
            input.seek(SeekFrom::Start(entry.data_offset))?;
            copy_exact(input, entry.size, sink, buf, None)
        }
        EntryPlan::Compressed {
            entry,
            header,
            regions,
        } => {
            let expected_hash = if verify_hash {
                hash_name(&entry.output_name)
            } else {
                None
            };
            let mut hasher = expected_hash.as_ref().map(|_| Sha256::new());

            input.seek(SeekFrom::Start(entry.data_offset))?;
            copy_exact(input, NCA_HEADER_SIZE, sink, buf, hasher.as_mut())?;

            input.seek(SeekFrom::Start(header.payload_offset))?;
            let compressed_len = entry.data_end() - header.payload_offset;
            let mut decoder =
                build_payload_decoder(Read::take(&mut *input, compressed_len), header, &entry.name, limits)?;
            log::trace!("{}: decoding {} payload", entry.name, decoder.method());

            for region in regions {
                let mut cipher = region
                    .encryption
                    .as_ref()
                    .map(|(key, counter)| AesCtr::new(key, counter, region.start));
                let mut remaining = region.len();
                while remaining > 0 {
                    let n = remaining.min(buf.len() as u64) as usize;
                    let chunk = &mut buf[..n];
                    decoder.read_exact_payload(chunk)?;
                    if let Some(cipher) = cipher.as_mut() {
                        cipher.apply_keystream(chunk);
                    }
                    if let Some(hasher) = hasher.as_mut() {
                        hasher.update(&*chunk);
                    }
                    sink.write_chunk(chunk)?;
                    remaining -= n as u64;
                }
            }

            if let (Some(expected), Some(hasher)) = (expected_hash, hasher) {
                let digest = hasher.finalize();
                let actual = to_hex(&digest[..16]);
                if actual != expected {
                    return Err(Error::HashMismatch {
                        entry: entry.output_name.clone(),
                        expected,
                        actual,
                    });
                }
                log::debug!("{}: hash verified", entry.output_name);
            }
            Ok(())
        }
    }
}

fn copy_exact<R: Read, W: Write>(
    input: &mut R,
    mut len: u64,
    sink: &mut OutputSink<'_, W>,
    buf: &mut [u8],
    mut hasher: Option<&mut Sha256>,
) -> Result<()> {
    while len > 0 {
        let n = len.min(buf.len() as u64) as usize;
        input.read_exact(&mut buf[..n])?;
        if let Some(hasher) = hasher.as_mut() {
            hasher.update(&buf[..n]);
        }
        sink.write_chunk(&buf[..n])?;
        len -= n as u64;
    }
    Ok(())
}

/// Returns the lowercase hash embedded in a content-addressed entry name.
///
/// Such names start with 32 hex digits followed by a dot, e.g.
/// `0123456789abcdef0123456789abcdef.nca` or `<hash>.cnmt.nca`.
pub(crate) fn hash_name(name: &str) -> Option<String> {
    let stem = name.split('.').next()?;
    (stem.len() == 32 && stem.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| stem.to_ascii_lowercase())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

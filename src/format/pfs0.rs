//! PFS0 container parsing and header reconstruction.
//!
//! ## Layout
//! ```text
//! [0x00]            Magic "PFS0"                         (4 bytes)
//! [0x04]            Entry count                          (u32 LE)
//! [0x08]            String table size                    (u32 LE)
//! [0x0C]            Reserved                             (u32 LE)
//! [0x10 + i*0x18]   Relative data offset                 (u64 LE)
//!                   Data size                            (u64 LE)
//!                   Name offset into string table        (u32 LE)
//!                   Reserved                             (u32 LE)
//! [0x10 + n*0x18]   String table (NUL-terminated names)
//! [header_size]     Entry data, in file table order
//! ```
//!
//! Relative data offsets count from the end of the header, so the absolute
//! offset of an entry is `header_size + relative_offset`.

use std::io::{Read, Seek, Write};

use super::detect::{is_compressed_entry_name, plain_entry_name};
use super::limits::ResourceLimits;
use super::reader::{read_array, read_field, read_u32_le, read_u64_le};
use crate::{Error, Result};

/// PFS0 magic bytes.
pub const PFS0_MAGIC: &[u8; 4] = b"PFS0";

/// Size of the fixed preamble (magic, count, string table size, reserved).
pub const PFS0_PREAMBLE_SIZE: u64 = 16;

/// Size of one file table record.
pub const PFS0_ENTRY_SIZE: u64 = 24;

/// One file inside a PFS0 container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Entry name as stored in the string table.
    pub name: String,
    /// Name with a `.ncz` suffix rewritten to `.nca`; equal to `name` otherwise.
    pub output_name: String,
    /// Byte length of the entry's data in this container.
    pub size: u64,
    /// Absolute offset of the entry's data within the container file.
    pub data_offset: u64,
    /// Whether the name carries the compressed marker.
    pub is_compressed: bool,
}

impl ContainerEntry {
    pub(crate) fn new(name: String, size: u64, data_offset: u64) -> Self {
        Self {
            output_name: plain_entry_name(&name),
            is_compressed: is_compressed_entry_name(&name),
            name,
            size,
            data_offset,
        }
    }

    /// Returns the absolute offset one past the entry's last byte.
    pub fn data_end(&self) -> u64 {
        self.data_offset + self.size
    }
}

/// A parsed or rebuilt PFS0 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pfs0Header {
    entries: Vec<ContainerEntry>,
    name_offsets: Vec<u32>,
    string_table: Vec<u8>,
}

impl Pfs0Header {
    /// Parses a PFS0 header starting at the reader's current position,
    /// which is taken to be the start of the container.
    ///
    /// Entries must be listed in ascending, non-overlapping data order. A gap
    /// between consecutive entries is tolerated and logged. Headers built by
    /// [`rebuild`] are always contiguous, so gap bytes do not survive a
    /// conversion. Data ranges are not checked against the file length here;
    /// see [`check_within`].
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedFormat`] if the magic is not `PFS0`
    /// - [`Error::CorruptHeader`] for truncation, counts above `limits`,
    ///   bad name offsets, or overlapping entries
    ///
    /// [`check_within`]: Self::check_within
    /// [`rebuild`]: Self::rebuild
    pub fn parse<R: Read + Seek>(r: &mut R, limits: &ResourceLimits) -> Result<Self> {
        let base = r.stream_position()?;

        let magic: [u8; 4] = read_field(r, "container magic", read_array)?;
        if &magic != PFS0_MAGIC {
            return Err(Error::UnsupportedFormat(format!(
                "bad container magic {:02x?}, expected \"PFS0\"",
                magic
            )));
        }

        let entry_count = read_field(r, "entry count", read_u32_le)?;
        let string_table_size = read_field(r, "string table size", read_u32_le)?;
        let _reserved = read_field(r, "reserved field", read_u32_le)?;

        if entry_count as usize > limits.max_entries {
            return Err(Error::corrupt(
                base + 4,
                format!(
                    "entry count {} exceeds limit {}",
                    entry_count, limits.max_entries
                ),
            ));
        }
        if string_table_size as u64 > limits.max_header_bytes {
            return Err(Error::corrupt(
                base + 8,
                format!(
                    "string table size {} exceeds limit {}",
                    string_table_size, limits.max_header_bytes
                ),
            ));
        }

        let mut records = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let offset = read_field(r, "entry data offset", read_u64_le)?;
            let size = read_field(r, "entry size", read_u64_le)?;
            let name_offset = read_field(r, "entry name offset", read_u32_le)?;
            let _reserved = read_field(r, "entry reserved field", read_u32_le)?;
            records.push((offset, size, name_offset));
        }

        let table_start = r.stream_position()?;
        let mut string_table = vec![0u8; string_table_size as usize];
        read_field(r, "string table", |r| r.read_exact(&mut string_table))?;

        let header_size = header_size(entry_count as u64, string_table_size as u64);
        let data_start = base + header_size;

        let mut entries = Vec::with_capacity(records.len());
        let mut name_offsets = Vec::with_capacity(records.len());
        let mut previous_end = 0u64;
        for (index, &(relative, size, name_offset)) in records.iter().enumerate() {
            let record_offset = base + PFS0_PREAMBLE_SIZE + index as u64 * PFS0_ENTRY_SIZE;
            let name = name_at(&string_table, name_offset)
                .map_err(|reason| Error::corrupt(table_start + name_offset as u64, reason))?;

            if relative < previous_end {
                return Err(Error::corrupt(
                    record_offset,
                    format!(
                        "entry '{}' at relative offset {:#x} overlaps previous entry ending at {:#x}",
                        name, relative, previous_end
                    ),
                ));
            }
            if relative > previous_end {
                log::warn!(
                    "{} byte gap before container entry '{}'",
                    relative - previous_end,
                    name
                );
            }

            let data_offset = data_start.checked_add(relative).ok_or_else(|| {
                Error::corrupt(record_offset, format!("entry '{}' offset overflows", name))
            })?;
            previous_end = relative.checked_add(size).ok_or_else(|| {
                Error::corrupt(record_offset, format!("entry '{}' size overflows", name))
            })?;
            data_offset.checked_add(size).ok_or_else(|| {
                Error::corrupt(record_offset, format!("entry '{}' size overflows", name))
            })?;

            entries.push(ContainerEntry::new(name, size, data_offset));
            name_offsets.push(name_offset);
        }

        log::debug!(
            "parsed PFS0 header: {} entries, {} byte string table",
            entries.len(),
            string_table.len()
        );

        Ok(Self {
            entries,
            name_offsets,
            string_table,
        })
    }

    /// Builds the header of a new container holding `entries` under their
    /// `output_name`s with the given `new_sizes`.
    ///
    /// Data is laid out contiguously in entry order, starting right after
    /// the header. The string table is the concatenation of each output name
    /// followed by a NUL byte.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEntryName`] if a name contains a NUL byte or the
    ///   string table would not fit in a `u32`
    /// - [`Error::CorruptHeader`] if `new_sizes` and `entries` differ in length
    pub fn rebuild(entries: &[ContainerEntry], new_sizes: &[u64]) -> Result<Self> {
        if entries.len() != new_sizes.len() {
            return Err(Error::corrupt(
                0,
                format!(
                    "{} entries but {} sizes supplied for header rebuild",
                    entries.len(),
                    new_sizes.len()
                ),
            ));
        }
        if u32::try_from(entries.len()).is_err() {
            return Err(Error::InvalidEntryName(format!(
                "{} entries do not fit in a PFS0 file table",
                entries.len()
            )));
        }

        let mut string_table = Vec::new();
        let mut name_offsets = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.output_name.as_bytes().contains(&0) {
                return Err(Error::InvalidEntryName(format!(
                    "'{}' contains a NUL byte",
                    entry.output_name.escape_debug()
                )));
            }
            let offset = u32::try_from(string_table.len()).map_err(|_| {
                Error::InvalidEntryName("string table exceeds 4 GiB".to_string())
            })?;
            name_offsets.push(offset);
            string_table.extend_from_slice(entry.output_name.as_bytes());
            string_table.push(0);
        }
        if u32::try_from(string_table.len()).is_err() {
            return Err(Error::InvalidEntryName(
                "string table exceeds 4 GiB".to_string(),
            ));
        }

        let mut data_offset = header_size(entries.len() as u64, string_table.len() as u64);
        let rebuilt = entries
            .iter()
            .zip(new_sizes)
            .map(|(entry, &size)| {
                let rebuilt = ContainerEntry::new(entry.output_name.clone(), size, data_offset);
                data_offset += size;
                rebuilt
            })
            .collect();

        Ok(Self {
            entries: rebuilt,
            name_offsets,
            string_table,
        })
    }

    /// Returns the entries in data order.
    pub fn entries(&self) -> &[ContainerEntry] {
        &self.entries
    }

    /// Returns the raw string table.
    pub fn string_table(&self) -> &[u8] {
        &self.string_table
    }

    /// Returns the header size: `16 + 24 * entry_count + string_table_size`.
    pub fn header_size(&self) -> u64 {
        header_size(self.entries.len() as u64, self.string_table.len() as u64)
    }

    /// Returns the header size plus the data size of every entry.
    pub fn total_size(&self) -> u64 {
        self.header_size() + self.entries.iter().map(|e| e.size).sum::<u64>()
    }

    /// Fails if any entry's data extends past `file_len`.
    pub fn check_within(&self, file_len: u64) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.data_end() > file_len {
                return Err(Error::corrupt(
                    PFS0_PREAMBLE_SIZE + index as u64 * PFS0_ENTRY_SIZE,
                    format!(
                        "entry '{}' ends at {:#x}, past end of file at {:#x}",
                        entry.name,
                        entry.data_end(),
                        file_len
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header_size() as usize);
        let data_start = self.header_size();

        out.extend_from_slice(PFS0_MAGIC);
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.string_table.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());

        for (entry, name_offset) in self.entries.iter().zip(&self.name_offsets) {
            out.extend_from_slice(&(entry.data_offset - data_start).to_le_bytes());
            out.extend_from_slice(&entry.size.to_le_bytes());
            out.extend_from_slice(&name_offset.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
        }

        out.extend_from_slice(&self.string_table);
        out
    }

    /// Writes the serialized header to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.to_bytes())?;
        Ok(())
    }
}

fn header_size(entry_count: u64, string_table_size: u64) -> u64 {
    PFS0_PREAMBLE_SIZE + PFS0_ENTRY_SIZE * entry_count + string_table_size
}

fn name_at(table: &[u8], offset: u32) -> std::result::Result<String, String> {
    let start = offset as usize;
    if start >= table.len() {
        return Err(format!(
            "name offset {:#x} outside string table of {} bytes",
            offset,
            table.len()
        ));
    }
    let len = table[start..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| format!("name at {:#x} is not NUL-terminated", offset))?;
    String::from_utf8(table[start..start + len].to_vec())
        .map_err(|_| format!("name at {:#x} is not valid UTF-8", offset))
}

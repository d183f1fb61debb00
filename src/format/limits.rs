//! Resource limits applied while parsing untrusted headers.

use crate::{Error, Result};

/// Resource limits for header parsing and payload decoding.
///
/// Every count or size read from an input file is checked against these
/// limits *before* it is used to allocate memory or drive a loop, so a
/// corrupt or hostile file cannot trigger unbounded allocation.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Maximum number of entries in a container file table.
    pub max_entries: usize,
    /// Maximum bytes allocated for a single variable-length header table
    /// (container string table, NCZ block size table).
    pub max_header_bytes: u64,
    /// Maximum number of sections in an NCZ section table.
    pub max_sections: u64,
    /// Maximum decompressed block size held in memory at once.
    pub max_block_size: u64,
    /// Maximum decompressed size of a single entry.
    pub max_entry_unpacked: u64,
}

impl Default for ResourceLimits {
    /// Creates resource limits with the following default values:
    ///
    /// | Limit | Default Value | Description |
    /// |-------|---------------|-------------|
    /// | `max_entries` | 65,536 | Entries per container |
    /// | `max_header_bytes` | 64 MiB | String table / block table size |
    /// | `max_sections` | 1,024 | NCZ sections per entry |
    /// | `max_block_size` | 256 MiB | Decompressed block held in memory |
    /// | `max_entry_unpacked` | 1 TiB | Decompressed entry size |
    fn default() -> Self {
        Self {
            max_entries: 65_536,
            max_header_bytes: 64 << 20,
            max_sections: 1024,
            max_block_size: 256 << 20,
            max_entry_unpacked: 1 << 40,
        }
    }
}

impl ResourceLimits {
    /// Creates new resource limits with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates resource limits with no restrictions.
    pub fn unlimited() -> Self {
        Self {
            max_entries: usize::MAX,
            max_header_bytes: u64::MAX,
            max_sections: u64::MAX,
            max_block_size: u64::MAX,
            max_entry_unpacked: u64::MAX,
        }
    }

    /// Sets the maximum number of container entries.
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Sets the maximum size of a variable-length header table.
    pub fn max_header_bytes(mut self, max: u64) -> Self {
        self.max_header_bytes = max;
        self
    }

    /// Sets the maximum number of NCZ sections.
    pub fn max_sections(mut self, max: u64) -> Self {
        self.max_sections = max;
        self
    }

    /// Sets the maximum decompressed block size.
    pub fn max_block_size(mut self, max: u64) -> Self {
        self.max_block_size = max;
        self
    }

    /// Sets the maximum decompressed entry size.
    pub fn max_entry_unpacked(mut self, max: u64) -> Self {
        self.max_entry_unpacked = max;
        self
    }

    pub(crate) fn check_block_size(&self, block_size: u64) -> Result<()> {
        if block_size > self.max_block_size {
            return Err(Error::ResourceLimitExceeded(format!(
                "block size {} exceeds limit {}",
                block_size, self.max_block_size
            )));
        }
        Ok(())
    }

    pub(crate) fn check_entry_unpacked(&self, name: &str, size: u64) -> Result<()> {
        if size > self.max_entry_unpacked {
            return Err(Error::ResourceLimitExceeded(format!(
                "entry '{}' decompresses to {} bytes, limit is {}",
                name, size, self.max_entry_unpacked
            )));
        }
        Ok(())
    }
}

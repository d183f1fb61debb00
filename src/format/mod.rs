//! On-disk formats: the PFS0 container, NCZ metadata, and file naming.
//!
//! This module contains the magic numbers, fixed sizes, and parsers for the
//! two structures a conversion has to understand:
//!
//! - [`pfs0`]: the outer container (file table, string table, data)
//! - [`ncz`]: the per-entry section table and optional block layout
//!
//! Parsers never return a partially valid structure: every truncated field,
//! wrong magic or out-of-bounds count is reported as an [`Error`].
//!
//! [`Error`]: crate::Error

pub mod detect;
pub mod limits;
pub mod ncz;
pub mod pfs0;
pub mod reader;

pub use detect::{CompressedFormat, is_compressed_format};
pub use limits::ResourceLimits;
pub use ncz::{BlockLayout, NCA_HEADER_SIZE, NczHeader, NczSection, PayloadRegion};
pub use pfs0::{ContainerEntry, Pfs0Header};

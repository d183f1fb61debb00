//! # nszconv
//!
//! A pure-Rust library for converting NSZ-compressed Nintendo Switch
//! containers back into their original, byte-exact form.
//!
//! An `.nsz` file is a PFS0 container in which some `.nca` entries were
//! decrypted and zstd-compressed into `.ncz` entries. Converting it produces
//! the `.nsp` container the compressor started from: compressed entries are
//! decompressed, their encrypted sections are re-encrypted with AES-128-CTR,
//! and every other entry is copied unchanged. A standalone `.ncz` file
//! converts to its `.nca` the same way.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nszconv::{ConvertOptions, Converter, Result};
//!
//! fn main() -> Result<()> {
//!     let options = ConvertOptions::new()
//!         .keep_input(true)
//!         .verify_hash(true)
//!         .output_dir("./converted");
//!     let mut converter = Converter::new(options);
//!
//!     let result = converter.convert("game.nsz")?;
//!     println!(
//!         "{}: {} entries, {} decompressed",
//!         result.output_path.display(),
//!         result.entries_total,
//!         result.entries_decompressed
//!     );
//!     Ok(())
//! }
//! ```
//!
//! For the common case there is a one-call entry point:
//!
//! ```rust,no_run
//! let output = nszconv::decompress("game.nsz", None)?;
//! # Ok::<(), nszconv::Error>(())
//! ```
//!
//! ## Guarantees
//!
//! - Output is written to a temporary file in the destination directory and
//!   renamed into place only when complete. A failed or cancelled conversion
//!   leaves the input untouched and no partial output behind.
//! - Memory use is bounded by the chunk size plus, for block-compressed
//!   entries, a single block. See [`ResourceLimits`].
//! - Progress is reported as a non-decreasing byte count whose final value
//!   equals the exact output size.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | No | Command-line interface tool |

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod codec;
pub mod convert;
pub mod crypto;
pub mod error;
pub mod format;
pub mod progress;

pub use convert::{
    ContainerInfo, ConvertOptions, ConvertResult, Converter, EntryPlan, decompress, inspect,
};
pub use error::{Error, Result};
pub use format::{CompressedFormat, ResourceLimits, is_compressed_format};
pub use progress::{ClosureProgress, NoProgress, ProgressReporter, progress_fn};

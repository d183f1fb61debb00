//! AES-128-CTR support for NCA section re-encryption.
//!
//! Every NCZ section carries its own AES-128 key and a 16-byte initial
//! counter block. The upper 8 bytes of the counter block are a per-section
//! nonce; the lower 8 bytes are a big-endian block index. Re-encrypting a
//! section therefore means positioning the keystream at the absolute NCA
//! offset where the section's bytes live and XOR-ing from there.
//!
//! [`AesCtr`] is stateful: feeding it contiguous sub-ranges one after another
//! produces the same output as feeding it the whole range at once, which is
//! what lets the converter re-encrypt multi-gigabyte sections chunk by chunk.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};

use crate::{Error, Result};

type Aes128Ctr64BE = ctr::Ctr64BE<Aes128>;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Size of an AES-128 key in bytes.
pub const KEY_SIZE: usize = 16;

/// Byte range of the counter block that holds the running block index.
///
/// Bytes `0..8` are the section nonce and never change.
const COUNTER_RANGE: std::ops::Range<usize> = 8..16;

/// Adds `blocks` to the block index held in the low half of `counter`.
///
/// The addition is big-endian over bytes 8..16 with carry propagated from
/// byte to byte. A carry out of byte 8 is dropped, so the nonce in bytes
/// 0..8 is never modified.
///
/// # Example
///
/// ```rust
/// use nszconv::crypto::add_counter;
///
/// let mut counter = [0u8; 16];
/// counter[15] = 0xFF;
/// add_counter(&mut counter, 1);
/// assert_eq!(counter[14], 0x01);
/// assert_eq!(counter[15], 0x00);
/// ```
pub fn add_counter(counter: &mut [u8; BLOCK_SIZE], blocks: u64) {
    let mut carry = blocks;
    for byte in counter[COUNTER_RANGE].iter_mut().rev() {
        if carry == 0 {
            break;
        }
        let sum = *byte as u64 + (carry & 0xFF);
        *byte = sum as u8;
        carry = (carry >> 8) + (sum >> 8);
    }
}

/// Seekable AES-128 counter-mode keystream.
///
/// Encryption and decryption are the same operation.
///
/// # Example
///
/// ```rust
/// use nszconv::crypto::AesCtr;
///
/// let key = [0x11u8; 16];
/// let counter = [0x22u8; 16];
/// let mut data = b"section payload".to_vec();
///
/// AesCtr::new(&key, &counter, 0x4000).apply_keystream(&mut data);
/// assert_ne!(&data[..], b"section payload");
/// AesCtr::new(&key, &counter, 0x4000).apply_keystream(&mut data);
/// assert_eq!(&data[..], b"section payload");
/// ```
pub struct AesCtr {
    cipher: Aes128Ctr64BE,
    position: u64,
}

impl std::fmt::Debug for AesCtr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesCtr")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl AesCtr {
    /// Creates a keystream positioned at `starting_offset` bytes into the
    /// logical stream defined by `key` and `counter`.
    pub fn new(key: &[u8; KEY_SIZE], counter: &[u8; BLOCK_SIZE], starting_offset: u64) -> Self {
        let mut block = *counter;
        add_counter(&mut block, starting_offset / BLOCK_SIZE as u64);

        let mut cipher = Aes128Ctr64BE::new(&(*key).into(), &block.into());
        // Always < 16, within the first keystream block.
        cipher.seek(starting_offset % BLOCK_SIZE as u64);

        Self {
            cipher,
            position: starting_offset,
        }
    }

    /// Creates a keystream from untyped key and counter slices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CryptoError`] if either slice is not exactly 16 bytes.
    pub fn from_slices(key: &[u8], counter: &[u8], starting_offset: u64) -> Result<Self> {
        let key: &[u8; KEY_SIZE] = key.try_into().map_err(|_| {
            Error::CryptoError(format!(
                "AES-128 key must be {} bytes, got {}",
                KEY_SIZE,
                key.len()
            ))
        })?;
        let counter: &[u8; BLOCK_SIZE] = counter.try_into().map_err(|_| {
            Error::CryptoError(format!(
                "CTR counter block must be {} bytes, got {}",
                BLOCK_SIZE,
                counter.len()
            ))
        })?;
        Ok(Self::new(key, counter, starting_offset))
    }

    /// XORs the keystream into `buf` and advances by `buf.len()` bytes.
    pub fn apply_keystream(&mut self, buf: &mut [u8]) {
        self.cipher.apply_keystream(buf);
        self.position += buf.len() as u64;
    }

    /// Returns the absolute stream offset of the next byte to be processed.
    pub fn position(&self) -> u64 {
        self.position
    }
}

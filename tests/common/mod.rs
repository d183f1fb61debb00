//! Shared test utilities for integration tests.
//!
//! Builds synthetic NSZ/NCZ inputs together with the exact NSP/NCA bytes a
//! correct conversion must produce. The expected output is computed here
//! independently of the library: encryption uses raw AES-128-ECB with a
//! hand-rolled counter, and containers are serialized field by field.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use aes::Aes128;
use aes::cipher::{BlockEncrypt, KeyInit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Size of the verbatim NCA header.
pub const NCA_HEADER_SIZE: usize = 0x4000;

/// Crypto type of a plaintext section.
pub const PLAIN: u64 = 1;

/// Crypto type of an AES-CTR section.
pub const CTR: u64 = 3;

/// Crypto type of a BKTR section.
pub const BKTR: u64 = 4;

/// Crypto type of an AES-CTR section with skipped layer hashes.
pub const CTR_SKIP_LAYER_HASH: u64 = 5;

/// One section of a synthetic NCZ.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub offset: u64,
    pub size: u64,
    pub crypto_type: u64,
    pub key: [u8; 16],
    pub counter: [u8; 16],
}

impl SectionSpec {
    pub fn new(offset: u64, size: u64, crypto_type: u64, seed: u8) -> Self {
        let mut counter = [0u8; 16];
        counter[..8].copy_from_slice(&[seed, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
        Self {
            offset,
            size,
            crypto_type,
            key: [seed.wrapping_mul(31).wrapping_add(7); 16],
            counter,
        }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// How the payload of a synthetic NCZ is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadMode {
    /// One zstd stream.
    Solid,
    /// Independent zstd blocks of `1 << exponent` bytes.
    Blocks { exponent: u8 },
    /// Like `Blocks`, but every block is stored uncompressed.
    RawBlocks { exponent: u8 },
}

/// A synthetic NCZ together with the NCA it must convert to.
#[derive(Debug, Clone)]
pub struct NczFixture {
    pub ncz: Vec<u8>,
    pub nca: Vec<u8>,
}

/// Three sections like a typical program NCA: an encrypted section that
/// starts inside the header, a plaintext one and a BKTR one.
pub fn typical_sections(payload_len: u64) -> Vec<SectionSpec> {
    let first_end = NCA_HEADER_SIZE as u64 + payload_len / 2 + 5;
    let second_end = first_end + payload_len / 4;
    let end = NCA_HEADER_SIZE as u64 + payload_len;
    vec![
        SectionSpec::new(0, first_end, CTR, 1),
        SectionSpec::new(first_end, second_end - first_end, PLAIN, 2),
        SectionSpec::new(second_end, end - second_end, BKTR, 3),
    ]
}

/// Builds an NCZ for `sections` and the NCA it decompresses to.
pub fn make_ncz(sections: &[SectionSpec], mode: PayloadMode, seed: u64) -> NczFixture {
    let end = sections.last().map_or(NCA_HEADER_SIZE as u64, |s| s.end());
    let payload_len = end as usize - NCA_HEADER_SIZE;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut header = vec![0u8; NCA_HEADER_SIZE];
    rng.fill(&mut header[..]);
    let payload = sample_payload(&mut rng, payload_len);

    let mut ncz = header.clone();
    ncz.extend_from_slice(b"NCZSECTN");
    ncz.extend_from_slice(&(sections.len() as u64).to_le_bytes());
    for section in sections {
        ncz.extend_from_slice(&section.offset.to_le_bytes());
        ncz.extend_from_slice(&section.size.to_le_bytes());
        ncz.extend_from_slice(&section.crypto_type.to_le_bytes());
        ncz.extend_from_slice(&0u64.to_le_bytes());
        ncz.extend_from_slice(&section.key);
        ncz.extend_from_slice(&section.counter);
    }
    ncz.extend_from_slice(&compress_payload(&payload, mode));

    let mut nca = header;
    nca.extend_from_slice(&payload);
    for section in sections {
        if section.crypto_type == PLAIN {
            continue;
        }
        let start = (section.offset as usize).max(NCA_HEADER_SIZE);
        let end = section.end() as usize;
        if end > start {
            encrypt_range(&mut nca[start..end], &section.key, &section.counter, start as u64);
        }
    }

    NczFixture { ncz, nca }
}

/// Serializes the payload for `mode`, including the block layout if any.
pub fn compress_payload(payload: &[u8], mode: PayloadMode) -> Vec<u8> {
    match mode {
        PayloadMode::Solid => zstd::encode_all(payload, 3).unwrap(),
        PayloadMode::Blocks { exponent } | PayloadMode::RawBlocks { exponent } => {
            let raw = matches!(mode, PayloadMode::RawBlocks { .. });
            let block_size = 1usize << exponent;
            let mut sizes = Vec::new();
            let mut data = Vec::new();
            for chunk in payload.chunks(block_size) {
                let mut block = zstd::bulk::compress(chunk, 3).unwrap();
                if raw || block.len() >= chunk.len() {
                    block = chunk.to_vec();
                }
                sizes.push(block.len() as u32);
                data.extend_from_slice(&block);
            }

            let mut out = Vec::new();
            out.extend_from_slice(b"NCZBLOCK");
            out.extend_from_slice(&[2, 1, 0, exponent]);
            out.extend_from_slice(&(sizes.len() as u32).to_le_bytes());
            out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
            for size in &sizes {
                out.extend_from_slice(&size.to_le_bytes());
            }
            out.extend_from_slice(&data);
            out
        }
    }
}

/// Payload with compressible runs and random noise.
pub fn sample_payload(rng: &mut StdRng, len: usize) -> Vec<u8> {
    let mut payload = Vec::with_capacity(len);
    while payload.len() < len {
        let run = rng.gen_range(1..512).min(len - payload.len());
        if rng.gen_bool(0.5) {
            let byte: u8 = rng.r#gen();
            payload.extend(std::iter::repeat_n(byte, run));
        } else {
            payload.extend((0..run).map(|_| rng.r#gen::<u8>()));
        }
    }
    payload
}

/// XORs the AES-128-CTR keystream for absolute stream offset `offset` into
/// `data`. The counter's low 8 bytes are a big-endian block index.
pub fn encrypt_range(data: &mut [u8], key: &[u8; 16], counter: &[u8; 16], offset: u64) {
    let aes = Aes128::new(&(*key).into());
    for (i, byte) in data.iter_mut().enumerate() {
        let position = offset + i as u64;
        let block_index = position / 16;
        let mut block = *counter;
        let low = u64::from_be_bytes(block[8..].try_into().unwrap()).wrapping_add(block_index);
        block[8..].copy_from_slice(&low.to_be_bytes());
        let mut ga = aes::Block::from(block);
        aes.encrypt_block(&mut ga);
        *byte ^= ga[(position % 16) as usize];
    }
}

/// Serializes a PFS0 container from (name, data) pairs, data contiguous.
pub fn build_pfs0(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut string_table = Vec::new();
    let mut name_offsets = Vec::new();
    for (name, _) in entries {
        name_offsets.push(string_table.len() as u32);
        string_table.extend_from_slice(name.as_bytes());
        string_table.push(0);
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"PFS0");
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    out.extend_from_slice(&(string_table.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    let mut offset = 0u64;
    for ((_, data), name_offset) in entries.iter().zip(&name_offsets) {
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&(data.len() as u64).to_le_bytes());
        out.extend_from_slice(&name_offset.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        offset += data.len() as u64;
    }
    out.extend_from_slice(&string_table);
    for (_, data) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// A container whose compressed entries are listed with their expected plain
/// form.
pub struct NszFixture {
    pub nsz: Vec<u8>,
    pub nsp: Vec<u8>,
}

/// Builds an NSZ with one compressed program, a ticket and a certificate,
/// plus the NSP it converts to.
pub fn make_nsz(mode: PayloadMode, seed: u64) -> NszFixture {
    let program = make_ncz(&typical_sections(200_000), mode, seed);
    let ticket: Vec<u8> = (0..0x2C0u32).map(|i| (i % 97) as u8).collect();
    let cert: Vec<u8> = (0..0x700u32).map(|i| (i % 13) as u8).collect();

    let nsz = build_pfs0(&[
        ("program.ncz", &program.ncz[..]),
        ("title.tik", &ticket[..]),
        ("title.cert", &cert[..]),
    ]);
    let nsp = build_pfs0(&[
        ("program.nca", &program.nca[..]),
        ("title.tik", &ticket[..]),
        ("title.cert", &cert[..]),
    ]);
    NszFixture { nsz, nsp }
}

/// Returns the 32 hex digit name stem a content-addressed NCA would carry.
pub fn hash_stem(nca: &[u8]) -> String {
    Sha256::digest(nca)[..16]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_input(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Returns the sorted file names in `dir`.
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

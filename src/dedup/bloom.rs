//! Bloom filter for paragraph-level deduplication
//!
//! On-disk layout (little endian): `i32 num_hashes | u64 byte_len | bytes`.
//! Hashes are FNV-1a 64 started from one of eight fixed seeds each.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::DedupError;

const FNV_PRIME: u64 = 1099511628211;

/// Seeds for the hash functions; the first is the standard FNV offset basis
const SEEDS: [u64; 8] = [
    14695981039346656037,
    9425296925403859339,
    13716263814064014149,
    3525492407291847033,
    8607404175481815707,
    9818874561736458749,
    10026508429719773353,
    3560712257386009938,
];

fn fnv1a(data: &[u8], seed: u64) -> u64 {
    let mut h = seed;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Bloom filter implementation
#[derive(Debug, Clone)]
pub struct BloomFilter {
    /// Bit array
    bits: Vec<u8>,
    /// Number of hash functions (at most 8)
    num_hashes: usize,
}

impl BloomFilter {
    /// Create an empty filter of `size_bytes` bytes
    pub fn with_params(size_bytes: usize, num_hashes: usize) -> Result<Self, DedupError> {
        Self::validate(size_bytes, num_hashes)?;
        Ok(Self {
            bits: vec![0u8; size_bytes],
            num_hashes,
        })
    }

    fn validate(size_bytes: usize, num_hashes: usize) -> Result<(), DedupError> {
        if size_bytes == 0 {
            return Err(DedupError::InvalidFormat("bloom filter has no bits".to_string()));
        }
        if num_hashes == 0 || num_hashes > SEEDS.len() {
            return Err(DedupError::InvalidFormat(format!(
                "unsupported number of hash functions: {}",
                num_hashes
            )));
        }
        Ok(())
    }

    /// Load a filter from disk
    pub fn load(path: &Path) -> Result<Self, DedupError> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut word = [0u8; 4];
        reader.read_exact(&mut word)?;
        let num_hashes = i32::from_le_bytes(word);
        let mut long = [0u8; 8];
        reader.read_exact(&mut long)?;
        let size = u64::from_le_bytes(long) as usize;

        let num_hashes = usize::try_from(num_hashes).map_err(|_| {
            DedupError::InvalidFormat(format!("negative number of hash functions: {}", num_hashes))
        })?;
        Self::validate(size, num_hashes)?;

        let mut bits = vec![0u8; size];
        reader.read_exact(&mut bits)?;
        Ok(Self { bits, num_hashes })
    }

    /// Write the filter to disk in the format read by [`BloomFilter::load`]
    pub fn save(&self, path: &Path) -> Result<(), DedupError> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&(self.num_hashes as i32).to_le_bytes())?;
        writer.write_all(&(self.bits.len() as u64).to_le_bytes())?;
        writer.write_all(&self.bits)?;
        writer.flush()?;
        Ok(())
    }

    fn bit_position(&self, hash: u64) -> (usize, u8) {
        let idx = (hash % (8 * self.bits.len() as u64)) as usize;
        (idx / 8, 1 << (idx % 8))
    }

    /// Insert an item into the bloom filter
    pub fn insert(&mut self, item: &[u8]) {
        for &seed in &SEEDS[..self.num_hashes] {
            let (byte, mask) = self.bit_position(fnv1a(item, seed));
            self.bits[byte] |= mask;
        }
    }

    /// Check if an item might be in the set
    /// Returns false if definitely not in set, true if possibly in set
    pub fn contains(&self, item: &[u8]) -> bool {
        SEEDS[..self.num_hashes].iter().all(|&seed| {
            let (byte, mask) = self.bit_position(fnv1a(item, seed));
            self.bits[byte] & mask != 0
        })
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.bits.len()
    }

    /// Get fill ratio (fraction of bits set)
    pub fn fill_ratio(&self) -> f64 {
        let set_bits: usize = self.bits.iter().map(|b| b.count_ones() as usize).sum();
        set_bits as f64 / (self.bits.len() * 8) as f64
    }
}

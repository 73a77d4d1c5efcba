//! Descriptive text metrics attached to every written document

use std::collections::HashSet;

/// Window size for the repetition metric
pub const REPETITION_WINDOW: usize = 20;

/// Minimum byte length of a "long" word
pub const LONG_WORD_LENGTH: usize = 15;

const HASH_BASE: i64 = 33;
const HASH_MODULUS: i64 = 1_000_000_007;

/// Share of byte windows of size `window` that already occurred earlier in the text.
///
/// Uses a polynomial rolling hash over bytes. Texts no longer than the window
/// score 0.
pub fn repetition_ratio(text: &str, window: usize) -> f64 {
    let bytes = text.as_bytes();
    if window == 0 || bytes.len() <= window {
        return 0.0;
    }

    // HASH_BASE^window, the weight of the byte leaving the window
    let mut leading_weight = 1i64;
    let mut hash = 0i64;
    for &b in &bytes[..window] {
        hash = (hash * HASH_BASE + b as i64) % HASH_MODULUS;
        leading_weight = (leading_weight * HASH_BASE) % HASH_MODULUS;
    }

    let mut seen: HashSet<i64> = HashSet::with_capacity(bytes.len() - window);
    let mut repeated = 0usize;
    for i in window..bytes.len() {
        hash = (hash * HASH_BASE - leading_weight * bytes[i - window] as i64 + bytes[i] as i64)
            .rem_euclid(HASH_MODULUS);
        if !seen.insert(hash) {
            repeated += 1;
        }
    }
    repeated as f64 / bytes.len() as f64
}

/// Share of text bytes belonging to whitespace-separated words of at least `min_length` bytes
pub fn long_word_ratio(text: &str, min_length: usize) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let long_bytes: usize = text
        .split_whitespace()
        .map(str::len)
        .filter(|&len| len >= min_length)
        .sum();
    long_bytes as f64 / text.len() as f64
}

//! Paragraph deduplication
//!
//! Lines already present in a bloom filter count as duplicated. A paragraph
//! survives when the share of its bytes coming from novel lines is above a
//! threshold. Every novel line is inserted, so the filter learns as it goes.

mod bloom;

pub use bloom::BloomFilter;

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors loading or saving dedup state
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bloom filter: {0}")]
    InvalidFormat(String),
}

/// Rewrites a document's text with duplicated paragraphs removed
pub trait Deduplicator: Send {
    fn rewrite(&mut self, text: &str, threshold: f64) -> String;
}

static RE_PARAGRAPH_BREAK: OnceLock<Regex> = OnceLock::new();

fn paragraph_separator() -> &'static Regex {
    RE_PARAGRAPH_BREAK.get_or_init(|| Regex::new(r"\n\n+").unwrap())
}

impl Deduplicator for BloomFilter {
    fn rewrite(&mut self, text: &str, threshold: f64) -> String {
        let mut kept = String::with_capacity(text.len());
        for paragraph in paragraph_separator().split(text) {
            let mut novel = 0usize;
            for line in paragraph.split('\n') {
                if !self.contains(line.as_bytes()) {
                    novel += line.len();
                    self.insert(line.as_bytes());
                }
            }
            // Empty paragraphs still register their line but are never kept
            if !paragraph.is_empty() && novel as f64 / paragraph.len() as f64 > threshold {
                kept.push_str(paragraph);
                kept.push_str("\n\n");
            }
        }
        kept
    }
}

//! Record payload decoding and main-content text extraction
//!
//! Turns the raw HTTP body of a response record into plain text:
//! - UTF-8 first, heuristic charset detection as fallback
//! - Main content area located by selector priority, boilerplate skipped
//! - Paragraphs separated by blank lines, lines by single newlines

mod encoding;
mod html;

pub use encoding::decode_payload;
pub use html::TextExtractor;

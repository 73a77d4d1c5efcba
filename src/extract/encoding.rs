//! Payload decoding

use chardetng::EncodingDetector;

/// Decode a payload to text.
///
/// UTF-8 is tried first since it covers most of the web. Anything else goes
/// through charset detection and a tolerant decode where undecodable bytes
/// are dropped.
pub fn decode_payload(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, had_errors) = encoding.decode(bytes);

    if had_errors {
        decoded.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect()
    } else {
        decoded.into_owned()
    }
}

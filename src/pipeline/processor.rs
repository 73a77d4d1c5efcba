//! Per-source record processing
//!
//! An [`ArchiveStreamProcessor`] turns one archive source into a sequence of
//! classified documents followed by exactly one completion report.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::fetcher::ArchiveFetcher;
use super::progress::WarcRecordProgress;
use crate::extract::{decode_payload, TextExtractor};
use crate::language::LanguageDetector;
use crate::types::{ArchiveCompletionReport, Document};
use crate::util::round_to;
use crate::warc::{open_stream, WarcRecord};

/// Minimum language confidence for a record to be kept
pub const LANGUAGE_THRESHOLD: f64 = 0.8;

/// Label whose confidence is doubled before thresholding
const BOOSTED_LANGUAGE: &str = "hr";

/// Why a record was not turned into a document
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Not a `response` record
    NotResponse,
    /// A required WARC header is absent
    MissingHeader(&'static str),
    /// Extracted text is not longer than the minimum
    TooShort(usize),
    /// Detected language is not in the allowed set
    UnsupportedLanguage(String),
    /// Detected language confidence is below the threshold
    LowConfidence { language: String, confidence: f64 },
    /// The language detector failed on this text
    Detector(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotResponse => write!(f, "not a response record"),
            Self::MissingHeader(name) => write!(f, "missing {} header", name),
            Self::TooShort(len) => write!(f, "text too short ({} chars)", len),
            Self::UnsupportedLanguage(lang) => write!(f, "unsupported language {}", lang),
            Self::LowConfidence {
                language,
                confidence,
            } => write!(f, "low confidence {:.3} for {}", confidence, language),
            Self::Detector(msg) => write!(f, "language detection failed: {}", msg),
        }
    }
}

/// Turns a single WARC record into a document, or says why not
pub struct RecordClassifier {
    extractor: TextExtractor,
    detector: Arc<dyn LanguageDetector>,
    languages: HashSet<String>,
    min_length: usize,
}

impl RecordClassifier {
    pub fn new(
        detector: Arc<dyn LanguageDetector>,
        languages: impl IntoIterator<Item = String>,
        min_length: usize,
    ) -> Self {
        Self {
            extractor: TextExtractor::new(),
            detector,
            languages: languages.into_iter().collect(),
            min_length,
        }
    }

    pub fn classify(
        &self,
        record: &WarcRecord,
        group_idx: usize,
        source: &str,
        record_idx: u64,
    ) -> Result<Document, Rejection> {
        if record.record_type() != Some("response") {
            return Err(Rejection::NotResponse);
        }
        let required = |name: &'static str| {
            record
                .header(name)
                .map(str::to_string)
                .ok_or(Rejection::MissingHeader(name))
        };
        let url = required("WARC-Target-URI")?;
        let date = required("WARC-Date")?;
        let warc_id = required("WARC-Record-ID")?;

        let html = decode_payload(record.http_payload());
        let text = self.extractor.extract(&html);
        let length = text.chars().count();
        if length <= self.min_length {
            return Err(Rejection::TooShort(length));
        }

        let guess = self
            .detector
            .predict(&text)
            .map_err(|e| Rejection::Detector(e.to_string()))?;
        let mut confidence = guess.confidence;
        if guess.label == BOOSTED_LANGUAGE {
            confidence *= 2.0;
        }
        if !self.languages.contains(&guess.label) {
            return Err(Rejection::UnsupportedLanguage(guess.label));
        }
        if confidence < LANGUAGE_THRESHOLD {
            return Err(Rejection::LowConfidence {
                language: guess.label,
                confidence,
            });
        }

        Ok(Document {
            text,
            date,
            url,
            language: guess.label,
            language_score: round_to(confidence, 3),
            warc_id,
            scores: Default::default(),
            group_idx,
            warc_file: source.to_string(),
            record_idx,
            repetitions: None,
            long_words: None,
        })
    }
}

/// Streams one archive source through a [`RecordClassifier`]
pub struct ArchiveStreamProcessor {
    fetcher: Arc<dyn ArchiveFetcher>,
    classifier: Arc<RecordClassifier>,
}

impl ArchiveStreamProcessor {
    pub fn new(fetcher: Arc<dyn ArchiveFetcher>, classifier: Arc<RecordClassifier>) -> Self {
        Self {
            fetcher,
            classifier,
        }
    }

    /// Process `source`, handing every accepted document to `emit`.
    ///
    /// Records covered by `progress` are skipped without classification. If
    /// `emit` returns false the consumer is gone and processing stops with a
    /// failed report. Stream errors end the source with a failed report
    /// carrying the partial counts.
    pub fn process(
        &self,
        source: &str,
        progress: WarcRecordProgress,
        group_idx: usize,
        emit: &mut dyn FnMut(Document) -> bool,
    ) -> ArchiveCompletionReport {
        if progress.done {
            return ArchiveCompletionReport::already_done(source);
        }

        let mut report = ArchiveCompletionReport {
            source: source.to_string(),
            success: false,
            total_records: 0,
            processed_records: 0,
            failed_records: 0,
        };

        let stream = match self
            .fetcher
            .open(source)
            .map_err(|e| e.to_string())
            .and_then(|reader| open_stream(reader).map_err(|e| e.to_string()))
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!(source, "Failed to open archive: {}", e);
                return report;
            }
        };

        for (record_idx, record) in (0u64..).zip(stream) {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(source, record_idx, "Archive stream failed: {}", e);
                    return report;
                }
            };
            report.total_records += 1;

            if progress.covers(record_idx) {
                report.processed_records += 1;
                continue;
            }

            match self
                .classifier
                .classify(&record, group_idx, source, record_idx)
            {
                Ok(document) => {
                    report.processed_records += 1;
                    if !emit(document) {
                        warn!(source, "Result consumer went away, abandoning archive");
                        return report;
                    }
                }
                Err(rejection) => {
                    debug!(source, record_idx, "Rejected record: {}", rejection);
                    report.failed_records += 1;
                }
            }
        }

        report.success = true;
        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::language::LanguageGuess;
    use crate::models::ModelError;
    use crate::pipeline::fetcher::FetchError;
    use crate::warc::tests::record_bytes;
    use std::io::{Cursor, Read};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Detector driven by markers in the text: `lang=xx conf=0.nn`
    pub(crate) struct MarkerDetector;

    impl LanguageDetector for MarkerDetector {
        fn predict(&self, text: &str) -> Result<LanguageGuess, ModelError> {
            let field = |key: &str| {
                text.split_whitespace()
                    .find_map(|w| w.strip_prefix(key))
                    .map(str::to_string)
            };
            let label = field("lang=").unwrap_or_else(|| "en".to_string());
            let confidence = field("conf=")
                .and_then(|c| c.parse().ok())
                .unwrap_or(0.95);
            Ok(LanguageGuess { label, confidence })
        }

        fn languages(&self) -> Result<Vec<String>, ModelError> {
            Ok(vec!["en".to_string(), "fr".to_string(), "hr".to_string()])
        }
    }

    /// A page whose body text is `filler` repeated to `len` chars plus markers
    pub(crate) fn page(markers: &str, len: usize) -> Vec<u8> {
        let body: String = "lorem ipsum ".chars().cycle().take(len).collect();
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html><body><p>{} {}</p></body></html>",
            markers, body
        )
        .into_bytes()
    }

    struct MemoryFetcher {
        data: Vec<u8>,
        opens: AtomicUsize,
    }

    impl ArchiveFetcher for MemoryFetcher {
        fn open(&self, _source: &str) -> Result<Box<dyn Read + Send>, FetchError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Cursor::new(self.data.clone())))
        }
    }

    fn classifier(min_length: usize) -> RecordClassifier {
        RecordClassifier::new(
            Arc::new(MarkerDetector),
            ["en".to_string(), "hr".to_string()],
            min_length,
        )
    }

    fn response(content: &[u8]) -> WarcRecord {
        let bytes = record_bytes("response", "https://example.com/", content);
        open_stream(Cursor::new(bytes)).unwrap().next().unwrap().unwrap()
    }

    /// Counts predict calls, answers like [`MarkerDetector`]
    #[derive(Default)]
    struct CountingDetector {
        calls: AtomicUsize,
    }

    impl LanguageDetector for CountingDetector {
        fn predict(&self, text: &str) -> Result<LanguageGuess, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            MarkerDetector.predict(text)
        }

        fn languages(&self) -> Result<Vec<String>, ModelError> {
            MarkerDetector.languages()
        }
    }

    #[test]
    fn test_short_text_is_rejected_before_detection() {
        let detector = Arc::new(CountingDetector::default());
        let classifier = RecordClassifier::new(detector.clone(), ["en".to_string()], 500);

        let record = response(&page("lang=en", 380));
        match classifier.classify(&record, 0, "s", 0) {
            Err(Rejection::TooShort(len)) => assert!(len <= 500),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);

        let long = response(&page("lang=en", 600));
        assert!(classifier.classify(&long, 0, "s", 1).is_ok());
        assert_eq!(detector.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_boosted_language_confidence_is_doubled() {
        let record = response(&page("lang=hr conf=0.5", 600));
        let doc = classifier(500).classify(&record, 2, "s", 9).unwrap();
        assert_eq!(doc.language, "hr");
        assert_eq!(doc.language_score, 1.0);
        assert_eq!(doc.group_idx, 2);
        assert_eq!(doc.record_idx, 9);
        assert_eq!(doc.url, "https://example.com/");
    }

    #[test]
    fn test_low_confidence_and_unknown_language_are_rejected() {
        let low = response(&page("lang=en conf=0.5", 600));
        assert!(matches!(
            classifier(500).classify(&low, 0, "s", 0),
            Err(Rejection::LowConfidence { .. })
        ));
        let unknown = response(&page("lang=fr conf=0.99", 600));
        assert_eq!(
            classifier(500).classify(&unknown, 0, "s", 0),
            Err(Rejection::UnsupportedLanguage("fr".to_string()))
        );
    }

    #[test]
    fn test_non_response_record_is_rejected() {
        let bytes = record_bytes("request", "https://example.com/", b"GET / HTTP/1.1\r\n\r\n");
        let record = open_stream(Cursor::new(bytes)).unwrap().next().unwrap().unwrap();
        assert_eq!(
            classifier(0).classify(&record, 0, "s", 0),
            Err(Rejection::NotResponse)
        );
    }

    fn archive() -> Vec<u8> {
        let mut data = record_bytes("warcinfo", "info", b"software: test");
        for i in 0..4 {
            data.extend(record_bytes(
                "response",
                &format!("https://example.com/{}", i),
                &page("lang=en", 600),
            ));
        }
        data
    }

    fn processor(data: Vec<u8>) -> (ArchiveStreamProcessor, Arc<MemoryFetcher>) {
        let fetcher = Arc::new(MemoryFetcher {
            data,
            opens: AtomicUsize::new(0),
        });
        let processor = ArchiveStreamProcessor::new(fetcher.clone(), Arc::new(classifier(500)));
        (processor, fetcher)
    }

    #[test]
    fn test_done_source_is_not_fetched() {
        let (processor, fetcher) = processor(archive());
        let progress = WarcRecordProgress {
            last_record_seen: 3,
            done: true,
        };
        let report = processor.process("s", progress, 0, &mut |_| true);
        assert_eq!(report, ArchiveCompletionReport::already_done("s"));
        assert_eq!(fetcher.opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_full_pass_counts_records() {
        let (processor, _) = processor(archive());
        let mut docs = Vec::new();
        let report = processor.process("s", WarcRecordProgress::default(), 0, &mut |d| {
            docs.push(d);
            true
        });
        assert!(report.success);
        assert_eq!(report.total_records, 5);
        assert_eq!(report.processed_records, 4);
        assert_eq!(report.failed_records, 1);
        let indices: Vec<u64> = docs.iter().map(|d| d.record_idx).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_resume_skips_seen_records() {
        let (processor, _) = processor(archive());
        let progress = WarcRecordProgress {
            last_record_seen: 2,
            done: false,
        };
        let mut docs = Vec::new();
        let report = processor.process("s", progress, 0, &mut |d| {
            docs.push(d.record_idx);
            true
        });
        assert!(report.success);
        assert_eq!(docs, vec![3, 4]);
        // Skipped records count as processed
        assert_eq!(report.processed_records, 5);
        assert_eq!(report.failed_records, 0);
    }

    #[test]
    fn test_truncated_stream_reports_failure_with_partial_counts() {
        let mut data = archive();
        data.truncate(data.len() - 100);
        let (processor, _) = processor(data);
        let mut docs = 0;
        let report = processor.process("s", WarcRecordProgress::default(), 0, &mut |_| {
            docs += 1;
            true
        });
        assert!(!report.success);
        assert_eq!(docs, 3);
        assert_eq!(report.total_records, 4);
    }
}

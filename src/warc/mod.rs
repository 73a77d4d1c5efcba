//! Streaming WARC record reader
//!
//! Reads WARC/1.0 and WARC/1.1 records from any byte stream. Archives are
//! usually stored as concatenated gzip members (one per record); the gzip
//! layer is detected from the magic bytes and decoded transparently.

use flate2::read::MultiGzDecoder;
use std::io::{self, BufRead, BufReader, Read};
use thiserror::Error;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors raised while reading a WARC stream
#[derive(Error, Debug)]
pub enum WarcError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid record version line: {0}")]
    InvalidVersion(String),

    #[error("Malformed header line: {0}")]
    MalformedHeader(String),

    #[error("Record is missing Content-Length")]
    MissingContentLength,

    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("Record body truncated: expected {expected} bytes, got {actual}")]
    TruncatedBody { expected: u64, actual: u64 },
}

/// One WARC record: named headers plus the raw content block
#[derive(Debug, Clone)]
pub struct WarcRecord {
    /// Version line, e.g. `WARC/1.0`
    pub version: String,
    headers: Vec<(String, String)>,
    /// Raw content block (`Content-Length` bytes)
    pub body: Vec<u8>,
}

impl WarcRecord {
    /// Look up a header value, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `WARC-Type` header value
    pub fn record_type(&self) -> Option<&str> {
        self.header("WARC-Type")
    }

    /// All headers in stream order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Body of the embedded HTTP message (everything after its header block).
    ///
    /// Returns an empty slice when the content block holds no header terminator.
    pub fn http_payload(&self) -> &[u8] {
        let body = &self.body;
        for i in 0..body.len() {
            if body[i..].starts_with(b"\r\n\r\n") {
                return &body[i + 4..];
            }
            if body[i..].starts_with(b"\n\n") {
                return &body[i + 2..];
            }
        }
        &[]
    }
}

/// Iterator over the records of a WARC stream.
///
/// Iteration stops after the first error.
pub struct WarcReader<R: BufRead> {
    inner: R,
    finished: bool,
    line: String,
}

impl<R: BufRead> WarcReader<R> {
    /// Wrap an already-decoded stream
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            finished: false,
            line: String::new(),
        }
    }

    /// Read one line, stripping the line terminator. `None` at end of stream.
    fn read_line(&mut self) -> Result<Option<&str>, WarcError> {
        self.line.clear();
        let n = self.inner.read_line(&mut self.line)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.line.trim_end_matches(&['\r', '\n'][..])))
    }

    fn read_record(&mut self) -> Result<Option<WarcRecord>, WarcError> {
        // Skip the blank lines separating records
        let version = loop {
            match self.read_line()? {
                None => return Ok(None),
                Some("") => continue,
                Some(line) => break line.to_string(),
            }
        };
        if !version.starts_with("WARC/") {
            return Err(WarcError::InvalidVersion(version));
        }

        let mut headers: Vec<(String, String)> = Vec::new();
        loop {
            let line = match self.read_line()? {
                None | Some("") => break,
                Some(line) => line,
            };
            if line.starts_with(&[' ', '\t'][..]) {
                // Folded continuation of the previous header
                match headers.last_mut() {
                    Some((_, value)) => {
                        value.push(' ');
                        value.push_str(line.trim());
                    }
                    None => return Err(WarcError::MalformedHeader(line.to_string())),
                }
                continue;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| WarcError::MalformedHeader(line.to_string()))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let length_value = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
            .map(|(_, v)| v.clone())
            .ok_or(WarcError::MissingContentLength)?;
        let expected: u64 = length_value
            .parse()
            .map_err(|_| WarcError::InvalidContentLength(length_value.clone()))?;

        let mut body = Vec::new();
        let actual = (&mut self.inner).take(expected).read_to_end(&mut body)? as u64;
        if actual != expected {
            return Err(WarcError::TruncatedBody { expected, actual });
        }

        Ok(Some(WarcRecord {
            version,
            headers,
            body,
        }))
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = Result<WarcRecord, WarcError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Boxed stream type produced by [`open_stream`]
pub type WarcStream = WarcReader<Box<dyn BufRead + Send>>;

/// Open a WARC stream, decoding gzip when the magic bytes are present
pub fn open_stream<R: Read + Send + 'static>(reader: R) -> Result<WarcStream, WarcError> {
    let mut buffered = BufReader::new(reader);
    let is_gzip = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);

    let inner: Box<dyn BufRead + Send> = if is_gzip {
        Box::new(BufReader::new(MultiGzDecoder::new(buffered)))
    } else {
        Box::new(buffered)
    };
    Ok(WarcReader::new(inner))
}

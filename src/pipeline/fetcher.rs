//! Archive source fetching with bounded retry

use reqwest::blocking::Client;
use std::fs::File;
use std::io::Read;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::FetchConfig;

/// Errors that can occur while opening an archive source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

/// Opens archive sources as byte streams
pub trait ArchiveFetcher: Send + Sync {
    fn open(&self, source: &str) -> Result<Box<dyn Read + Send>, FetchError>;
}

/// Fetches `http(s)` sources with retry; anything else is read from the local filesystem
pub struct SourceFetcher {
    client: Client,
    attempts: u32,
    retry_delay: Duration,
}

impl SourceFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        // For the blocking client the timeout bounds each read, not the whole body
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .build()?;

        Ok(Self {
            client,
            attempts: config.attempts.max(1),
            retry_delay: config.retry_delay(),
        })
    }

    /// The underlying HTTP client, shared with the catalog
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        let mut attempt = 1;
        loop {
            let result = self
                .client
                .get(url)
                .send()
                .and_then(|response| response.error_for_status());
            match result {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.attempts => {
                    warn!(
                        "Fetching {} failed (attempt {}/{}): {}",
                        url, attempt, self.attempts, e
                    );
                    thread::sleep(self.retry_delay);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FetchError::Exhausted {
                        attempts: self.attempts,
                        last: Box::new(e.into()),
                    })
                }
            }
        }
    }
}

impl ArchiveFetcher for SourceFetcher {
    fn open(&self, source: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            Ok(Box::new(self.get(source)?))
        } else {
            let path = source.strip_prefix("file://").unwrap_or(source);
            Ok(Box::new(File::open(path)?))
        }
    }
}

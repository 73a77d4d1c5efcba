//! Archive catalogs
//!
//! A catalog lists every archive source of a crawl and partitions them into
//! numbered groups. Common Crawl publishes the listing as `warc.paths.gz`;
//! the group index is the number after the dot in the segment directory:
//!
//! ```text
//! crawl-data/CC-MAIN-2024-51/segments/1733066035857.0/warc/CC-MAIN-...-00000.warc.gz
//!                                                   ^ group 0
//! ```

mod selection;

pub use selection::GroupSelection;

use flate2::read::MultiGzDecoder;
use reqwest::blocking::Client;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::types::SourceId;

/// Errors resolving a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot derive a group index from path: {0}")]
    InvalidPath(String),

    #[error("Group {expected} not found in the corpus, found {found} instead; the corpus might be incomplete")]
    GroupGap { expected: usize, found: usize },

    #[error("Catalog lists no archives")]
    Empty,

    #[error("Invalid group selection '{0}'. Examples: `ALL`, `28`, `10-50`, or `1,8,13`")]
    InvalidSelection(String),

    #[error("Group {group} does not exist, the corpus has {available} groups")]
    GroupOutOfRange { group: usize, available: usize },
}

/// Ordered groups of archive sources; index `i` holds group `i`
pub type Groups = Vec<Vec<SourceId>>;

/// Lists the archive sources of a crawl, partitioned into groups
pub trait ArchiveCatalog {
    fn resolve(&self, corpus: &str) -> Result<Groups, CatalogError>;
}

/// Group index of a catalog path
pub fn group_index(path: &str) -> Result<usize, CatalogError> {
    path.split('/')
        .nth(3)
        .and_then(|segment| segment.split('.').nth(1))
        .and_then(|idx| idx.parse().ok())
        .ok_or_else(|| CatalogError::InvalidPath(path.to_string()))
}

/// Partition catalog paths into groups.
///
/// Paths are sorted within each group and turned into sources by prefixing
/// `base_url` (unless it is empty). Group indices must be contiguous from 0.
pub fn build_groups<I, S>(paths: I, base_url: &str) -> Result<Groups, CatalogError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut by_group: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for path in paths {
        let path = path.as_ref().trim();
        if path.is_empty() {
            continue;
        }
        by_group
            .entry(group_index(path)?)
            .or_default()
            .push(path.to_string());
    }
    if by_group.is_empty() {
        return Err(CatalogError::Empty);
    }

    let base = base_url.trim_end_matches('/');
    let mut groups = Vec::with_capacity(by_group.len());
    for (expected, (found, mut paths)) in by_group.into_iter().enumerate() {
        if found != expected {
            return Err(CatalogError::GroupGap { expected, found });
        }
        paths.sort();
        groups.push(
            paths
                .into_iter()
                .map(|p| if base.is_empty() { p } else { format!("{}/{}", base, p) })
                .collect(),
        );
    }
    Ok(groups)
}

/// Read a listing that may or may not be gzip compressed
fn decode_listing(bytes: &[u8]) -> Result<String, CatalogError> {
    let mut text = String::new();
    if bytes.starts_with(&[0x1f, 0x8b]) {
        MultiGzDecoder::new(bytes).read_to_string(&mut text)?;
    } else {
        text = String::from_utf8_lossy(bytes).into_owned();
    }
    Ok(text)
}

/// Common Crawl catalog, downloaded from `<base>/crawl-data/<corpus>/warc.paths.gz`
pub struct CommonCrawlCatalog {
    client: Client,
    base_url: String,
}

impl CommonCrawlCatalog {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn listing_url(&self, corpus: &str) -> String {
        format!(
            "{}/crawl-data/{}/warc.paths.gz",
            self.base_url.trim_end_matches('/'),
            corpus
        )
    }
}

impl ArchiveCatalog for CommonCrawlCatalog {
    fn resolve(&self, corpus: &str) -> Result<Groups, CatalogError> {
        let url = self.listing_url(corpus);
        info!("Fetching archive listing from {}", url);
        let bytes = self.client.get(&url).send()?.error_for_status()?.bytes()?;
        let listing = decode_listing(&bytes)?;
        let groups = build_groups(listing.lines(), &self.base_url)?;
        info!("Corpus {} has {} groups", corpus, groups.len());
        Ok(groups)
    }
}

/// Catalog read from a local listing file (plain or gzip) in `warc.paths` format
pub struct PathsFileCatalog {
    path: PathBuf,
    base_url: String,
}

impl PathsFileCatalog {
    pub fn new(path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            base_url: base_url.into(),
        }
    }
}

impl ArchiveCatalog for PathsFileCatalog {
    fn resolve(&self, _corpus: &str) -> Result<Groups, CatalogError> {
        let bytes = std::fs::read(&self.path)?;
        let listing = decode_listing(&bytes)?;
        build_groups(listing.lines(), &self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    fn path(group: usize, file: &str) -> String {
        format!(
            "crawl-data/CC-MAIN-2024-51/segments/1733066035857.{}/warc/{}.warc.gz",
            group, file
        )
    }

    #[test]
    fn test_group_index() {
        assert_eq!(group_index(&path(27, "a")).unwrap(), 27);
        assert!(matches!(
            group_index("no/segments/here"),
            Err(CatalogError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_groups_are_sorted_and_prefixed() {
        let paths = vec![path(1, "b"), path(0, "z"), path(1, "a"), path(0, "y")];
        let groups = build_groups(&paths, "https://data.commoncrawl.org/").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0],
            vec![
                format!("https://data.commoncrawl.org/{}", path(0, "y")),
                format!("https://data.commoncrawl.org/{}", path(0, "z")),
            ]
        );
        assert!(groups[1][0].ends_with("/a.warc.gz"));
    }

    #[test]
    fn test_group_gap_is_fatal() {
        let paths = vec![path(0, "a"), path(2, "b")];
        assert!(matches!(
            build_groups(&paths, ""),
            Err(CatalogError::GroupGap { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_missing_group_zero_is_fatal() {
        let paths = vec![path(1, "a")];
        assert!(matches!(
            build_groups(&paths, ""),
            Err(CatalogError::GroupGap { expected: 0, found: 1 })
        ));
    }

    #[test]
    fn test_empty_listing() {
        assert!(matches!(
            build_groups(Vec::<String>::new(), ""),
            Err(CatalogError::Empty)
        ));
    }

    #[test]
    fn test_paths_file_catalog_reads_gzip() {
        let dir = TempDir::new().unwrap();
        let listing = format!("{}\n{}\n", path(0, "a"), path(0, "b"));
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(listing.as_bytes()).unwrap();
        let file = dir.path().join("warc.paths.gz");
        std::fs::write(&file, enc.finish().unwrap()).unwrap();

        let catalog = PathsFileCatalog::new(&file, "");
        let groups = catalog.resolve("ignored").unwrap();
        assert_eq!(groups, vec![vec![path(0, "a"), path(0, "b")]]);
    }

    #[test]
    fn test_listing_url() {
        let catalog = CommonCrawlCatalog::new(Client::new(), "https://data.commoncrawl.org");
        assert_eq!(
            catalog.listing_url("CC-MAIN-2024-51"),
            "https://data.commoncrawl.org/crawl-data/CC-MAIN-2024-51/warc.paths.gz"
        );
    }
}

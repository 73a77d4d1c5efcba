//! Local cache for model files
//!
//! References take one of three forms:
//! - a local path, used as is
//! - an `http(s)://` URL, downloaded once into the cache directory
//! - `hf://<owner>/<repo>/<file>`, resolved to the Hugging Face download URL

use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

use super::ModelError;

const HUB_SCHEME: &str = "hf://";
const HUB_BASE_URL: &str = "https://huggingface.co";

/// Where a model reference points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelLocation {
    Local(PathBuf),
    Remote(Url),
}

impl ModelLocation {
    /// Classify a reference string
    pub fn parse(reference: &str) -> Result<Self, ModelError> {
        if let Some(rest) = reference.strip_prefix(HUB_SCHEME) {
            let parts: Vec<&str> = rest.trim_matches('/').splitn(3, '/').collect();
            if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
                return Err(ModelError::InvalidReference(format!(
                    "expected hf://<owner>/<repo>/<file>, got {}",
                    reference
                )));
            }
            let url = format!(
                "{}/{}/{}/resolve/main/{}",
                HUB_BASE_URL, parts[0], parts[1], parts[2]
            );
            return Self::remote(&url);
        }
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Self::remote(reference);
        }
        Ok(Self::Local(PathBuf::from(reference)))
    }

    fn remote(url: &str) -> Result<Self, ModelError> {
        Url::parse(url)
            .map(Self::Remote)
            .map_err(|e| ModelError::InvalidReference(format!("{}: {}", url, e)))
    }
}

/// Resolves model references to local files
pub struct ModelStore {
    cache_dir: PathBuf,
    client: Client,
}

impl ModelStore {
    /// Create a store caching into `cache_dir`, or the platform cache directory
    pub fn new(cache_dir: Option<PathBuf>, user_agent: &str) -> Result<Self, ModelError> {
        let cache_dir = cache_dir.unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "warcsift")
                .map(|d| d.cache_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".warcsift-cache"))
        });

        // Models can be large: no overall timeout, only a connect timeout
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(30))
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self { cache_dir, client })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Return a local path for `reference`, downloading it first if remote.
    ///
    /// Local paths are returned without checking that they exist; loaders
    /// report missing files themselves.
    pub fn ensure_local(&self, reference: &str) -> Result<PathBuf, ModelError> {
        match ModelLocation::parse(reference)? {
            ModelLocation::Local(path) => Ok(path),
            ModelLocation::Remote(url) => {
                let local = self.cache_path(&url)?;
                if local.exists() {
                    return Ok(local);
                }
                self.download(&url, &local)?;
                Ok(local)
            }
        }
    }

    /// Cache location for a URL: `<cache>/<host>/<path segments>`
    fn cache_path(&self, url: &Url) -> Result<PathBuf, ModelError> {
        let host = url
            .host_str()
            .ok_or_else(|| ModelError::InvalidReference(url.to_string()))?;
        let mut path = self.cache_dir.join(host);
        let segments = url
            .path_segments()
            .ok_or_else(|| ModelError::InvalidReference(url.to_string()))?;
        let mut has_file = false;
        for segment in segments.filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(ModelError::InvalidReference(url.to_string()));
            }
            path.push(segment);
            has_file = true;
        }
        if !has_file {
            return Err(ModelError::InvalidReference(format!(
                "{} does not name a file",
                url
            )));
        }
        Ok(path)
    }

    /// Stream a model to disk through a `.tmp` file, then rename into place
    fn download(&self, url: &Url, destination: &Path) -> Result<(), ModelError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        info!(url = %url, path = %destination.display(), "Downloading model");

        let mut response = self.client.get(url.clone()).send()?.error_for_status()?;
        let tmp_path = destination.with_extension("tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        let bytes = response.copy_to(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&tmp_path, destination)?;
        info!(bytes, path = %destination.display(), "Model downloaded");
        Ok(())
    }
}

//! Reference table sources: local files or HTTP(S) URLs.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use super::DataLoadError;
use crate::config::LoaderConfig;

/// Where a reference table is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceSource {
    Path(PathBuf),
    Url(String),
}

impl ReferenceSource {
    /// Classify a user-supplied location. Anything starting with `http://` or
    /// `https://` is a URL, everything else a filesystem path.
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }

    /// Read the whole table as text.
    pub async fn fetch(&self, loader: &LoaderConfig) -> Result<String, DataLoadError> {
        match self {
            Self::Path(path) => {
                debug!(path = %path.display(), "Reading reference table");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| DataLoadError::Io {
                        origin: self.to_string(),
                        error: e,
                    })
            }
            Self::Url(url) => {
                debug!(url = %url, "Fetching reference table");
                let http = reqwest::Client::builder()
                    .timeout(loader.http_timeout())
                    .build()
                    .map_err(|e| self.http_error(e))?;
                let resp = http.get(url).send().await.map_err(|e| self.http_error(e))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(DataLoadError::HttpStatus {
                        origin: self.to_string(),
                        status: status.as_u16(),
                    });
                }
                resp.text().await.map_err(|e| self.http_error(e))
            }
        }
    }

    fn http_error(&self, e: reqwest::Error) -> DataLoadError {
        DataLoadError::Http {
            origin: self.to_string(),
            error: e,
        }
    }
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
        }
    }
}

impl From<&str> for ReferenceSource {
    fn from(location: &str) -> Self {
        Self::parse(location)
    }
}

impl From<PathBuf> for ReferenceSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&std::path::Path> for ReferenceSource {
    fn from(path: &std::path::Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

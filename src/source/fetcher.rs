//! Fetching listing data from local files or HTTP endpoints.
//!
//! This module reads the site directory, listings and search filter from
//! wherever they live and parses them as JSON. It performs no retries.

use crate::models::{Listings, SiteDirectory};
use crate::projection::{RemoteSearchFilter, SearchFilter};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Endpoint path of the site directory on a listings server.
pub const SITES_PATH: &str = "/v1/sites";
/// Endpoint path of the listings on a listings server.
pub const LISTINGS_PATH: &str = "/v1/listings";
/// Endpoint path of the saved search filter on a listings server.
pub const SEARCH_FILTER_PATH: &str = "/v1/searchFilter";

/// Where a JSON document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A local JSON file.
    File(PathBuf),
    /// An HTTP(S) URL.
    Remote(String),
}

impl Source {
    /// Parses a source; `http://` and `https://` values are remote, anything else is a path.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Source::Remote(value.to_string())
        } else {
            Source::File(PathBuf::from(value))
        }
    }

    /// An endpoint below a server base URL.
    pub fn endpoint(base_url: &str, path: &str) -> Self {
        Source::Remote(format!("{}{}", base_url.trim_end_matches('/'), path))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Errors raised while acquiring a document.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to parse JSON from {origin}: {source}")]
    Parse {
        origin: String,
        source: serde_json::Error,
    },
}

/// Basic-auth credentials for a protected listings server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: Option<String>,
}

/// Options for the fetcher.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Credentials sent with every HTTP request.
    pub auth: Option<BasicAuth>,
    /// Honor the system proxy settings.
    pub use_proxy: bool,
    /// Show a spinner during HTTP requests.
    pub show_progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            auth: None,
            use_proxy: true,
            show_progress: true,
        }
    }
}

/// Reads JSON documents from files and HTTP endpoints.
pub struct Fetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl Fetcher {
    /// Create a new fetcher.
    pub fn new(options: FetchOptions) -> Result<Self, SourceError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(options.timeout_seconds));
        if !options.use_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(SourceError::Client)?;

        Ok(Self { client, options })
    }

    /// Fetch the raw text of a document.
    pub async fn fetch_text(&self, source: &Source) -> Result<String, SourceError> {
        match source {
            Source::File(path) => {
                debug!("Reading {}", path.display());
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| SourceError::Io {
                        path: path.clone(),
                        source,
                    })
            }
            Source::Remote(url) => {
                let spinner = self.spinner(url);
                let result = self.get(url).await;
                if let Some(pb) = spinner {
                    pb.finish_and_clear();
                }
                result
            }
        }
    }

    /// Fetch a document and parse it as JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self, source: &Source) -> Result<T, SourceError> {
        let text = self.fetch_text(source).await?;

        serde_json::from_str(&text).map_err(|e| SourceError::Parse {
            origin: source.to_string(),
            source: e,
        })
    }

    /// Fetch the site directory.
    pub async fn fetch_directory(&self, source: &Source) -> Result<SiteDirectory, SourceError> {
        let directory: SiteDirectory = self.fetch_json(source).await?;
        info!("Loaded {} sites from {}", directory.len(), source);
        Ok(directory)
    }

    /// Fetch the listings.
    pub async fn fetch_listings(&self, source: &Source) -> Result<Listings, SourceError> {
        let listings: Listings = self.fetch_json(source).await?;
        info!("Loaded {} listings from {}", listings.len(), source);
        Ok(listings)
    }

    /// Fetch a saved search filter.
    pub async fn fetch_search_filter(&self, source: &Source) -> Result<SearchFilter, SourceError> {
        let remote: RemoteSearchFilter = self.fetch_json(source).await?;
        debug!("Loaded search filter from {}: {:?}", source, remote);
        Ok(remote.into())
    }

    async fn get(&self, url: &str) -> Result<String, SourceError> {
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(ref auth) = self.options.auth {
            request = request.basic_auth(&auth.user, auth.password.as_ref());
        }

        let response = request.send().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| SourceError::Http {
            url: url.to_string(),
            source,
        })
    }

    fn spinner(&self, url: &str) -> Option<ProgressBar> {
        if !self.options.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Fetching {}", url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

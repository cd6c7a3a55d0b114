//! Data acquisition.
//!
//! Directory, listings and search filter are JSON documents read from a
//! local file or an HTTP endpoint.

pub mod fetcher;

pub use fetcher::{
    BasicAuth, FetchOptions, Fetcher, Source, SourceError, LISTINGS_PATH, SEARCH_FILTER_PATH,
    SITES_PATH,
};

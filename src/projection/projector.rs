//! Listing projection.
//!
//! Joins listings against the site directory by URL prefix and turns
//! them into display-ready records. Pure: no I/O, no shared state.

use crate::models::{
    DisplayRecord, ListingEntry, ListingRecord, Listings, NameTag, SiteDirectory, SkippedListing,
};
use thiserror::Error;
use tracing::debug;

/// Marker separating a site's base URL from the listing path.
pub const RENTAL_MARKER: &str = "/rental";

/// Errors scoped to a single listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("invalid listing '{address}': {reason}")]
    InvalidRecord { address: String, reason: String },
}

impl From<&ProjectionError> for SkippedListing {
    fn from(err: &ProjectionError) -> Self {
        match err {
            ProjectionError::InvalidRecord { address, reason } => SkippedListing {
                address: address.clone(),
                reason: reason.clone(),
            },
        }
    }
}

/// What to do when a listing cannot be projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidRecordPolicy {
    /// Leave the listing out and keep going.
    #[default]
    Skip,
    /// Fail the whole pass on the first invalid listing.
    Abort,
}

/// Options for a projection pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectOptions {
    /// Order records by descending timestamp instead of document order.
    pub sort_by_timestamp: bool,
    pub on_invalid: InvalidRecordPolicy,
}

/// Result of a projection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub records: Vec<DisplayRecord>,
    /// Listings left out under [`InvalidRecordPolicy::Skip`].
    pub skipped: Vec<ProjectionError>,
}

/// The site key of a reference URL: everything before the first `/rental`.
pub fn site_key(url: &str) -> &str {
    url.split_once(RENTAL_MARKER)
        .map(|(base, _)| base)
        .unwrap_or(url)
}

/// Resolves each reference URL to a name tag, keeping order.
pub fn resolve_name_tags(directory: &SiteDirectory, refs: &[String]) -> Vec<NameTag> {
    refs.iter()
        .map(|url| NameTag {
            url: url.clone(),
            name: directory.lookup(site_key(url)).map(String::from),
        })
        .collect()
}

/// Projects a single listing.
pub fn project_listing(
    directory: &SiteDirectory,
    address: &str,
    record: &ListingRecord,
) -> Result<DisplayRecord, ProjectionError> {
    let refs = record
        .refs
        .normalize()
        .map_err(|reason| ProjectionError::InvalidRecord {
            address: address.to_string(),
            reason,
        })?;

    let name_tags = resolve_name_tags(directory, &refs);

    Ok(DisplayRecord {
        address: address.to_string(),
        price: record.price,
        beds: record.beds,
        baths: record.baths,
        timestamp: record.timestamp,
        name_tags,
        date: record.date.clone(),
        notes: record.notes.clone(),
        is_favorite: record.is_favorite,
        is_dismissed: record.is_dismissed,
    })
}

/// Projects all listings into display records.
///
/// With `sort_by_timestamp`, records are ordered newest first; listings
/// without a timestamp go last and ties keep document order.
pub fn project(
    directory: &SiteDirectory,
    listings: &Listings,
    options: ProjectOptions,
) -> Result<Projection, ProjectionError> {
    let mut entries: Vec<(&String, &ListingEntry)> = listings.iter().collect();

    if options.sort_by_timestamp {
        // `None < Some(_)`, so reversing the comparison puts missing timestamps last.
        entries.sort_by(|(_, a), (_, b)| b.timestamp().cmp(&a.timestamp()));
    }

    let mut projection = Projection {
        records: Vec::with_capacity(entries.len()),
        skipped: Vec::new(),
    };

    for (address, entry) in entries {
        let projected = match entry {
            ListingEntry::Record(record) => project_listing(directory, address, record),
            ListingEntry::Unreadable { reason } => Err(ProjectionError::InvalidRecord {
                address: address.clone(),
                reason: reason.clone(),
            }),
        };
        match projected {
            Ok(display) => projection.records.push(display),
            Err(e) => match options.on_invalid {
                InvalidRecordPolicy::Abort => return Err(e),
                InvalidRecordPolicy::Skip => {
                    debug!("Skipping listing: {}", e);
                    projection.skipped.push(e);
                }
            },
        }
    }

    debug!(
        "Projected {} listings ({} skipped)",
        projection.records.len(),
        projection.skipped.len()
    );

    Ok(projection)
}

//! Data models for listings and the site directory.
//!
//! Both inputs are normalized here, at the deserialization boundary:
//! the site directory accepts the object and the broker-array shapes,
//! and a listing's `refs` may arrive joined or as a list.

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Mapping from a site base URL (or opaque site key) to its display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SiteDirectory {
    sites: HashMap<String, String>,
}

impl SiteDirectory {
    /// Looks up the display name for an exact site key.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.sites.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }
}

impl<K, V> FromIterator<(K, V)> for SiteDirectory
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            sites: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One element of the broker-array wire shape.
#[derive(Debug, Deserialize)]
struct BrokerEntry {
    url: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DirectoryWire {
    Map(HashMap<String, String>),
    List(Vec<BrokerEntry>),
}

impl<'de> Deserialize<'de> for SiteDirectory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sites = match DirectoryWire::deserialize(deserializer)? {
            DirectoryWire::Map(map) => map,
            // Later duplicates replace earlier ones.
            DirectoryWire::List(entries) => entries.into_iter().map(|b| (b.url, b.name)).collect(),
        };

        Ok(Self { sites })
    }
}

/// Raw `refs` value of a listing, as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Refs {
    /// Comma-joined reference URLs.
    Joined(String),
    /// Reference URLs in order.
    List(Vec<String>),
    /// Anything else, including a missing field.
    Malformed(Value),
}

impl Default for Refs {
    fn default() -> Self {
        Refs::Malformed(Value::Null)
    }
}

impl Refs {
    /// Normalizes the reference URLs into an ordered list.
    ///
    /// Joined strings are split on `,`; segments are trimmed and empty
    /// segments dropped. Lists are returned as-is.
    pub fn normalize(&self) -> Result<Vec<String>, String> {
        match self {
            Refs::Joined(joined) => Ok(joined
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()),
            Refs::List(urls) => Ok(urls.clone()),
            Refs::Malformed(Value::Null) => Err("refs is missing or null".to_string()),
            Refs::Malformed(other) => Err(format!(
                "refs must be a string or a list of strings, got {}",
                json_kind(other)
            )),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list with non-string entries",
        Value::Object(_) => "an object",
    }
}

/// A rental listing, keyed by address in [`Listings`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub beds: Option<f64>,
    #[serde(default)]
    pub baths: Option<f64>,
    /// Opaque sortable integer; its unit only matters for display.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub refs: Refs,
    /// Posting date as reported by the listing site.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_dismissed: bool,
}

/// One entry of a listings document.
///
/// An entry whose fields have the wrong types is kept as `Unreadable` so
/// that it fails on its own instead of failing the whole document.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingEntry {
    Record(ListingRecord),
    Unreadable { reason: String },
}

impl ListingEntry {
    /// Sort key; unreadable entries have none.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            ListingEntry::Record(record) => record.timestamp,
            ListingEntry::Unreadable { .. } => None,
        }
    }
}

impl From<ListingRecord> for ListingEntry {
    fn from(record: ListingRecord) -> Self {
        ListingEntry::Record(record)
    }
}

impl<'de> Deserialize<'de> for ListingEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match ListingRecord::deserialize(&value) {
            Ok(record) => ListingEntry::Record(record),
            Err(e) => ListingEntry::Unreadable {
                reason: e.to_string(),
            },
        })
    }
}

/// Listings by address, in document order.
pub type Listings = IndexMap<String, ListingEntry>;

/// A reference URL with its resolved site name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTag {
    pub url: String,
    /// `None` when the URL's site key is not in the directory.
    pub name: Option<String>,
}

impl NameTag {
    /// Text to show for this tag: the site name, or the URL itself.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// A display-ready listing produced by the projector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub address: String,
    pub price: Option<f64>,
    pub beds: Option<f64>,
    pub baths: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    pub name_tags: Vec<NameTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub is_dismissed: bool,
}

impl DisplayRecord {
    /// Number of tags whose site could not be resolved.
    pub fn unresolved_count(&self) -> usize {
        self.name_tags.iter().filter(|t| t.name.is_none()).count()
    }
}

/// A listing left out of the report, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedListing {
    pub address: String,
    pub reason: String,
}

/// Metadata about a rendered listing report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Page or document title.
    pub title: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Where the site directory came from.
    pub sites_source: String,
    /// Where the listings came from.
    pub listings_source: String,
    /// Number of listings received.
    pub total_listings: usize,
    /// Number of listings removed by the search filter.
    pub filtered_out: usize,
    /// Whether records are ordered newest first.
    pub sorted_by_timestamp: bool,
    /// Unit used to display timestamps.
    pub timestamp_unit: TimestampUnit,
}

/// The complete listing report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingReport {
    pub metadata: ReportMetadata,
    /// Records to display, in display order.
    pub records: Vec<DisplayRecord>,
    /// Listings that could not be projected.
    pub skipped: Vec<SkippedListing>,
}

impl ListingReport {
    /// Total number of name tags whose site could not be resolved.
    pub fn unresolved_tags(&self) -> usize {
        self.records.iter().map(DisplayRecord::unresolved_count).sum()
    }
}

/// Unit of listing timestamps, used when turning them into dates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
    /// Nanoseconds since the epoch (what the scraper writes)
    #[default]
    Nanoseconds,
    /// Milliseconds since the epoch
    Milliseconds,
    /// Seconds since the epoch
    Seconds,
}

impl TimestampUnit {
    /// Converts a raw timestamp into a UTC date, if it is in range.
    pub fn to_datetime(self, raw: i64) -> Option<DateTime<Utc>> {
        match self {
            TimestampUnit::Nanoseconds => Some(Utc.timestamp_nanos(raw)),
            TimestampUnit::Milliseconds => Utc.timestamp_millis_opt(raw).single(),
            TimestampUnit::Seconds => Utc.timestamp_opt(raw, 0).single(),
        }
    }

    /// Converts a date into a raw timestamp in this unit.
    pub fn from_datetime(self, date: DateTime<Utc>) -> i64 {
        match self {
            TimestampUnit::Nanoseconds => date.timestamp_nanos_opt().unwrap_or(i64::MAX),
            TimestampUnit::Milliseconds => date.timestamp_millis(),
            TimestampUnit::Seconds => date.timestamp(),
        }
    }
}

impl fmt::Display for TimestampUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampUnit::Nanoseconds => write!(f, "nanoseconds"),
            TimestampUnit::Milliseconds => write!(f, "milliseconds"),
            TimestampUnit::Seconds => write!(f, "seconds"),
        }
    }
}

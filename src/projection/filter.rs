//! Search filtering over projected listings.

use crate::models::DisplayRecord;
use serde::{Deserialize, Serialize};

/// Bounds a listing must satisfy to be shown. Unset bounds don't filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Minimum bedrooms (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds_min: Option<f64>,

    /// Maximum bedrooms (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds_max: Option<f64>,

    /// Maximum price (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,

    /// Earliest raw timestamp (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<i64>,

    /// Hide listings marked dismissed.
    #[serde(default)]
    pub hide_dismissed: bool,

    /// Show only listings marked favorite.
    #[serde(default)]
    pub favorites_only: bool,
}

/// Wire shape of a remote search filter, where `0` means "unset".
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSearchFilter {
    #[serde(default)]
    pub beds_min: i64,
    #[serde(default)]
    pub beds_max: i64,
    #[serde(default)]
    pub price_max: i64,
    #[serde(default)]
    pub date_min: i64,
}

fn nonzero(value: i64) -> Option<i64> {
    (value != 0).then_some(value)
}

impl From<RemoteSearchFilter> for SearchFilter {
    fn from(remote: RemoteSearchFilter) -> Self {
        Self {
            beds_min: nonzero(remote.beds_min).map(|v| v as f64),
            beds_max: nonzero(remote.beds_max).map(|v| v as f64),
            price_max: nonzero(remote.price_max).map(|v| v as f64),
            since: nonzero(remote.date_min),
            hide_dismissed: false,
            favorites_only: false,
        }
    }
}

impl SearchFilter {
    /// Whether any bound or flag is set.
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    /// Fills bounds that are unset here from `other`.
    pub fn or(self, other: SearchFilter) -> Self {
        Self {
            beds_min: self.beds_min.or(other.beds_min),
            beds_max: self.beds_max.or(other.beds_max),
            price_max: self.price_max.or(other.price_max),
            since: self.since.or(other.since),
            hide_dismissed: self.hide_dismissed || other.hide_dismissed,
            favorites_only: self.favorites_only || other.favorites_only,
        }
    }

    /// Whether a record passes every set bound.
    ///
    /// A record missing a field that a bound applies to does not pass.
    pub fn matches(&self, record: &DisplayRecord) -> bool {
        fn at_least<T: PartialOrd>(bound: Option<T>, value: Option<T>) -> bool {
            match bound {
                Some(min) => value.is_some_and(|v| v >= min),
                None => true,
            }
        }

        fn at_most<T: PartialOrd>(bound: Option<T>, value: Option<T>) -> bool {
            match bound {
                Some(max) => value.is_some_and(|v| v <= max),
                None => true,
            }
        }

        if self.hide_dismissed && record.is_dismissed {
            return false;
        }
        if self.favorites_only && !record.is_favorite {
            return false;
        }

        at_least(self.beds_min, record.beds)
            && at_most(self.beds_max, record.beds)
            && at_most(self.price_max, record.price)
            && at_least(self.since, record.timestamp)
    }

    /// Keeps the matching records, in order.
    pub fn apply(&self, records: Vec<DisplayRecord>) -> Vec<DisplayRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str, price: f64, beds: f64, timestamp: Option<i64>) -> DisplayRecord {
        DisplayRecord {
            address: address.to_string(),
            price: Some(price),
            beds: Some(beds),
            baths: Some(1.0),
            timestamp,
            name_tags: Vec::new(),
            date: None,
            notes: None,
            is_favorite: false,
            is_dismissed: false,
        }
    }

    fn addresses(records: &[DisplayRecord]) -> Vec<&str> {
        records.iter().map(|r| r.address.as_str()).collect()
    }

    #[test]
    fn test_default_filter_keeps_everything() {
        let filter = SearchFilter::default();
        assert!(!filter.is_active());

        let records = vec![record("a", 1.0, 1.0, None), record("b", 9e9, 9.0, Some(1))];
        assert_eq!(filter.apply(records).len(), 2);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let filter = SearchFilter {
            beds_min: Some(2.0),
            beds_max: Some(3.0),
            price_max: Some(3300.0),
            ..Default::default()
        };

        let records = vec![
            record("one bed", 1500.0, 1.0, None),
            record("two beds at max", 3300.0, 2.0, None),
            record("three beds", 2000.0, 3.0, None),
            record("four beds", 2000.0, 4.0, None),
            record("too pricey", 3300.5, 2.0, None),
        ];

        let kept = filter.apply(records);
        assert_eq!(addresses(&kept), vec!["two beds at max", "three beds"]);
    }

    #[test]
    fn test_since_excludes_missing_timestamps() {
        let filter = SearchFilter {
            since: Some(100),
            ..Default::default()
        };

        let records = vec![
            record("old", 1.0, 1.0, Some(99)),
            record("edge", 1.0, 1.0, Some(100)),
            record("unknown", 1.0, 1.0, None),
        ];

        assert_eq!(addresses(&filter.apply(records)), vec!["edge"]);
    }

    #[test]
    fn test_flags() {
        let mut dismissed = record("dismissed", 1.0, 1.0, None);
        dismissed.is_dismissed = true;
        let mut favorite = record("favorite", 1.0, 1.0, None);
        favorite.is_favorite = true;
        let plain = record("plain", 1.0, 1.0, None);
        let records = vec![dismissed, favorite, plain];

        let hide = SearchFilter {
            hide_dismissed: true,
            ..Default::default()
        };
        assert_eq!(
            addresses(&hide.apply(records.clone())),
            vec!["favorite", "plain"]
        );

        let favorites = SearchFilter {
            favorites_only: true,
            ..Default::default()
        };
        assert_eq!(addresses(&favorites.apply(records)), vec!["favorite"]);
    }

    #[test]
    fn test_remote_filter_zero_means_unset() {
        let remote: RemoteSearchFilter =
            serde_json::from_str(r#"{"bedsMin": 2, "bedsMax": 0, "priceMax": 3300, "dateMin": 0}"#)
                .unwrap();
        let filter = SearchFilter::from(remote);

        assert_eq!(filter.beds_min, Some(2.0));
        assert_eq!(filter.beds_max, None);
        assert_eq!(filter.price_max, Some(3300.0));
        assert_eq!(filter.since, None);
    }

    #[test]
    fn test_or_prefers_own_bounds() {
        let local = SearchFilter {
            price_max: Some(2000.0),
            ..Default::default()
        };
        let remote = SearchFilter {
            price_max: Some(3000.0),
            beds_min: Some(2.0),
            hide_dismissed: true,
            ..Default::default()
        };

        let merged = local.or(remote);
        assert_eq!(merged.price_max, Some(2000.0));
        assert_eq!(merged.beds_min, Some(2.0));
        assert!(merged.hide_dismissed);
    }
}

//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::TimestampUnit;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// rentwatch - rental listings, labelled by the sites that posted them
///
/// Fetches a site directory and a set of listings from local JSON files
/// or a listings server, resolves each listing's reference URLs to site
/// names, and renders the result as HTML, Markdown or JSON.
///
/// Examples:
///   rentwatch --sites sites.json --listings listings.json
///   rentwatch --base-url http://localhost:8083 --format json -o listings.json
///   rentwatch --base-url http://localhost:8083 --use-server-filter --hide-dismissed
///   rentwatch --listings listings.json --sites sites.json --beds-min 2 --price-max 3300
///   rentwatch --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Site directory source (JSON file path or http(s) URL)
    #[arg(short, long, value_name = "SOURCE", env = "RENTWATCH_SITES")]
    pub sites: Option<String>,

    /// Listings source (JSON file path or http(s) URL)
    #[arg(short, long, value_name = "SOURCE", env = "RENTWATCH_LISTINGS")]
    pub listings: Option<String>,

    /// Listings server base URL
    ///
    /// Sites and listings default to /v1/sites and /v1/listings below it.
    #[arg(long, value_name = "URL", env = "RENTWATCH_BASE_URL")]
    pub base_url: Option<String>,

    /// Basic-auth user for the listings server
    #[arg(long, value_name = "USER", env = "AUTH_USER")]
    pub auth_user: Option<String>,

    /// Basic-auth password for the listings server
    #[arg(long, value_name = "PASS", env = "AUTH_PASS", hide_env_values = true)]
    pub auth_pass: Option<String>,

    /// Output file path for the report (stdout if not set)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Report title
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .rentwatch.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Keep listings in the order received instead of newest first
    #[arg(long)]
    pub no_sort: bool,

    /// Abort on the first listing that cannot be projected
    ///
    /// By default invalid listings are skipped and reported.
    #[arg(long)]
    pub strict: bool,

    /// Unit of listing timestamps
    #[arg(long, value_name = "UNIT")]
    pub timestamp_unit: Option<TimestampUnit>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Minimum number of bedrooms
    #[arg(long, value_name = "N")]
    pub beds_min: Option<f64>,

    /// Maximum number of bedrooms
    #[arg(long, value_name = "N")]
    pub beds_max: Option<f64>,

    /// Maximum price
    #[arg(long, value_name = "AMOUNT")]
    pub price_max: Option<f64>,

    /// Only listings seen on or after this date (YYYY-MM-DD) or raw timestamp
    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    /// Hide listings marked dismissed
    #[arg(long)]
    pub hide_dismissed: bool,

    /// Show only listings marked favorite
    #[arg(long)]
    pub favorites_only: bool,

    /// Also apply the search filter saved on the listings server
    #[arg(long)]
    pub use_server_filter: bool,

    /// Search filter source (JSON file path or http(s) URL)
    #[arg(long, value_name = "SOURCE", conflicts_with = "use_server_filter")]
    pub filter_source: Option<String>,

    /// Generate a default .rentwatch.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// HTML page (default)
    #[default]
    Html,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

/// Parse a `--since` value: a `YYYY-MM-DD` date or a raw timestamp.
pub fn parse_since(value: &str, unit: TimestampUnit) -> Result<i64, String> {
    if let Ok(raw) = value.parse::<i64>() {
        return Ok(raw);
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid --since value '{}': expected YYYY-MM-DD or an integer", value))?;
    let midnight: DateTime<Utc> = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("Invalid --since date '{}'", value))?
        .and_utc();

    Ok(unit.from_datetime(midnight))
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref base) = self.base_url {
            if !is_http_url(base) {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let (Some(min), Some(max)) = (self.beds_min, self.beds_max) {
            if min > max {
                return Err(format!(
                    "--beds-min ({}) cannot exceed --beds-max ({})",
                    min, max
                ));
            }
        }

        if let Some(price) = self.price_max {
            if price < 0.0 {
                return Err("--price-max cannot be negative".to_string());
            }
        }

        if let Some(ref since) = self.since {
            parse_since(since, TimestampUnit::default())?;
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            sites: Some("sites.json".to_string()),
            listings: Some("listings.json".to_string()),
            base_url: None,
            auth_user: None,
            auth_pass: None,
            output: None,
            format: None,
            title: None,
            config: None,
            verbose: false,
            quiet: false,
            no_sort: false,
            strict: false,
            timestamp_unit: None,
            timeout: None,
            beds_min: None,
            beds_max: None,
            price_max: None,
            since: None,
            hide_dismissed: false,
            favorites_only: false,
            use_server_filter: false,
            filter_source: None,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_base_url() {
        let mut args = make_args();
        args.base_url = Some("localhost:8083".to_string());
        assert!(args.validate().is_err());

        args.base_url = Some("http://localhost:8083".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bed_bounds() {
        let mut args = make_args();
        args.beds_min = Some(3.0);
        args.beds_max = Some(2.0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_since() {
        let mut args = make_args();
        args.since = Some("yesterday".to_string());
        assert!(args.validate().is_err());

        args.since = Some("2024-09-01".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_since() {
        assert_eq!(parse_since("12345", TimestampUnit::Seconds), Ok(12345));
        assert_eq!(
            parse_since("2023-11-14", TimestampUnit::Seconds),
            Ok(1_699_920_000)
        );
        assert_eq!(
            parse_since("2023-11-14", TimestampUnit::Nanoseconds),
            Ok(1_699_920_000_000_000_000)
        );
        assert!(parse_since("14/11/2023", TimestampUnit::Seconds).is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}

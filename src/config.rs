//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.rentwatch.toml` files.

use crate::cli::{parse_since, Args, OutputFormat};
use crate::models::TimestampUnit;
use crate::projection::SearchFilter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".rentwatch.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where data comes from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Projection settings.
    #[serde(default)]
    pub projection: ProjectionConfig,

    /// Search filter applied to projected listings.
    #[serde(default)]
    pub filter: SearchFilter,

    /// Report settings.
    #[serde(default)]
    pub render: RenderConfig,
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site directory source (path or URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sites: Option<String>,

    /// Listings source (path or URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listings: Option<String>,

    /// Listings server base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Search filter source (path or URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Basic-auth user for the listings server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_user: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Honor system proxy settings.
    #[serde(default = "default_true")]
    pub use_proxy: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sites: None,
            listings: None,
            base_url: None,
            filter: None,
            auth_user: None,
            timeout_seconds: default_timeout(),
            use_proxy: true,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Projection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Order listings newest first.
    #[serde(default = "default_true")]
    pub sort_by_timestamp: bool,

    /// Abort on the first invalid listing instead of skipping it.
    #[serde(default)]
    pub strict: bool,

    /// Unit of listing timestamps.
    #[serde(default)]
    pub timestamp_unit: TimestampUnit,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            sort_by_timestamp: true,
            strict: false,
            timestamp_unit: TimestampUnit::default(),
        }
    }
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file; stdout if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Report title.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output: None,
            title: default_title(),
        }
    }
}

fn default_title() -> String {
    "Rental Listings".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_optional(Path::new(CONFIG_FILE))
    }

    /// Load configuration if `path` exists.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &Args) -> Result<()> {
        // Source settings
        if let Some(ref sites) = args.sites {
            self.source.sites = Some(sites.clone());
        }
        if let Some(ref listings) = args.listings {
            self.source.listings = Some(listings.clone());
        }
        if let Some(ref base_url) = args.base_url {
            self.source.base_url = Some(base_url.clone());
        }
        if let Some(ref filter) = args.filter_source {
            self.source.filter = Some(filter.clone());
        }
        if let Some(ref user) = args.auth_user {
            self.source.auth_user = Some(user.clone());
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        // Projection settings - flags only override when set
        if args.no_sort {
            self.projection.sort_by_timestamp = false;
        }
        if args.strict {
            self.projection.strict = true;
        }
        if let Some(unit) = args.timestamp_unit {
            self.projection.timestamp_unit = unit;
        }

        // Filter bounds - only override if provided
        if args.beds_min.is_some() {
            self.filter.beds_min = args.beds_min;
        }
        if args.beds_max.is_some() {
            self.filter.beds_max = args.beds_max;
        }
        if args.price_max.is_some() {
            self.filter.price_max = args.price_max;
        }
        if let Some(ref since) = args.since {
            let since = parse_since(since, self.projection.timestamp_unit)
                .map_err(anyhow::Error::msg)?;
            self.filter.since = Some(since);
        }
        if args.hide_dismissed {
            self.filter.hide_dismissed = true;
        }
        if args.favorites_only {
            self.filter.favorites_only = true;
        }

        // Render settings
        if let Some(format) = args.format {
            self.render.format = format;
        }
        if let Some(ref output) = args.output {
            self.render.output = Some(output.display().to_string());
        }
        if let Some(ref title) = args.title {
            self.render.title = title.clone();
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.projection.sort_by_timestamp);
        assert!(!config.projection.strict);
        assert_eq!(config.projection.timestamp_unit, TimestampUnit::Nanoseconds);
        assert_eq!(config.source.timeout_seconds, 30);
        assert_eq!(config.render.format, OutputFormat::Html);
        assert!(!config.filter.is_active());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[source]
base_url = "http://localhost:8083"
timeout_seconds = 10

[projection]
sort_by_timestamp = false
timestamp_unit = "milliseconds"

[filter]
beds_min = 2.0
price_max = 3300.0
hide_dismissed = true

[render]
format = "markdown"
title = "Two bedrooms"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.source.base_url.as_deref(), Some("http://localhost:8083"));
        assert_eq!(config.source.timeout_seconds, 10);
        assert!(config.source.use_proxy);
        assert!(!config.projection.sort_by_timestamp);
        assert_eq!(config.projection.timestamp_unit, TimestampUnit::Milliseconds);
        assert_eq!(config.filter.beds_min, Some(2.0));
        assert_eq!(config.filter.price_max, Some(3300.0));
        assert!(config.filter.hide_dismissed);
        assert_eq!(config.render.format, OutputFormat::Markdown);
        assert_eq!(config.render.title, "Two bedrooms");
    }

    #[test]
    fn test_args_override_config() {
        let mut config: Config = toml::from_str(
            r#"
[source]
sites = "old-sites.json"

[filter]
price_max = 5000.0
beds_min = 1.0
"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "rentwatch",
            "--sites",
            "new-sites.json",
            "--price-max",
            "3300",
            "--no-sort",
            "--strict",
            "--format",
            "json",
            "--timestamp-unit",
            "seconds",
            "--since",
            "2023-11-14",
        ]);
        config.merge_with_args(&args).unwrap();

        assert_eq!(config.source.sites.as_deref(), Some("new-sites.json"));
        assert_eq!(config.filter.price_max, Some(3300.0));
        assert_eq!(config.filter.beds_min, Some(1.0));
        assert_eq!(config.filter.since, Some(1_699_920_000));
        assert!(!config.projection.sort_by_timestamp);
        assert!(config.projection.strict);
        assert_eq!(config.render.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert!(Config::load_optional(&path).unwrap().is_none());

        std::fs::write(&path, "[render]\ntitle = \"Mine\"\n").unwrap();
        let config = Config::load_optional(&path).unwrap().unwrap();
        assert_eq!(config.render.title, "Mine");

        std::fs::write(&path, "[render\ntitle = ").unwrap();
        let err = Config::load_optional(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[projection]"));
        assert!(toml_str.contains("[render]"));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.render.title, "Rental Listings");
    }
}

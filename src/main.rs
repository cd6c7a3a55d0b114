//! rentwatch - rental listings, labelled by the sites that posted them
//!
//! A CLI tool that joins scraped rental listings against a directory of
//! broker sites and renders them newest first as an HTML page, Markdown
//! or JSON.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (unreadable source, bad config, invalid listing under --strict, etc.)

mod cli;
mod config;
mod models;
mod projection;
mod report;
mod source;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::{ListingReport, Listings, ReportMetadata, SiteDirectory, SkippedListing};
use projection::{InvalidRecordPolicy, ProjectOptions, SearchFilter};
use source::{BasicAuth, FetchOptions, Fetcher, Source, LISTINGS_PATH, SEARCH_FILTER_PATH, SITES_PATH};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("rentwatch v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .rentwatch.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set sources, filters and the report format.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the level picked from the flags.
///
/// Logs go to stderr so a report printed to stdout stays clean.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Progress line on stderr, suppressed by --quiet.
fn status(args: &Args, message: impl AsRef<str>) {
    if !args.quiet {
        eprintln!("{}", message.as_ref());
    }
}

/// Run the complete fetch, project and render workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args)?;

    let (sites_source, listings_source) = resolve_sources(&config)?;

    let fetcher = Fetcher::new(FetchOptions {
        timeout_seconds: config.source.timeout_seconds,
        auth: basic_auth(&config, &args)?,
        use_proxy: config.source.use_proxy,
        show_progress: !args.quiet,
    })?;

    // Step 1: the directory must be complete before any listing is projected
    status(&args, format!("📥 Loading site directory: {}", sites_source));
    let directory = fetcher
        .fetch_directory(&sites_source)
        .await
        .context("Failed to load site directory")?;

    // Step 2: listings
    status(&args, format!("📥 Loading listings: {}", listings_source));
    let listings = fetcher
        .fetch_listings(&listings_source)
        .await
        .context("Failed to load listings")?;

    // Step 3: search filter, with a saved remote filter filling unset bounds
    let filter = match resolve_filter_source(&args, &config)? {
        Some(filter_source) => {
            status(&args, format!("🔎 Loading search filter: {}", filter_source));
            let remote = fetcher
                .fetch_search_filter(&filter_source)
                .await
                .context("Failed to load search filter")?;
            config.filter.clone().or(remote)
        }
        None => config.filter.clone(),
    };
    if filter.is_active() {
        debug!("Search filter: {:?}", filter);
    }

    // Step 4: project and render
    let report = build_report(
        &config,
        &directory,
        &listings,
        &filter,
        &sites_source.to_string(),
        &listings_source.to_string(),
    )?;

    for skipped in &report.skipped {
        warn!("Skipped listing '{}': {}", skipped.address, skipped.reason);
    }
    let unresolved = report.unresolved_tags();
    if unresolved > 0 {
        warn!("{} reference URLs matched no known site", unresolved);
    }

    let output = render(&report, config.render.format)?;

    // Step 5: write the report
    match config.render.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path))?;
        }
        None => print!("{}", output),
    }

    let duration = start_time.elapsed().as_secs_f64();
    status(&args, "\n📊 Summary:");
    status(
        &args,
        format!(
            "   Listings: {} shown of {} received",
            report.records.len(),
            report.metadata.total_listings
        ),
    );
    status(
        &args,
        format!(
            "   Filtered out: {} | Skipped: {} | Unresolved sites: {}",
            report.metadata.filtered_out,
            report.skipped.len(),
            unresolved
        ),
    );
    status(&args, format!("   Duration: {:.1}s", duration));
    if let Some(ref path) = config.render.output {
        status(&args, format!("\n✅ Report saved to: {}", path));
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.context(format!("Invalid {}", CONFIG_FILE))),
    }
}

/// Credentials for the listings server.
///
/// The user may come from the config file; the password only from
/// `--auth-pass` or `AUTH_PASS`.
fn basic_auth(config: &Config, args: &Args) -> Result<Option<BasicAuth>> {
    match (&config.source.auth_user, &args.auth_pass) {
        (Some(user), password) => Ok(Some(BasicAuth {
            user: user.clone(),
            password: password.clone(),
        })),
        (None, Some(_)) => bail!("--auth-pass requires --auth-user (or source.auth_user)"),
        (None, None) => Ok(None),
    }
}

/// Work out where the directory and listings come from.
///
/// Explicit sources win; otherwise both hang off the server base URL.
fn resolve_sources(config: &Config) -> Result<(Source, Source)> {
    let base_url = config.source.base_url.as_deref();

    let sites = config
        .source
        .sites
        .as_deref()
        .map(Source::parse)
        .or_else(|| base_url.map(|base| Source::endpoint(base, SITES_PATH)))
        .ok_or_else(|| anyhow!("No site directory source: pass --sites or --base-url"))?;

    let listings = config
        .source
        .listings
        .as_deref()
        .map(Source::parse)
        .or_else(|| base_url.map(|base| Source::endpoint(base, LISTINGS_PATH)))
        .ok_or_else(|| anyhow!("No listings source: pass --listings or --base-url"))?;

    Ok((sites, listings))
}

/// Where a saved search filter comes from, if anywhere.
fn resolve_filter_source(args: &Args, config: &Config) -> Result<Option<Source>> {
    if args.use_server_filter {
        let Some(ref base) = config.source.base_url else {
            bail!("--use-server-filter needs a base URL (--base-url or source.base_url)");
        };
        return Ok(Some(Source::endpoint(base, SEARCH_FILTER_PATH)));
    }

    Ok(config.source.filter.as_deref().map(Source::parse))
}

/// Project the listings, apply the filter and assemble the report.
fn build_report(
    config: &Config,
    directory: &SiteDirectory,
    listings: &Listings,
    filter: &SearchFilter,
    sites_source: &str,
    listings_source: &str,
) -> Result<ListingReport> {
    let options = ProjectOptions {
        sort_by_timestamp: config.projection.sort_by_timestamp,
        on_invalid: if config.projection.strict {
            InvalidRecordPolicy::Abort
        } else {
            InvalidRecordPolicy::Skip
        },
    };

    let projection = projection::project(directory, listings, options)?;

    let projected = projection.records.len();
    let records = filter.apply(projection.records);
    let filtered_out = projected - records.len();

    Ok(ListingReport {
        metadata: ReportMetadata {
            title: config.render.title.clone(),
            generated_at: Utc::now(),
            sites_source: sites_source.to_string(),
            listings_source: listings_source.to_string(),
            total_listings: listings.len(),
            filtered_out,
            sorted_by_timestamp: options.sort_by_timestamp,
            timestamp_unit: config.projection.timestamp_unit,
        },
        records,
        skipped: projection.skipped.iter().map(SkippedListing::from).collect(),
    })
}

fn render(report: &ListingReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Html => report::generate_html_report(report),
        OutputFormat::Markdown => report::generate_markdown_report(report),
        OutputFormat::Json => report::generate_json_report(report)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    const SITES: &str = include_str!("../fixtures/sites.json");
    const BROKERS: &str = include_str!("../fixtures/brokers.json");
    const LISTINGS: &str = include_str!("../fixtures/listings.json");

    fn fixtures() -> (SiteDirectory, Listings) {
        (
            serde_json::from_str(SITES).unwrap(),
            serde_json::from_str(LISTINGS).unwrap(),
        )
    }

    fn addresses(report: &ListingReport) -> Vec<&str> {
        report.records.iter().map(|r| r.address.as_str()).collect()
    }

    #[test]
    fn test_both_directory_shapes_agree() {
        let map: SiteDirectory = serde_json::from_str(SITES).unwrap();
        let list: SiteDirectory = serde_json::from_str(BROKERS).unwrap();
        assert_eq!(map, list);
    }

    #[test]
    fn test_fixture_report_end_to_end() {
        let (directory, listings) = fixtures();
        let report = build_report(
            &Config::default(),
            &directory,
            &listings,
            &SearchFilter::default(),
            "sites.json",
            "listings.json",
        )
        .unwrap();

        assert_eq!(
            addresses(&report),
            vec![
                "88 Harbor View Rd",
                "12 Oak Ln, Unit 3",
                "450 Mission St #12",
                "7 Elm Ct",
            ]
        );
        assert_eq!(report.metadata.total_listings, 5);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].address, "31 Broken Refs Ave");

        let harbor = &report.records[0];
        let names: Vec<_> = harbor.name_tags.iter().map(|t| t.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Bayside Rentals"), Some("Keystone Property")]);

        // The last listing points at a site the directory doesn't know.
        assert_eq!(report.unresolved_tags(), 1);
    }

    #[test]
    fn test_fixture_report_with_filter() {
        let (directory, listings) = fixtures();
        let filter = SearchFilter {
            beds_min: Some(2.0),
            price_max: Some(3300.0),
            hide_dismissed: true,
            ..Default::default()
        };

        let report = build_report(
            &Config::default(),
            &directory,
            &listings,
            &filter,
            "sites.json",
            "listings.json",
        )
        .unwrap();

        assert_eq!(addresses(&report), vec!["12 Oak Ln, Unit 3"]);
        assert_eq!(report.metadata.filtered_out, 3);
    }

    #[test]
    fn test_strict_config_aborts_on_invalid_listing() {
        let (directory, listings) = fixtures();
        let mut config = Config::default();
        config.projection.strict = true;

        let err = build_report(
            &config,
            &directory,
            &listings,
            &SearchFilter::default(),
            "sites.json",
            "listings.json",
        )
        .unwrap_err();

        assert!(err.to_string().contains("31 Broken Refs Ave"));
    }

    #[test]
    fn test_resolve_sources_from_base_url() {
        let mut config = Config::default();
        config.source.base_url = Some("http://localhost:8083/".to_string());
        config.source.listings = Some("listings.json".to_string());

        let (sites, listings) = resolve_sources(&config).unwrap();
        assert_eq!(
            sites,
            Source::Remote("http://localhost:8083/v1/sites".to_string())
        );
        assert_eq!(listings, Source::File("listings.json".into()));
    }

    #[test]
    fn test_resolve_sources_missing() {
        let config = Config::default();
        let err = resolve_sources(&config).unwrap_err();
        assert!(err.to_string().contains("--sites"));
    }

    #[test]
    fn test_server_filter_needs_base_url() {
        let args = Args::parse_from(["rentwatch", "--use-server-filter"]);
        assert!(resolve_filter_source(&args, &Config::default()).is_err());

        let mut config = Config::default();
        config.source.base_url = Some("http://localhost:8083".to_string());
        assert_eq!(
            resolve_filter_source(&args, &config).unwrap(),
            Some(Source::Remote(
                "http://localhost:8083/v1/searchFilter".to_string()
            ))
        );
    }

    #[test]
    fn test_auth_user_from_config_with_password_from_args() {
        let mut config: Config = toml::from_str(
            r#"
[source]
auth_user = "alice"
"#,
        )
        .unwrap();
        let args = Args::parse_from(["rentwatch", "--auth-pass", "secret"]);
        assert!(args.validate().is_ok());
        config.merge_with_args(&args).unwrap();

        assert_eq!(
            basic_auth(&config, &args).unwrap(),
            Some(BasicAuth {
                user: "alice".to_string(),
                password: Some("secret".to_string()),
            })
        );
    }

    #[test]
    fn test_password_without_any_user_is_rejected() {
        let args = Args::parse_from(["rentwatch", "--auth-pass", "secret"]);
        let err = basic_auth(&Config::default(), &args).unwrap_err();
        assert!(err.to_string().contains("--auth-user"));

        let args = Args::parse_from(["rentwatch"]);
        assert_eq!(basic_auth(&Config::default(), &args).unwrap(), None);
    }

    #[test]
    fn test_malformed_explicit_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[source\nsites = ").unwrap();
        let path = file.path().display().to_string();

        let args = Args::parse_from(["rentwatch", "--config", path.as_str()]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_render_formats() {
        let (directory, listings) = fixtures();
        let report = build_report(
            &Config::default(),
            &directory,
            &listings,
            &SearchFilter::default(),
            "sites.json",
            "listings.json",
        )
        .unwrap();

        let html = render(&report, OutputFormat::Html).unwrap();
        assert!(html.contains("Bayside Rentals"));

        let markdown = render(&report, OutputFormat::Markdown).unwrap();
        assert!(markdown.contains("# Rental Listings"));

        let json = render(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["records"].as_array().unwrap().len(), 4);
    }
}

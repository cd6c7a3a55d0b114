//! Listing report generation.
//!
//! This module renders a [`ListingReport`] as an HTML page, Markdown, or
//! JSON. HTML goes through maud, so every interpolated value is escaped.

use crate::models::{DisplayRecord, ListingReport, ReportMetadata, SkippedListing, TimestampUnit};
use anyhow::Result;
use maud::{html, Markup, DOCTYPE};

/// Date format of rendered timestamps, e.g. `Tuesday, November 14, 2023 10:13:20 PM`.
const DATE_FORMAT: &str = "%A, %B %-d, %Y %-I:%M:%S %p";

/// Format a raw timestamp as a UTC date, or the raw value if out of range.
pub fn format_timestamp(raw: i64, unit: TimestampUnit) -> String {
    unit.to_datetime(raw)
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Format a numeric field; whole numbers print without a fraction.
pub fn format_amount(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{}", v),
        None => "?".to_string(),
    }
}

fn listing_class(record: &DisplayRecord) -> &'static str {
    match (record.is_favorite, record.is_dismissed) {
        (true, true) => "listing favorite dismissed",
        (true, false) => "listing favorite",
        (false, true) => "listing dismissed",
        (false, false) => "listing",
    }
}

/// Generate a complete HTML page.
pub fn generate_html_report(report: &ListingReport) -> String {
    let metadata = &report.metadata;

    let page = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (metadata.title) }
            }
            body {
                h1 { (metadata.title) }
                (summary_line(report))
                div class="properties" {
                    @for (i, record) in report.records.iter().enumerate() {
                        (listing_item(i, record, metadata.timestamp_unit))
                    }
                }
                @if !report.skipped.is_empty() {
                    (skipped_section(&report.skipped))
                }
            }
        }
    };

    page.into_string()
}

fn summary_line(report: &ListingReport) -> Markup {
    html! {
        p class="summary" {
            (report.records.len()) " of " (report.metadata.total_listings) " listings"
            @if report.metadata.filtered_out > 0 {
                ", " (report.metadata.filtered_out) " filtered out"
            }
            @if !report.skipped.is_empty() {
                ", " (report.skipped.len()) " skipped"
            }
        }
    }
}

/// One listing line: timestamp, price, beds/baths, address and site links.
fn listing_item(index: usize, record: &DisplayRecord, unit: TimestampUnit) -> Markup {
    html! {
        p id=(format!("listing{}", index)) class=(listing_class(record)) {
            @if let Some(ts) = record.timestamp {
                span class="timestamp" { "(" (format_timestamp(ts, unit)) ") - " }
            }
            span class="price" { "$" (format_amount(record.price)) }
            " "
            span class="beds-baths" {
                (format_amount(record.beds)) "Bd / " (format_amount(record.baths)) "bth"
            }
            " "
            span class="address" { (record.address) ":" }
            " "
            span class="name-tags" {
                @for tag in &record.name_tags {
                    a href=(tag.url)
                        target="_blank"
                        rel="noopener noreferrer"
                        class=[tag.name.is_none().then_some("unresolved")]
                    { (tag.label()) }
                    " "
                }
            }
            @if let Some(notes) = record.notes.as_deref().filter(|n| !n.is_empty()) {
                " "
                span class="notes" { (notes) }
            }
        }
    }
}

fn skipped_section(skipped: &[SkippedListing]) -> Markup {
    html! {
        section class="skipped" {
            h2 { "Skipped listings" }
            ul {
                @for listing in skipped {
                    li { strong { (listing.address) } ": " (listing.reason) }
                }
            }
        }
    }
}

/// Generate a Markdown report.
pub fn generate_markdown_report(report: &ListingReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.metadata.title));
    output.push_str(&generate_metadata_section(&report.metadata, report));
    output.push_str(&generate_listings_section(
        &report.records,
        report.metadata.timestamp_unit,
    ));
    output.push_str(&generate_skipped_section(&report.skipped));
    output.push_str("---\n\n*Report generated by rentwatch*\n");

    output
}

fn generate_metadata_section(metadata: &ReportMetadata, report: &ListingReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Listings Source:** {}\n", metadata.listings_source));
    section.push_str(&format!("- **Sites Source:** {}\n", metadata.sites_source));
    section.push_str(&format!(
        "- **Shown:** {} of {}\n",
        report.records.len(),
        metadata.total_listings
    ));
    if metadata.filtered_out > 0 {
        section.push_str(&format!("- **Filtered Out:** {}\n", metadata.filtered_out));
    }
    if !report.skipped.is_empty() {
        section.push_str(&format!("- **Skipped:** {}\n", report.skipped.len()));
    }
    section.push_str(&format!(
        "- **Order:** {}\n",
        if metadata.sorted_by_timestamp {
            "newest first"
        } else {
            "as received"
        }
    ));
    section.push('\n');

    section
}

fn generate_listings_section(records: &[DisplayRecord], unit: TimestampUnit) -> String {
    let mut section = String::new();

    section.push_str("## Listings\n\n");

    if records.is_empty() {
        section.push_str("No listings to show.\n\n");
        return section;
    }

    for (i, record) in records.iter().enumerate() {
        section.push_str(&generate_listing_block(i + 1, record, unit));
    }

    section
}

fn generate_listing_block(number: usize, record: &DisplayRecord, unit: TimestampUnit) -> String {
    let mut block = String::new();

    let marker = if record.is_favorite { " ⭐" } else { "" };
    block.push_str(&format!("### {}. {}{}\n\n", number, record.address, marker));

    if let Some(ts) = record.timestamp {
        block.push_str(&format!("- **Seen:** {}\n", format_timestamp(ts, unit)));
    }
    if let Some(ref date) = record.date {
        block.push_str(&format!("- **Posted:** {}\n", date));
    }
    block.push_str(&format!("- **Price:** ${}\n", format_amount(record.price)));
    block.push_str(&format!(
        "- **Beds / Baths:** {} / {}\n",
        format_amount(record.beds),
        format_amount(record.baths)
    ));

    let links: Vec<String> = record
        .name_tags
        .iter()
        .map(|tag| match tag.name {
            Some(ref name) => format!("[{}]({})", name, tag.url),
            None => format!("<{}>", tag.url),
        })
        .collect();
    if !links.is_empty() {
        block.push_str(&format!("- **Sites:** {}\n", links.join(", ")));
    }

    if let Some(notes) = record.notes.as_deref().filter(|n| !n.is_empty()) {
        block.push_str(&format!("- **Notes:** {}\n", notes));
    }
    if record.is_dismissed {
        block.push_str("- *Dismissed*\n");
    }
    block.push('\n');

    block
}

fn generate_skipped_section(skipped: &[SkippedListing]) -> String {
    if skipped.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Skipped Listings\n\n");
    for listing in skipped {
        section.push_str(&format!("- `{}`: {}\n", listing.address, listing.reason));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ListingReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

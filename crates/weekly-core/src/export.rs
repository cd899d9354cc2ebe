//! # Report Export
//!
//! Renders query results as a human-readable text document or as CSV.
//!
//! ## CSV Layout
//!
//! One row per (report, content entry). A report without content yields a
//! single row with empty module and work-content columns. Fields containing
//! a comma, a double quote, CR or LF are wrapped in double quotes with inner
//! quotes doubled; everything else is written verbatim.
//!
//! Names are resolved through `Labels`: a dangling reference prints as
//! `UNKNOWN_LABEL`, `UNKNOWN_USER` or `UNKNOWN_MODULE` instead of failing.

use crate::config_graph::ConfigGraph;
use crate::primitives::UNKNOWN_MODULE;
use crate::users::UserDirectory;
use crate::{Level, RecordId, Report, ReportStatus};
use chrono::{DateTime, NaiveDate, Utc};
use std::borrow::Cow;
use std::fmt::Write as _;

/// Column headers of the CSV export.
pub const CSV_HEADER: [&str; 10] = [
    "user",
    "dateRange",
    "domain",
    "brand",
    "model",
    "baseline",
    "status",
    "updatedAt",
    "module",
    "workContent",
];

const RULE: &str = "===========================================";

/// Resolves ids to display names for export.
#[derive(Debug, Clone, Copy)]
pub struct Labels<'a> {
    config: &'a ConfigGraph,
    users: &'a UserDirectory,
}

impl<'a> Labels<'a> {
    #[must_use]
    pub fn new(config: &'a ConfigGraph, users: &'a UserDirectory) -> Self {
        Self { config, users }
    }

    #[must_use]
    pub fn user(&self, id: &RecordId) -> String {
        self.users.display_name(id)
    }

    #[must_use]
    pub fn node(&self, level: Level, id: Option<&RecordId>) -> &'a str {
        self.config.label(level, id)
    }

    #[must_use]
    pub fn module(&self, id: &RecordId) -> &'a str {
        self.config
            .find(Level::Module, id)
            .map_or(UNKNOWN_MODULE, |m| m.name.as_str())
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn format_date_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn status_label(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Draft => "Draft",
        ReportStatus::Submitted => "Submitted",
    }
}

/// `"start - end"` with blanks for missing dates.
#[must_use]
pub fn date_range(report: &Report) -> String {
    format!(
        "{} - {}",
        format_date(report.start_date),
        format_date(report.end_date)
    )
}

/// Quote a CSV field when it contains `,` `"` CR or LF.
#[must_use]
pub fn escape_csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Render the CSV export, header row first. Every row ends with `\n`.
#[must_use]
pub fn to_csv(reports: &[&Report], labels: &Labels<'_>) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for report in reports {
        let s = &report.selection;
        let head = [
            labels.user(&report.user_id),
            date_range(report),
            labels.node(Level::Domain, s.domain_id.as_ref()).to_string(),
            labels.node(Level::Brand, s.brand_id.as_ref()).to_string(),
            labels.node(Level::Model, s.model_id.as_ref()).to_string(),
            labels.node(Level::Baseline, s.baseline_id.as_ref()).to_string(),
            status_label(report.status).to_string(),
            format_date_time(report.updated_at),
        ];
        let head: Vec<Cow<'_, str>> = head.iter().map(|f| escape_csv_field(f)).collect();
        let head = head.join(",");

        if report.content.is_empty() {
            let _ = writeln!(out, "{head},,");
            continue;
        }
        for entry in &report.content {
            let _ = writeln!(
                out,
                "{head},{},{}",
                escape_csv_field(labels.module(&entry.module_id)),
                escape_csv_field(&entry.work_content)
            );
        }
    }
    out
}

/// Render the plain-text export.
#[must_use]
pub fn to_text(reports: &[&Report], labels: &Labels<'_>, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Weekly report query results");
    let _ = writeln!(out, "Generated: {}", format_date_time(generated_at));
    let _ = writeln!(out, "Reports: {}", reports.len());
    out.push('\n');

    for (index, report) in reports.iter().enumerate() {
        let s = &report.selection;
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "Report {}", index + 1);
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(out, "User: {}", labels.user(&report.user_id));
        let _ = writeln!(out, "Date range: {}", date_range(report));
        let _ = writeln!(out, "Domain: {}", labels.node(Level::Domain, s.domain_id.as_ref()));
        let _ = writeln!(out, "Brand: {}", labels.node(Level::Brand, s.brand_id.as_ref()));
        let _ = writeln!(out, "Model: {}", labels.node(Level::Model, s.model_id.as_ref()));
        let _ = writeln!(
            out,
            "Baseline: {}",
            labels.node(Level::Baseline, s.baseline_id.as_ref())
        );
        let _ = writeln!(out, "Status: {}", status_label(report.status));
        let _ = writeln!(out, "Updated: {}", format_date_time(report.updated_at));
        out.push('\n');

        if report.content.is_empty() {
            let _ = writeln!(out, "Work content: none");
        } else {
            let _ = writeln!(out, "Work content:");
            for entry in &report.content {
                let work = if entry.work_content.is_empty() {
                    "-"
                } else {
                    entry.work_content.as_str()
                };
                let _ = writeln!(out, "  {}:", labels.module(&entry.module_id));
                let _ = writeln!(out, "    {work}");
                out.push('\n');
            }
        }
        out.push('\n');
    }
    out
}

//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! reconciliation results to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::api::HaPayload;
use crate::reconcile::{ActionKind, HaResource, ReconcileReport, Vmid, field_diffs};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Field diff row for table display.
#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Desired")]
    desired: String,
}

/// Resource field row for status display.
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a reconciliation report for display.
    #[must_use]
    pub fn format_report(&self, report: &ReconcileReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    /// Formats a report as text.
    fn format_report_text(report: &ReconcileReport) -> String {
        let mut output = String::new();

        let marker = match report.action {
            ActionKind::None => "unchanged".dimmed().to_string(),
            ActionKind::Create => "+create".green().to_string(),
            ActionKind::Update => "~update".yellow().to_string(),
            ActionKind::Delete => "-delete".red().to_string(),
        };

        let _ = writeln!(output, "{marker} {}", report.message);

        if let (Some(old), Some(new)) = (report.old.as_ref(), report.new.as_ref()) {
            let rows: Vec<DiffRow> = field_diffs(old, new)
                .into_iter()
                .map(|diff| DiffRow {
                    field: diff.field,
                    current: diff.old_value.unwrap_or_else(|| String::from("(unset)")),
                    desired: diff.new_value.unwrap_or_else(|| String::from("(unset)")),
                })
                .collect();

            if !rows.is_empty() {
                output.push('\n');
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
            }
        }

        if report.check_mode && report.changed {
            let _ = write!(
                output,
                "\n{} Check mode: no changes were applied.\n",
                "!".yellow()
            );
        }

        output
    }

    /// Formats the current HA configuration of a guest for display.
    #[must_use]
    pub fn format_status(&self, vmid: Vmid, current: Option<&HaResource>) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "vmid": vmid,
                    "managed": current.is_some(),
                    "resource": current.map(HaResource::full_payload),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_status_text(vmid, current),
        }
    }

    /// Formats status as text.
    fn format_status_text(vmid: Vmid, current: Option<&HaResource>) -> String {
        let Some(resource) = current else {
            return format!("Guest {vmid} is not managed by HA.\n");
        };

        let mut output = format!("HA resource for guest {vmid}:\n\n");
        output.push_str(&Table::new(Self::field_rows(&resource.full_payload())).to_string());
        output.push('\n');
        output
    }

    /// Builds display rows from a field set, unset fields excluded.
    fn field_rows(payload: &HaPayload) -> Vec<FieldRow> {
        let mut rows = Vec::new();
        let mut push = |field: &'static str, value: Option<String>| {
            if let Some(value) = value {
                rows.push(FieldRow { field, value });
            }
        };

        push("state", payload.state.clone());
        push("group", payload.group.clone());
        push("comment", payload.comment.clone());
        push("digest", payload.digest.clone());
        push("max_restart", payload.max_restart.map(|v| v.to_string()));
        push("max_relocate", payload.max_relocate.map(|v| v.to_string()));
        rows
    }
}

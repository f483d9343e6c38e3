//! Office Open XML rendering of a [`Report`].
//!
//! The workbook has four sheets: Summary, All Events, Critical Events and
//! Risk Analysis. Output is a pure function of the report: the document
//! creation date is pinned, so no clock is read.

mod sheet;
mod styles;

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Workbook, XlsxError};
use thiserror::Error;

use crate::contract::{ClassifiedEvent, RiskTier};
use crate::report::Report;
use sheet::{Cell, Sheet};
use styles::Style;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const SUMMARY_SHEET: &str = "Summary";
pub const ALL_EVENTS_SHEET: &str = "All Events";
pub const CRITICAL_EVENTS_SHEET: &str = "Critical Events";
pub const RISK_ANALYSIS_SHEET: &str = "Risk Analysis";
pub const NO_CRITICAL_EVENTS: &str = "No critical events found";

pub const EVENT_HEADERS: [&str; 19] = [
    "Event ARN",
    "Event Type",
    "Service",
    "Region",
    "Start Time",
    "Last Update",
    "Status",
    "Category",
    "Description",
    "Risk Level",
    "Account ID",
    "Time Sensitivity",
    "Risk Category",
    "Rationale",
    "Required Actions",
    "Impact Analysis",
    "Consequences If Ignored",
    "Affected Resources",
    "Parse Warning",
];
pub const ANALYSIS_HEADERS: [&str; 4] = ["Event Type", "Region", "Risk Level", "Full Analysis"];

const DESCRIPTION_COLUMN: usize = 8;
const DESCRIPTION_WIDTH: f64 = 60.0;
const FULL_ANALYSIS_COLUMN: usize = 3;
const FULL_ANALYSIS_WIDTH: f64 = 100.0;
const NOT_AVAILABLE: &str = "N/A";
/// Document creation date written to `docProps/core.xml`.
const PINNED_CREATION_DATE: (u16, u8, u8) = (2000, 1, 1);

#[derive(Debug, Error)]
#[error("workbook write failed: {0}")]
pub struct WorkbookError(#[from] XlsxError);

pub fn render_workbook(report: &Report) -> Result<Vec<u8>, WorkbookError> {
    let sheets = [
        summary_sheet(report),
        events_sheet(ALL_EVENTS_SHEET, report.rows().iter()),
        critical_sheet(report),
        analysis_sheet(report),
    ];

    let (year, month, day) = PINNED_CREATION_DATE;
    let created = ExcelDateTime::from_ymd(year, month, day)?;
    let mut workbook = Workbook::new();
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));
    for sheet in &sheets {
        sheet.write_to(workbook.add_worksheet())?;
    }
    Ok(workbook.save_to_buffer()?)
}

pub fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn summary_sheet(report: &Report) -> Sheet {
    let context = report.context();
    let counts = report.counts();
    let mut sheet = Sheet::new(SUMMARY_SHEET);

    sheet.push_row(vec![Cell::text(
        "AWS Health Events Analysis Summary",
        Style::Title,
    )]);
    sheet.merge_row(1, 2);
    sheet.push_blank_row();

    let window = format!(
        "{} to {}",
        format_timestamp(Some(context.window.start)),
        format_timestamp(Some(context.window.end))
    );
    for (label, value) in [
        ("Customer", context.customer_name.as_str()),
        ("Analysis Window", window.as_str()),
        ("Category Filter", context.category_filter.as_str()),
    ] {
        sheet.push_row(vec![
            Cell::text(label, Style::Bold),
            Cell::text(value, Style::Default),
        ]);
    }
    sheet.push_row(vec![
        Cell::text("Events Excluded By Filter", Style::Bold),
        Cell::count(context.filtered_events, Style::Default),
    ]);
    sheet.push_blank_row();

    sheet.push_row(vec![Cell::text("Risk Summary", Style::Bold)]);
    sheet.push_row(vec![
        Cell::text("Total Events", Style::Default),
        Cell::count(report.rows().len(), Style::Default),
    ]);
    for tier in RiskTier::ALL {
        sheet.push_row(vec![
            Cell::text(tier_heading(tier), Style::for_tier(tier, false)),
            Cell::count(counts.get(tier), Style::for_tier(tier, false)),
        ]);
    }
    sheet.push_row(vec![
        Cell::text("Classification Warnings", Style::Default),
        Cell::count(report.parse_warnings(), Style::Default),
    ]);
    sheet
}

fn tier_heading(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Critical => "Critical Events",
        RiskTier::High => "High Risk Events",
        RiskTier::Medium => "Medium Risk Events",
        RiskTier::Low => "Low Risk Events",
    }
}

fn header_row(headers: &[&str]) -> Vec<Cell> {
    headers
        .iter()
        .map(|header| Cell::text(*header, Style::Header))
        .collect()
}

fn events_sheet<'a>(name: &str, rows: impl Iterator<Item = &'a ClassifiedEvent>) -> Sheet {
    let mut sheet = Sheet::new(name);
    sheet.push_row(header_row(&EVENT_HEADERS));
    for row in rows {
        sheet.push_row(event_row(row));
    }
    sheet.set_width(DESCRIPTION_COLUMN, DESCRIPTION_WIDTH);
    sheet
}

fn critical_sheet(report: &Report) -> Sheet {
    let mut sheet = events_sheet(CRITICAL_EVENTS_SHEET, report.critical_rows());
    if sheet.row_count() == 1 {
        sheet.push_row(vec![Cell::text(NO_CRITICAL_EVENTS, Style::Centered)]);
        sheet.merge_row(2, EVENT_HEADERS.len() - 1);
    }
    sheet
}

fn event_row(row: &ClassifiedEvent) -> Vec<Cell> {
    let event = &row.event;
    let fill = Style::for_tier(row.tier, false);
    let wrap = Style::for_tier(row.tier, true);

    vec![
        Cell::text(event.arn.as_str(), fill),
        Cell::text(event.event_type_code.as_str(), fill),
        Cell::text(event.service.as_str(), fill),
        Cell::text(join_or(&event.regions, NOT_AVAILABLE), fill),
        Cell::text(format_timestamp(event.start_time), fill),
        Cell::text(format_timestamp(event.last_updated_time), fill),
        Cell::text(event.status.as_str(), fill),
        Cell::text(event.category.as_str(), fill),
        Cell::text(event.description.as_str(), wrap),
        Cell::text(row.tier.label(), fill),
        Cell::text(event.account_id.as_deref().unwrap_or(NOT_AVAILABLE), fill),
        Cell::text(row.time_sensitivity.as_str(), fill),
        Cell::text(row.risk_category.as_str(), fill),
        Cell::text(row.rationale.as_str(), fill),
        Cell::text(row.required_actions.as_str(), fill),
        Cell::text(row.impact_summary.as_str(), fill),
        Cell::text(row.consequences_if_ignored.as_str(), fill),
        Cell::text(join_or(&event.affected_entities, "None"), fill),
        Cell::text(row.parse_warning.as_deref().unwrap_or(""), fill),
    ]
}

fn join_or(values: &[String], empty: &str) -> String {
    if values.is_empty() {
        empty.to_string()
    } else {
        values.join(", ")
    }
}

fn analysis_sheet(report: &Report) -> Sheet {
    let mut sheet = Sheet::new(RISK_ANALYSIS_SHEET);
    sheet.push_row(header_row(&ANALYSIS_HEADERS));
    for row in report.rows() {
        let fill = Style::for_tier(row.tier, false);
        sheet.push_row(vec![
            Cell::text(row.event.event_type_code.as_str(), fill),
            Cell::text(join_or(&row.event.regions, NOT_AVAILABLE), fill),
            Cell::text(row.tier.label(), fill),
            Cell::text(row.analysis_text.as_str(), Style::for_tier(row.tier, true)),
        ]);
    }
    sheet.set_width(FULL_ANALYSIS_COLUMN, FULL_ANALYSIS_WIDTH);
    sheet
}

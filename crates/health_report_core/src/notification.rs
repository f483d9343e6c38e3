use std::fmt::Write as _;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use thiserror::Error;

use crate::contract::{ClassifiedEvent, RiskTier};
use crate::report::Report;
use crate::workbook::{format_timestamp, XLSX_CONTENT_TYPE};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("could not build email message: {0}")]
    Build(String),
}

pub fn subject_line(customer: &str, report: &Report) -> String {
    let counts = report.counts();
    if counts.critical > 0 {
        format!(
            "{customer} [CRITICAL] AWS Health Events Analysis - {} Critical, {} High Risk Events",
            counts.critical, counts.high
        )
    } else if counts.high > 0 {
        format!(
            "{customer} [HIGH RISK] AWS Health Events Analysis - {} High Risk Events",
            counts.high
        )
    } else {
        format!(
            "{customer} AWS Health Events Analysis - {} Events",
            report.rows().len()
        )
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            ch => escaped.push(ch),
        }
    }
    escaped
}

const HTML_HEAD: &str = r#"<html>
<head>
<style>
body { font-family: Arial, sans-serif; }
.header { background-color: #232F3E; color: white; padding: 20px; }
.content { padding: 20px; }
table { border-collapse: collapse; width: 100%; margin-top: 20px; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; font-size: 12px; }
th { background-color: #f2f2f2; }
.critical { background-color: #ffcccc; }
.high { background-color: #fff2cc; }
.summary { margin-top: 20px; margin-bottom: 20px; }
</style>
</head>
"#;

/// Email body: counts, the Critical and High tables, and a pointer to the attachment.
pub fn summary_html(report: &Report, attachment_name: &str) -> String {
    let context = report.context();
    let counts = report.counts();
    let mut html = String::from(HTML_HEAD);

    let _ = write!(
        html,
        r#"<body>
<div class="header">
<h1>{} AWS Health Events Analysis Report</h1>
<p>Date: {}</p>
</div>
<div class="content">
<div class="summary">
<h2>Summary</h2>
<p>Total AWS Health events analyzed: {}</p>
<p>Analysis Window: {} to {}</p>
<p>Events filtered by categories: {}</p>
<p>Events excluded by filter: {}</p>
<h3>Risk Levels</h3>
<ul>
"#,
        escape_html(&context.customer_name),
        context.window.end.format("%Y-%m-%d"),
        report.rows().len(),
        format_timestamp(Some(context.window.start)),
        format_timestamp(Some(context.window.end)),
        escape_html(&context.category_filter),
        context.filtered_events,
    );
    for (tier, label) in [
        (RiskTier::Critical, "Critical Events"),
        (RiskTier::High, "High Risk Events"),
        (RiskTier::Medium, "Medium Risk Events"),
        (RiskTier::Low, "Low Risk Events"),
    ] {
        let _ = writeln!(
            html,
            "<li><strong>{label}:</strong> {}</li>",
            counts.get(tier)
        );
    }
    if report.parse_warnings() > 0 {
        let _ = writeln!(
            html,
            "<li><strong>Classification Warnings:</strong> {}</li>",
            report.parse_warnings()
        );
    }
    html.push_str("</ul>\n</div>\n");

    push_event_table(&mut html, "Critical Events", "critical", report.critical_rows());
    push_event_table(
        &mut html,
        "High Risk Events",
        "high",
        report.rows_with_tier(RiskTier::High),
    );

    let _ = write!(
        html,
        r#"<div class="summary">
<h2>Full Report</h2>
<p>Please see the attached Excel file ({}) for complete details on all events.</p>
</div>
</div>
</body>
</html>
"#,
        escape_html(attachment_name)
    );
    html
}

fn push_event_table<'a>(
    html: &mut String,
    heading: &str,
    class: &str,
    rows: impl Iterator<Item = &'a ClassifiedEvent>,
) {
    let mut rows = rows.peekable();
    if rows.peek().is_none() {
        return;
    }
    let _ = write!(
        html,
        "<h2>{heading}</h2>\n<table>\n<tr><th>Event ARN</th><th>Region</th><th>Start Time</th><th>Risk Level</th><th>Account ID</th></tr>\n"
    );
    for row in rows {
        let event = &row.event;
        let region = if event.regions.is_empty() {
            "N/A".to_string()
        } else {
            event.regions.join(", ")
        };
        let _ = writeln!(
            html,
            r#"<tr class="{class}"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            escape_html(&event.arn),
            escape_html(&region),
            format_timestamp(event.start_time),
            row.tier.label(),
            escape_html(event.account_id.as_deref().unwrap_or("N/A")),
        );
    }
    html.push_str("</table>\n");
}

pub struct EmailContent<'a> {
    pub sender: &'a str,
    pub recipients: &'a [String],
    pub subject: &'a str,
    pub html_body: String,
    pub attachment_name: &'a str,
    pub attachment: Vec<u8>,
}

/// Builds the multipart/mixed MIME message passed to the mail service as raw bytes.
pub fn build_raw_message(content: EmailContent<'_>) -> Result<Vec<u8>, NotificationError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(content.sender)?)
        .subject(content.subject);
    for recipient in content.recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    let attachment_type = ContentType::parse(XLSX_CONTENT_TYPE)
        .map_err(|error| NotificationError::Build(error.to_string()))?;
    let message = builder
        .multipart(
            MultiPart::mixed()
                .multipart(MultiPart::alternative().singlepart(SinglePart::html(content.html_body)))
                .singlepart(
                    Attachment::new(content.attachment_name.to_string())
                        .body(content.attachment, attachment_type),
                ),
        )
        .map_err(|error| NotificationError::Build(error.to_string()))?;
    Ok(message.formatted())
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse::<Mailbox>()
        .map_err(|error| NotificationError::InvalidAddress {
            address: address.to_string(),
            reason: error.to_string(),
        })
}

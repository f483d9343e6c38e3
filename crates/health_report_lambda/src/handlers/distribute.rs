use health_report_core::config::AnalysisConfig;
use health_report_core::contract::{DeliveryResult, DestinationKind};
use health_report_core::notification::{build_raw_message, subject_line, summary_html, EmailContent};
use health_report_core::report::Report;
use health_report_core::storage_keys::ObjectTarget;
use health_report_core::workbook::XLSX_CONTENT_TYPE;
use serde_json::json;

use crate::adapters::mailer::Mailer;
use crate::adapters::object_store::ReportStore;
use crate::handlers::logging::{log_error, log_info};

const COMPONENT: &str = "distributor";

#[derive(Debug, Clone, Copy)]
pub struct Artifact<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
    pub run_fingerprint: &'a str,
}

/// Writes the workbook to the internal destination, then the external one.
///
/// Each write is independent: a failure is recorded in its result and the
/// next destination is still attempted.
pub fn store_report(
    store: &dyn ReportStore,
    config: &AnalysisConfig,
    artifact: Artifact<'_>,
) -> Vec<DeliveryResult> {
    let mut destinations = vec![(DestinationKind::InternalStorage, &config.internal_storage)];
    if let Some(external) = &config.external_storage {
        destinations.push((DestinationKind::ExternalStorage, external));
    }

    destinations
        .into_iter()
        .map(|(kind, storage)| {
            let target = ObjectTarget::for_storage(
                storage,
                artifact.filename,
                XLSX_CONTENT_TYPE,
                artifact.run_fingerprint,
            );
            match store.write_object(&target, artifact.bytes) {
                Ok(()) => {
                    log_info(
                        COMPONENT,
                        "report_stored",
                        json!({
                            "destination": kind,
                            "uri": target.uri(),
                            "bytes": artifact.bytes.len(),
                        }),
                    );
                    DeliveryResult::success(kind, target.uri())
                }
                Err(error) => {
                    log_error(
                        COMPONENT,
                        "storage_write_failed",
                        json!({
                            "destination": kind,
                            "uri": target.uri(),
                            "error": error,
                        }),
                    );
                    DeliveryResult::failure(kind, target.uri(), error)
                }
            }
        })
        .collect()
}

/// Emails the workbook to every recipient in one message.
pub fn email_report(
    mailer: &dyn Mailer,
    config: &AnalysisConfig,
    report: &Report,
    artifact: Artifact<'_>,
) -> Result<DeliveryResult, String> {
    let subject = subject_line(&config.customer_name, report);
    let raw = build_raw_message(EmailContent {
        sender: &config.sender,
        recipients: &config.recipients,
        subject: &subject,
        html_body: summary_html(report, artifact.filename),
        attachment_name: artifact.filename,
        attachment: artifact.bytes.to_vec(),
    })
    .map_err(|error| error.to_string())?;

    let message_id = mailer.send_raw(&config.sender, &config.recipients, &raw)?;
    log_info(
        COMPONENT,
        "email_sent",
        json!({
            "message_id": message_id,
            "recipients": config.recipients.len(),
            "subject": subject,
            "attachment": artifact.filename,
        }),
    );
    Ok(DeliveryResult::success(
        DestinationKind::Email,
        config.recipients.join(","),
    ))
}

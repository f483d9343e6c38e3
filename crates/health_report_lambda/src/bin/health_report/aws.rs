use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_bedrockruntime::primitives::Blob as ModelBlob;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum as CloudWatchDatum, StandardUnit};
use aws_sdk_health::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_health::primitives::DateTime as HealthDateTime;
use aws_sdk_health::types::{
    DateTimeRange, EntityAccountFilter, EntityFilter, EventAccountFilter, EventFilter,
    EventStatusCode, EventTypeCategory, OrganizationEventFilter,
};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_sesv2::primitives::Blob as MailBlob;
use aws_sdk_sesv2::types::{Destination, EmailContent, RawMessage};
use chrono::{DateTime, Utc};
use health_report_core::classification::{ModelRequest, MODEL_CONTENT_TYPE};
use health_report_core::config::RetrySettings;
use health_report_core::contract::{EventStatus, HealthEvent};
use health_report_core::fetch::{EventQuery, PAGE_SIZE};
use health_report_core::metrics::{MetricDatum, MetricsTarget, METRIC_DIMENSION_NAME};
use health_report_core::storage_keys::{ObjectTarget, RUN_FINGERPRINT_METADATA_KEY};
use health_report_lambda::adapters::event_source::{with_account_fallback, HealthEventSource};
use health_report_lambda::adapters::mailer::Mailer;
use health_report_lambda::adapters::metrics_sink::MetricsSink;
use health_report_lambda::adapters::model::ModelClient;
use health_report_lambda::adapters::object_store::ReportStore;
use health_report_lambda::handlers::logging::{log_info, log_warn};
use serde_json::json;

const COMPONENT: &str = "aws_adapter";
/// Health is a global service served from us-east-1; the model is pinned there too.
const PINNED_REGION: &str = "us-east-1";
const SUBSCRIPTION_REQUIRED: &str = "SubscriptionRequiredException";
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared SDK config with the bounded retry and timeout budget applied.
pub async fn load_sdk_config(retry: &RetrySettings) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .retry_config(
            RetryConfig::standard()
                .with_max_attempts(retry.max_attempts)
                .with_initial_backoff(INITIAL_BACKOFF),
        )
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(retry.operation_timeout)
                .connect_timeout(CONNECT_TIMEOUT)
                .build(),
        )
        .load()
        .await
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

fn to_chrono(value: Option<&HealthDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|at| DateTime::<Utc>::from_timestamp(at.secs(), at.subsec_nanos()))
}

fn to_health_time(value: DateTime<Utc>) -> HealthDateTime {
    HealthDateTime::from_secs(value.timestamp())
}

/// `Event` and `OrganizationEvent` expose the same accessors as distinct types.
macro_rules! health_event {
    ($event:expr) => {{
        let event = $event;
        HealthEvent {
            arn: event.arn().unwrap_or_default().to_string(),
            service: event.service().unwrap_or_default().to_string(),
            event_type_code: event.event_type_code().unwrap_or_default().to_string(),
            category: event
                .event_type_category()
                .map(|category| category.as_str().to_string())
                .unwrap_or_default(),
            status: event
                .status_code()
                .map(|status| EventStatus::parse(status.as_str()))
                .unwrap_or(EventStatus::Unknown),
            start_time: to_chrono(event.start_time()),
            end_time: to_chrono(event.end_time()),
            last_updated_time: to_chrono(event.last_updated_time()),
            regions: event.region().map(str::to_string).into_iter().collect(),
            account_id: None,
            description: String::new(),
            affected_entities: Vec::new(),
        }
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthView {
    Organization,
    Account,
}

impl HealthView {
    fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Account => "account",
        }
    }
}

pub struct AwsHealthSource {
    client: aws_sdk_health::Client,
    view: HealthView,
}

impl AwsHealthSource {
    /// Checks the organization view once and falls back to the account view
    /// when it is not enabled or not permitted.
    pub async fn connect(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_health::config::Builder::from(sdk_config)
            .region(Region::new(PINNED_REGION))
            .build();
        let client = aws_sdk_health::Client::from_conf(config);

        let view = match client
            .describe_events_for_organization()
            .max_results(1)
            .send()
            .await
        {
            Ok(_) => HealthView::Organization,
            Err(error) => {
                let code = error.code().unwrap_or("unknown").to_string();
                if code != SUBSCRIPTION_REQUIRED {
                    log_warn(
                        COMPONENT,
                        "organization_view_check_failed",
                        json!({
                            "code": code,
                            "error": DisplayErrorContext(&error).to_string(),
                        }),
                    );
                }
                HealthView::Account
            }
        };
        log_info(
            COMPONENT,
            "health_view_selected",
            json!({ "view": view.as_str() }),
        );
        Self { client, view }
    }

    async fn list_account_events(&self, query: &EventQuery) -> Result<Vec<HealthEvent>, String> {
        let mut filter = EventFilter::builder()
            .start_times(DateTimeRange::builder().from(to_health_time(query.start_from)).build());
        if let Some(end_to) = query.end_to {
            filter = filter.end_times(DateTimeRange::builder().to(to_health_time(end_to)).build());
        }
        for status in &query.statuses {
            filter = filter.event_status_codes(EventStatusCode::from(status.as_str()));
        }
        for category in &query.categories {
            filter = filter.event_type_categories(EventTypeCategory::from(category.as_str()));
        }
        let filter = filter.build();

        let mut events = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .client
                .describe_events()
                .filter(filter.clone())
                .max_results(PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|error| {
                    format!("describe_events failed: {}", DisplayErrorContext(&error))
                })?;
            events.extend(page.events().iter().map(|event| health_event!(event)));
            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(events)
    }

    async fn list_organization_events(
        &self,
        query: &EventQuery,
    ) -> Result<Vec<HealthEvent>, String> {
        let mut filter = OrganizationEventFilter::builder()
            .start_time(DateTimeRange::builder().from(to_health_time(query.start_from)).build());
        if let Some(end_to) = query.end_to {
            filter = filter.end_time(DateTimeRange::builder().to(to_health_time(end_to)).build());
        }
        for status in &query.statuses {
            filter = filter.event_status_codes(EventStatusCode::from(status.as_str()));
        }
        for category in &query.categories {
            filter = filter.event_type_categories(EventTypeCategory::from(category.as_str()));
        }
        let filter = filter.build();

        let mut events = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .client
                .describe_events_for_organization()
                .filter(filter.clone())
                .max_results(PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|error| {
                    format!(
                        "describe_events_for_organization failed: {}",
                        DisplayErrorContext(&error)
                    )
                })?;
            events.extend(page.events().iter().map(|event| health_event!(event)));
            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(events)
    }

    async fn account_description(&self, event_arn: &str) -> Result<Option<String>, String> {
        let output = self
            .client
            .describe_event_details()
            .event_arns(event_arn)
            .send()
            .await
            .map_err(|error| format!("describe_event_details failed: {}", DisplayErrorContext(&error)))?;
        Ok(output
            .successful_set()
            .iter()
            .find_map(|details| details.event_description()?.latest_description())
            .map(str::to_string))
    }

    async fn organization_description(
        &self,
        event_arn: &str,
        account_id: Option<&str>,
    ) -> Result<Option<String>, String> {
        let filter = EventAccountFilter::builder()
            .event_arn(event_arn)
            .set_aws_account_id(account_id.map(str::to_string))
            .build()
            .map_err(|error| format!("invalid event detail filter: {error}"))?;
        let output = self
            .client
            .describe_event_details_for_organization()
            .organization_event_detail_filters(filter)
            .send()
            .await
            .map_err(|error| {
                format!(
                    "describe_event_details_for_organization failed: {}",
                    DisplayErrorContext(&error)
                )
            })?;
        Ok(output
            .successful_set()
            .iter()
            .find_map(|details| details.event_description()?.latest_description())
            .map(str::to_string))
    }

    async fn account_entities(&self, event_arn: &str) -> Result<Vec<String>, String> {
        let filter = EntityFilter::builder()
            .event_arns(event_arn)
            .build()
            .map_err(|error| format!("invalid entity filter: {error}"))?;
        let mut entities = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .client
                .describe_affected_entities()
                .filter(filter.clone())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|error| {
                    format!("describe_affected_entities failed: {}", DisplayErrorContext(&error))
                })?;
            entities.extend(
                page.entities()
                    .iter()
                    .filter_map(|entity| entity.entity_value().map(str::to_string)),
            );
            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(entities)
    }

    async fn organization_entities(
        &self,
        event_arn: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<String>, String> {
        let filter = EntityAccountFilter::builder()
            .event_arn(event_arn)
            .set_aws_account_id(account_id.map(str::to_string))
            .build()
            .map_err(|error| format!("invalid entity account filter: {error}"))?;
        let mut entities = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .client
                .describe_affected_entities_for_organization()
                .organization_entity_account_filters(filter.clone())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|error| {
                    format!(
                        "describe_affected_entities_for_organization failed: {}",
                        DisplayErrorContext(&error)
                    )
                })?;
            entities.extend(
                page.entities()
                    .iter()
                    .filter_map(|entity| entity.entity_value().map(str::to_string)),
            );
            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(entities)
    }

    async fn organization_accounts(&self, event_arn: &str) -> Result<Vec<String>, String> {
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = self
                .client
                .describe_affected_accounts_for_organization()
                .event_arn(event_arn)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|error| {
                    format!(
                        "describe_affected_accounts_for_organization failed: {}",
                        DisplayErrorContext(&error)
                    )
                })?;
            accounts.extend(page.affected_accounts().iter().cloned());
            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(accounts)
    }
}

impl HealthEventSource for AwsHealthSource {
    fn list_events(&self, query: &EventQuery) -> Result<Vec<HealthEvent>, String> {
        match self.view {
            HealthView::Organization => block_on(self.list_organization_events(query)),
            HealthView::Account => block_on(self.list_account_events(query)),
        }
    }

    fn event_description(
        &self,
        event_arn: &str,
        account_id: Option<&str>,
    ) -> Result<Option<String>, String> {
        match self.view {
            HealthView::Organization => with_account_fallback(
                "description",
                event_arn,
                block_on(self.organization_description(event_arn, account_id)),
                Option::is_none,
                || block_on(self.account_description(event_arn)),
            ),
            HealthView::Account => block_on(self.account_description(event_arn)),
        }
    }

    fn affected_entities(
        &self,
        event_arn: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<String>, String> {
        match self.view {
            HealthView::Organization => with_account_fallback(
                "affected_entities",
                event_arn,
                block_on(self.organization_entities(event_arn, account_id)),
                Vec::is_empty,
                || block_on(self.account_entities(event_arn)),
            ),
            HealthView::Account => block_on(self.account_entities(event_arn)),
        }
    }

    fn affected_accounts(&self, event_arn: &str) -> Result<Vec<String>, String> {
        match self.view {
            HealthView::Organization => block_on(self.organization_accounts(event_arn)),
            HealthView::Account => Ok(Vec::new()),
        }
    }
}

pub struct BedrockModelClient {
    client: aws_sdk_bedrockruntime::Client,
}

impl BedrockModelClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_bedrockruntime::config::Builder::from(sdk_config)
            .region(Region::new(PINNED_REGION))
            .build();
        Self {
            client: aws_sdk_bedrockruntime::Client::from_conf(config),
        }
    }
}

impl ModelClient for BedrockModelClient {
    fn invoke_model(&self, request: &ModelRequest) -> Result<Vec<u8>, String> {
        let client = self.client.clone();
        let model_id = request.model_id.clone();
        let body = request.body.clone();

        block_on(async move {
            client
                .invoke_model()
                .model_id(model_id)
                .content_type(MODEL_CONTENT_TYPE)
                .accept(MODEL_CONTENT_TYPE)
                .body(ModelBlob::new(body))
                .send()
                .await
                .map(|output| output.body().as_ref().to_vec())
                .map_err(|error| {
                    format!(
                        "failed to invoke bedrock model: {}",
                        aws_sdk_bedrockruntime::error::DisplayErrorContext(&error)
                    )
                })
        })
    }
}

pub struct S3ReportStore {
    client: aws_sdk_s3::Client,
}

impl S3ReportStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }
}

impl ReportStore for S3ReportStore {
    fn write_object(&self, target: &ObjectTarget, body: &[u8]) -> Result<(), String> {
        let client = self.client.clone();
        let target = target.clone();
        let body_bytes = body.to_vec();

        block_on(async move {
            client
                .put_object()
                .bucket(&target.bucket)
                .key(&target.key)
                .content_type(&target.content_type)
                .metadata(RUN_FINGERPRINT_METADATA_KEY, &target.run_fingerprint)
                .body(ByteStream::from(body_bytes))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    format!(
                        "failed to write object to {}: {}",
                        target.uri(),
                        aws_sdk_s3::error::DisplayErrorContext(&error)
                    )
                })
        })
    }
}

pub struct SesMailer {
    client: aws_sdk_sesv2::Client,
}

impl SesMailer {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_sesv2::Client::new(sdk_config),
        }
    }
}

impl Mailer for SesMailer {
    fn send_raw(
        &self,
        sender: &str,
        recipients: &[String],
        raw_message: &[u8],
    ) -> Result<String, String> {
        let client = self.client.clone();
        let sender = sender.to_string();
        let destination = Destination::builder()
            .set_to_addresses(Some(recipients.to_vec()))
            .build();
        let raw = RawMessage::builder()
            .data(MailBlob::new(raw_message.to_vec()))
            .build()
            .map_err(|error| format!("invalid raw message: {error}"))?;

        block_on(async move {
            client
                .send_email()
                .from_email_address(sender)
                .destination(destination)
                .content(EmailContent::builder().raw(raw).build())
                .send()
                .await
                .map(|output| output.message_id().unwrap_or_default().to_string())
                .map_err(|error| {
                    format!(
                        "failed to send email: {}",
                        aws_sdk_sesv2::error::DisplayErrorContext(&error)
                    )
                })
        })
    }
}

pub struct CloudWatchMetricsSink {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchMetricsSink {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudwatch::Client::new(sdk_config),
        }
    }
}

impl MetricsSink for CloudWatchMetricsSink {
    fn publish(&self, target: &MetricsTarget, data: &[MetricDatum]) -> Result<(), String> {
        let dimension = Dimension::builder()
            .name(METRIC_DIMENSION_NAME)
            .value(&target.function)
            .build();
        let metric_data = data
            .iter()
            .map(|datum| {
                CloudWatchDatum::builder()
                    .metric_name(datum.name)
                    .value(datum.value)
                    .unit(StandardUnit::Count)
                    .dimensions(dimension.clone())
                    .build()
            })
            .collect::<Vec<_>>();
        let client = self.client.clone();
        let namespace = target.namespace.clone();

        block_on(async move {
            client
                .put_metric_data()
                .namespace(namespace)
                .set_metric_data(Some(metric_data))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    format!(
                        "failed to publish metrics: {}",
                        aws_sdk_cloudwatch::error::DisplayErrorContext(&error)
                    )
                })
        })
    }
}

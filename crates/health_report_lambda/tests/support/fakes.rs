use std::collections::HashMap;
use std::sync::Mutex;

use health_report_core::classification::ModelRequest;
use health_report_core::contract::HealthEvent;
use health_report_core::fetch::{EventQuery, QueryKind};
use health_report_core::metrics::{MetricDatum, MetricsTarget};
use health_report_core::storage_keys::ObjectTarget;
use health_report_lambda::adapters::event_source::HealthEventSource;
use health_report_lambda::adapters::mailer::Mailer;
use health_report_lambda::adapters::metrics_sink::MetricsSink;
use health_report_lambda::adapters::model::ModelClient;
use health_report_lambda::adapters::object_store::ReportStore;
use health_report_lambda::handlers::report_run::ReportAdapters;
use serde_json::{json, Value};

#[derive(Default)]
pub struct FakeHealthSource {
    pub settled: Vec<HealthEvent>,
    pub open: Vec<HealthEvent>,
    pub listing_error: Option<String>,
}

impl HealthEventSource for FakeHealthSource {
    fn list_events(&self, query: &EventQuery) -> Result<Vec<HealthEvent>, String> {
        if let Some(error) = &self.listing_error {
            return Err(error.clone());
        }
        Ok(match query.kind {
            QueryKind::Settled => self.settled.clone(),
            QueryKind::Open => self.open.clone(),
        })
    }

    fn event_description(
        &self,
        event_arn: &str,
        _account_id: Option<&str>,
    ) -> Result<Option<String>, String> {
        Ok(Some(format!("Details for {event_arn}")))
    }

    fn affected_entities(
        &self,
        event_arn: &str,
        _account_id: Option<&str>,
    ) -> Result<Vec<String>, String> {
        Ok(vec![format!("{event_arn}/entity")])
    }

    fn affected_accounts(&self, _event_arn: &str) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }
}

/// Answers every batch by reading the event type codes out of the prompt and
/// looking up the risk level to report for each.
pub struct PromptAwareModel {
    risk_by_type: HashMap<String, String>,
    unreachable: bool,
    calls: Mutex<usize>,
}

impl PromptAwareModel {
    pub fn new(risk_by_type: &[(&str, &str)]) -> Self {
        Self {
            risk_by_type: risk_by_type
                .iter()
                .map(|(code, risk)| (code.to_string(), risk.to_string()))
                .collect(),
            unreachable: false,
            calls: Mutex::new(0),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new(&[])
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("poisoned mutex")
    }
}

impl ModelClient for PromptAwareModel {
    fn invoke_model(&self, request: &ModelRequest) -> Result<Vec<u8>, String> {
        *self.calls.lock().expect("poisoned mutex") += 1;
        if self.unreachable {
            return Err("ReadTimeout: model endpoint did not respond".to_string());
        }

        let body: Value = serde_json::from_slice(&request.body).expect("request body is JSON");
        let prompt = body["messages"][0]["content"]
            .as_str()
            .expect("prompt is a string");

        let mut entries = Vec::new();
        let mut index = 0usize;
        for line in prompt.lines() {
            if line.starts_with("### Event ") {
                index += 1;
            } else if let Some(code) = line.strip_prefix("- Type: ") {
                let risk = self
                    .risk_by_type
                    .get(code.trim())
                    .cloned()
                    .unwrap_or_else(|| "low".to_string());
                entries.push(json!({
                    "event_index": index,
                    "risk_level": risk,
                    "impact_analysis": format!("{code} assessed"),
                    "required_actions": ["Review"],
                }));
            }
        }

        let text = format!("```json\n{}\n```", Value::Array(entries));
        Ok(serde_json::to_vec(&json!({
            "content": [{"type": "text", "text": text}]
        }))
        .expect("response serializes"))
    }
}

#[derive(Default)]
pub struct RecordingStore {
    pub denied_buckets: Vec<String>,
    writes: Mutex<Vec<(ObjectTarget, Vec<u8>)>>,
}

impl RecordingStore {
    pub fn denying(bucket: &str) -> Self {
        Self {
            denied_buckets: vec![bucket.to_string()],
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<(ObjectTarget, Vec<u8>)> {
        self.writes.lock().expect("poisoned mutex").clone()
    }
}

impl ReportStore for RecordingStore {
    fn write_object(&self, target: &ObjectTarget, body: &[u8]) -> Result<(), String> {
        if self.denied_buckets.contains(&target.bucket) {
            return Err(format!("AccessDenied: cannot write {}", target.uri()));
        }
        self.writes
            .lock()
            .expect("poisoned mutex")
            .push((target.clone(), body.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub sender: String,
    pub recipients: Vec<String>,
    pub raw_message: Vec<u8>,
}

#[derive(Default)]
pub struct CapturingMailer {
    pub failure: Option<String>,
    sent: Mutex<Vec<SentMail>>,
}

impl CapturingMailer {
    pub fn failing(error: &str) -> Self {
        Self {
            failure: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("poisoned mutex").clone()
    }
}

impl Mailer for CapturingMailer {
    fn send_raw(
        &self,
        sender: &str,
        recipients: &[String],
        raw_message: &[u8],
    ) -> Result<String, String> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut sent = self.sent.lock().expect("poisoned mutex");
        sent.push(SentMail {
            sender: sender.to_string(),
            recipients: recipients.to_vec(),
            raw_message: raw_message.to_vec(),
        });
        Ok(format!("message-{}", sent.len()))
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub failing: bool,
    published: Mutex<Vec<(MetricsTarget, Vec<MetricDatum>)>>,
}

impl RecordingMetrics {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.published
            .lock()
            .expect("poisoned mutex")
            .iter()
            .flat_map(|(_, data)| data.iter())
            .find(|datum| datum.name == name)
            .map(|datum| datum.value)
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.published
            .lock()
            .expect("poisoned mutex")
            .iter()
            .map(|(target, _)| target.namespace.clone())
            .collect()
    }

    pub fn functions(&self) -> Vec<String> {
        self.published
            .lock()
            .expect("poisoned mutex")
            .iter()
            .map(|(target, _)| target.function.clone())
            .collect()
    }
}

impl MetricsSink for RecordingMetrics {
    fn publish(&self, target: &MetricsTarget, data: &[MetricDatum]) -> Result<(), String> {
        if self.failing {
            return Err("Throttling: rate exceeded".to_string());
        }
        self.published
            .lock()
            .expect("poisoned mutex")
            .push((target.clone(), data.to_vec()));
        Ok(())
    }
}

/// One set of fakes wired into the run handler.
pub struct Harness {
    pub source: FakeHealthSource,
    pub model: PromptAwareModel,
    pub store: RecordingStore,
    pub mailer: CapturingMailer,
    pub metrics: RecordingMetrics,
}

impl Harness {
    pub fn new(source: FakeHealthSource, model: PromptAwareModel) -> Self {
        Self {
            source,
            model,
            store: RecordingStore::default(),
            mailer: CapturingMailer::default(),
            metrics: RecordingMetrics::default(),
        }
    }

    pub fn adapters(&self) -> ReportAdapters<'_> {
        ReportAdapters {
            events: &self.source,
            model: &self.model,
            store: &self.store,
            mailer: &self.mailer,
            metrics: &self.metrics,
        }
    }
}

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Failures that end a report run.
///
/// Parse warnings and per-destination storage failures are not here: they are
/// recovered in place and surface through the run summary instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("health event source unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("classification model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("email delivery failed: {0}")]
    EmailDeliveryFailure(String),
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ValidationError),
    #[error("report rendering failed: {0}")]
    Report(String),
}

impl RunError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_) => "UpstreamUnavailable",
            Self::ModelUnavailable(_) => "ModelUnavailable",
            Self::EmailDeliveryFailure(_) => "EmailDeliveryFailure",
            Self::Configuration(_) => "ConfigurationInvalid",
            Self::Report(_) => "ReportRenderFailure",
        }
    }
}

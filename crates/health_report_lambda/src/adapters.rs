pub mod event_source;
pub mod mailer;
pub mod metrics_sink;
pub mod model;
pub mod object_store;

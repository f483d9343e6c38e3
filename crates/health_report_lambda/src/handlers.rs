pub mod classify_events;
pub mod distribute;
pub mod fetch_events;
pub mod logging;
pub mod publish_metrics;
pub mod report_run;
pub mod trigger;

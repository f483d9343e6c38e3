//! Shared AWS Health report domain primitives.
//!
//! This crate owns the deterministic parts of the weekly report pipeline:
//! contracts, configuration parsing, fetch planning, classification prompt and
//! response handling, report assembly, and workbook rendering. It intentionally
//! excludes AWS SDK and Lambda runtime concerns.
//! See `crates/health_report_lambda` for the runtime adapters.

pub mod classification;
pub mod config;
pub mod contract;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod notification;
pub mod report;
pub mod run_context;
pub mod storage_keys;
pub mod workbook;

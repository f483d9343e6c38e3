//! AWS-oriented adapters and handlers for the weekly health report run.
//!
//! This crate owns runtime integration details (the Lambda handler, trigger
//! parsing, and the adapter seams for Health, Bedrock, S3, SES, and
//! CloudWatch). Domain rules live in `health_report_core`; the AWS SDK
//! implementations of the adapters live in the `health_report` binary.

pub mod adapters;
pub mod handlers;

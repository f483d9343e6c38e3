use chrono::{DateTime, Utc};

use crate::config::StorageTarget;

pub const RUN_FINGERPRINT_METADATA_KEY: &str = "run-fingerprint";

/// Substitutes `{date}` (`%Y-%m-%d`) and `{time}` (`%H-%M-%S`) in UTC.
pub fn render_filename(template: &str, at: DateTime<Utc>) -> String {
    template
        .replace("{date}", &at.format("%Y-%m-%d").to_string())
        .replace("{time}", &at.format("%H-%M-%S").to_string())
}

pub fn object_key(prefix: &str, filename: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        filename.to_string()
    } else {
        format!("{trimmed}/{filename}")
    }
}

pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// A fully resolved write: where the workbook goes and how it is tagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTarget {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub run_fingerprint: String,
}

impl ObjectTarget {
    pub fn for_storage(
        storage: &StorageTarget,
        filename: &str,
        content_type: &str,
        run_fingerprint: &str,
    ) -> Self {
        Self {
            bucket: storage.bucket.clone(),
            key: object_key(&storage.key_prefix, filename),
            content_type: content_type.to_string(),
            run_fingerprint: run_fingerprint.to_string(),
        }
    }

    pub fn uri(&self) -> String {
        s3_uri(&self.bucket, &self.key)
    }
}

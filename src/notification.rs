//! Storage-event notification decoding
//!
//! Queue messages carry the storage-creation event shape
//! `{"Records":[{"s3":{"bucket":{"name":...},"object":{"key":...}}}]}`.
//! Only the first record is honored; batched events log the dropped count.

use crate::error::{Result, WorkerError};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct StorageEvent {
    #[serde(rename = "Records", default)]
    records: Vec<StorageRecord>,
}

#[derive(Debug, Deserialize)]
struct StorageRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Location of the source object named by a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub bucket: String,
    pub key: String,
}

impl SourceReference {
    /// Final path segment of the key, used to name the thumbnail.
    pub fn object_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Parse a raw message body into a [`SourceReference`].
///
/// Fails with [`WorkerError::MalformedNotification`] when the body is not
/// valid JSON, has no records, or names an empty bucket/key.
pub fn decode(body: &str) -> Result<SourceReference> {
    let event: StorageEvent = serde_json::from_str(body)
        .map_err(|e| WorkerError::MalformedNotification(e.to_string()))?;

    if event.records.len() > 1 {
        warn!(
            dropped = event.records.len() - 1,
            "batched notification: only the first record is processed"
        );
    }

    let record = event
        .records
        .into_iter()
        .next()
        .ok_or_else(|| WorkerError::MalformedNotification("no records in event".to_string()))?;

    let bucket = record.s3.bucket.name;
    let key = record.s3.object.key;

    if bucket.is_empty() {
        return Err(WorkerError::MalformedNotification(
            "empty bucket name".to_string(),
        ));
    }
    if key.is_empty() {
        return Err(WorkerError::MalformedNotification(
            "empty object key".to_string(),
        ));
    }

    let source = SourceReference { bucket, key };
    if source.object_name().is_empty() {
        return Err(WorkerError::MalformedNotification(format!(
            "object key has no final path segment: {}",
            source.key
        )));
    }

    Ok(source)
}

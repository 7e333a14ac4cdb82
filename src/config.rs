/// Configuration management for the thumbnail worker
///
/// Loads configuration from environment variables with sensible defaults.
/// Only the queue identity is mandatory; everything else has a default
/// (destination folder `Processed`, thumbnail prefix `tb-`, 100x100 bound).
use crate::error::{Result, WorkerError};
use crate::notification::SourceReference;
use crate::services::thumbnail::ThumbnailConfig;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub queue: QueueConfig,
    pub aws: AwsConfig,
    pub output: OutputConfig,
    pub thumbnail: ThumbnailConfig,
    pub worker: WorkerConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QueueConfig {
    /// Full queue URL; takes precedence over `queue_name` when both are set.
    pub queue_url: Option<String>,
    /// Queue name, resolved to a URL at startup.
    pub queue_name: Option<String>,
    /// Long-poll wait time (SQS caps this at 20 seconds).
    pub wait_time_secs: i32,
    /// Messages per receive call (SQS caps this at 10).
    pub max_messages: i32,
    /// Deliveries after which a message is routed out of the main queue.
    /// 0 disables the local bound and defers to the queue's own redrive policy.
    pub max_receive_count: u32,
    pub dead_letter_queue_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub s3_endpoint: Option<String>,
    pub sqs_endpoint: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OutputConfig {
    /// Bucket thumbnails are written to; defaults to the source bucket.
    pub destination_bucket: Option<String>,
    pub destination_folder: String,
    pub filename_prefix: String,
}

impl OutputConfig {
    /// Destination key for a source object's thumbnail.
    ///
    /// Deterministic for a given source, so redelivered notifications
    /// overwrite rather than duplicate.
    pub fn target_key(&self, source: &SourceReference) -> String {
        format!(
            "{}/{}{}",
            self.destination_folder.trim_end_matches('/'),
            self.filename_prefix,
            source.object_name()
        )
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorkerConfig {
    /// Notifications processed concurrently.
    pub concurrency: usize,
    /// Pause after a failed receive before polling again.
    pub poll_backoff_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let queue_url = std::env::var("QUEUE_URL").ok().filter(|v| !v.is_empty());
        let queue_name = std::env::var("QUEUE_NAME").ok().filter(|v| !v.is_empty());
        if queue_url.is_none() && queue_name.is_none() {
            return Err(WorkerError::InvalidConfig(
                "QUEUE_URL or QUEUE_NAME must be set".to_string(),
            ));
        }

        let destination_folder =
            std::env::var("DESTINATION_FOLDER").unwrap_or_else(|_| "Processed".to_string());
        if destination_folder.trim_end_matches('/').is_empty() {
            return Err(WorkerError::InvalidConfig(
                "DESTINATION_FOLDER must not be empty".to_string(),
            ));
        }

        let max_width = std::env::var("THUMB_MAX_WIDTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        let max_height = std::env::var("THUMB_MAX_HEIGHT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        if max_width == 0 || max_height == 0 {
            return Err(WorkerError::InvalidConfig(
                "thumbnail dimensions must be at least 1x1".to_string(),
            ));
        }

        let concurrency = std::env::var("WORKER_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(4);
        if concurrency == 0 {
            return Err(WorkerError::InvalidConfig(
                "WORKER_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            queue: QueueConfig {
                queue_url,
                queue_name,
                wait_time_secs: std::env::var("SQS_WAIT_TIME_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20)
                    .clamp(0, 20),
                max_messages: std::env::var("SQS_MAX_MESSAGES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10)
                    .clamp(1, 10),
                max_receive_count: std::env::var("MAX_RECEIVE_COUNT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
                dead_letter_queue_url: std::env::var("DEAD_LETTER_QUEUE_URL")
                    .ok()
                    .filter(|v| !v.is_empty()),
            },
            aws: AwsConfig {
                region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                s3_endpoint: std::env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),
                sqs_endpoint: std::env::var("SQS_ENDPOINT").ok().filter(|v| !v.is_empty()),
            },
            output: OutputConfig {
                destination_bucket: std::env::var("DESTINATION_BUCKET")
                    .ok()
                    .filter(|v| !v.is_empty()),
                destination_folder,
                filename_prefix: std::env::var("THUMBNAIL_PREFIX")
                    .unwrap_or_else(|_| "tb-".to_string()),
            },
            thumbnail: ThumbnailConfig {
                max_width,
                max_height,
                jpeg_quality: std::env::var("THUMB_JPEG_QUALITY")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(85)
                    .clamp(1, 100),
            },
            worker: WorkerConfig {
                concurrency,
                poll_backoff_ms: std::env::var("POLL_BACKOFF_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            },
        })
    }
}

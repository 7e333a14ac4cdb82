//! Thumbnail service - coordinates the per-notification pipeline
//!
//! One call runs the complete workflow for a raw message body:
//! 1. Decode the notification into a source reference
//! 2. Download the original image
//! 3. Generate the thumbnail
//! 4. Upload it under the destination prefix
//!
//! All state is local to the call; nothing is shared between notifications.

use crate::config::OutputConfig;
use crate::error::Result;
use crate::notification;
use crate::services::thumbnail::processor::{ThumbnailConfig, ThumbnailProcessor};
use crate::storage::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of successfully publishing one thumbnail.
#[derive(Debug, Clone)]
pub struct PublishedThumbnail {
    pub bucket: String,
    pub target_key: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
}

pub struct ThumbnailService<S> {
    store: Arc<S>,
    processor: Arc<ThumbnailProcessor>,
    output: OutputConfig,
}

impl<S: ObjectStore> ThumbnailService<S> {
    pub fn new(store: Arc<S>, thumbnail: ThumbnailConfig, output: OutputConfig) -> Self {
        Self {
            store,
            processor: Arc::new(ThumbnailProcessor::new(thumbnail)),
            output,
        }
    }

    /// Run the full pipeline for one raw message body.
    ///
    /// The target key is derived deterministically from the source, so a
    /// redelivered notification overwrites its earlier thumbnail instead of
    /// creating a duplicate.
    pub async fn process(&self, body: &str) -> Result<PublishedThumbnail> {
        let source = notification::decode(body)?;
        debug!(bucket = %source.bucket, key = %source.key, "fetching source object");

        let original = self.store.download(&source.bucket, &source.key).await?;
        let thumbnail = Arc::clone(&self.processor).generate_async(original).await?;

        let target_key = self.output.target_key(&source);
        let bucket = self
            .output
            .destination_bucket
            .clone()
            .unwrap_or_else(|| source.bucket.clone());
        let size_bytes = thumbnail.data.len();
        let content_type = thumbnail.content_type();

        self.store
            .upload(&bucket, &target_key, thumbnail.data, content_type)
            .await?;

        info!(
            bucket = %bucket,
            target_key = %target_key,
            width = thumbnail.width,
            height = thumbnail.height,
            size = size_bytes,
            "thumbnail uploaded"
        );

        Ok(PublishedThumbnail {
            bucket,
            target_key,
            width: thumbnail.width,
            height: thumbnail.height,
            size_bytes,
        })
    }
}

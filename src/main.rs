//! Thumbnail Worker - SQS consumer for bounded-size thumbnail generation
//!
//! Listens for storage-upload notifications on an SQS queue, downloads each
//! image from S3, generates a thumbnail, and uploads it under the configured
//! destination prefix. A notification is deleted from the queue only after
//! its thumbnail is uploaded.
//!
//! Environment variables:
//! - QUEUE_URL or QUEUE_NAME: input queue (one required)
//! - DESTINATION_BUCKET: bucket for thumbnails (default: source bucket)
//! - DESTINATION_FOLDER: destination key prefix (default: "Processed")
//! - THUMBNAIL_PREFIX: thumbnail filename prefix (default: "tb-")
//! - THUMB_MAX_WIDTH / THUMB_MAX_HEIGHT: bound in pixels (default: 100x100)
//! - THUMB_JPEG_QUALITY: JPEG quality 1-100 (default: 85)
//! - WORKER_CONCURRENCY: notifications processed concurrently (default: 4)
//! - MAX_RECEIVE_COUNT: redelivery bound, 0 disables (default: 5)
//! - DEAD_LETTER_QUEUE_URL: where exhausted messages are forwarded (optional)
//! - SQS_WAIT_TIME_SECS / SQS_MAX_MESSAGES: long-poll tuning (defaults: 20, 10)
//! - AWS_REGION, S3_ENDPOINT, SQS_ENDPOINT: AWS client configuration

use anyhow::Context;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use std::time::Duration;
use thumbnail_worker::config::Config;
use thumbnail_worker::queue::SqsQueue;
use thumbnail_worker::services::thumbnail::{
    ConsumerConfig, NotificationConsumer, RedeliveryPolicy, ThumbnailService,
};
use thumbnail_worker::storage::S3ObjectStore;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("thumbnail_worker=info".parse().expect("valid directive")),
        )
        .init();

    info!("Starting thumbnail worker");

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        queue = %config
            .queue
            .queue_url
            .as_deref()
            .or(config.queue.queue_name.as_deref())
            .unwrap_or("<unset>"),
        destination_folder = %config.output.destination_folder,
        max_width = config.thumbnail.max_width,
        max_height = config.thumbnail.max_height,
        concurrency = config.worker.concurrency,
        "configuration loaded"
    );

    // Shared AWS configuration, with optional endpoint overrides for
    // S3-compatible storage and local queue emulators
    let region_provider = RegionProviderChain::default_provider()
        .or_else(Region::new(config.aws.region.clone()));
    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;

    let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
    if let Some(endpoint) = &config.aws.s3_endpoint {
        s3_builder = s3_builder.endpoint_url(endpoint).force_path_style(true);
    }
    let s3_client = aws_sdk_s3::Client::from_conf(s3_builder.build());

    let mut sqs_builder = aws_sdk_sqs::config::Builder::from(&shared_config);
    if let Some(endpoint) = &config.aws.sqs_endpoint {
        sqs_builder = sqs_builder.endpoint_url(endpoint);
    }
    let sqs_client = aws_sdk_sqs::Client::from_conf(sqs_builder.build());

    let queue = Arc::new(
        SqsQueue::connect(sqs_client, &config.queue)
            .await
            .context("failed to connect to queue")?,
    );
    let store = Arc::new(S3ObjectStore::new(s3_client));
    let service = Arc::new(ThumbnailService::new(
        store,
        config.thumbnail.clone(),
        config.output.clone(),
    ));
    info!("thumbnail service initialized");

    // Handle SIGTERM/SIGINT for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let consumer_config = ConsumerConfig {
        concurrency: config.worker.concurrency,
        poll_backoff: Duration::from_millis(config.worker.poll_backoff_ms),
        redelivery: RedeliveryPolicy {
            max_receive_count: config.queue.max_receive_count,
        },
    };
    let mut consumer = NotificationConsumer::new(queue, service, consumer_config, shutdown_rx);
    if let Err(e) = consumer.run().await {
        error!(error = %e, "consumer error");
    }

    info!("thumbnail worker stopped");
    Ok(())
}

//! Thumbnail generation service
//!
//! - Image processor for resizing and re-encoding
//! - Service coordinating decode -> fetch -> generate -> publish
//! - Queue consumer driving the pipeline with bounded concurrency

pub mod consumer;
pub mod processor;
pub mod service;

pub use consumer::{ConsumerConfig, NotificationConsumer, RedeliveryPolicy};
pub use processor::{ThumbnailConfig, ThumbnailProcessor, ThumbnailResult};
pub use service::{PublishedThumbnail, ThumbnailService};

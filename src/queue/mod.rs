//! Notification queue seam
//!
//! At-least-once delivery, no ordering across messages. A message stays on
//! the queue until `acknowledge` (or `dead_letter`) removes it; a crash
//! between processing and acknowledgment causes redelivery.

use crate::error::Result;
use async_trait::async_trait;

pub mod sqs;

pub use sqs::SqsQueue;

/// One received, not-yet-acknowledged notification.
#[derive(Debug, Clone)]
pub struct QueuedNotification {
    pub message_id: Option<String>,
    /// Raw message body (storage-event JSON).
    pub body: String,
    /// Opaque handle identifying this delivery for acknowledgment.
    pub receipt: String,
    /// Delivery attempt counter, starting at 1 for the first delivery.
    pub receive_count: u32,
}

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Block (with implementation-defined long-poll timeout) until a batch
    /// of notifications is available. May return an empty batch.
    async fn receive(&self) -> Result<Vec<QueuedNotification>>;

    /// Remove a successfully processed notification from the queue.
    async fn acknowledge(&self, receipt: &str) -> Result<()>;

    /// Route a repeatedly failing notification out of the main queue.
    async fn dead_letter(&self, notification: &QueuedNotification) -> Result<()>;
}

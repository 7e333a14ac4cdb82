//! SQS-backed notification queue

use crate::config::QueueConfig;
use crate::error::{Result, WorkerError};
use crate::queue::{NotificationQueue, QueuedNotification};
use async_trait::async_trait;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use aws_sdk_sqs::Client;
use tracing::{info, warn};

pub struct SqsQueue {
    client: Client,
    queue_url: String,
    dead_letter_queue_url: Option<String>,
    wait_time_secs: i32,
    max_messages: i32,
}

impl SqsQueue {
    /// Build a consumer handle, resolving the queue URL by name when only a
    /// name is configured.
    pub async fn connect(client: Client, config: &QueueConfig) -> Result<Self> {
        let queue_url = match (&config.queue_url, &config.queue_name) {
            (Some(url), _) => url.clone(),
            (None, Some(name)) => {
                let resolved = client
                    .get_queue_url()
                    .queue_name(name)
                    .send()
                    .await
                    .map_err(|e| {
                        WorkerError::QueueUnavailable(format!(
                            "failed to resolve queue {name}: {e}"
                        ))
                    })?;
                resolved
                    .queue_url()
                    .ok_or_else(|| {
                        WorkerError::QueueUnavailable(format!("queue {name} has no URL"))
                    })?
                    .to_string()
            }
            (None, None) => {
                return Err(WorkerError::InvalidConfig(
                    "queue URL or queue name required".to_string(),
                ))
            }
        };

        info!(queue_url = %queue_url, "queue resolved");

        Ok(Self {
            client,
            queue_url,
            dead_letter_queue_url: config.dead_letter_queue_url.clone(),
            wait_time_secs: config.wait_time_secs,
            max_messages: config.max_messages,
        })
    }
}

#[async_trait]
impl NotificationQueue for SqsQueue {
    async fn receive(&self) -> Result<Vec<QueuedNotification>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.max_messages)
            .wait_time_seconds(self.wait_time_secs)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| WorkerError::QueueUnavailable(e.to_string()))?;

        let mut notifications = Vec::new();
        for message in output.messages.unwrap_or_default() {
            let receipt = match message.receipt_handle() {
                Some(r) => r.to_string(),
                None => {
                    warn!("message missing receipt handle, skipping");
                    continue;
                }
            };
            let body = match message.body() {
                Some(b) => b.to_string(),
                None => {
                    warn!("message missing body, skipping");
                    continue;
                }
            };
            let receive_count = message
                .attributes()
                .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);

            notifications.push(QueuedNotification {
                message_id: message.message_id().map(str::to_string),
                body,
                receipt,
                receive_count,
            });
        }

        Ok(notifications)
    }

    async fn acknowledge(&self, receipt: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| {
                WorkerError::QueueUnavailable(format!("failed to delete message: {e}"))
            })?;
        Ok(())
    }

    /// Forward the body to the dead-letter queue (when one is configured),
    /// then remove the message from the main queue.
    async fn dead_letter(&self, notification: &QueuedNotification) -> Result<()> {
        if let Some(dlq) = &self.dead_letter_queue_url {
            self.client
                .send_message()
                .queue_url(dlq)
                .message_body(&notification.body)
                .send()
                .await
                .map_err(|e| {
                    WorkerError::QueueUnavailable(format!(
                        "failed to forward to dead-letter queue: {e}"
                    ))
                })?;
        }
        self.acknowledge(&notification.receipt).await
    }
}

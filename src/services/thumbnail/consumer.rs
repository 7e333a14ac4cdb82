//! Queue consumer driving the notification pipeline
//!
//! A single polling task receives batches and hands each notification to a
//! worker task admitted by a semaphore, so at most `concurrency`
//! notifications are in flight. Per-notification state is task-local.
//!
//! Acknowledgment timing is the at-least-once contract: a notification is
//! deleted from the queue only after its thumbnail is uploaded. Any failure
//! leaves it in place for redelivery, bounded by the redelivery policy.

use crate::error::Result;
use crate::queue::{NotificationQueue, QueuedNotification};
use crate::services::thumbnail::service::ThumbnailService;
use crate::storage::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Redelivery bound applied before a notification is processed.
#[derive(Clone, Debug)]
pub struct RedeliveryPolicy {
    /// Deliveries after which a message is routed out of the main queue.
    /// 0 disables the local bound (the queue's own redrive policy applies).
    pub max_receive_count: u32,
}

impl RedeliveryPolicy {
    fn exhausted(&self, receive_count: u32) -> bool {
        self.max_receive_count > 0 && receive_count > self.max_receive_count
    }
}

/// Consumer configuration
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Notifications processed concurrently.
    pub concurrency: usize,
    /// Pause after a failed receive before polling again.
    pub poll_backoff: Duration,
    pub redelivery: RedeliveryPolicy,
}

/// Polling consumer for storage-upload notifications
pub struct NotificationConsumer<Q, S> {
    queue: Arc<Q>,
    service: Arc<ThumbnailService<S>>,
    config: ConsumerConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl<Q, S> NotificationConsumer<Q, S>
where
    Q: NotificationQueue + 'static,
    S: ObjectStore + 'static,
{
    pub fn new(
        queue: Arc<Q>,
        service: Arc<ThumbnailService<S>>,
        config: ConsumerConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            service,
            config,
            shutdown_rx,
        }
    }

    /// Run the consumer loop until the shutdown signal flips.
    ///
    /// In-flight notifications are drained before this returns; a worker is
    /// never aborted mid-pipeline.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            concurrency = self.config.concurrency,
            "starting notification consumer loop"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping consumer");
                        break;
                    }
                }

                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}

                received = self.queue.receive() => {
                    match received {
                        Ok(batch) => {
                            for notification in batch {
                                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                                    Ok(permit) => permit,
                                    Err(_) => break,
                                };
                                let queue = Arc::clone(&self.queue);
                                let service = Arc::clone(&self.service);
                                let policy = self.config.redelivery.clone();
                                in_flight.spawn(async move {
                                    let _permit = permit;
                                    handle_notification(queue, service, policy, notification).await;
                                });
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "failed to receive from queue, backing off");
                            tokio::time::sleep(self.config.poll_backoff).await;
                        }
                    }
                }
            }
        }

        // Finish in-flight notifications before exiting.
        while in_flight.join_next().await.is_some() {}

        info!("notification consumer stopped");
        Ok(())
    }
}

/// Process one notification and settle it against the queue.
///
/// Success is the only path that acknowledges a live notification; every
/// processing failure leaves it on the queue. A notification past the
/// redelivery bound is dead-lettered without being processed again.
async fn handle_notification<Q, S>(
    queue: Arc<Q>,
    service: Arc<ThumbnailService<S>>,
    policy: RedeliveryPolicy,
    notification: QueuedNotification,
) where
    Q: NotificationQueue,
    S: ObjectStore,
{
    let message_id = notification
        .message_id
        .clone()
        .unwrap_or_else(|| "<unknown>".to_string());

    if policy.exhausted(notification.receive_count) {
        warn!(
            message_id = %message_id,
            receive_count = notification.receive_count,
            "redelivery bound exhausted, dead-lettering notification"
        );
        if let Err(e) = queue.dead_letter(&notification).await {
            error!(message_id = %message_id, error = %e, "failed to dead-letter notification");
        }
        return;
    }

    info!(
        message_id = %message_id,
        receive_count = notification.receive_count,
        "received notification"
    );

    match service.process(&notification.body).await {
        Ok(published) => {
            if let Err(e) = queue.acknowledge(&notification.receipt).await {
                // Redelivery will reprocess; overwrite semantics make that safe.
                error!(
                    message_id = %message_id,
                    target_key = %published.target_key,
                    error = %e,
                    "thumbnail uploaded but acknowledgment failed"
                );
            }
        }
        Err(e) => {
            warn!(
                message_id = %message_id,
                kind = e.kind(),
                error = %e,
                "processing failed, notification left on queue"
            );
        }
    }
}
